//! Centralized error handling for granule_meta
//!
//! Every fallible operation returns [`Result`], so a failed lookup or an unreadable
//! filename is handled at the call site instead of surfacing later as an unrelated
//! failure.

use std::fmt;
use std::path::PathBuf;

/// Main error type for granule_meta operations
#[derive(Debug)]
pub enum MetaError {
    /// NetCDF file operation errors
    NetCDFError(netcdf::Error),

    /// Non-zero status returned by a direct libnetcdf call
    NetcdfStatus { operation: String, code: i32 },

    /// I/O operation errors
    IoError(std::io::Error),

    /// Delimited text parsing errors
    CsvError(csv::Error),

    /// Spreadsheet parsing errors
    SpreadsheetError(calamine::Error),

    /// Invalid glob pattern for directory mode
    PatternError(glob::PatternError),

    /// Input file or table does not exist
    FileNotFound { path: PathBuf },

    /// Table file extension is not a supported tabular format
    UnsupportedTableFormat { path: PathBuf },

    /// Column not present in the loaded table
    ColumnNotFound { column: String, available: Vec<String> },

    /// No row carries the requested key
    KeyNotFound { key: String, column: String },

    /// Exactly one of a key name or a value column must be given
    ConflictingSelector,

    /// Filename does not have the expected dot-separated layout
    InvalidFilename { filename: String },

    /// Date token from the filename cannot be turned into a calendar date
    InvalidDateToken { filename: String, token: String },

    /// Target file was already closed
    TargetClosed { path: PathBuf },

    /// Generic error for everything else
    Generic(String),
}

impl fmt::Display for MetaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetaError::NetCDFError(e) => write!(f, "NetCDF error: {}", e),
            MetaError::NetcdfStatus { operation, code } => {
                write!(f, "NetCDF error: {} failed with status {}", operation, code)
            }
            MetaError::IoError(e) => write!(f, "I/O error: {}", e),
            MetaError::CsvError(e) => write!(f, "CSV error: {}", e),
            MetaError::SpreadsheetError(e) => write!(f, "Spreadsheet error: {}", e),
            MetaError::PatternError(e) => write!(f, "Invalid file pattern: {}", e),
            MetaError::FileNotFound { path } => {
                write!(f, "File does not exist: {}", path.display())
            }
            MetaError::UnsupportedTableFormat { path } => write!(
                f,
                "Unsupported table format '{}': expected .csv, .txt, .xls, .xlsx or .ods",
                path.display()
            ),
            MetaError::ColumnNotFound { column, available } => write!(
                f,
                "Column '{}' is not in the loaded columns [{}]",
                column,
                available.join(", ")
            ),
            MetaError::KeyNotFound { key, column } => {
                write!(f, "'{}' is not a valid key in column '{}'", key, column)
            }
            MetaError::ConflictingSelector => write!(
                f,
                "Set either a key name or a value column, not both or neither"
            ),
            MetaError::InvalidFilename { filename } => {
                write!(f, "Cannot split '{}' into product and date fields", filename)
            }
            MetaError::InvalidDateToken { filename, token } => write!(
                f,
                "Invalid date token '{}' in filename '{}'",
                token, filename
            ),
            MetaError::TargetClosed { path } => {
                write!(f, "Target file '{}' is already closed", path.display())
            }
            MetaError::Generic(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for MetaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MetaError::NetCDFError(e) => Some(e),
            MetaError::IoError(e) => Some(e),
            MetaError::CsvError(e) => Some(e),
            MetaError::SpreadsheetError(e) => Some(e),
            MetaError::PatternError(e) => Some(e),
            _ => None,
        }
    }
}

impl From<netcdf::Error> for MetaError {
    fn from(error: netcdf::Error) -> Self {
        MetaError::NetCDFError(error)
    }
}

impl From<std::io::Error> for MetaError {
    fn from(error: std::io::Error) -> Self {
        MetaError::IoError(error)
    }
}

impl From<csv::Error> for MetaError {
    fn from(error: csv::Error) -> Self {
        MetaError::CsvError(error)
    }
}

impl From<calamine::Error> for MetaError {
    fn from(error: calamine::Error) -> Self {
        MetaError::SpreadsheetError(error)
    }
}

impl From<glob::PatternError> for MetaError {
    fn from(error: glob::PatternError) -> Self {
        MetaError::PatternError(error)
    }
}

impl From<String> for MetaError {
    fn from(error: String) -> Self {
        MetaError::Generic(error)
    }
}

impl From<&str> for MetaError {
    fn from(error: &str) -> Self {
        MetaError::Generic(error.to_string())
    }
}

/// Result type alias for granule_meta operations
pub type Result<T> = std::result::Result<T, MetaError>;
