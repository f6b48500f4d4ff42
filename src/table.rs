//! Lookup tables loaded from spreadsheets or delimited text
//!
//! A [`LookupTable`] is a small in-memory grid of [`AttrValue`] cells with named
//! columns. Column names and string cells are whitespace-stripped on load, and
//! lookups compare keys as exact strings.

use crate::errors::{MetaError, Result};
use crate::value::{AttrValue, AttributeSet};
use calamine::{open_workbook_auto, Data, Reader};
use log::{debug, error, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

/// Source formats recognised by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `.csv` and `.txt`
    Delimited,
    /// `.xls`, `.xlsx` and `.ods`
    Spreadsheet,
}

impl TableFormat {
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "csv" | "txt" => Some(TableFormat::Delimited),
            "xls" | "xlsx" | "ods" => Some(TableFormat::Spreadsheet),
            _ => None,
        }
    }
}

/// How a table file is read
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadOptions {
    /// Worksheet to read from spreadsheet sources
    pub sheet_name: String,
    /// Restrict the table to these columns, in this order
    pub use_cols: Option<Vec<String>>,
    /// Field separator for delimited text
    pub delimiter: u8,
    /// Whether the first text row holds the column names
    pub has_header: bool,
    /// Column names to use instead of the header row
    pub names: Option<Vec<String>>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            sheet_name: "metadata".to_string(),
            use_cols: None,
            delimiter: b',',
            has_header: true,
            names: None,
        }
    }
}

impl LoadOptions {
    pub fn sheet(mut self, name: &str) -> Self {
        self.sheet_name = name.to_string();
        self
    }

    pub fn columns(mut self, cols: &[&str]) -> Self {
        self.use_cols = Some(cols.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Read a header-less text file, naming its columns positionally.
    pub fn without_header(mut self, names: &[&str]) -> Self {
        self.has_header = false;
        self.names = Some(names.iter().map(|n| n.to_string()).collect());
        self
    }
}

/// Column-oriented view over a loaded table
#[derive(Debug, Clone, PartialEq)]
pub struct LookupTable {
    columns: Vec<String>,
    rows: Vec<Vec<AttrValue>>,
}

impl LookupTable {
    /// Build a table from already parsed parts; short rows are padded with missing cells.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<AttrValue>>) -> Self {
        let width = columns.len();
        let rows = rows
            .into_iter()
            .map(|mut row| {
                row.resize(width, AttrValue::Missing);
                row
            })
            .collect();
        Self { columns, rows }
    }

    /// Load a table file, logging and returning an error when it cannot be read.
    pub fn load(path: &Path, options: &LoadOptions) -> Result<Self> {
        let result = Self::load_inner(path, options);
        match &result {
            Ok(table) => debug!(
                "Loaded {} row(s) x {} column(s) from {}",
                table.len(),
                table.columns.len(),
                path.display()
            ),
            Err(e) => error!("Error loading table {}: {}", path.display(), e),
        }
        result
    }

    fn load_inner(path: &Path, options: &LoadOptions) -> Result<Self> {
        if !path.is_file() {
            return Err(MetaError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let format = TableFormat::from_path(path).ok_or_else(|| {
            MetaError::UnsupportedTableFormat {
                path: path.to_path_buf(),
            }
        })?;

        let table = match format {
            TableFormat::Delimited => read_delimited(path, options)?,
            TableFormat::Spreadsheet => read_spreadsheet(path, options)?,
        };

        match &options.use_cols {
            Some(cols) => table.project(cols),
            None => Ok(table),
        }
    }

    /// Keep only `cols`, in the given order.
    pub fn project(&self, cols: &[String]) -> Result<Self> {
        let indices = cols
            .iter()
            .map(|c| self.column_index(c))
            .collect::<Result<Vec<_>>>()?;

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();

        Ok(Self {
            columns: cols.to_vec(),
            rows,
        })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn column_index(&self, name: &str) -> Result<usize> {
        self.columns
            .iter()
            .position(|c| c == name)
            .ok_or_else(|| MetaError::ColumnNotFound {
                column: name.to_string(),
                available: self.columns.clone(),
            })
    }

    /// Resolve an optional column name, falling back to the column at `default_pos`.
    fn resolve_column(&self, requested: Option<&str>, default_pos: usize) -> Result<usize> {
        let result = match requested {
            Some(name) => self.column_index(name),
            None if default_pos < self.columns.len() => Ok(default_pos),
            None => Err(MetaError::ColumnNotFound {
                column: format!("#{}", default_pos),
                available: self.columns.clone(),
            }),
        };
        if let Err(e) = &result {
            error!("{}", e);
        }
        result
    }

    /// Return the row whose `key_column` equals `key` as a column-ordered attribute set.
    ///
    /// `key_column` defaults to the first column. When several rows match, the first
    /// one is used and a warning is logged.
    pub fn select_one_row(&self, key: &str, key_column: Option<&str>) -> Result<AttributeSet> {
        let idx = self.resolve_column(key_column, 0)?;
        let column = &self.columns[idx];

        let mut matches = self.rows.iter().filter(|row| row[idx].as_str() == Some(key));
        let first = match matches.next() {
            Some(row) => row,
            None => {
                let valid: Vec<String> = self.rows.iter().map(|r| r[idx].to_string()).collect();
                error!("Error: {} is not a valid key ...", key);
                error!("Valid keys in '{}': [{}]", column, valid.join(", "));
                return Err(MetaError::KeyNotFound {
                    key: key.to_string(),
                    column: column.clone(),
                });
            }
        };
        let extra = matches.count();
        if extra > 0 {
            warn!(
                "Warning: {} is not a unique key in '{}' ({} rows match), using the first",
                key,
                column,
                extra + 1
            );
        }

        Ok(self
            .columns
            .iter()
            .cloned()
            .zip(first.iter().cloned())
            .collect())
    }

    /// Pair every row's key cell with its value cell.
    ///
    /// Columns default to the first and second. A key that appears more than once
    /// keeps the value from its last row.
    pub fn select_two_columns(
        &self,
        key_column: Option<&str>,
        value_column: Option<&str>,
    ) -> Result<AttributeSet> {
        let key_idx = self.resolve_column(key_column, 0)?;
        let value_idx = self.resolve_column(value_column, 1)?;

        let mut attrs = AttributeSet::new();
        for (line, row) in self.rows.iter().enumerate() {
            let key = &row[key_idx];
            if key.is_missing() {
                warn!(
                    "Skipping row {}: no key in column '{}'",
                    line + 1,
                    self.columns[key_idx]
                );
                continue;
            }
            attrs.insert(key.to_string(), row[value_idx].clone());
        }
        Ok(attrs)
    }
}

fn text_cell(field: &str) -> AttrValue {
    let field = field.trim();
    if field.is_empty() {
        AttrValue::Missing
    } else {
        AttrValue::Str(field.to_string())
    }
}

fn read_delimited(path: &Path, options: &LoadOptions) -> Result<LookupTable> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(options.delimiter)
        .has_headers(options.has_header)
        .flexible(true)
        .from_path(path)?;

    let header: Vec<String> = if options.has_header {
        reader.headers()?.iter().map(|h| h.trim().to_string()).collect()
    } else {
        Vec::new()
    };

    // With explicit names, fields past the last named column belong to it:
    // `DataSetURL=https://x.org/a?b=c` keeps its full value.
    let named_width = options.names.as_ref().map(Vec::len).filter(|&n| n > 0);
    let separator = (options.delimiter as char).to_string();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let fields: Vec<&str> = record.iter().collect();
        let row = match named_width {
            Some(width) if fields.len() > width => {
                let mut row: Vec<AttrValue> =
                    fields[..width - 1].iter().map(|f| text_cell(f)).collect();
                row.push(text_cell(&fields[width - 1..].join(&separator)));
                row
            }
            _ => fields.iter().map(|f| text_cell(f)).collect(),
        };
        rows.push(row);
    }

    let columns = match &options.names {
        Some(names) => names.iter().map(|n| n.trim().to_string()).collect(),
        None if options.has_header => header,
        None => {
            let width = rows.iter().map(Vec::len).max().unwrap_or(0);
            (0..width).map(|i| i.to_string()).collect()
        }
    };

    Ok(LookupTable::from_rows(columns, rows))
}

fn spreadsheet_cell(cell: &Data) -> AttrValue {
    match cell {
        Data::String(s) => AttrValue::Str(s.trim().to_string()),
        Data::Int(i) => AttrValue::Int(*i),
        Data::Float(v) => AttrValue::Float(*v),
        Data::Bool(b) => AttrValue::Str(if *b { "True" } else { "False" }.to_string()),
        Data::Empty | Data::Error(_) => AttrValue::Missing,
        other => AttrValue::Str(other.to_string().trim().to_string()),
    }
}

fn read_spreadsheet(path: &Path, options: &LoadOptions) -> Result<LookupTable> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook.worksheet_range(&options.sheet_name)?;

    let mut rows = range.rows();
    let columns: Vec<String> = match rows.next() {
        Some(header) => header
            .iter()
            .enumerate()
            .map(|(i, cell)| match cell {
                Data::Empty => format!("Unnamed: {}", i),
                other => other.to_string().trim().to_string(),
            })
            .collect(),
        None => return Ok(LookupTable::from_rows(Vec::new(), Vec::new())),
    };

    let cells: Vec<Vec<AttrValue>> = rows
        .map(|row| row.iter().map(spreadsheet_cell).collect())
        .collect();

    let mut table = LookupTable::from_rows(columns, cells);
    promote_integral_columns(&mut table);
    Ok(table)
}

/// Spreadsheets store every number as a float; a column whose cells are all
/// whole numbers is read back as integers.
fn promote_integral_columns(table: &mut LookupTable) {
    if table.rows.is_empty() {
        return;
    }
    for col in 0..table.columns.len() {
        let integral = table.rows.iter().all(|row| match &row[col] {
            AttrValue::Int(_) => true,
            AttrValue::Float(v) => v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64,
            _ => false,
        });
        if !integral {
            continue;
        }
        for row in table.rows.iter_mut() {
            if let AttrValue::Float(v) = row[col] {
                row[col] = AttrValue::Int(v as i64);
            }
        }
    }
}

/// Process-scoped cache of loaded tables, keyed by path and load options.
///
/// Tables are assumed static for the lifetime of a run, so entries are never
/// invalidated.
#[derive(Debug, Default)]
pub struct TableCache {
    tables: HashMap<(PathBuf, LoadOptions), Rc<LookupTable>>,
}

impl TableCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_load(&mut self, path: &Path, options: &LoadOptions) -> Result<Rc<LookupTable>> {
        let key = (path.to_path_buf(), options.clone());
        if let Some(table) = self.tables.get(&key) {
            return Ok(Rc::clone(table));
        }
        let table = Rc::new(LookupTable::load(path, options)?);
        self.tables.insert(key, Rc::clone(&table));
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
