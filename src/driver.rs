//! Per-granule orchestration and directory batches
//!
//! For each granule the driver parses the filename, resolves the product's
//! `ShortName`, copies the file into the output directory, and applies three
//! attribute sets in order: the dynamic per-file values, the product's row from
//! the metadata sheet, and the global key=value table.

use crate::errors::{MetaError, Result};
use crate::granule::{production_datetime, GranuleName};
use crate::merger::{AttributeMerger, AttributeSource, MergeSummary};
use crate::table::{LoadOptions, TableCache};
use chrono::Utc;
use log::{error, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_METADATA_TABLE: &str = "M2OCEAN_global_metadata.xls";
pub const DEFAULT_GLOBAL_TABLE: &str = "M2OCN_gmet.csv";
pub const DEFAULT_PATTERN: &str = "M2OCEAN_S2SV3*.nc4";

const SHORT_NAME_COLUMN: &str = "ShortName";
const PRODUCT_NAME_COLUMN: &str = "ScienceProductName";

/// Table locations and merge behaviour for a run
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// Table mapping science product names to short names
    pub product_table: PathBuf,
    pub products_sheet: String,
    /// Table with one row of static attributes per short name
    pub metadata_table: PathBuf,
    pub metadata_sheet: String,
    /// Header-less `key=value` table applied to every granule
    pub global_table: PathBuf,
    /// Glob used to pick granules in directory mode
    pub pattern: String,
    pub verbose: bool,
    pub overwrite: bool,
    /// Print the final attributes of every output file
    pub list: bool,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            product_table: PathBuf::from(DEFAULT_METADATA_TABLE),
            products_sheet: "products".to_string(),
            metadata_table: PathBuf::from(DEFAULT_METADATA_TABLE),
            metadata_sheet: "metadata".to_string(),
            global_table: PathBuf::from(DEFAULT_GLOBAL_TABLE),
            pattern: DEFAULT_PATTERN.to_string(),
            verbose: false,
            overwrite: true,
            list: false,
        }
    }
}

impl DriverConfig {
    fn product_options(&self) -> LoadOptions {
        LoadOptions::default()
            .sheet(&self.products_sheet)
            .columns(&[SHORT_NAME_COLUMN, PRODUCT_NAME_COLUMN])
    }

    fn metadata_options(&self) -> LoadOptions {
        LoadOptions::default().sheet(&self.metadata_sheet)
    }

    fn global_options(&self) -> LoadOptions {
        LoadOptions::default()
            .delimiter(b'=')
            .without_header(&["a", "b"])
    }
}

/// Outcome of a batch run
#[derive(Debug, Default)]
pub struct BatchReport {
    pub processed: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl BatchReport {
    pub fn total(&self) -> usize {
        self.processed.len() + self.failed.len()
    }
}

/// Files to process: every match of `pattern` when `fpath` is a directory
/// (not recursive, sorted), otherwise `fpath` itself.
pub fn collect_inputs(fpath: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    if !fpath.is_dir() {
        return Ok(vec![fpath.to_path_buf()]);
    }

    let dir = fpath
        .to_str()
        .ok_or_else(|| MetaError::Generic(format!("Unusable directory path: {}", fpath.display())))?;
    let full_pattern = format!("{}/{}", glob::Pattern::escape(dir), pattern);

    let mut inputs = Vec::new();
    for entry in glob::glob(&full_pattern)? {
        match entry {
            Ok(path) if path.is_file() => inputs.push(path),
            Ok(_) => {}
            Err(e) => warn!("Skipping unreadable entry: {}", e),
        }
    }
    inputs.sort();
    Ok(inputs)
}

/// Runs the per-granule procedure, sharing loaded tables across files
pub struct Driver {
    config: DriverConfig,
    cache: TableCache,
}

impl Driver {
    pub fn new(config: DriverConfig) -> Self {
        Self {
            config,
            cache: TableCache::new(),
        }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// Look up the `ShortName` of a science product
    pub fn resolve_short_name(&mut self, product: &str) -> Result<String> {
        let options = self.config.product_options();
        let table = self.cache.get_or_load(&self.config.product_table, &options)?;
        let row = table.select_one_row(product, Some(PRODUCT_NAME_COLUMN))?;

        match row.get(SHORT_NAME_COLUMN).and_then(|v| v.as_str()) {
            Some(name) if !name.is_empty() => Ok(name.to_string()),
            _ => Err(MetaError::Generic(format!(
                "Product '{}' has no {} in {}",
                product,
                SHORT_NAME_COLUMN,
                self.config.product_table.display()
            ))),
        }
    }

    /// Copy `input` into `outdir` and rewrite the copy's global attributes.
    pub fn process_file(&mut self, input: &Path, outdir: &Path) -> Result<PathBuf> {
        let basename = input
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| MetaError::InvalidFilename {
                filename: input.display().to_string(),
            })?;

        let granule = GranuleName::parse(basename)?;
        let short_name = self.resolve_short_name(&granule.product)?;
        let output = outdir.join(basename);

        let mut merger = AttributeMerger::open(input, Some(&output))?
            .with_verbose(self.config.verbose)
            .with_overwrite(self.config.overwrite);

        let mut summary = MergeSummary::default();
        let dynamic = granule.dynamic_attributes(&short_name, &production_datetime(Utc::now()));
        summary.absorb(merger.add_attributes(&dynamic, self.config.overwrite)?);

        let metadata = self
            .cache
            .get_or_load(&self.config.metadata_table, &self.config.metadata_options())?;
        let per_product = AttributeSource::Row {
            key_column: SHORT_NAME_COLUMN.to_string(),
            key: short_name.clone(),
        };
        summary.absorb(merger.add_attributes_from_table(&metadata, &per_product)?);

        let global = self
            .cache
            .get_or_load(&self.config.global_table, &self.config.global_options())?;
        let pairs = AttributeSource::Columns {
            key_column: "a".to_string(),
            value_column: "b".to_string(),
        };
        summary.absorb(merger.add_attributes_from_table(&global, &pairs)?);

        if self.config.list {
            merger.print_attributes()?;
        }
        merger.close()?;

        info!(
            "{} -> {} ({}): {} new, {} replaced, {} kept",
            basename,
            output.display(),
            short_name,
            summary.created,
            summary.replaced,
            summary.unchanged
        );
        Ok(output)
    }

    /// Process a file or every matching granule in a directory.
    ///
    /// A failing granule is logged and skipped; only setup problems (output
    /// directory, glob pattern) end the run with an error.
    pub fn run(&mut self, fpath: &Path, outdir: &Path) -> Result<BatchReport> {
        fs::create_dir_all(outdir)?;
        let inputs = collect_inputs(fpath, &self.config.pattern)?;
        if inputs.is_empty() {
            warn!(
                "No files matching '{}' in {}",
                self.config.pattern,
                fpath.display()
            );
        }

        let mut report = BatchReport::default();
        for input in inputs {
            info!("{}", input.display());
            match self.process_file(&input, outdir) {
                Ok(output) => report.processed.push(output),
                Err(e) => {
                    error!("Skipping {}: {}", input.display(), e);
                    report.failed.push((input, e.to_string()));
                }
            }
        }
        Ok(report)
    }
}
