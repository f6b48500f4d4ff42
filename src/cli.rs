//! Defines command-line interface options using `clap` for the granule-meta application.

use crate::driver::{DriverConfig, DEFAULT_GLOBAL_TABLE, DEFAULT_METADATA_TABLE, DEFAULT_PATTERN};
use clap::Parser;
use std::path::PathBuf;

/// Rewrites the global metadata of NetCDF granules
#[derive(Parser, Debug)]
#[command(
    name = "granule-meta",
    version,
    about = "Modify the global metadata of M2OCEAN NC4 files from filenames and lookup tables"
)]
pub struct Args {
    /// Single granule, or a directory of granules
    pub fpath: PathBuf,

    /// Output directory, created if absent
    #[arg(default_value = "results")]
    pub outdir: PathBuf,

    /// Log every attribute change
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Spreadsheet (or CSV) with one row of static attributes per ShortName
    #[arg(long, default_value = DEFAULT_METADATA_TABLE)]
    pub metadata_table: PathBuf,

    /// Table mapping ScienceProductName to ShortName. Defaults to the metadata table.
    #[arg(long)]
    pub product_table: Option<PathBuf>,

    /// Header-less key=value table applied to every granule
    #[arg(long, default_value = DEFAULT_GLOBAL_TABLE)]
    pub global_table: PathBuf,

    /// Sheet holding the product name mapping
    #[arg(long, default_value = "products")]
    pub products_sheet: String,

    /// Sheet holding the per-product attributes
    #[arg(long, default_value = "metadata")]
    pub metadata_sheet: String,

    /// Granule filename pattern used in directory mode
    #[arg(long, default_value = DEFAULT_PATTERN)]
    pub pattern: String,

    /// Leave attributes that already exist untouched
    #[arg(long, default_value_t = false)]
    pub keep_existing: bool,

    /// Print the final global attributes of every output file
    #[arg(short, long, default_value_t = false)]
    pub list: bool,
}

impl Args {
    pub fn driver_config(&self) -> DriverConfig {
        DriverConfig {
            product_table: self
                .product_table
                .clone()
                .unwrap_or_else(|| self.metadata_table.clone()),
            products_sheet: self.products_sheet.clone(),
            metadata_table: self.metadata_table.clone(),
            metadata_sheet: self.metadata_sheet.clone(),
            global_table: self.global_table.clone(),
            pattern: self.pattern.clone(),
            verbose: self.verbose,
            overwrite: !self.keep_existing,
            list: self.list,
        }
    }
}
