//! granule_meta: global metadata rewriting for NetCDF granules
//!
//! Copies NetCDF granules and rewrites their global attributes from three sources:
//! values derived from the granule filename (product, date range, production time),
//! a per-product row in a spreadsheet or CSV table, and a global `key=value` table.
//!
//! ## Module Organization
//!
//! - [`table`]: lookup tables from `.csv`/`.txt` and `.xls`/`.xlsx`/`.ods` files
//! - [`value`]: tagged attribute values and ordered attribute sets
//! - [`target`]: files whose global attributes can be edited
//! - [`merger`]: overwrite and case-insensitive merge policy
//! - [`granule`]: filename parsing and dynamic attributes
//! - [`driver`]: per-file orchestration and directory batches
//! - [`metadata`]: NetCDF attribute conversion and listing
//! - [`errors`]: centralized error handling
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use granule_meta::prelude::*;
//! use std::path::Path;
//!
//! let mut merger = AttributeMerger::open(Path::new("in.nc4"), Some(Path::new("out.nc4"))).unwrap();
//! let mut attrs = AttributeSet::new();
//! attrs.insert("Title", "M2OCEAN_S2SV3_MONTHLY");
//! merger.add_attributes(&attrs, true).unwrap();
//! merger.close().unwrap();
//! ```

pub mod cli;
pub mod driver;
pub mod errors;
pub mod granule;
pub mod merger;
pub mod metadata;
pub mod table;
pub mod target;
pub mod value;

use log::LevelFilter;
use std::{env, sync::OnceLock};

pub use driver::*;
pub use errors::*;
pub use granule::*;
pub use merger::*;
pub use table::*;
pub use target::*;
pub use value::*;

pub mod prelude {
    //! Commonly used imports for convenience
    pub use crate::driver::{BatchReport, Driver, DriverConfig};
    pub use crate::errors::{MetaError, Result};
    pub use crate::granule::GranuleName;
    pub use crate::merger::{AttributeMerger, AttributeSource, MergeSummary};
    pub use crate::table::{LoadOptions, LookupTable, TableCache};
    pub use crate::target::{AttributeTarget, MemoryTarget, NetcdfTarget};
    pub use crate::value::{AttrValue, AttributeSet};
}

static LOGGER: OnceLock<()> = OnceLock::new();

/// Initialise stdout logging once. `RUST_LOG` overrides the default filter.
pub fn init_logging(verbose: bool) {
    LOGGER.get_or_init(|| {
        let mut builder = env_logger::Builder::from_env(env_logger::Env::default());
        if env::var("RUST_LOG").is_err() {
            let level = if verbose {
                LevelFilter::Debug
            } else {
                LevelFilter::Info
            };
            builder.filter_module("granule_meta", level);
        }
        let _ = builder
            .target(env_logger::Target::Stdout)
            .format_timestamp_millis()
            .try_init();
    });
}
