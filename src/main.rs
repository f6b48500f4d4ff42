//! Entry point for the granule-meta application.
//! Parses the CLI, sets up logging, and runs the driver over a file or directory.

use clap::Parser;
use granule_meta::cli::Args;
use granule_meta::{init_logging, Driver};
use log::info;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut driver = Driver::new(args.driver_config());
    let report = driver.run(&args.fpath, &args.outdir)?;

    info!(
        "Processed {} of {} file(s) into {}",
        report.processed.len(),
        report.total(),
        args.outdir.display()
    );

    Ok(())
}
