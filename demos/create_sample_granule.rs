//! Creates a sample M2OCEAN granule and matching lookup tables.
//!
//! The granule carries a few placeholder global attributes so a run of
//! granule-meta shows both new and replaced metadata.

use netcdf::create;
use std::fs;
use std::path::Path;

const GRANULE: &str = "M2OCEAN_S2SV3.ocn_tavg_1mo_glo_T1440x1080_slv.19980201_0000z.nc4";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dir = Path::new("sample_data");
    fs::create_dir_all(dir)?;
    let output_path = dir.join(GRANULE);

    println!("🔨 Creating sample granule: {}", output_path.display());

    // Remove existing file if it exists
    if output_path.exists() {
        fs::remove_file(&output_path)?
    }

    let mut file = create(&output_path)?;

    // Placeholder global attributes
    file.add_attribute("title", "MERRA-2 ocean placeholder")?;
    file.add_attribute("Conventions", "CF-1.6")?;
    file.add_attribute("Filename", "unknown")?;

    file.add_dimension("time", 1)?;
    file.add_dimension("lat", 4)?;
    file.add_dimension("lon", 8)?;

    {
        let mut lat_var = file.add_variable::<f32>("lat", &["lat"])?;
        lat_var.put_attribute("units", "degrees_north")?;
        let lat: Vec<f32> = (0..4).map(|i| -67.5 + i as f32 * 45.0).collect();
        lat_var.put_values(&lat, ..)?;
    }

    {
        let mut lon_var = file.add_variable::<f32>("lon", &["lon"])?;
        lon_var.put_attribute("units", "degrees_east")?;
        let lon: Vec<f32> = (0..8).map(|i| -180.0 + i as f32 * 45.0).collect();
        lon_var.put_values(&lon, ..)?;
    }

    {
        let mut sst = file.add_variable::<f32>("SST", &["time", "lat", "lon"])?;
        sst.put_attribute("units", "K")?;
        sst.put_attribute("long_name", "sea surface temperature")?;
        sst.put_attribute("_FillValue", 1.0e15f32)?;
        let values: Vec<f32> = (0..32).map(|i| 271.0 + (i % 8) as f32).collect();
        sst.put_values(&values, ..)?;
    }

    fs::write(
        dir.join("products.csv"),
        "ShortName,ScienceProductName\nM2OCEAN_TAVG,ocn_tavg_1mo_glo_T1440x1080_slv\n",
    )?;
    fs::write(
        dir.join("metadata.csv"),
        "ShortName,LongName,VersionID\nM2OCEAN_TAVG,MERRA-2 Ocean Monthly Mean,1\n",
    )?;
    fs::write(
        dir.join("gmet.csv"),
        "Conventions=CF-1.7\nInstitution=NASA Global Modeling and Assimilation Office\n",
    )?;

    println!("✅ Wrote granule and tables to {}", dir.display());
    println!("\n🧪 Rewrite its metadata with:");
    println!(
        "   cargo run -- sample_data results -v --list --metadata-table sample_data/metadata.csv \
         --product-table sample_data/products.csv --global-table sample_data/gmet.csv"
    );

    Ok(())
}
