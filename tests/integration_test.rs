use granule_meta::{
    driver::{Driver, DriverConfig},
    errors::{MetaError, Result},
    merger::AttributeMerger,
    metadata::attr_value_from_netcdf,
    value::{AttrValue, AttributeSet},
};
use netcdf::{create, open};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

const GRANULE: &str = "M2OCEAN_S2SV3.ocn_tavg_1mo_glo_T1440x1080_slv.19980201_0000z.nc4";

/// Write a small NetCDF-4 file carrying the given global attributes
fn create_granule(path: &Path, attrs: &[(&str, &str)]) -> Result<()> {
    let mut file = create(path)?;
    file.add_dimension("time", 1)?;
    let mut var = file.add_variable::<f32>("SST", &["time"])?;
    var.put_attribute("units", "K")?;
    var.put_values(&[271.5f32], ..)?;
    for (name, value) in attrs {
        file.add_attribute(name, *value)?;
    }
    Ok(())
}

fn read_attributes(path: &Path) -> Result<Vec<(String, AttrValue)>> {
    let file = open(path)?;
    let mut attrs = Vec::new();
    for attr in file.attributes() {
        attrs.push((attr.name().to_string(), attr_value_from_netcdf(attr.value()?)));
    }
    Ok(attrs)
}

fn lookup<'a>(attrs: &'a [(String, AttrValue)], name: &str) -> Option<&'a AttrValue> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v)
}

fn write_tables(dir: &Path) -> (PathBuf, PathBuf, PathBuf) {
    let products = dir.join("products.csv");
    fs::write(
        &products,
        "ShortName,ScienceProductName,Notes\nM2OCEAN_TAVG,ocn_tavg_1mo_glo_T1440x1080_slv,monthly\n",
    )
    .expect("write products table");

    let metadata = dir.join("metadata.csv");
    fs::write(
        &metadata,
        "ShortName,LongName,VersionID,Title\n\
         M2OCEAN_TAVG,MERRA-2 Ocean Monthly Mean,1,\n\
         M2OCEAN_INST,MERRA-2 Ocean Instantaneous,1,\n",
    )
    .expect("write metadata table");

    let global = dir.join("gmet.csv");
    fs::write(
        &global,
        "Conventions = CF-1.7\nInstitution = NASA Global Modeling and Assimilation Office\n",
    )
    .expect("write global table");

    (products, metadata, global)
}

#[test]
fn test_merge_round_trip_preserves_input() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let input = temp_dir.path().join("input.nc4");
    let output = temp_dir.path().join("output.nc4");
    create_granule(&input, &[("title", "Old Title"), ("Source", "original")])?;

    let mut attrs = AttributeSet::new();
    attrs.insert("Title", "M2OCEAN_TAVG");
    attrs.insert("Source", "rewritten");
    attrs.insert("VersionID", AttrValue::Int(2));
    attrs.insert("Resolution", AttrValue::Float(0.25));
    attrs.insert("Comment", AttrValue::Missing);

    let mut merger = AttributeMerger::open(&input, Some(&output))?;
    let summary = merger.add_attributes(&attrs, true)?;
    assert_eq!(summary.created, 3);
    assert_eq!(summary.replaced, 2);
    merger.close()?;
    merger.close()?;

    let written = read_attributes(&output)?;
    assert_eq!(lookup(&written, "Title"), Some(&AttrValue::from("M2OCEAN_TAVG")));
    assert_eq!(lookup(&written, "title"), None);
    assert_eq!(lookup(&written, "Source"), Some(&AttrValue::from("rewritten")));
    assert_eq!(lookup(&written, "VersionID"), Some(&AttrValue::Int(2)));
    assert_eq!(lookup(&written, "Resolution"), Some(&AttrValue::Float(0.25)));
    assert_eq!(lookup(&written, "Comment"), Some(&AttrValue::from("")));

    // Variables survive the attribute edits
    let file = open(&output)?;
    let sst = file.variable("SST").expect("SST variable");
    assert_eq!(sst.get_values::<f32, _>(..)?, vec![271.5]);

    let original = read_attributes(&input)?;
    assert_eq!(
        original,
        vec![
            ("title".to_string(), AttrValue::from("Old Title")),
            ("Source".to_string(), AttrValue::from("original")),
        ]
    );

    Ok(())
}

#[test]
fn test_merge_without_output_edits_in_place() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("granule.nc4");
    create_granule(&path, &[("Conventions", "CF-1.6")])?;

    let mut attrs = AttributeSet::new();
    attrs.insert("conventions", "CF-1.7");

    let mut merger = AttributeMerger::open(&path, None)?.with_verbose(true);
    merger.add_attributes(&attrs, false)?;
    assert_eq!(
        merger.list_attributes()?,
        vec![("Conventions".to_string(), AttrValue::from("CF-1.6"))]
    );
    merger.add_attributes(&attrs, true)?;
    merger.close()?;

    assert_eq!(
        read_attributes(&path)?,
        vec![("conventions".to_string(), AttrValue::from("CF-1.7"))]
    );
    Ok(())
}

#[test]
fn test_open_missing_input_fails() {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let result = AttributeMerger::open(&temp_dir.path().join("absent.nc4"), None);
    assert!(matches!(result, Err(MetaError::FileNotFound { .. })));
}

#[test]
fn test_driver_processes_granule() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let (products, metadata, global) = write_tables(temp_dir.path());

    let input = temp_dir.path().join(GRANULE);
    create_granule(&input, &[("title", "placeholder"), ("Institution", "unknown")])?;
    let outdir = temp_dir.path().join("results");
    fs::create_dir_all(&outdir)?;

    let mut driver = Driver::new(DriverConfig {
        product_table: products,
        metadata_table: metadata,
        global_table: global,
        ..DriverConfig::default()
    });
    let output = driver.process_file(&input, &outdir)?;
    assert_eq!(output, outdir.join(GRANULE));

    let attrs = read_attributes(&output)?;
    // The metadata row's empty Title cell is applied after the dynamic Title
    assert_eq!(lookup(&attrs, "Title"), Some(&AttrValue::from("")));
    assert_eq!(lookup(&attrs, "title"), None);
    assert_eq!(lookup(&attrs, "GranuleID"), Some(&AttrValue::from(GRANULE)));
    assert_eq!(lookup(&attrs, "Filename"), Some(&AttrValue::from(GRANULE)));
    assert_eq!(lookup(&attrs, "RangeBeginningDate"), Some(&AttrValue::from("1998-02-01")));
    assert_eq!(lookup(&attrs, "RangeEndingDate"), Some(&AttrValue::from("1998-02-28")));
    assert_eq!(lookup(&attrs, "RangeBeginningTime"), Some(&AttrValue::from("00:00:00.0000")));
    assert_eq!(lookup(&attrs, "RangeEndingTime"), Some(&AttrValue::from("23:59:59.9999")));
    assert_eq!(lookup(&attrs, "ShortName"), Some(&AttrValue::from("M2OCEAN_TAVG")));
    assert_eq!(
        lookup(&attrs, "LongName"),
        Some(&AttrValue::from("MERRA-2 Ocean Monthly Mean"))
    );
    assert_eq!(lookup(&attrs, "Conventions"), Some(&AttrValue::from("CF-1.7")));
    assert_eq!(
        lookup(&attrs, "Institution"),
        Some(&AttrValue::from("NASA Global Modeling and Assimilation Office"))
    );

    match lookup(&attrs, "ProductionDateTime") {
        Some(AttrValue::Str(s)) => {
            assert_eq!(s.len(), "19980201T00:00:00Z".len());
            assert!(s.ends_with('Z'));
        }
        other => panic!("Expected ProductionDateTime string, got {:?}", other),
    }

    // Input granule keeps its original attributes
    assert_eq!(
        lookup(&read_attributes(&input)?, "title"),
        Some(&AttrValue::from("placeholder"))
    );
    Ok(())
}

#[test]
fn test_driver_batch_skips_failing_granules() -> Result<()> {
    let temp_dir = tempdir().expect("Failed to create temp dir");
    let (products, metadata, global) = write_tables(temp_dir.path());

    let granules = temp_dir.path().join("granules");
    fs::create_dir_all(&granules)?;
    create_granule(&granules.join(GRANULE), &[])?;
    // Unreadable date token
    create_granule(&granules.join("M2OCEAN_S2SV3.ocn_tavg_1mo_glo_T1440x1080_slv.1998_0000z.nc4"), &[])?;
    // Product missing from the products table
    create_granule(&granules.join("M2OCEAN_S2SV3.ocn_unknown.19980301_0000z.nc4"), &[])?;
    // Not part of the product family
    create_granule(&granules.join("OTHER.ocn_tavg_1mo_glo_T1440x1080_slv.19980201_0000z.nc4"), &[])?;

    let outdir = temp_dir.path().join("out");
    let mut driver = Driver::new(DriverConfig {
        product_table: products,
        metadata_table: metadata,
        global_table: global,
        ..DriverConfig::default()
    });
    let report = driver.run(&granules, &outdir)?;

    assert_eq!(report.total(), 3);
    assert_eq!(report.processed, vec![outdir.join(GRANULE)]);
    assert_eq!(report.failed.len(), 2);

    // Failed granules never reach the output directory
    let written: Vec<_> = fs::read_dir(&outdir)?.collect();
    assert_eq!(written.len(), 1);
    Ok(())
}
