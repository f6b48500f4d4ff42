//! NetCDF attribute value conversion and display
//!
//! Global attributes come back from the `netcdf` crate as [`AttributeValue`];
//! this module maps them onto [`AttrValue`] and renders them for listings.

use crate::value::AttrValue;
use netcdf::AttributeValue;

/// Convert a NetCDF attribute value into the crate's tagged value.
///
/// Scalars keep their kind; string lists are joined with `", "` and other
/// arrays are rendered as text.
pub fn attr_value_from_netcdf(value: AttributeValue) -> AttrValue {
    match value {
        AttributeValue::Str(s) => AttrValue::Str(s),
        AttributeValue::Strs(ss) => AttrValue::Str(ss.join(", ")),
        AttributeValue::Double(d) => AttrValue::Float(d),
        AttributeValue::Float(f) => AttrValue::Float(f as f64),
        AttributeValue::Longlong(i) => AttrValue::Int(i),
        AttributeValue::Int(i) => AttrValue::Int(i as i64),
        AttributeValue::Short(s) => AttrValue::Int(s as i64),
        AttributeValue::Schar(c) => AttrValue::Int(c as i64),
        AttributeValue::Uchar(u) => AttrValue::Int(u as i64),
        AttributeValue::Ushort(u) => AttrValue::Int(u as i64),
        AttributeValue::Uint(u) => AttrValue::Int(u as i64),
        AttributeValue::Ulonglong(u) => match i64::try_from(u) {
            Ok(i) => AttrValue::Int(i),
            Err(_) => AttrValue::Str(u.to_string()),
        },
        AttributeValue::Doubles(ds) => AttrValue::Str(format!("{:?}", ds)),
        AttributeValue::Floats(fs) => AttrValue::Str(format!("{:?}", fs)),
        AttributeValue::Ints(is) => AttrValue::Str(format!("{:?}", is)),
        AttributeValue::Shorts(ss) => AttrValue::Str(format!("{:?}", ss)),
        other => AttrValue::Str(format!("{:?}", other)),
    }
}

/// Render a value the way attribute listings show it: text quoted, numbers bare.
pub fn format_attr_value(value: &AttrValue) -> String {
    match value {
        AttrValue::Str(s) => format!("'{}'", s),
        AttrValue::Int(i) => i.to_string(),
        AttrValue::Float(f) => f.to_string(),
        AttrValue::Missing => "nan".to_string(),
    }
}

/// Prints global attributes as `\tname: value` lines.
pub fn print_attributes(attributes: &[(String, AttrValue)]) {
    println!("\n===== Global Attributes =====");
    for (name, value) in attributes {
        println!("\t{}: {}", name, format_attr_value(value));
    }
}
