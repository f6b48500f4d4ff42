//! Merging attribute sets into a target file's global metadata
//!
//! [`AttributeMerger`] applies name/value pairs one at a time. Each name is
//! classified against the attributes already present (exact match,
//! case-insensitive match, or none) and the overwrite flag decides what happens.

use crate::errors::{MetaError, Result};
use crate::metadata::{format_attr_value, print_attributes};
use crate::table::{LoadOptions, LookupTable};
use crate::target::{AttributeTarget, NetcdfTarget};
use crate::value::{AttrValue, AttributeSet};
use log::{error, info, log, warn, Level};
use std::fs;
use std::path::Path;

/// How a requested attribute name relates to the existing ones
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameMatch {
    /// Same name, same casing
    Exact(String),
    /// Same name in a different casing; holds the existing spelling
    CaseInsensitive(String),
    None,
}

/// Classify `name` against `existing`, first hit in attribute order.
pub fn classify_name(name: &str, existing: &[String]) -> NameMatch {
    for attr in existing {
        if attr == name {
            return NameMatch::Exact(attr.clone());
        }
        if attr.to_lowercase() == name.to_lowercase() {
            return NameMatch::CaseInsensitive(attr.clone());
        }
    }
    NameMatch::None
}

fn same_file(a: &Path, b: &Path) -> Result<bool> {
    if !b.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}

/// Counts of what a merge did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    pub created: usize,
    pub replaced: usize,
    pub unchanged: usize,
}

impl MergeSummary {
    /// Add another merge's counts to this one
    pub fn absorb(&mut self, other: MergeSummary) {
        self.created += other.created;
        self.replaced += other.replaced;
        self.unchanged += other.unchanged;
    }
}

/// Which part of a lookup table becomes the attribute set
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttributeSource {
    /// The row whose `key_column` equals `key`, one attribute per column
    Row { key_column: String, key: String },
    /// Every row's `key_column` cell paired with its `value_column` cell
    Columns { key_column: String, value_column: String },
}

impl AttributeSource {
    /// Build a source from the loose key-name / value-column pair.
    ///
    /// Exactly one of `key_name` and `value_column` must be set.
    pub fn from_parts(
        key_column: &str,
        key_name: Option<&str>,
        value_column: Option<&str>,
    ) -> Result<Self> {
        match (key_name, value_column) {
            (Some(key), None) => Ok(AttributeSource::Row {
                key_column: key_column.to_string(),
                key: key.to_string(),
            }),
            (None, Some(value_column)) => Ok(AttributeSource::Columns {
                key_column: key_column.to_string(),
                value_column: value_column.to_string(),
            }),
            _ => Err(MetaError::ConflictingSelector),
        }
    }

    pub fn select(&self, table: &LookupTable) -> Result<AttributeSet> {
        match self {
            AttributeSource::Row { key_column, key } => {
                table.select_one_row(key, Some(key_column.as_str()))
            }
            AttributeSource::Columns {
                key_column,
                value_column,
            } => table.select_two_columns(Some(key_column.as_str()), Some(value_column.as_str())),
        }
    }
}

/// Applies attribute sets to one open target
pub struct AttributeMerger<T: AttributeTarget = NetcdfTarget> {
    target: T,
    verbose: bool,
    overwrite: bool,
}

impl AttributeMerger<NetcdfTarget> {
    /// Open `input` for editing.
    ///
    /// When `output` is given the input is copied there first and only the copy
    /// is modified.
    pub fn open(input: &Path, output: Option<&Path>) -> Result<Self> {
        if !input.is_file() {
            error!("Error: file does not exist {}", input.display());
            return Err(MetaError::FileNotFound {
                path: input.to_path_buf(),
            });
        }

        let path = match output {
            Some(out) if !same_file(input, out)? => {
                fs::copy(input, out)?;
                out
            }
            _ => input,
        };

        Ok(Self::new(NetcdfTarget::open(path)?))
    }
}

impl<T: AttributeTarget> AttributeMerger<T> {
    pub fn new(target: T) -> Self {
        Self {
            target,
            verbose: false,
            overwrite: true,
        }
    }

    /// Log every creation and replacement at info level instead of debug
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Overwrite policy used by the table-driven merges
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn target(&self) -> &T {
        &self.target
    }

    fn change_level(&self) -> Level {
        if self.verbose {
            Level::Info
        } else {
            Level::Debug
        }
    }

    /// Write every pair of `attrs` into the target's global attributes.
    ///
    /// Missing and NaN values are written as empty strings. Names are
    /// re-read after each write, so later pairs see the effect of earlier ones.
    pub fn add_attributes(&mut self, attrs: &AttributeSet, overwrite: bool) -> Result<MergeSummary> {
        let level = self.change_level();
        let mut summary = MergeSummary::default();

        for (name, value) in attrs.iter() {
            let value = value.normalized();
            let existing = self.target.attribute_names()?;

            match classify_name(name, &existing) {
                NameMatch::None => {
                    self.target.put_attribute(name, &value)?;
                    log!(level, "New Meta: {} = {}", name, format_attr_value(&value));
                    summary.created += 1;
                }
                NameMatch::Exact(attr) if overwrite => {
                    let old = self.target.attribute(&attr)?.unwrap_or(AttrValue::Missing);
                    self.target.put_attribute(name, &value)?;
                    log!(
                        level,
                        "Replace Meta: {} from {} to {}",
                        name,
                        format_attr_value(&old),
                        format_attr_value(&value)
                    );
                    summary.replaced += 1;
                }
                NameMatch::CaseInsensitive(attr) if overwrite => {
                    let old = self.target.attribute(&attr)?.unwrap_or(AttrValue::Missing);
                    self.target.delete_attribute(&attr)?;
                    self.target.put_attribute(name, &value)?;
                    log!(
                        level,
                        "Replace Meta: {} ({}) from {} to {}",
                        name,
                        attr,
                        format_attr_value(&old),
                        format_attr_value(&value)
                    );
                    summary.replaced += 1;
                }
                _ => summary.unchanged += 1,
            }
        }

        Ok(summary)
    }

    /// Merge the part of `table` picked by `source`, with the merger's overwrite policy.
    pub fn add_attributes_from_table(
        &mut self,
        table: &LookupTable,
        source: &AttributeSource,
    ) -> Result<MergeSummary> {
        let attrs = source.select(table)?;
        self.add_attributes(&attrs, self.overwrite)
    }

    /// Load a table file and merge either one keyed row or a key/value column pair.
    ///
    /// Exactly one of `key_name` and `value_column` must be given; otherwise the
    /// call logs an error and changes nothing.
    pub fn add_attributes_from_file(
        &mut self,
        path: &Path,
        key_column: &str,
        key_name: Option<&str>,
        value_column: Option<&str>,
        options: &LoadOptions,
    ) -> Result<MergeSummary> {
        let source = match AttributeSource::from_parts(key_column, key_name, value_column) {
            Ok(source) => source,
            Err(e) => {
                error!("Error: {}", e);
                return Err(e);
            }
        };
        let table = LookupTable::load(path, options)?;
        self.add_attributes_from_table(&table, &source)
    }

    /// Current global attributes in file order
    pub fn list_attributes(&self) -> Result<Vec<(String, AttrValue)>> {
        let mut attributes = Vec::new();
        for name in self.target.attribute_names()? {
            let value = self.target.attribute(&name)?.unwrap_or(AttrValue::Missing);
            attributes.push((name, value));
        }
        Ok(attributes)
    }

    pub fn print_attributes(&self) -> Result<()> {
        print_attributes(&self.list_attributes()?);
        Ok(())
    }

    /// Flush and release the target. Safe to call more than once.
    pub fn close(&mut self) -> Result<()> {
        if self.target.is_open() {
            self.target.close()?;
            info!("Closed {}", self.target.location().display());
        }
        Ok(())
    }
}

impl<T: AttributeTarget> Drop for AttributeMerger<T> {
    fn drop(&mut self) {
        if self.target.is_open() {
            if let Err(e) = self.target.close() {
                warn!("Failed to close {}: {}", self.target.location().display(), e);
            }
        }
    }
}
