//! Files whose global attributes can be read and rewritten
//!
//! [`AttributeTarget`] is the seam between the merge policy and the storage:
//! [`NetcdfTarget`] edits a NetCDF file in place, [`MemoryTarget`] keeps an
//! ordered attribute list in memory for previews and tests.

use crate::errors::{MetaError, Result};
use crate::metadata::attr_value_from_netcdf;
use crate::value::AttrValue;
use netcdf::FileMut;
use std::ffi::CString;
use std::path::{Path, PathBuf};

/// Global attribute access for a single open file
pub trait AttributeTarget {
    /// Current attribute names, in file order
    fn attribute_names(&self) -> Result<Vec<String>>;

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>>;

    /// Create or replace the attribute `name`
    fn put_attribute(&mut self, name: &str, value: &AttrValue) -> Result<()>;

    fn delete_attribute(&mut self, name: &str) -> Result<()>;

    /// Flush and release the file. Closing twice is a no-op.
    fn close(&mut self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Path shown in log lines and errors
    fn location(&self) -> &Path;
}

/// A NetCDF file opened for appending
pub struct NetcdfTarget {
    path: PathBuf,
    file: Option<FileMut>,
}

impl NetcdfTarget {
    /// Open an existing file for in-place attribute edits
    pub fn open(path: &Path) -> Result<Self> {
        let file = netcdf::append(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Some(file),
        })
    }

    fn file(&self) -> Result<&FileMut> {
        self.file.as_ref().ok_or_else(|| MetaError::TargetClosed {
            path: self.path.clone(),
        })
    }

    fn file_mut(&mut self) -> Result<&mut FileMut> {
        self.file.as_mut().ok_or_else(|| MetaError::TargetClosed {
            path: self.path.clone(),
        })
    }
}

impl AttributeTarget for NetcdfTarget {
    fn attribute_names(&self) -> Result<Vec<String>> {
        Ok(self
            .file()?
            .attributes()
            .map(|attr| attr.name().to_string())
            .collect())
    }

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>> {
        match self.file()?.attribute(name) {
            Some(attr) => Ok(Some(attr_value_from_netcdf(attr.value()?))),
            None => Ok(None),
        }
    }

    fn put_attribute(&mut self, name: &str, value: &AttrValue) -> Result<()> {
        let file = self.file_mut()?;
        match value {
            AttrValue::Str(s) => {
                file.add_attribute(name, s.as_str())?;
            }
            AttrValue::Int(i) => {
                file.add_attribute(name, *i)?;
            }
            AttrValue::Float(v) => {
                file.add_attribute(name, *v)?;
            }
            AttrValue::Missing => {
                file.add_attribute(name, "")?;
            }
        }
        Ok(())
    }

    fn delete_attribute(&mut self, name: &str) -> Result<()> {
        // The crate handle must be released before libnetcdf opens a second one.
        if self.file.take().is_none() {
            return Err(MetaError::TargetClosed {
                path: self.path.clone(),
            });
        }
        let deleted = delete_global_attribute(&self.path, name);
        self.file = Some(netcdf::append(&self.path)?);
        deleted
    }

    fn close(&mut self) -> Result<()> {
        // Dropping the handle runs nc_close.
        drop(self.file.take());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.file.is_some()
    }

    fn location(&self) -> &Path {
        &self.path
    }
}

fn check_status(operation: &str, code: i32) -> Result<()> {
    if code == netcdf_sys::NC_NOERR {
        Ok(())
    } else {
        Err(MetaError::NetcdfStatus {
            operation: operation.to_string(),
            code,
        })
    }
}

/// Remove a global attribute with a short-lived raw libnetcdf handle.
fn delete_global_attribute(path: &Path, name: &str) -> Result<()> {
    use netcdf_sys::{
        nc_close, nc_del_att, nc_enddef, nc_open, nc_redef, NC_EINDEFINE, NC_GLOBAL, NC_NOERR,
        NC_WRITE,
    };

    let c_path = path
        .to_str()
        .and_then(|p| CString::new(p).ok())
        .ok_or_else(|| MetaError::Generic(format!("Unusable file path: {}", path.display())))?;
    let c_name = CString::new(name)
        .map_err(|_| MetaError::Generic(format!("Unusable attribute name: {:?}", name)))?;

    let _guard = netcdf_sys::libnetcdf_lock.lock();

    let mut ncid = 0;
    check_status("nc_open", unsafe { nc_open(c_path.as_ptr(), NC_WRITE, &mut ncid) })?;

    // Classic-format files only accept deletions in define mode.
    let status = unsafe {
        let redef = nc_redef(ncid);
        if redef != NC_NOERR && redef != NC_EINDEFINE {
            redef
        } else {
            let deleted = nc_del_att(ncid, NC_GLOBAL, c_name.as_ptr());
            let ended = nc_enddef(ncid);
            if deleted != NC_NOERR {
                deleted
            } else {
                ended
            }
        }
    };
    let closed = unsafe { nc_close(ncid) };

    check_status("nc_del_att", status)?;
    check_status("nc_close", closed)
}

/// In-memory attribute list with the same replace/delete semantics as a file
#[derive(Debug, Clone)]
pub struct MemoryTarget {
    path: PathBuf,
    attributes: Vec<(String, AttrValue)>,
    closed: bool,
}

impl Default for MemoryTarget {
    fn default() -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            attributes: Vec::new(),
            closed: false,
        }
    }
}

impl MemoryTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attributes<I, K, V>(attributes: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<AttrValue>,
    {
        Self {
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
            ..Self::default()
        }
    }

    /// Attributes as currently held, regardless of open state
    pub fn attributes(&self) -> &[(String, AttrValue)] {
        &self.attributes
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(MetaError::TargetClosed {
                path: self.path.clone(),
            })
        } else {
            Ok(())
        }
    }
}

impl AttributeTarget for MemoryTarget {
    fn attribute_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.attributes.iter().map(|(n, _)| n.clone()).collect())
    }

    fn attribute(&self, name: &str) -> Result<Option<AttrValue>> {
        self.ensure_open()?;
        Ok(self
            .attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.clone()))
    }

    fn put_attribute(&mut self, name: &str, value: &AttrValue) -> Result<()> {
        self.ensure_open()?;
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(entry) => entry.1 = value.clone(),
            None => self.attributes.push((name.to_string(), value.clone())),
        }
        Ok(())
    }

    fn delete_attribute(&mut self, name: &str) -> Result<()> {
        self.ensure_open()?;
        self.attributes.retain(|(n, _)| n != name);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }

    fn is_open(&self) -> bool {
        !self.closed
    }

    fn location(&self) -> &Path {
        &self.path
    }
}
