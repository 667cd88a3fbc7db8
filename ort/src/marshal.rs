//! Converts Rust strings into the layouts the C API takes.

use std::ffi::CString;
use std::os::raw::c_char;
use std::path::Path;

use crate::error::OrtError;
use crate::ffi;

/// An owned array of NUL-terminated strings plus the pointer array the C API
/// reads. The pointers stay valid for as long as the value is alive.
pub(crate) struct CStringArray {
    _strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CStringArray {
    pub fn new<I, S>(strings: I) -> Result<Self, OrtError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let strings = strings
            .into_iter()
            .map(|s| to_cstring(s.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        let ptrs = strings.iter().map(|s| s.as_ptr()).collect();
        Ok(Self { _strings: strings, ptrs })
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.ptrs.len()
    }
}

pub(crate) fn to_cstring(s: &str) -> Result<CString, OrtError> {
    CString::new(s).map_err(|_| OrtError::InvalidArgument(format!("string contains a NUL byte: {s:?}")))
}

/// A filesystem path encoded as `ORTCHAR_T`, NUL-terminated.
#[cfg(not(windows))]
pub(crate) struct NativePath(CString);

#[cfg(not(windows))]
impl NativePath {
    pub fn new(path: &Path) -> Result<Self, OrtError> {
        use std::os::unix::ffi::OsStrExt;
        CString::new(path.as_os_str().as_bytes())
            .map(Self)
            .map_err(|_| OrtError::InvalidArgument(format!("path contains a NUL byte: {}", path.display())))
    }

    pub fn as_ptr(&self) -> *const ffi::OrtChar {
        self.0.as_ptr()
    }
}

#[cfg(windows)]
pub(crate) struct NativePath(Vec<u16>);

#[cfg(windows)]
impl NativePath {
    pub fn new(path: &Path) -> Result<Self, OrtError> {
        use std::os::windows::ffi::OsStrExt;
        let mut wide: Vec<u16> = path.as_os_str().encode_wide().collect();
        if wide.contains(&0) {
            return Err(OrtError::InvalidArgument(format!("path contains a NUL: {}", path.display())));
        }
        wide.push(0);
        Ok(Self(wide))
    }

    pub fn as_ptr(&self) -> *const ffi::OrtChar {
        self.0.as_ptr()
    }
}
