//! Resolves a loaded image handle to its on-disk file path.

use std::ffi::CStr;
use std::mem;

use crate::dyld::MachHeader;

/// Failure to resolve an image handle to a file path.
#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ResolutionError {
    /// The loader supplied no handle for the image.
    #[error("loader supplied a null image handle")]
    NullHandle,

    /// The linker knows the image but has no file path for it, e.g. a
    /// synthetic image with no on-disk backing.
    #[error("no file path available for the image")]
    PathUnavailable,
}

/// Looks up the file path backing a mapped image address via `dladdr(3)`.
///
/// Works for any mapped image, including the main executable; no bundle
/// types are filtered out. Pure query, no side effects.
pub fn resolve(handle: *const MachHeader) -> Result<String, ResolutionError> {
    if handle.is_null() {
        return Err(ResolutionError::NullHandle);
    }

    let mut info: libc::Dl_info = unsafe { mem::zeroed() };
    unsafe {
        libc::dladdr(handle as *const libc::c_void, &mut info);
    }

    // dladdr's return code is not authoritative for header addresses;
    // dli_fname is the signal that matters.
    if info.dli_fname.is_null() {
        return Err(ResolutionError::PathUnavailable);
    }

    let path = unsafe { CStr::from_ptr(info.dli_fname) };
    Ok(path.to_string_lossy().into_owned())
}
