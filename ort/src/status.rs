//! Translates native status objects into `Result`s.

use std::ffi::CStr;

use tracing::warn;

use crate::api::api;
use crate::error::{ErrorCode, OrtError};
use crate::ffi;

/// Converts an OrtStatus to a Rust Result.
///
/// A non-null status is owned by the caller, so it is released here exactly
/// once, after its code and message have been copied out.
pub(crate) fn check(status: *mut ffi::OrtStatus) -> Result<(), OrtError> {
    if status.is_null() {
        return Ok(());
    }
    let api = api();
    let (code, message) = unsafe {
        let code = (api.get_error_code)(status);
        let ptr = (api.get_error_message)(status);
        let message = if ptr.is_null() {
            String::new()
        } else {
            CStr::from_ptr(ptr).to_string_lossy().into_owned()
        };
        (api.release_status)(status);
        (code, message)
    };

    // Not expected from the runtime, but a status carrying ORT_OK is not a failure.
    if code == ffi::ORT_OK {
        warn!("ort: non-null status with ORT_OK: {message}");
        return Ok(());
    }

    Err(OrtError::Runtime {
        code: ErrorCode::from_raw(code),
        message,
    })
}
