//! Session configuration: threading, graph optimization and execution providers.

use std::collections::BTreeMap;
use std::ffi::CString;
use std::fmt;
use std::os::raw::c_int;
use std::ptr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::api;
use crate::config::{ProviderConfig, SessionConfig};
use crate::error::OrtError;
use crate::ffi;
use crate::marshal::{to_cstring, CStringArray};
use crate::status::check;

/// Graph optimization level applied when a session loads its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GraphOptimizationLevel {
    Disable,
    Basic,
    Extended,
    All,
}

impl GraphOptimizationLevel {
    fn to_native(self) -> ffi::GraphOptimizationLevel {
        match self {
            Self::Disable => ffi::ORT_DISABLE_ALL,
            Self::Basic => ffi::ORT_ENABLE_BASIC,
            Self::Extended => ffi::ORT_ENABLE_EXTENDED,
            Self::All => ffi::ORT_ENABLE_ALL,
        }
    }
}

// ---------------------------------------------------------------------------
// Provider options
// ---------------------------------------------------------------------------

/// CUDA execution provider sub-options.
///
/// Keys and values are handed to the runtime verbatim, e.g. `device_id`,
/// `gpu_mem_limit`, `cudnn_conv_algo_search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CudaProviderOptions {
    entries: BTreeMap<String, String>,
}

impl CudaProviderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the GPU to run on.
    pub fn with_device_id(self, device_id: i32) -> Self {
        self.with("device_id", device_id.to_string())
    }

    /// Sets an arbitrary sub-option.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.entries.insert(key.into(), value.into());
        self
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// MIGraphX execution provider options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigraphxProviderOptions {
    pub device_id: i32,
    pub fp16: bool,
    pub int8: bool,
    pub use_native_calibration_table: bool,
    pub int8_calibration_table_name: Option<String>,
    pub save_compiled_model: bool,
    pub save_model_path: Option<String>,
    pub load_compiled_model: bool,
    pub load_model_path: Option<String>,
    pub exhaustive_tune: bool,
}

impl MigraphxProviderOptions {
    /// Rejects option combinations the runtime cannot honor.
    pub fn validate(&self) -> Result<(), OrtError> {
        if self.save_model_path.is_some() && self.load_model_path.is_some() {
            return Err(OrtError::InvalidArgument(
                "provide either save_model_path or load_model_path, not both".into(),
            ));
        }
        Ok(())
    }
}

/// Owns a transient OrtCUDAProviderOptionsV2 until the append call returns.
struct CudaOptionsHandle {
    options: *mut ffi::OrtCUDAProviderOptionsV2,
}

impl Drop for CudaOptionsHandle {
    fn drop(&mut self) {
        if !self.options.is_null() {
            unsafe { (api().release_cuda_provider_options)(self.options) };
            self.options = ptr::null_mut();
        }
    }
}

fn optional_cstring(s: &Option<String>) -> Result<Option<CString>, OrtError> {
    s.as_deref().map(to_cstring).transpose()
}

fn opt_ptr(s: &Option<CString>) -> *const std::os::raw::c_char {
    s.as_ref().map_or(ptr::null(), |s| s.as_ptr())
}

// ---------------------------------------------------------------------------
// SessionOptions
// ---------------------------------------------------------------------------

/// Mutable configuration consumed by session creation.
///
/// Options are read when a session is created and may be reused for any
/// number of sessions.
pub struct SessionOptions {
    options: *mut ffi::OrtSessionOptions,
}

unsafe impl Send for SessionOptions {}

impl SessionOptions {
    /// Creates options with runtime defaults.
    pub fn new() -> Result<Self, OrtError> {
        let mut options: *mut ffi::OrtSessionOptions = ptr::null_mut();
        check(unsafe { (api().create_session_options)(&mut options) })?;
        if options.is_null() {
            return Err(OrtError::Internal("CreateSessionOptions returned null".into()));
        }
        Ok(Self { options })
    }

    /// Creates options and applies every field set in `config`.
    pub fn from_config(config: &SessionConfig) -> Result<Self, OrtError> {
        let mut options = Self::new()?;
        if let Some(n) = config.intra_op_threads {
            options.set_intra_op_num_threads(n)?;
        }
        if let Some(n) = config.inter_op_threads {
            options.set_inter_op_num_threads(n)?;
        }
        if let Some(level) = config.optimization_level {
            options.set_graph_optimization_level(level)?;
        }
        for provider in &config.providers {
            match provider {
                ProviderConfig::Cuda(cuda) => options.append_cuda(cuda)?,
                ProviderConfig::Migraphx(migraphx) => options.append_migraphx(migraphx)?,
            }
        }
        Ok(options)
    }

    /// Sets the number of threads used to parallelize a single operator.
    pub fn set_intra_op_num_threads(&mut self, n: i32) -> Result<(), OrtError> {
        check(unsafe { (api().set_intra_op_num_threads)(self.options, n as c_int) })
    }

    /// Sets the number of threads used to run independent operators.
    pub fn set_inter_op_num_threads(&mut self, n: i32) -> Result<(), OrtError> {
        check(unsafe { (api().set_inter_op_num_threads)(self.options, n as c_int) })
    }

    pub fn set_graph_optimization_level(&mut self, level: GraphOptimizationLevel) -> Result<(), OrtError> {
        check(unsafe { (api().set_session_graph_optimization_level)(self.options, level.to_native()) })
    }

    /// Appends the CUDA execution provider.
    pub fn append_cuda(&mut self, cuda: &CudaProviderOptions) -> Result<(), OrtError> {
        let api = api();
        let mut handle = CudaOptionsHandle { options: ptr::null_mut() };
        check(unsafe { (api.create_cuda_provider_options)(&mut handle.options) })?;
        if handle.options.is_null() {
            return Err(OrtError::Internal("CreateCUDAProviderOptions returned null".into()));
        }

        if !cuda.entries.is_empty() {
            let keys = CStringArray::new(cuda.entries.keys())?;
            let values = CStringArray::new(cuda.entries.values())?;
            check(unsafe {
                (api.update_cuda_provider_options)(handle.options, keys.as_ptr(), values.as_ptr(), keys.len())
            })?;
        }

        check(unsafe { (api.session_options_append_execution_provider_cuda_v2)(self.options, handle.options) })?;
        debug!("ort: appended CUDA provider ({} options)", cuda.entries.len());
        Ok(())
    }

    /// Appends the MIGraphX execution provider.
    pub fn append_migraphx(&mut self, migraphx: &MigraphxProviderOptions) -> Result<(), OrtError> {
        migraphx.validate()?;

        let calibration_table = optional_cstring(&migraphx.int8_calibration_table_name)?;
        let save_path = optional_cstring(&migraphx.save_model_path)?;
        let load_path = optional_cstring(&migraphx.load_model_path)?;

        let native = ffi::OrtMIGraphXProviderOptions {
            device_id: migraphx.device_id as c_int,
            migraphx_fp16_enable: migraphx.fp16 as c_int,
            migraphx_int8_enable: migraphx.int8 as c_int,
            migraphx_use_native_calibration_table: migraphx.use_native_calibration_table as c_int,
            migraphx_int8_calibration_table_name: opt_ptr(&calibration_table),
            migraphx_save_compiled_model: migraphx.save_compiled_model as c_int,
            migraphx_save_model_path: opt_ptr(&save_path),
            migraphx_load_compiled_model: migraphx.load_compiled_model as c_int,
            migraphx_load_model_path: opt_ptr(&load_path),
            migraphx_exhaustive_tune: migraphx.exhaustive_tune,
        };

        check(unsafe { (api().session_options_append_execution_provider_migraphx)(self.options, &native) })?;
        debug!("ort: appended MIGraphX provider (device {})", migraphx.device_id);
        Ok(())
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::OrtSessionOptions {
        self.options
    }
}

impl fmt::Debug for SessionOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionOptions").field("options", &self.options).finish()
    }
}

impl Drop for SessionOptions {
    fn drop(&mut self) {
        if !self.options.is_null() {
            unsafe { (api().release_session_options)(self.options) };
            self.options = ptr::null_mut();
        }
    }
}
