//! ONNX Runtime environment.

use std::fmt;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::api::api;
use crate::error::OrtError;
use crate::ffi;
use crate::marshal::to_cstring;
use crate::options::SessionOptions;
use crate::session::Session;
use crate::status::check;

/// Severity threshold for the runtime's own logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Verbose,
    Info,
    #[default]
    Warning,
    Error,
    Fatal,
}

impl LoggingLevel {
    fn to_native(self) -> ffi::OrtLoggingLevel {
        match self {
            Self::Verbose => ffi::ORT_LOGGING_LEVEL_VERBOSE,
            Self::Info => ffi::ORT_LOGGING_LEVEL_INFO,
            Self::Warning => ffi::ORT_LOGGING_LEVEL_WARNING,
            Self::Error => ffi::ORT_LOGGING_LEVEL_ERROR,
            Self::Fatal => ffi::ORT_LOGGING_LEVEL_FATAL,
        }
    }
}

/// Environment configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    /// Identifier attached to the runtime's log lines.
    pub log_id: String,
    /// Minimum severity the runtime logs.
    pub logging_level: LoggingLevel,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            log_id: "onnxruntime".into(),
            logging_level: LoggingLevel::Warning,
        }
    }
}

impl EnvConfig {
    /// Creates a config with the given log id and the default level.
    pub fn new(log_id: impl Into<String>) -> Self {
        Self {
            log_id: log_id.into(),
            ..Self::default()
        }
    }

    /// Set the runtime logging level.
    pub fn with_logging_level(mut self, level: LoggingLevel) -> Self {
        self.logging_level = level;
        self
    }
}

struct EnvHandle {
    env: *mut ffi::OrtEnv,
}

// The runtime environment is internally synchronized.
unsafe impl Send for EnvHandle {}
unsafe impl Sync for EnvHandle {}

impl Drop for EnvHandle {
    fn drop(&mut self) {
        if !self.env.is_null() {
            unsafe { (api().release_env)(self.env) };
            self.env = ptr::null_mut();
        }
    }
}

/// ONNX Runtime environment. Create one per process.
///
/// Cloning is cheap and shares the native environment. Every [`Session`]
/// keeps a clone, so the environment is released only after the last
/// session built on it.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvHandle>,
}

impl Environment {
    /// Creates a new environment with the given log id and warning-level logging.
    pub fn new(log_id: &str) -> Result<Self, OrtError> {
        Self::with_config(&EnvConfig::new(log_id))
    }

    /// Creates a new environment from a config.
    pub fn with_config(config: &EnvConfig) -> Result<Self, OrtError> {
        let c_log_id = to_cstring(&config.log_id)?;
        let mut env: *mut ffi::OrtEnv = ptr::null_mut();
        check(unsafe { (api().create_env)(config.logging_level.to_native(), c_log_id.as_ptr(), &mut env) })?;
        if env.is_null() {
            return Err(OrtError::Internal("CreateEnv returned null".into()));
        }
        debug!("ort: created environment {:?} ({:?})", config.log_id, config.logging_level);
        Ok(Self {
            inner: Arc::new(EnvHandle { env }),
        })
    }

    /// Creates a session from in-memory ONNX model data with default options.
    pub fn new_session(&self, model_data: &[u8]) -> Result<Session, OrtError> {
        Session::from_memory(self, model_data, None)
    }

    /// Creates a session from a model file.
    pub fn load_session(&self, path: impl AsRef<Path>, options: Option<&SessionOptions>) -> Result<Session, OrtError> {
        Session::from_file(self, path, options)
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::OrtEnv {
        self.inner.env
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment").field("env", &self.inner.env).finish()
    }
}
