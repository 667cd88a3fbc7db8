//! Safe Rust wrappers for the ONNX Runtime C API.
//!
//! ONNX Runtime is a cross-platform inference engine for ONNX models. It
//! exposes its C API as a versioned table of function pointers; this crate
//! loads the shared library at runtime, resolves the table once, and wraps
//! the native handles in owned types that release themselves exactly once.
//!
//! # Usage
//!
//! ```no_run
//! use giztoy_ort::{Environment, Value};
//!
//! let env = Environment::new("myapp").unwrap();
//! let session = env.load_session("model.onnx", None).unwrap();
//!
//! let input = Value::tensor(&[1, 4], &[1.0f32, 2.0, 3.0, 4.0]).unwrap();
//! let outputs = session.run([("x", &input)], Some(&["y"])).unwrap();
//! let y = outputs["y"].float_data().unwrap();
//! ```
//!
//! # Dynamic Linking
//!
//! The runtime library is located through the `ORT_DYLIB_PATH` environment
//! variable, falling back to the platform's default library name. Call
//! [`init_from_path`] before anything else to load a specific file and get
//! load failures back as errors.

mod api;
mod config;
mod element;
mod env;
mod error;
mod ffi;
mod marshal;
pub mod model;
mod options;
mod session;
mod status;
mod value;

#[cfg(test)]
mod fake;

pub use api::{available_providers, init_from_path, version, API_VERSION, DYLIB_PATH_ENV};
pub use config::{ProviderConfig, SessionConfig};
pub use element::{ElementKind, TensorElement};
pub use env::{EnvConfig, Environment, LoggingLevel};
pub use error::{ErrorCode, OrtError};
pub use model::{list_models, load_model, register_model, ModelInfo};
pub use options::{CudaProviderOptions, GraphOptimizationLevel, MigraphxProviderOptions, SessionOptions};
pub use session::Session;
pub use value::{shape_element_count, Value};
