//! Serializable session configuration.
//!
//! ```
//! use giztoy_ort::SessionConfig;
//!
//! let config = SessionConfig::from_json(r#"{
//!     "intra_op_threads": 4,
//!     "optimization_level": "all",
//!     "providers": [
//!         {"type": "cuda", "options": {"device_id": "0"}},
//!         {"type": "migraphx", "options": {"fp16": true}}
//!     ]
//! }"#).unwrap();
//! assert_eq!(config.providers.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::OrtError;
use crate::options::{CudaProviderOptions, GraphOptimizationLevel, MigraphxProviderOptions};

/// Declarative form of [`SessionOptions`](crate::SessionOptions).
///
/// Unset fields keep the runtime defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub intra_op_threads: Option<i32>,
    pub inter_op_threads: Option<i32>,
    pub optimization_level: Option<GraphOptimizationLevel>,
    /// Execution providers in priority order.
    pub providers: Vec<ProviderConfig>,
}

/// An execution provider to append.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum ProviderConfig {
    Cuda(CudaProviderOptions),
    Migraphx(MigraphxProviderOptions),
}

impl SessionConfig {
    pub fn from_json(s: &str) -> Result<Self, OrtError> {
        Ok(serde_json::from_str(s)?)
    }
}
