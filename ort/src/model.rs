//! Model registry: register and load ONNX models by ID.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::env::Environment;
use crate::error::OrtError;
use crate::options::SessionOptions;
use crate::session::Session;

/// Describes a registered model.
pub struct ModelInfo {
    pub id: String,
    pub data: &'static [u8],
}

static REGISTRY: Lazy<RwLock<HashMap<String, ModelInfo>>> = Lazy::new(|| RwLock::new(HashMap::new()));

/// Registers a model with the given ID and ONNX data, replacing any
/// previous registration under the same ID.
pub fn register_model(id: &str, data: &'static [u8]) {
    REGISTRY.write().insert(
        id.to_string(),
        ModelInfo {
            id: id.to_string(),
            data,
        },
    );
}

/// Loads a registered model by ID, returning a ready-to-use Session.
pub fn load_model(env: &Environment, id: &str, options: Option<&SessionOptions>) -> Result<Session, OrtError> {
    let data = REGISTRY
        .read()
        .get(id)
        .map(|info| info.data)
        .ok_or_else(|| OrtError::ModelNotRegistered(id.to_string()))?;
    Session::from_memory(env, data, options)
}

/// Returns the IDs of all registered models, sorted.
pub fn list_models() -> Vec<String> {
    let mut ids: Vec<String> = REGISTRY.read().keys().cloned().collect();
    ids.sort();
    ids
}
