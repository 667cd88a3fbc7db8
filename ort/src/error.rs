use std::fmt;

use thiserror::Error;

/// Errors returned by ONNX Runtime operations.
#[derive(Debug, Error)]
pub enum OrtError {
    /// A non-success status reported by the runtime, surfaced verbatim.
    #[error("ort: {code}: {message}")]
    Runtime { code: ErrorCode, message: String },

    #[error("ort: invalid argument: {0}")]
    InvalidArgument(String),

    #[error("ort: empty data")]
    EmptyData,

    #[error("ort: unsupported: {0}")]
    Unsupported(String),

    /// The runtime reported success but broke its own contract
    /// (e.g. left an output slot empty).
    #[error("ort: internal: {0}")]
    Internal(String),

    #[error("ort: model {0:?} not registered")]
    ModelNotRegistered(String),

    #[error("ort: load {path:?}: {message}")]
    Library { path: String, message: String },

    #[error("ort: config: {0}")]
    Config(#[from] serde_json::Error),
}

impl OrtError {
    /// Returns the native error code for [`OrtError::Runtime`].
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Runtime { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Native `OrtErrorCode` values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Ok,
    Fail,
    InvalidArgument,
    NoSuchFile,
    NoModel,
    EngineError,
    RuntimeException,
    InvalidProtobuf,
    ModelLoaded,
    NotImplemented,
    InvalidGraph,
    EpFail,
    Other(i32),
}

impl ErrorCode {
    pub fn from_raw(code: i32) -> Self {
        match code {
            0 => Self::Ok,
            1 => Self::Fail,
            2 => Self::InvalidArgument,
            3 => Self::NoSuchFile,
            4 => Self::NoModel,
            5 => Self::EngineError,
            6 => Self::RuntimeException,
            7 => Self::InvalidProtobuf,
            8 => Self::ModelLoaded,
            9 => Self::NotImplemented,
            10 => Self::InvalidGraph,
            11 => Self::EpFail,
            other => Self::Other(other),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Fail => 1,
            Self::InvalidArgument => 2,
            Self::NoSuchFile => 3,
            Self::NoModel => 4,
            Self::EngineError => 5,
            Self::RuntimeException => 6,
            Self::InvalidProtobuf => 7,
            Self::ModelLoaded => 8,
            Self::NotImplemented => 9,
            Self::InvalidGraph => 10,
            Self::EpFail => 11,
            Self::Other(code) => code,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Ok => "ORT_OK",
            Self::Fail => "ORT_FAIL",
            Self::InvalidArgument => "ORT_INVALID_ARGUMENT",
            Self::NoSuchFile => "ORT_NO_SUCHFILE",
            Self::NoModel => "ORT_NO_MODEL",
            Self::EngineError => "ORT_ENGINE_ERROR",
            Self::RuntimeException => "ORT_RUNTIME_EXCEPTION",
            Self::InvalidProtobuf => "ORT_INVALID_PROTOBUF",
            Self::ModelLoaded => "ORT_MODEL_LOADED",
            Self::NotImplemented => "ORT_NOT_IMPLEMENTED",
            Self::InvalidGraph => "ORT_INVALID_GRAPH",
            Self::EpFail => "ORT_EP_FAIL",
            Self::Other(code) => return write!(f, "ORT_ERROR({code})"),
        };
        f.write_str(name)
    }
}
