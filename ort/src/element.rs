//! Tensor element kinds and their native type tags.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::OrtError;
use crate::ffi;

/// The element types this crate can build and read tensors of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Float32,
    Float64,
    Int8,
    Int16,
    Int32,
    Int64,
    Uint8,
    Uint16,
    Uint32,
    Uint64,
    Bool,
}

impl ElementKind {
    /// Returns the native `ONNXTensorElementDataType` tag.
    pub fn to_native(self) -> ffi::ONNXTensorElementDataType {
        match self {
            Self::Float32 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT,
            Self::Float64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE,
            Self::Int8 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8,
            Self::Int16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16,
            Self::Int32 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32,
            Self::Int64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64,
            Self::Uint8 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8,
            Self::Uint16 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16,
            Self::Uint32 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32,
            Self::Uint64 => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64,
            Self::Bool => ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL,
        }
    }

    /// Maps a native tag back to a kind. Tags outside the supported set
    /// (string, float16, bfloat16, complex, ...) are rejected.
    pub fn from_native(tag: ffi::ONNXTensorElementDataType) -> Result<Self, OrtError> {
        Ok(match tag {
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT => Self::Float32,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE => Self::Float64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8 => Self::Int8,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16 => Self::Int16,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32 => Self::Int32,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64 => Self::Int64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8 => Self::Uint8,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16 => Self::Uint16,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32 => Self::Uint32,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64 => Self::Uint64,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL => Self::Bool,
            ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING => {
                return Err(OrtError::Unsupported("string tensors".into()));
            }
            other => return Err(OrtError::Unsupported(format!("tensor element type {other}"))),
        })
    }

    /// Size of one element in bytes.
    pub fn size(self) -> usize {
        match self {
            Self::Int8 | Self::Uint8 | Self::Bool => 1,
            Self::Int16 | Self::Uint16 => 2,
            Self::Float32 | Self::Int32 | Self::Uint32 => 4,
            Self::Float64 | Self::Int64 | Self::Uint64 => 8,
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Uint8 => "uint8",
            Self::Uint16 => "uint16",
            Self::Uint32 => "uint32",
            Self::Uint64 => "uint64",
            Self::Bool => "bool",
        };
        f.write_str(name)
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A Rust type that can be stored in a tensor.
///
/// Implemented for exactly the types in [`ElementKind`]; the set is closed.
pub trait TensorElement: sealed::Sealed + Copy + Send + Sync + 'static {
    const KIND: ElementKind;
}

macro_rules! tensor_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl TensorElement for $ty {
                const KIND: ElementKind = ElementKind::$kind;
            }
        )*
    };
}

tensor_element! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
}
