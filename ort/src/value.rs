//! Native values and the tensor codec.

use std::any::Any;
use std::ffi::c_void;
use std::fmt;
use std::os::raw::c_int;
use std::ptr;

use crate::api::{api, cpu_memory_info};
use crate::element::{ElementKind, TensorElement};
use crate::error::OrtError;
use crate::ffi;
use crate::status::check;

/// Returns the number of elements a shape describes. A scalar (empty
/// shape) holds one element.
pub fn shape_element_count(shape: &[i64]) -> Result<usize, OrtError> {
    shape.iter().try_fold(1usize, |acc, &d| {
        let d = usize::try_from(d).map_err(|_| OrtError::InvalidArgument(format!("negative dimension in shape {shape:?}")))?;
        acc.checked_mul(d)
            .ok_or_else(|| OrtError::InvalidArgument(format!("shape {shape:?} overflows")))
    })
}

/// Scoped OrtTensorTypeAndShapeInfo.
struct TypeAndShape {
    info: *mut ffi::OrtTensorTypeAndShapeInfo,
}

impl TypeAndShape {
    fn of(value: *const ffi::OrtValue) -> Result<Self, OrtError> {
        let mut info: *mut ffi::OrtTensorTypeAndShapeInfo = ptr::null_mut();
        check(unsafe { (api().get_tensor_type_and_shape)(value, &mut info) })?;
        if info.is_null() {
            return Err(OrtError::Internal("GetTensorTypeAndShape returned null".into()));
        }
        Ok(Self { info })
    }

    fn element_type(&self) -> Result<ffi::ONNXTensorElementDataType, OrtError> {
        let mut tag = ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UNDEFINED;
        check(unsafe { (api().get_tensor_element_type)(self.info, &mut tag) })?;
        Ok(tag)
    }

    fn dims(&self) -> Result<Vec<i64>, OrtError> {
        let mut ndim: usize = 0;
        check(unsafe { (api().get_dimensions_count)(self.info, &mut ndim) })?;
        if ndim == 0 {
            return Ok(Vec::new());
        }
        let mut dims = vec![0i64; ndim];
        check(unsafe { (api().get_dimensions)(self.info, dims.as_mut_ptr(), ndim) })?;
        Ok(dims)
    }
}

impl Drop for TypeAndShape {
    fn drop(&mut self) {
        if !self.info.is_null() {
            unsafe { (api().release_tensor_type_and_shape_info)(self.info) };
            self.info = ptr::null_mut();
        }
    }
}

fn describe(tag: ffi::ONNXTensorElementDataType) -> String {
    ElementKind::from_native(tag).map_or_else(|_| format!("element type {tag}"), |k| k.to_string())
}

/// A native value: a tensor built from Rust data, or an output of
/// [`Session::run`](crate::Session::run).
///
/// Tensors built here own the buffer the runtime reads from. The runtime
/// does not copy it, so the buffer is dropped only after the native value
/// is released.
pub struct Value {
    value: *mut ffi::OrtValue,
    // Dropped after `value` is released in Drop.
    _pinned: Option<Box<dyn Any + Send + Sync>>,
}

// Read-only accessors only; mutation goes through Drop, which needs ownership.
unsafe impl Send for Value {}
unsafe impl Sync for Value {}

impl Value {
    /// Creates a tensor with the given shape, copying `data` into a buffer
    /// owned by the returned value.
    pub fn tensor<T: TensorElement>(shape: &[i64], data: &[T]) -> Result<Self, OrtError> {
        if data.is_empty() {
            return Err(OrtError::EmptyData);
        }
        let total = shape_element_count(shape)?;
        if total != data.len() {
            return Err(OrtError::InvalidArgument(format!(
                "data length {} does not match shape {shape:?} ({total} elements)",
                data.len()
            )));
        }

        let info = cpu_memory_info()?;
        let mut owned: Box<[T]> = data.into();
        let byte_len = std::mem::size_of_val(&*owned);
        let mut value: *mut ffi::OrtValue = ptr::null_mut();
        check(unsafe {
            (api().create_tensor_with_data_as_ort_value)(
                info,
                owned.as_mut_ptr() as *mut c_void,
                byte_len,
                shape.as_ptr(),
                shape.len(),
                T::KIND.to_native(),
                &mut value,
            )
        })?;
        if value.is_null() {
            return Err(OrtError::Internal("CreateTensorWithDataAsOrtValue returned null".into()));
        }

        Ok(Self {
            value,
            _pinned: Some(Box::new(owned)),
        })
    }

    /// Takes ownership of a value produced by the runtime.
    pub(crate) fn from_raw(value: *mut ffi::OrtValue) -> Self {
        Self { value, _pinned: None }
    }

    pub(crate) fn as_ptr(&self) -> *const ffi::OrtValue {
        self.value
    }

    pub fn is_tensor(&self) -> Result<bool, OrtError> {
        let mut out: c_int = 0;
        check(unsafe { (api().is_tensor)(self.value, &mut out) })?;
        Ok(out != 0)
    }

    fn ensure_tensor(&self) -> Result<(), OrtError> {
        if !self.is_tensor()? {
            return Err(OrtError::InvalidArgument("value is not a tensor".into()));
        }
        Ok(())
    }

    /// Returns the tensor's element kind.
    pub fn element_kind(&self) -> Result<ElementKind, OrtError> {
        self.ensure_tensor()?;
        ElementKind::from_native(TypeAndShape::of(self.value)?.element_type()?)
    }

    /// Returns the tensor dimensions.
    pub fn shape(&self) -> Result<Vec<i64>, OrtError> {
        TypeAndShape::of(self.value)?.dims()
    }

    pub fn element_count(&self) -> Result<usize, OrtError> {
        shape_element_count(&self.shape()?)
    }

    /// Copies the tensor data out. Fails if the tensor does not hold `T`;
    /// elements are never reinterpreted as another type.
    pub fn data<T: TensorElement>(&self) -> Result<Vec<T>, OrtError> {
        self.ensure_tensor()?;

        let (tag, shape) = {
            let info = TypeAndShape::of(self.value)?;
            (info.element_type()?, info.dims()?)
        };
        if tag != T::KIND.to_native() {
            return Err(OrtError::InvalidArgument(format!(
                "tensor element type mismatch: requested {}, tensor holds {}",
                T::KIND,
                describe(tag)
            )));
        }

        let total = shape_element_count(&shape)?;
        if total == 0 {
            return Ok(Vec::new());
        }

        let mut raw: *mut c_void = ptr::null_mut();
        check(unsafe { (api().get_tensor_mutable_data)(self.value, &mut raw) })?;
        if raw.is_null() {
            return Err(OrtError::Internal("tensor data pointer is null".into()));
        }
        Ok(unsafe { std::slice::from_raw_parts(raw as *const T, total) }.to_vec())
    }

    /// Copies the tensor data into a new f32 vector.
    pub fn float_data(&self) -> Result<Vec<f32>, OrtError> {
        self.data::<f32>()
    }
}

impl Drop for Value {
    fn drop(&mut self) {
        // Release before `_pinned` (a field) is dropped: the runtime may
        // still point into it until now.
        if !self.value.is_null() {
            unsafe { (api().release_value)(self.value) };
            self.value = ptr::null_mut();
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Value")
            .field("value", &self.value)
            .field("owns_buffer", &self._pinned.is_some())
            .finish()
    }
}
