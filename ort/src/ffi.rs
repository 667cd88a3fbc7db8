//! Raw FFI declarations for the ONNX Runtime C API.
//!
//! These declarations match `onnxruntime_c_api.h`. The runtime exposes its
//! functions through a versioned table of function pointers rather than
//! exported symbols. We hand-write the signatures for the subset we need and
//! pick them out of the table by position, avoiding bindgen complexity.

use std::ffi::c_void;
use std::os::raw::{c_char, c_int};

// Opaque types: the C API only hands out pointers to these.
pub type OrtApi = c_void;
pub type OrtEnv = c_void;
pub type OrtSession = c_void;
pub type OrtSessionOptions = c_void;
pub type OrtRunOptions = c_void;
pub type OrtMemoryInfo = c_void;
pub type OrtValue = c_void;
pub type OrtStatus = c_void;
pub type OrtAllocator = c_void;
pub type OrtTensorTypeAndShapeInfo = c_void;
pub type OrtCUDAProviderOptionsV2 = c_void;

/// `ORTCHAR_T`: wide characters on Windows, narrow everywhere else.
#[cfg(windows)]
pub type OrtChar = u16;
#[cfg(not(windows))]
pub type OrtChar = c_char;

// C enums are int-sized.
pub type OrtErrorCode = c_int;
pub type OrtLoggingLevel = c_int;
pub type GraphOptimizationLevel = c_int;
pub type ONNXTensorElementDataType = c_int;
pub type OrtAllocatorType = c_int;
pub type OrtMemType = c_int;

pub const ORT_OK: OrtErrorCode = 0;

pub const ORT_LOGGING_LEVEL_VERBOSE: OrtLoggingLevel = 0;
pub const ORT_LOGGING_LEVEL_INFO: OrtLoggingLevel = 1;
pub const ORT_LOGGING_LEVEL_WARNING: OrtLoggingLevel = 2;
pub const ORT_LOGGING_LEVEL_ERROR: OrtLoggingLevel = 3;
pub const ORT_LOGGING_LEVEL_FATAL: OrtLoggingLevel = 4;

pub const ORT_DISABLE_ALL: GraphOptimizationLevel = 0;
pub const ORT_ENABLE_BASIC: GraphOptimizationLevel = 1;
pub const ORT_ENABLE_EXTENDED: GraphOptimizationLevel = 2;
pub const ORT_ENABLE_ALL: GraphOptimizationLevel = 99;

pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UNDEFINED: ONNXTensorElementDataType = 0;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT: ONNXTensorElementDataType = 1;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8: ONNXTensorElementDataType = 2;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8: ONNXTensorElementDataType = 3;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16: ONNXTensorElementDataType = 4;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16: ONNXTensorElementDataType = 5;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32: ONNXTensorElementDataType = 6;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64: ONNXTensorElementDataType = 7;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_STRING: ONNXTensorElementDataType = 8;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL: ONNXTensorElementDataType = 9;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16: ONNXTensorElementDataType = 10;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE: ONNXTensorElementDataType = 11;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32: ONNXTensorElementDataType = 12;
pub const ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64: ONNXTensorElementDataType = 13;

pub const ORT_ARENA_ALLOCATOR: OrtAllocatorType = 1;
pub const ORT_MEM_TYPE_DEFAULT: OrtMemType = 0;

/// Entry point exported by the shared library.
pub type OrtGetApiBaseFn = unsafe extern "system" fn() -> *const OrtApiBase;

/// The one symbol the library exports by name.
pub const ORT_GET_API_BASE_SYMBOL: &[u8] = b"OrtGetApiBase\0";

#[repr(C)]
pub struct OrtApiBase {
    pub get_api: Option<unsafe extern "system" fn(version: u32) -> *const OrtApi>,
    pub get_version_string: Option<unsafe extern "system" fn() -> *const c_char>,
}

#[repr(C)]
pub struct OrtMIGraphXProviderOptions {
    pub device_id: c_int,
    pub migraphx_fp16_enable: c_int,
    pub migraphx_int8_enable: c_int,
    pub migraphx_use_native_calibration_table: c_int,
    pub migraphx_int8_calibration_table_name: *const c_char,
    pub migraphx_save_compiled_model: c_int,
    pub migraphx_save_model_path: *const c_char,
    pub migraphx_load_compiled_model: c_int,
    pub migraphx_load_model_path: *const c_char,
    pub migraphx_exhaustive_tune: bool,
}

/// Positions of the functions we use inside `struct OrtApi`.
///
/// The table only ever grows at the end, so positions are stable across
/// runtime releases that support the requested API version.
mod slot {
    pub const GET_ERROR_CODE: usize = 1;
    pub const GET_ERROR_MESSAGE: usize = 2;
    pub const CREATE_ENV: usize = 3;
    pub const CREATE_SESSION: usize = 7;
    pub const CREATE_SESSION_FROM_ARRAY: usize = 8;
    pub const RUN: usize = 9;
    pub const CREATE_SESSION_OPTIONS: usize = 10;
    pub const SET_SESSION_GRAPH_OPTIMIZATION_LEVEL: usize = 23;
    pub const SET_INTRA_OP_NUM_THREADS: usize = 24;
    pub const SET_INTER_OP_NUM_THREADS: usize = 25;
    pub const SESSION_GET_INPUT_COUNT: usize = 30;
    pub const SESSION_GET_OUTPUT_COUNT: usize = 31;
    pub const SESSION_GET_INPUT_NAME: usize = 36;
    pub const SESSION_GET_OUTPUT_NAME: usize = 37;
    pub const CREATE_TENSOR_WITH_DATA_AS_ORT_VALUE: usize = 49;
    pub const IS_TENSOR: usize = 50;
    pub const GET_TENSOR_MUTABLE_DATA: usize = 51;
    pub const GET_TENSOR_ELEMENT_TYPE: usize = 60;
    pub const GET_DIMENSIONS_COUNT: usize = 61;
    pub const GET_DIMENSIONS: usize = 62;
    pub const GET_TENSOR_TYPE_AND_SHAPE: usize = 65;
    pub const CREATE_CPU_MEMORY_INFO: usize = 69;
    pub const ALLOCATOR_FREE: usize = 76;
    pub const GET_ALLOCATOR_WITH_DEFAULT_OPTIONS: usize = 78;
    pub const RELEASE_ENV: usize = 92;
    pub const RELEASE_STATUS: usize = 93;
    pub const RELEASE_MEMORY_INFO: usize = 94;
    pub const RELEASE_SESSION: usize = 95;
    pub const RELEASE_VALUE: usize = 96;
    pub const RELEASE_TENSOR_TYPE_AND_SHAPE_INFO: usize = 99;
    pub const RELEASE_SESSION_OPTIONS: usize = 100;
    pub const GET_AVAILABLE_PROVIDERS: usize = 125;
    pub const RELEASE_AVAILABLE_PROVIDERS: usize = 126;
    pub const SESSION_OPTIONS_APPEND_EXECUTION_PROVIDER_CUDA_V2: usize = 204;
    pub const CREATE_CUDA_PROVIDER_OPTIONS: usize = 205;
    pub const UPDATE_CUDA_PROVIDER_OPTIONS: usize = 206;
    pub const RELEASE_CUDA_PROVIDER_OPTIONS: usize = 208;
    pub const SESSION_OPTIONS_APPEND_EXECUTION_PROVIDER_MIGRAPHX: usize = 209;
}

/// The subset of the runtime function table used by this crate.
///
/// Functions returning `*mut OrtStatus` report failure with a non-null
/// status that the caller must release.
pub struct Api {
    pub get_error_code: unsafe extern "system" fn(status: *const OrtStatus) -> OrtErrorCode,
    pub get_error_message: unsafe extern "system" fn(status: *const OrtStatus) -> *const c_char,
    pub create_env: unsafe extern "system" fn(
        level: OrtLoggingLevel,
        log_id: *const c_char,
        out: *mut *mut OrtEnv,
    ) -> *mut OrtStatus,
    pub create_session: unsafe extern "system" fn(
        env: *const OrtEnv,
        model_path: *const OrtChar,
        options: *const OrtSessionOptions,
        out: *mut *mut OrtSession,
    ) -> *mut OrtStatus,
    pub create_session_from_array: unsafe extern "system" fn(
        env: *const OrtEnv,
        model_data: *const c_void,
        model_data_len: usize,
        options: *const OrtSessionOptions,
        out: *mut *mut OrtSession,
    ) -> *mut OrtStatus,
    pub run: unsafe extern "system" fn(
        session: *mut OrtSession,
        run_options: *const OrtRunOptions,
        input_names: *const *const c_char,
        inputs: *const *const OrtValue,
        input_len: usize,
        output_names: *const *const c_char,
        output_names_len: usize,
        outputs: *mut *mut OrtValue,
    ) -> *mut OrtStatus,
    pub create_session_options: unsafe extern "system" fn(out: *mut *mut OrtSessionOptions) -> *mut OrtStatus,
    pub set_session_graph_optimization_level:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, level: GraphOptimizationLevel) -> *mut OrtStatus,
    pub set_intra_op_num_threads:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, threads: c_int) -> *mut OrtStatus,
    pub set_inter_op_num_threads:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, threads: c_int) -> *mut OrtStatus,
    pub session_get_input_count: unsafe extern "system" fn(session: *const OrtSession, out: *mut usize) -> *mut OrtStatus,
    pub session_get_output_count: unsafe extern "system" fn(session: *const OrtSession, out: *mut usize) -> *mut OrtStatus,
    pub session_get_input_name: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        allocator: *mut OrtAllocator,
        out: *mut *mut c_char,
    ) -> *mut OrtStatus,
    pub session_get_output_name: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        allocator: *mut OrtAllocator,
        out: *mut *mut c_char,
    ) -> *mut OrtStatus,
    pub create_tensor_with_data_as_ort_value: unsafe extern "system" fn(
        info: *const OrtMemoryInfo,
        data: *mut c_void,
        data_len: usize,
        shape: *const i64,
        shape_len: usize,
        element_type: ONNXTensorElementDataType,
        out: *mut *mut OrtValue,
    ) -> *mut OrtStatus,
    pub is_tensor: unsafe extern "system" fn(value: *const OrtValue, out: *mut c_int) -> *mut OrtStatus,
    pub get_tensor_mutable_data: unsafe extern "system" fn(value: *mut OrtValue, out: *mut *mut c_void) -> *mut OrtStatus,
    pub get_tensor_element_type: unsafe extern "system" fn(
        info: *const OrtTensorTypeAndShapeInfo,
        out: *mut ONNXTensorElementDataType,
    ) -> *mut OrtStatus,
    pub get_dimensions_count:
        unsafe extern "system" fn(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> *mut OrtStatus,
    pub get_dimensions: unsafe extern "system" fn(
        info: *const OrtTensorTypeAndShapeInfo,
        dims: *mut i64,
        dims_len: usize,
    ) -> *mut OrtStatus,
    pub get_tensor_type_and_shape: unsafe extern "system" fn(
        value: *const OrtValue,
        out: *mut *mut OrtTensorTypeAndShapeInfo,
    ) -> *mut OrtStatus,
    pub create_cpu_memory_info: unsafe extern "system" fn(
        allocator_type: OrtAllocatorType,
        mem_type: OrtMemType,
        out: *mut *mut OrtMemoryInfo,
    ) -> *mut OrtStatus,
    pub allocator_free: unsafe extern "system" fn(allocator: *mut OrtAllocator, p: *mut c_void) -> *mut OrtStatus,
    pub get_allocator_with_default_options: unsafe extern "system" fn(out: *mut *mut OrtAllocator) -> *mut OrtStatus,
    pub release_env: unsafe extern "system" fn(env: *mut OrtEnv),
    pub release_status: unsafe extern "system" fn(status: *mut OrtStatus),
    pub release_memory_info: unsafe extern "system" fn(info: *mut OrtMemoryInfo),
    pub release_session: unsafe extern "system" fn(session: *mut OrtSession),
    pub release_value: unsafe extern "system" fn(value: *mut OrtValue),
    pub release_tensor_type_and_shape_info: unsafe extern "system" fn(info: *mut OrtTensorTypeAndShapeInfo),
    pub release_session_options: unsafe extern "system" fn(options: *mut OrtSessionOptions),
    pub get_available_providers:
        unsafe extern "system" fn(out: *mut *mut *mut c_char, len: *mut c_int) -> *mut OrtStatus,
    pub release_available_providers: unsafe extern "system" fn(providers: *mut *mut c_char, len: c_int) -> *mut OrtStatus,
    pub session_options_append_execution_provider_cuda_v2: unsafe extern "system" fn(
        options: *mut OrtSessionOptions,
        cuda_options: *const OrtCUDAProviderOptionsV2,
    ) -> *mut OrtStatus,
    pub create_cuda_provider_options:
        unsafe extern "system" fn(out: *mut *mut OrtCUDAProviderOptionsV2) -> *mut OrtStatus,
    pub update_cuda_provider_options: unsafe extern "system" fn(
        cuda_options: *mut OrtCUDAProviderOptionsV2,
        keys: *const *const c_char,
        values: *const *const c_char,
        num_keys: usize,
    ) -> *mut OrtStatus,
    pub release_cuda_provider_options: unsafe extern "system" fn(cuda_options: *mut OrtCUDAProviderOptionsV2),
    pub session_options_append_execution_provider_migraphx: unsafe extern "system" fn(
        options: *mut OrtSessionOptions,
        migraphx_options: *const OrtMIGraphXProviderOptions,
    ) -> *mut OrtStatus,
    pub get_version_string: unsafe extern "system" fn() -> *const c_char,
}

/// Reads one function pointer out of the raw table, failing on an empty slot.
macro_rules! slot {
    ($table:expr, $index:expr) => {{
        let f = *$table.add($index);
        if f.is_null() {
            return Err(format!("function table slot {} is empty", $index));
        }
        std::mem::transmute::<*const c_void, _>(f)
    }};
}

impl Api {
    /// Resolves the function pointers this crate uses out of a raw table.
    ///
    /// # Safety
    ///
    /// `table` must point to a live `OrtApi` of at least the version the
    /// slot positions were taken from.
    pub unsafe fn from_raw(base: &OrtApiBase, table: *const OrtApi) -> Result<Self, String> {
        let get_version_string = base
            .get_version_string
            .ok_or_else(|| "OrtApiBase.GetVersionString is null".to_string())?;
        let table = table as *const *const c_void;
        unsafe {
            Ok(Self {
                get_error_code: slot!(table, slot::GET_ERROR_CODE),
                get_error_message: slot!(table, slot::GET_ERROR_MESSAGE),
                create_env: slot!(table, slot::CREATE_ENV),
                create_session: slot!(table, slot::CREATE_SESSION),
                create_session_from_array: slot!(table, slot::CREATE_SESSION_FROM_ARRAY),
                run: slot!(table, slot::RUN),
                create_session_options: slot!(table, slot::CREATE_SESSION_OPTIONS),
                set_session_graph_optimization_level: slot!(table, slot::SET_SESSION_GRAPH_OPTIMIZATION_LEVEL),
                set_intra_op_num_threads: slot!(table, slot::SET_INTRA_OP_NUM_THREADS),
                set_inter_op_num_threads: slot!(table, slot::SET_INTER_OP_NUM_THREADS),
                session_get_input_count: slot!(table, slot::SESSION_GET_INPUT_COUNT),
                session_get_output_count: slot!(table, slot::SESSION_GET_OUTPUT_COUNT),
                session_get_input_name: slot!(table, slot::SESSION_GET_INPUT_NAME),
                session_get_output_name: slot!(table, slot::SESSION_GET_OUTPUT_NAME),
                create_tensor_with_data_as_ort_value: slot!(table, slot::CREATE_TENSOR_WITH_DATA_AS_ORT_VALUE),
                is_tensor: slot!(table, slot::IS_TENSOR),
                get_tensor_mutable_data: slot!(table, slot::GET_TENSOR_MUTABLE_DATA),
                get_tensor_element_type: slot!(table, slot::GET_TENSOR_ELEMENT_TYPE),
                get_dimensions_count: slot!(table, slot::GET_DIMENSIONS_COUNT),
                get_dimensions: slot!(table, slot::GET_DIMENSIONS),
                get_tensor_type_and_shape: slot!(table, slot::GET_TENSOR_TYPE_AND_SHAPE),
                create_cpu_memory_info: slot!(table, slot::CREATE_CPU_MEMORY_INFO),
                allocator_free: slot!(table, slot::ALLOCATOR_FREE),
                get_allocator_with_default_options: slot!(table, slot::GET_ALLOCATOR_WITH_DEFAULT_OPTIONS),
                release_env: slot!(table, slot::RELEASE_ENV),
                release_status: slot!(table, slot::RELEASE_STATUS),
                release_memory_info: slot!(table, slot::RELEASE_MEMORY_INFO),
                release_session: slot!(table, slot::RELEASE_SESSION),
                release_value: slot!(table, slot::RELEASE_VALUE),
                release_tensor_type_and_shape_info: slot!(table, slot::RELEASE_TENSOR_TYPE_AND_SHAPE_INFO),
                release_session_options: slot!(table, slot::RELEASE_SESSION_OPTIONS),
                get_available_providers: slot!(table, slot::GET_AVAILABLE_PROVIDERS),
                release_available_providers: slot!(table, slot::RELEASE_AVAILABLE_PROVIDERS),
                session_options_append_execution_provider_cuda_v2: slot!(
                    table,
                    slot::SESSION_OPTIONS_APPEND_EXECUTION_PROVIDER_CUDA_V2
                ),
                create_cuda_provider_options: slot!(table, slot::CREATE_CUDA_PROVIDER_OPTIONS),
                update_cuda_provider_options: slot!(table, slot::UPDATE_CUDA_PROVIDER_OPTIONS),
                release_cuda_provider_options: slot!(table, slot::RELEASE_CUDA_PROVIDER_OPTIONS),
                session_options_append_execution_provider_migraphx: slot!(
                    table,
                    slot::SESSION_OPTIONS_APPEND_EXECUTION_PROVIDER_MIGRAPHX
                ),
                get_version_string,
            })
        }
    }
}
