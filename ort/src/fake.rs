//! In-process stand-in for the runtime function table, used by unit tests.
//!
//! Handles are opaque ids that are never reused. Every creation and release
//! is counted per calling thread (tests run on their own threads, so counts
//! do not leak between tests), and releasing a handle twice is recorded
//! rather than crashing.
//!
//! Models are plain text:
//!
//! ```text
//! inputs: x
//! outputs: y, z
//! ```
//!
//! `run` copies the first input (by the order passed in) to every requested
//! output, except for these output names: `hole` is left null, `map` is a
//! non-tensor value, `half` is a float16 tensor, and `fail` fails the call.

use std::cell::Cell;
use std::collections::HashMap;
use std::ffi::{c_void, CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::sync::atomic::{AtomicUsize, Ordering};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::ffi;

pub const VERSION: &str = "1.18.0-fake";
static VERSION_C: &[u8] = b"1.18.0-fake\0";

/// A log id that makes environment creation fail.
pub const FAIL: &str = "fail";

/// Tensors of higher rank are rejected by the stand-in.
pub const MAX_RANK: usize = 8;

const CODE_FAIL: c_int = 1;
const CODE_INVALID_ARGUMENT: c_int = 2;
const CODE_NO_SUCHFILE: c_int = 3;
const CODE_INVALID_PROTOBUF: c_int = 7;

const CUDA_KEYS: &[&str] = &[
    "device_id",
    "gpu_mem_limit",
    "arena_extend_strategy",
    "cudnn_conv_algo_search",
    "do_copy_in_default_stream",
];

/// Creation and release counts for the current thread.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stats {
    pub env_created: usize,
    pub env_released: usize,
    pub options_created: usize,
    pub options_released: usize,
    pub session_created: usize,
    pub session_released: usize,
    pub value_created: usize,
    pub value_released: usize,
    pub status_created: usize,
    pub status_released: usize,
    pub type_info_created: usize,
    pub type_info_released: usize,
    pub cuda_options_created: usize,
    pub cuda_options_released: usize,
    pub names_allocated: usize,
    pub names_freed: usize,
    pub provider_lists_created: usize,
    pub provider_lists_released: usize,
    pub double_released: usize,
}

impl Stats {
    pub fn provider_lists_live(&self) -> usize {
        self.provider_lists_created - self.provider_lists_released
    }
}

thread_local! {
    static STATS: Cell<Stats> = Cell::new(Stats::default());
}

fn bump(f: impl FnOnce(&mut Stats)) {
    STATS.with(|cell| {
        let mut stats = cell.get();
        f(&mut stats);
        cell.set(stats);
    });
}

pub fn stats() -> Stats {
    STATS.with(Cell::get)
}

static TABLES_BUILT: AtomicUsize = AtomicUsize::new(0);
static MEMORY_INFOS: AtomicUsize = AtomicUsize::new(0);

pub fn tables_built() -> usize {
    TABLES_BUILT.load(Ordering::SeqCst)
}

pub fn memory_infos_created() -> usize {
    MEMORY_INFOS.load(Ordering::SeqCst)
}

/// What a session-options handle has been told.
#[derive(Debug, Clone, PartialEq)]
pub struct OptionsRecord {
    pub intra_op_threads: i32,
    pub inter_op_threads: i32,
    pub optimization_level: c_int,
    pub providers: Vec<String>,
}

/// Arguments of the most recent `Run` call on a session.
#[derive(Debug, Clone, PartialEq)]
pub struct RunRecord {
    pub input_names: Vec<String>,
    pub inputs: Vec<usize>,
    pub output_names: Vec<String>,
}

enum Object {
    Env {
        log_id: String,
        level: c_int,
    },
    Options(OptionsRecord),
    Session {
        inputs: Vec<String>,
        outputs: Vec<String>,
        intra_op_threads: i32,
        last_run: Option<RunRecord>,
    },
    Tensor {
        kind: c_int,
        shape: Vec<i64>,
        data: *mut c_void,
        byte_len: usize,
        // Caller-owned tensors: the bytes seen at creation, and whether
        // they were unchanged when the value was released.
        snapshot: Option<Vec<u8>>,
        intact_at_release: Option<bool>,
        // Runtime-owned tensors keep their storage here.
        _owned: Option<Vec<u64>>,
    },
    NonTensor,
    TypeInfo {
        kind: c_int,
        shape: Vec<i64>,
    },
    Status {
        code: c_int,
        message: CString,
    },
    MemoryInfo,
    CudaOptions(Vec<(String, String)>),
}

struct Entry {
    object: Object,
    releases: u32,
}

struct State {
    next: usize,
    objects: HashMap<usize, Entry>,
}

// Raw pointers in tensor objects are only touched under the lock.
unsafe impl Send for State {}

static STATE: Lazy<Mutex<State>> = Lazy::new(|| {
    Mutex::new(State {
        next: 0x1000,
        objects: HashMap::new(),
    })
});

fn with_state<R>(f: impl FnOnce(&mut State) -> R) -> R {
    f(&mut STATE.lock())
}

impl State {
    fn insert(&mut self, object: Object) -> *mut c_void {
        self.next += 16;
        self.objects.insert(self.next, Entry { object, releases: 0 });
        self.next as *mut c_void
    }

    fn fail(&mut self, code: c_int, message: &str) -> *mut c_void {
        bump(|s| s.status_created += 1);
        let message = CString::new(message).unwrap_or_default();
        self.insert(Object::Status { code, message })
    }

    fn live(&mut self, handle: *const c_void) -> Option<&mut Object> {
        self.objects
            .get_mut(&(handle as usize))
            .filter(|e| e.releases == 0)
            .map(|e| &mut e.object)
    }

    fn release(&mut self, handle: *const c_void, count: fn(&mut Stats)) {
        match self.objects.get_mut(&(handle as usize)) {
            Some(entry) if entry.releases == 0 => {
                entry.releases = 1;
                bump(count);
            }
            Some(entry) => {
                entry.releases += 1;
                bump(|s| s.double_released += 1);
            }
            None => bump(|s| s.double_released += 1),
        }
    }

    fn tensor(&mut self, kind: c_int, shape: Vec<i64>, bytes: &[u8]) -> *mut c_void {
        let mut owned = vec![0u64; bytes.len().div_ceil(8)];
        unsafe { ptr::copy_nonoverlapping(bytes.as_ptr(), owned.as_mut_ptr() as *mut u8, bytes.len()) };
        let data = owned.as_mut_ptr() as *mut c_void;
        bump(|s| s.value_created += 1);
        self.insert(Object::Tensor {
            kind,
            shape,
            data,
            byte_len: bytes.len(),
            snapshot: None,
            intact_at_release: None,
            _owned: Some(owned),
        })
    }
}

fn element_size(kind: c_int) -> Option<usize> {
    match kind {
        ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT8
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT8
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_BOOL => Some(1),
        ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT16
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT16
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16 => Some(2),
        ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT32
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT32 => Some(4),
        ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_DOUBLE
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_INT64
        | ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_UINT64 => Some(8),
        _ => None,
    }
}

fn parse_model(bytes: &[u8]) -> Option<(Vec<String>, Vec<String>)> {
    let text = std::str::from_utf8(bytes).ok()?;
    let mut inputs = None;
    let mut outputs = None;
    for line in text.lines() {
        let list = |rest: &str| rest.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        if let Some(rest) = line.strip_prefix("inputs:") {
            inputs = Some(list(rest));
        } else if let Some(rest) = line.strip_prefix("outputs:") {
            outputs = Some(list(rest));
        }
    }
    Some((inputs?, outputs?))
}

unsafe fn c_str(p: *const c_char) -> String {
    if p.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(p) }.to_string_lossy().into_owned()
}

unsafe fn c_str_array(p: *const *const c_char, len: usize) -> Vec<String> {
    (0..len).map(|i| unsafe { c_str(*p.add(i)) }).collect()
}

// ---------------------------------------------------------------------------
// Function table
// ---------------------------------------------------------------------------

unsafe extern "system" fn get_error_code(status: *const c_void) -> c_int {
    with_state(|st| match st.live(status) {
        Some(Object::Status { code, .. }) => *code,
        _ => CODE_FAIL,
    })
}

unsafe extern "system" fn get_error_message(status: *const c_void) -> *const c_char {
    with_state(|st| match st.live(status) {
        Some(Object::Status { message, .. }) => message.as_ptr(),
        _ => ptr::null(),
    })
}

unsafe extern "system" fn create_env(level: c_int, log_id: *const c_char, out: *mut *mut c_void) -> *mut c_void {
    let log_id = unsafe { c_str(log_id) };
    with_state(|st| {
        if log_id == FAIL {
            return st.fail(CODE_FAIL, "environment creation failed");
        }
        bump(|s| s.env_created += 1);
        unsafe { *out = st.insert(Object::Env { log_id, level }) };
        ptr::null_mut()
    })
}

fn new_session(st: &mut State, bytes: &[u8], options: *const c_void, out: *mut *mut c_void) -> *mut c_void {
    let Some((inputs, outputs)) = parse_model(bytes) else {
        return st.fail(CODE_INVALID_PROTOBUF, "failed to parse model");
    };
    let intra_op_threads = match st.live(options) {
        Some(Object::Options(record)) => record.intra_op_threads,
        _ => 0,
    };
    bump(|s| s.session_created += 1);
    unsafe {
        *out = st.insert(Object::Session {
            inputs,
            outputs,
            intra_op_threads,
            last_run: None,
        })
    };
    ptr::null_mut()
}

#[cfg(not(windows))]
unsafe fn native_path(p: *const ffi::OrtChar) -> std::path::PathBuf {
    use std::os::unix::ffi::OsStrExt;
    let bytes = unsafe { CStr::from_ptr(p) }.to_bytes();
    std::path::PathBuf::from(std::ffi::OsStr::from_bytes(bytes))
}

#[cfg(windows)]
unsafe fn native_path(p: *const ffi::OrtChar) -> std::path::PathBuf {
    let mut len = 0;
    while unsafe { *p.add(len) } != 0 {
        len += 1;
    }
    let wide = unsafe { std::slice::from_raw_parts(p, len) };
    std::path::PathBuf::from(String::from_utf16_lossy(wide))
}

unsafe extern "system" fn create_session(
    _env: *const c_void,
    path: *const ffi::OrtChar,
    options: *const c_void,
    out: *mut *mut c_void,
) -> *mut c_void {
    let path = unsafe { native_path(path) };
    let bytes = std::fs::read(&path);
    with_state(|st| match bytes {
        Ok(bytes) => new_session(st, &bytes, options, out),
        Err(e) => st.fail(CODE_NO_SUCHFILE, &format!("{}: {e}", path.display())),
    })
}

unsafe extern "system" fn create_session_from_array(
    _env: *const c_void,
    data: *const c_void,
    len: usize,
    options: *const c_void,
    out: *mut *mut c_void,
) -> *mut c_void {
    let bytes = unsafe { std::slice::from_raw_parts(data as *const u8, len) }.to_vec();
    with_state(|st| new_session(st, &bytes, options, out))
}

#[allow(clippy::too_many_arguments)]
unsafe extern "system" fn run(
    session: *mut c_void,
    _run_options: *const c_void,
    input_names: *const *const c_char,
    inputs: *const *const c_void,
    input_len: usize,
    output_names: *const *const c_char,
    output_len: usize,
    outputs: *mut *mut c_void,
) -> *mut c_void {
    let record = RunRecord {
        input_names: unsafe { c_str_array(input_names, input_len) },
        inputs: (0..input_len).map(|i| unsafe { *inputs.add(i) } as usize).collect(),
        output_names: unsafe { c_str_array(output_names, output_len) },
    };

    with_state(|st| {
        let (declared_inputs, declared_outputs) = match st.live(session) {
            Some(Object::Session {
                inputs,
                outputs,
                last_run,
                ..
            }) => {
                *last_run = Some(record.clone());
                (inputs.clone(), outputs.clone())
            }
            _ => return st.fail(CODE_INVALID_ARGUMENT, "invalid session"),
        };

        let mut given = record.input_names.clone();
        given.sort();
        let mut expected = declared_inputs;
        expected.sort();
        if given != expected {
            return st.fail(CODE_INVALID_ARGUMENT, &format!("invalid input names {:?}", record.input_names));
        }
        if let Some(name) = record.output_names.iter().find(|n| !declared_outputs.contains(n)) {
            return st.fail(CODE_INVALID_ARGUMENT, &format!("invalid output name {name}"));
        }
        if record.output_names.iter().any(|n| n == "fail") {
            return st.fail(CODE_FAIL, "run failed");
        }

        let source = record.inputs.first().copied().unwrap_or(0) as *const c_void;
        let (kind, shape, bytes) = match st.live(source) {
            Some(Object::Tensor {
                kind,
                shape,
                data,
                byte_len,
                ..
            }) => {
                let bytes = unsafe { std::slice::from_raw_parts(*data as *const u8, *byte_len) }.to_vec();
                (*kind, shape.clone(), bytes)
            }
            _ => return st.fail(CODE_INVALID_ARGUMENT, "input is not a tensor"),
        };

        for (i, name) in record.output_names.iter().enumerate() {
            let value = match name.as_str() {
                "hole" => ptr::null_mut(),
                "map" => {
                    bump(|s| s.value_created += 1);
                    st.insert(Object::NonTensor)
                }
                "half" => {
                    let count = bytes.len() / element_size(kind).unwrap_or(1);
                    st.tensor(ffi::ONNX_TENSOR_ELEMENT_DATA_TYPE_FLOAT16, shape.clone(), &vec![0u8; count * 2])
                }
                _ => st.tensor(kind, shape.clone(), &bytes),
            };
            unsafe { *outputs.add(i) = value };
        }
        ptr::null_mut()
    })
}

unsafe extern "system" fn create_session_options(out: *mut *mut c_void) -> *mut c_void {
    with_state(|st| {
        bump(|s| s.options_created += 1);
        unsafe {
            *out = st.insert(Object::Options(OptionsRecord {
                intra_op_threads: 0,
                inter_op_threads: 0,
                optimization_level: ffi::ORT_ENABLE_ALL,
                providers: Vec::new(),
            }))
        };
        ptr::null_mut()
    })
}

fn with_options(options: *mut c_void, f: impl FnOnce(&mut OptionsRecord) -> Result<(), String>) -> *mut c_void {
    with_state(|st| {
        let result = match st.live(options) {
            Some(Object::Options(record)) => f(record),
            _ => Err("invalid session options".to_string()),
        };
        match result {
            Ok(()) => ptr::null_mut(),
            Err(message) => st.fail(CODE_INVALID_ARGUMENT, &message),
        }
    })
}

unsafe extern "system" fn set_session_graph_optimization_level(options: *mut c_void, level: c_int) -> *mut c_void {
    with_options(options, |r| {
        r.optimization_level = level;
        Ok(())
    })
}

unsafe extern "system" fn set_intra_op_num_threads(options: *mut c_void, n: c_int) -> *mut c_void {
    with_options(options, |r| {
        if n < 0 {
            return Err(format!("invalid intra-op thread count {n}"));
        }
        r.intra_op_threads = n;
        Ok(())
    })
}

unsafe extern "system" fn set_inter_op_num_threads(options: *mut c_void, n: c_int) -> *mut c_void {
    with_options(options, |r| {
        if n < 0 {
            return Err(format!("invalid inter-op thread count {n}"));
        }
        r.inter_op_threads = n;
        Ok(())
    })
}

fn session_names(session: *const c_void, outputs: bool) -> Option<Vec<String>> {
    with_state(|st| match st.live(session) {
        Some(Object::Session { inputs, outputs: o, .. }) => Some(if outputs { o.clone() } else { inputs.clone() }),
        _ => None,
    })
}

fn name_count(session: *const c_void, outputs: bool, out: *mut usize) -> *mut c_void {
    match session_names(session, outputs) {
        Some(names) => {
            unsafe { *out = names.len() };
            ptr::null_mut()
        }
        None => with_state(|st| st.fail(CODE_INVALID_ARGUMENT, "invalid session")),
    }
}

fn name_at(session: *const c_void, outputs: bool, index: usize, out: *mut *mut c_char) -> *mut c_void {
    match session_names(session, outputs).and_then(|names| names.get(index).cloned()) {
        Some(name) => {
            bump(|s| s.names_allocated += 1);
            unsafe { *out = CString::new(name).unwrap_or_default().into_raw() };
            ptr::null_mut()
        }
        None => with_state(|st| st.fail(CODE_INVALID_ARGUMENT, &format!("no name at index {index}"))),
    }
}

unsafe extern "system" fn session_get_input_count(session: *const c_void, out: *mut usize) -> *mut c_void {
    name_count(session, false, out)
}

unsafe extern "system" fn session_get_output_count(session: *const c_void, out: *mut usize) -> *mut c_void {
    name_count(session, true, out)
}

unsafe extern "system" fn session_get_input_name(
    session: *const c_void,
    index: usize,
    _allocator: *mut c_void,
    out: *mut *mut c_char,
) -> *mut c_void {
    name_at(session, false, index, out)
}

unsafe extern "system" fn session_get_output_name(
    session: *const c_void,
    index: usize,
    _allocator: *mut c_void,
    out: *mut *mut c_char,
) -> *mut c_void {
    name_at(session, true, index, out)
}

unsafe extern "system" fn create_tensor_with_data_as_ort_value(
    info: *const c_void,
    data: *mut c_void,
    data_len: usize,
    shape: *const i64,
    shape_len: usize,
    kind: c_int,
    out: *mut *mut c_void,
) -> *mut c_void {
    let shape = unsafe { std::slice::from_raw_parts(shape, shape_len) }.to_vec();
    with_state(|st| {
        if !matches!(st.live(info), Some(Object::MemoryInfo)) {
            return st.fail(CODE_INVALID_ARGUMENT, "invalid memory info");
        }
        if shape.len() > MAX_RANK {
            return st.fail(CODE_INVALID_ARGUMENT, &format!("rank {} is too large", shape.len()));
        }
        let Some(size) = element_size(kind) else {
            return st.fail(CODE_INVALID_ARGUMENT, &format!("unknown element type {kind}"));
        };
        let count: i64 = shape.iter().product();
        if count < 0 || count as usize * size != data_len {
            return st.fail(CODE_INVALID_ARGUMENT, "buffer size does not match shape");
        }
        let snapshot = unsafe { std::slice::from_raw_parts(data as *const u8, data_len) }.to_vec();
        bump(|s| s.value_created += 1);
        unsafe {
            *out = st.insert(Object::Tensor {
                kind,
                shape,
                data,
                byte_len: data_len,
                snapshot: Some(snapshot),
                intact_at_release: None,
                _owned: None,
            })
        };
        ptr::null_mut()
    })
}

unsafe extern "system" fn is_tensor(value: *const c_void, out: *mut c_int) -> *mut c_void {
    with_state(|st| {
        let answer = match st.live(value) {
            Some(Object::Tensor { .. }) => 1,
            Some(Object::NonTensor) => 0,
            _ => return st.fail(CODE_INVALID_ARGUMENT, "invalid value"),
        };
        unsafe { *out = answer };
        ptr::null_mut()
    })
}

unsafe extern "system" fn get_tensor_mutable_data(value: *mut c_void, out: *mut *mut c_void) -> *mut c_void {
    with_state(|st| {
        let data = match st.live(value) {
            Some(Object::Tensor { data, .. }) => *data,
            _ => return st.fail(CODE_INVALID_ARGUMENT, "not a tensor"),
        };
        unsafe { *out = data };
        ptr::null_mut()
    })
}

unsafe extern "system" fn get_tensor_type_and_shape(value: *const c_void, out: *mut *mut c_void) -> *mut c_void {
    with_state(|st| {
        let (kind, shape) = match st.live(value) {
            Some(Object::Tensor { kind, shape, .. }) => (*kind, shape.clone()),
            _ => return st.fail(CODE_INVALID_ARGUMENT, "not a tensor"),
        };
        bump(|s| s.type_info_created += 1);
        unsafe { *out = st.insert(Object::TypeInfo { kind, shape }) };
        ptr::null_mut()
    })
}

fn type_info(info: *const c_void) -> Option<(c_int, Vec<i64>)> {
    with_state(|st| match st.live(info) {
        Some(Object::TypeInfo { kind, shape }) => Some((*kind, shape.clone())),
        _ => None,
    })
}

fn invalid(message: &str) -> *mut c_void {
    with_state(|st| st.fail(CODE_INVALID_ARGUMENT, message))
}

unsafe extern "system" fn get_tensor_element_type(info: *const c_void, out: *mut c_int) -> *mut c_void {
    match type_info(info) {
        Some((kind, _)) => {
            unsafe { *out = kind };
            ptr::null_mut()
        }
        None => invalid("invalid type info"),
    }
}

unsafe extern "system" fn get_dimensions_count(info: *const c_void, out: *mut usize) -> *mut c_void {
    match type_info(info) {
        Some((_, shape)) => {
            unsafe { *out = shape.len() };
            ptr::null_mut()
        }
        None => invalid("invalid type info"),
    }
}

unsafe extern "system" fn get_dimensions(info: *const c_void, dims: *mut i64, len: usize) -> *mut c_void {
    match type_info(info) {
        Some((_, shape)) => {
            let n = len.min(shape.len());
            unsafe { ptr::copy_nonoverlapping(shape.as_ptr(), dims, n) };
            ptr::null_mut()
        }
        None => invalid("invalid type info"),
    }
}

unsafe extern "system" fn create_cpu_memory_info(_allocator: c_int, _mem_type: c_int, out: *mut *mut c_void) -> *mut c_void {
    MEMORY_INFOS.fetch_add(1, Ordering::SeqCst);
    // Widen the window for racing first users.
    std::thread::sleep(std::time::Duration::from_millis(5));
    with_state(|st| {
        unsafe { *out = st.insert(Object::MemoryInfo) };
        ptr::null_mut()
    })
}

const ALLOCATOR: usize = 0x10;

unsafe extern "system" fn allocator_free(_allocator: *mut c_void, p: *mut c_void) -> *mut c_void {
    if !p.is_null() {
        drop(unsafe { CString::from_raw(p as *mut c_char) });
        bump(|s| s.names_freed += 1);
    }
    ptr::null_mut()
}

unsafe extern "system" fn get_allocator_with_default_options(out: *mut *mut c_void) -> *mut c_void {
    unsafe { *out = ALLOCATOR as *mut c_void };
    ptr::null_mut()
}

unsafe extern "system" fn release_env(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.env_released += 1));
}

unsafe extern "system" fn release_status(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.status_released += 1));
}

unsafe extern "system" fn release_memory_info(p: *mut c_void) {
    with_state(|st| st.release(p, |_| {}));
}

unsafe extern "system" fn release_session(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.session_released += 1));
}

unsafe extern "system" fn release_value(p: *mut c_void) {
    with_state(|st| {
        if let Some(Object::Tensor {
            data,
            byte_len,
            snapshot: Some(snapshot),
            intact_at_release,
            ..
        }) = st.live(p)
        {
            let now = unsafe { std::slice::from_raw_parts(*data as *const u8, *byte_len) };
            *intact_at_release = Some(now == snapshot.as_slice());
        }
        st.release(p, |s| s.value_released += 1);
    });
}

unsafe extern "system" fn release_tensor_type_and_shape_info(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.type_info_released += 1));
}

unsafe extern "system" fn release_session_options(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.options_released += 1));
}

unsafe extern "system" fn get_available_providers(out: *mut *mut *mut c_char, len: *mut c_int) -> *mut c_void {
    let list: Box<[*mut c_char]> = vec![CString::new("CPUExecutionProvider").unwrap_or_default().into_raw()].into();
    bump(|s| s.provider_lists_created += 1);
    unsafe {
        *len = list.len() as c_int;
        *out = Box::into_raw(list) as *mut *mut c_char;
    }
    ptr::null_mut()
}

unsafe extern "system" fn release_available_providers(list: *mut *mut c_char, len: c_int) -> *mut c_void {
    let list = unsafe { Box::from_raw(ptr::slice_from_raw_parts_mut(list, len as usize)) };
    for &name in list.iter() {
        drop(unsafe { CString::from_raw(name) });
    }
    bump(|s| s.provider_lists_released += 1);
    ptr::null_mut()
}

unsafe extern "system" fn append_cuda_v2(options: *mut c_void, cuda: *const c_void) -> *mut c_void {
    let entries = with_state(|st| match st.live(cuda) {
        Some(Object::CudaOptions(entries)) => Some(entries.clone()),
        _ => None,
    });
    let Some(entries) = entries else {
        return invalid("invalid CUDA provider options");
    };
    let desc = entries.iter().map(|(k, v)| format!("{k}={v}")).collect::<Vec<_>>().join(",");
    with_options(options, |r| {
        r.providers.push(format!("CUDA{{{desc}}}"));
        Ok(())
    })
}

unsafe extern "system" fn create_cuda_provider_options(out: *mut *mut c_void) -> *mut c_void {
    with_state(|st| {
        bump(|s| s.cuda_options_created += 1);
        unsafe { *out = st.insert(Object::CudaOptions(Vec::new())) };
        ptr::null_mut()
    })
}

unsafe extern "system" fn update_cuda_provider_options(
    cuda: *mut c_void,
    keys: *const *const c_char,
    values: *const *const c_char,
    n: usize,
) -> *mut c_void {
    let keys = unsafe { c_str_array(keys, n) };
    let values = unsafe { c_str_array(values, n) };
    with_state(|st| {
        if let Some(key) = keys.iter().find(|k| !CUDA_KEYS.contains(&k.as_str())) {
            return st.fail(CODE_INVALID_ARGUMENT, &format!("unknown CUDA option {key}"));
        }
        match st.live(cuda) {
            Some(Object::CudaOptions(entries)) => {
                entries.extend(keys.into_iter().zip(values));
                ptr::null_mut()
            }
            _ => st.fail(CODE_INVALID_ARGUMENT, "invalid CUDA provider options"),
        }
    })
}

unsafe extern "system" fn release_cuda_provider_options(p: *mut c_void) {
    with_state(|st| st.release(p, |s| s.cuda_options_released += 1));
}

unsafe extern "system" fn append_migraphx(options: *mut c_void, m: *const ffi::OrtMIGraphXProviderOptions) -> *mut c_void {
    let m = unsafe { &*m };
    let desc = format!(
        "device_id={},fp16={},int8={},save={},load={}",
        m.device_id,
        m.migraphx_fp16_enable,
        m.migraphx_int8_enable,
        unsafe { c_str(m.migraphx_save_model_path) },
        unsafe { c_str(m.migraphx_load_model_path) },
    );
    with_options(options, |r| {
        r.providers.push(format!("MIGraphX{{{desc}}}"));
        Ok(())
    })
}

unsafe extern "system" fn get_version_string() -> *const c_char {
    VERSION_C.as_ptr() as *const c_char
}

/// Builds the stand-in table.
pub fn table() -> ffi::Api {
    TABLES_BUILT.fetch_add(1, Ordering::SeqCst);
    ffi::Api {
        get_error_code,
        get_error_message,
        create_env,
        create_session,
        create_session_from_array,
        run,
        create_session_options,
        set_session_graph_optimization_level,
        set_intra_op_num_threads,
        set_inter_op_num_threads,
        session_get_input_count,
        session_get_output_count,
        session_get_input_name,
        session_get_output_name,
        create_tensor_with_data_as_ort_value,
        is_tensor,
        get_tensor_mutable_data,
        get_tensor_element_type,
        get_dimensions_count,
        get_dimensions,
        get_tensor_type_and_shape,
        create_cpu_memory_info,
        allocator_free,
        get_allocator_with_default_options,
        release_env,
        release_status,
        release_memory_info,
        release_session,
        release_value,
        release_tensor_type_and_shape_info,
        release_session_options,
        get_available_providers,
        release_available_providers,
        session_options_append_execution_provider_cuda_v2: append_cuda_v2,
        create_cuda_provider_options,
        update_cuda_provider_options,
        release_cuda_provider_options,
        session_options_append_execution_provider_migraphx: append_migraphx,
        get_version_string,
    }
}

// ---------------------------------------------------------------------------
// Inspection
// ---------------------------------------------------------------------------

/// Creates a status object as the runtime would on failure.
pub fn status(code: c_int, message: &str) -> *mut c_void {
    with_state(|st| st.fail(code, message))
}

/// How many times a handle has been released.
pub fn releases(handle: usize) -> u32 {
    with_state(|st| st.objects.get(&handle).map_or(0, |e| e.releases))
}

fn inspect<R>(handle: usize, f: impl FnOnce(&Object) -> Option<R>) -> Option<R> {
    with_state(|st| st.objects.get(&handle).and_then(|e| f(&e.object)))
}

pub fn env_log_id(handle: usize) -> Option<String> {
    inspect(handle, |o| match o {
        Object::Env { log_id, .. } => Some(log_id.clone()),
        _ => None,
    })
}

pub fn env_level(handle: usize) -> Option<c_int> {
    inspect(handle, |o| match o {
        Object::Env { level, .. } => Some(*level),
        _ => None,
    })
}

pub fn options(handle: usize) -> Option<OptionsRecord> {
    inspect(handle, |o| match o {
        Object::Options(record) => Some(record.clone()),
        _ => None,
    })
}

pub fn last_run(session: usize) -> Option<RunRecord> {
    inspect(session, |o| match o {
        Object::Session { last_run, .. } => last_run.clone(),
        _ => None,
    })
}

pub fn session_threads(session: usize) -> Option<i32> {
    inspect(session, |o| match o {
        Object::Session { intra_op_threads, .. } => Some(*intra_op_threads),
        _ => None,
    })
}

pub fn tensor_data_addr(value: usize) -> Option<usize> {
    inspect(value, |o| match o {
        Object::Tensor { data, .. } => Some(*data as usize),
        _ => None,
    })
}

/// Whether a caller-owned tensor buffer still held its original bytes
/// when the value was released.
pub fn buffer_intact_at_release(value: usize) -> bool {
    inspect(value, |o| match o {
        Object::Tensor { intact_at_release, .. } => *intact_at_release,
        _ => None,
    })
    .unwrap_or(false)
}
