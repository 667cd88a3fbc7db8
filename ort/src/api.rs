//! Process-wide access to the runtime function table.
//!
//! The table is resolved once, on first use, and lives for the rest of the
//! process. The runtime has no unload operation, so neither does this module.

use std::ffi::CStr;
use std::os::raw::{c_char, c_int};
use std::path::{Path, PathBuf};
use std::ptr;

use once_cell::sync::OnceCell;
use tracing::{debug, info};

use crate::error::OrtError;
use crate::ffi;
use crate::status::check;

/// The C API version requested from the runtime.
pub const API_VERSION: u32 = 18;

/// Environment variable overriding the runtime library location.
pub const DYLIB_PATH_ENV: &str = "ORT_DYLIB_PATH";

#[cfg(target_os = "windows")]
const DEFAULT_DYLIB: &str = "onnxruntime.dll";
#[cfg(target_os = "macos")]
const DEFAULT_DYLIB: &str = "libonnxruntime.dylib";
#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const DEFAULT_DYLIB: &str = "libonnxruntime.so";

/// A resolved function table together with the library that backs it.
pub(crate) struct Runtime {
    pub api: ffi::Api,
    _library: Option<libloading::Library>,
}

static RUNTIME: OnceCell<Runtime> = OnceCell::new();

/// Gets the function table, resolving it on first call.
///
/// Panics if the runtime cannot be loaded: nothing else can proceed without it.
pub(crate) fn api() -> &'static ffi::Api {
    &RUNTIME.get_or_init(init).api
}

#[cfg(not(test))]
fn init() -> Runtime {
    let path = library_path(std::env::var_os(DYLIB_PATH_ENV).map(PathBuf::from));
    match load(&path) {
        Ok(runtime) => runtime,
        Err(e) => panic!("{e}"),
    }
}

#[cfg(test)]
fn init() -> Runtime {
    Runtime {
        api: crate::fake::table(),
        _library: None,
    }
}

/// Picks the library to load: an explicit override, or the platform default name.
fn library_path(override_path: Option<PathBuf>) -> PathBuf {
    override_path
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DYLIB))
}

fn load(path: &Path) -> Result<Runtime, OrtError> {
    let fail = |message: String| OrtError::Library {
        path: path.display().to_string(),
        message,
    };

    let library = unsafe { libloading::Library::new(path) }.map_err(|e| fail(e.to_string()))?;
    let api = unsafe {
        let get_api_base: libloading::Symbol<ffi::OrtGetApiBaseFn> = library
            .get(ffi::ORT_GET_API_BASE_SYMBOL)
            .map_err(|e| fail(e.to_string()))?;
        let base = get_api_base();
        if base.is_null() {
            return Err(fail("OrtGetApiBase returned null".into()));
        }
        let base = &*base;
        let get_api = base.get_api.ok_or_else(|| fail("OrtApiBase.GetApi is null".into()))?;
        let table = get_api(API_VERSION);
        if table.is_null() {
            return Err(fail(format!("API version {API_VERSION} is not supported by this runtime")));
        }
        ffi::Api::from_raw(base, table).map_err(fail)?
    };

    info!("ort: loaded {} (runtime {})", path.display(), version_of(&api));
    Ok(Runtime {
        api,
        _library: Some(library),
    })
}

/// Resolves the function table from an explicit library path.
///
/// Unlike implicit first use, failures are returned rather than fatal.
/// Fails if the table has already been resolved.
pub fn init_from_path(path: impl AsRef<Path>) -> Result<(), OrtError> {
    let path = path.as_ref();
    if RUNTIME.get().is_some() {
        return Err(OrtError::InvalidArgument("runtime already initialized".into()));
    }
    let runtime = load(path)?;
    RUNTIME
        .set(runtime)
        .map_err(|_| OrtError::InvalidArgument("runtime already initialized".into()))
}

fn version_of(api: &ffi::Api) -> String {
    let ptr = unsafe { (api.get_version_string)() };
    if ptr.is_null() {
        return "unknown".into();
    }
    unsafe { CStr::from_ptr(ptr).to_string_lossy().into_owned() }
}

/// Returns the ONNX Runtime version string.
pub fn version() -> String {
    version_of(api())
}

/// Returns the execution providers compiled into the loaded runtime.
pub fn available_providers() -> Result<Vec<String>, OrtError> {
    let api = api();
    let mut list: *mut *mut c_char = ptr::null_mut();
    let mut len: c_int = 0;
    check(unsafe { (api.get_available_providers)(&mut list, &mut len) })?;
    if list.is_null() {
        return Ok(Vec::new());
    }

    let providers = (0..len.max(0) as usize)
        .filter_map(|i| {
            let name = unsafe { *list.add(i) };
            (!name.is_null()).then(|| unsafe { CStr::from_ptr(name).to_string_lossy().into_owned() })
        })
        .collect();
    check(unsafe { (api.release_available_providers)(list, len) })?;
    Ok(providers)
}

// ---------------------------------------------------------------------------
// Memory info
// ---------------------------------------------------------------------------

struct CpuMemoryInfo(*const ffi::OrtMemoryInfo);

// Read-only after creation; the runtime only reads it.
unsafe impl Send for CpuMemoryInfo {}
unsafe impl Sync for CpuMemoryInfo {}

static CPU_MEMORY_INFO: OnceCell<CpuMemoryInfo> = OnceCell::new();

/// Returns the shared CPU arena memory info used to wrap tensor buffers.
///
/// Created once and never released.
pub(crate) fn cpu_memory_info() -> Result<*const ffi::OrtMemoryInfo, OrtError> {
    let info = CPU_MEMORY_INFO.get_or_try_init(|| {
        let api = api();
        let mut info: *mut ffi::OrtMemoryInfo = ptr::null_mut();
        check(unsafe { (api.create_cpu_memory_info)(ffi::ORT_ARENA_ALLOCATOR, ffi::ORT_MEM_TYPE_DEFAULT, &mut info) })?;
        if info.is_null() {
            return Err(OrtError::Internal("CreateCpuMemoryInfo returned null".into()));
        }
        debug!("ort: created cpu memory info");
        Ok(CpuMemoryInfo(info))
    })?;
    Ok(info.0)
}

/// Returns the runtime's default allocator. It is owned by the runtime and never released.
pub(crate) fn default_allocator() -> Result<*mut ffi::OrtAllocator, OrtError> {
    let mut allocator: *mut ffi::OrtAllocator = ptr::null_mut();
    check(unsafe { (api().get_allocator_with_default_options)(&mut allocator) })?;
    if allocator.is_null() {
        return Err(OrtError::Internal("default allocator not available".into()));
    }
    Ok(allocator)
}
