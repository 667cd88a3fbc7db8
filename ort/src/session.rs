//! Loaded models and the inference call.

use std::collections::{HashMap, HashSet};
use std::ffi::CStr;
use std::fmt;
use std::os::raw::c_char;
use std::path::Path;
use std::ptr;

use tracing::{debug, warn};

use crate::api::{api, default_allocator};
use crate::env::Environment;
use crate::error::OrtError;
use crate::ffi;
use crate::marshal::{CStringArray, NativePath};
use crate::options::SessionOptions;
use crate::status::check;
use crate::value::Value;

type CountFn = unsafe extern "system" fn(*const ffi::OrtSession, *mut usize) -> *mut ffi::OrtStatus;
type NameFn =
    unsafe extern "system" fn(*const ffi::OrtSession, usize, *mut ffi::OrtAllocator, *mut *mut c_char) -> *mut ffi::OrtStatus;

/// Holds a loaded ONNX model.
///
/// A session keeps its [`Environment`] alive. `run` may be called from
/// several threads at once.
pub struct Session {
    session: *mut ffi::OrtSession,
    _env: Environment,
}

unsafe impl Send for Session {}
unsafe impl Sync for Session {}

impl Session {
    /// Loads a model from a file.
    ///
    /// Without `options`, a default set is created for the call and released after.
    pub fn from_file(
        env: &Environment,
        path: impl AsRef<Path>,
        options: Option<&SessionOptions>,
    ) -> Result<Self, OrtError> {
        let path = path.as_ref();
        let native_path = NativePath::new(path)?;
        let session = Self::create(env, options, |opts, out| unsafe {
            (api().create_session)(env.as_ptr(), native_path.as_ptr(), opts, out)
        })?;
        debug!("ort: loaded model {}", path.display());
        Ok(session)
    }

    /// Loads a model from in-memory ONNX data. The runtime does not keep
    /// a reference to `model_data` after this returns.
    pub fn from_memory(
        env: &Environment,
        model_data: &[u8],
        options: Option<&SessionOptions>,
    ) -> Result<Self, OrtError> {
        if model_data.is_empty() {
            return Err(OrtError::EmptyData);
        }
        let session = Self::create(env, options, |opts, out| unsafe {
            (api().create_session_from_array)(
                env.as_ptr(),
                model_data.as_ptr() as *const _,
                model_data.len(),
                opts,
                out,
            )
        })?;
        debug!("ort: loaded model from {} bytes", model_data.len());
        Ok(session)
    }

    fn create(
        env: &Environment,
        options: Option<&SessionOptions>,
        create: impl FnOnce(*const ffi::OrtSessionOptions, *mut *mut ffi::OrtSession) -> *mut ffi::OrtStatus,
    ) -> Result<Self, OrtError> {
        let defaults;
        let opts = match options {
            Some(o) => o,
            None => {
                defaults = SessionOptions::new()?;
                &defaults
            }
        };

        let mut session: *mut ffi::OrtSession = ptr::null_mut();
        check(create(opts.as_ptr(), &mut session))?;
        if session.is_null() {
            return Err(OrtError::Internal("CreateSession returned null".into()));
        }
        Ok(Self {
            session,
            _env: env.clone(),
        })
    }

    pub fn input_count(&self) -> Result<usize, OrtError> {
        self.count(api().session_get_input_count)
    }

    pub fn output_count(&self) -> Result<usize, OrtError> {
        self.count(api().session_get_output_count)
    }

    /// Returns the model's input names in declaration order.
    pub fn input_names(&self) -> Result<Vec<String>, OrtError> {
        let api = api();
        self.names(api.session_get_input_count, api.session_get_input_name)
    }

    /// Returns the model's output names in declaration order.
    pub fn output_names(&self) -> Result<Vec<String>, OrtError> {
        let api = api();
        self.names(api.session_get_output_count, api.session_get_output_name)
    }

    fn count(&self, count_fn: CountFn) -> Result<usize, OrtError> {
        let mut count: usize = 0;
        check(unsafe { count_fn(self.session, &mut count) })?;
        Ok(count)
    }

    fn names(&self, count_fn: CountFn, name_fn: NameFn) -> Result<Vec<String>, OrtError> {
        let count = self.count(count_fn)?;
        if count == 0 {
            return Ok(Vec::new());
        }

        let allocator = default_allocator()?;
        let mut names = Vec::with_capacity(count);
        for index in 0..count {
            let mut name: *mut c_char = ptr::null_mut();
            check(unsafe { name_fn(self.session, index, allocator, &mut name) })?;
            if name.is_null() {
                return Err(OrtError::Internal(format!("no name at index {index}")));
            }
            // The string belongs to the runtime allocator: copy, then free.
            names.push(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned());
            check(unsafe { (api().allocator_free)(allocator, name as *mut _) })?;
        }
        Ok(names)
    }

    /// Runs inference.
    ///
    /// `inputs` maps input names to values; any iterator of `(name, &Value)`
    /// works, including `&HashMap<String, Value>`. Inputs are passed to the
    /// runtime sorted by name. `output_names` selects the outputs to compute;
    /// `None` computes all of them. The result is keyed by output name and
    /// contains exactly the requested outputs.
    pub fn run<'v, I, K>(&self, inputs: I, output_names: Option<&[&str]>) -> Result<HashMap<String, Value>, OrtError>
    where
        I: IntoIterator<Item = (K, &'v Value)>,
        K: AsRef<str>,
    {
        let mut inputs: Vec<(K, &Value)> = inputs.into_iter().collect();
        inputs.sort_by(|a, b| a.0.as_ref().cmp(b.0.as_ref()));
        if let Some(dup) = inputs.windows(2).find(|w| w[0].0.as_ref() == w[1].0.as_ref()) {
            return Err(OrtError::InvalidArgument(format!("duplicate input name {:?}", dup[0].0.as_ref())));
        }

        let outputs: Vec<String> = match output_names {
            Some(names) => names.iter().map(|s| s.to_string()).collect(),
            None => self.output_names()?,
        };
        let mut seen = HashSet::with_capacity(outputs.len());
        if let Some(dup) = outputs.iter().find(|name| !seen.insert(name.as_str())) {
            return Err(OrtError::InvalidArgument(format!("duplicate output name {dup:?}")));
        }

        let c_input_names = CStringArray::new(inputs.iter().map(|(name, _)| name.as_ref()))?;
        let c_inputs: Vec<*const ffi::OrtValue> = inputs.iter().map(|(_, v)| v.as_ptr()).collect();
        let c_output_names = CStringArray::new(&outputs)?;
        let mut c_outputs: Vec<*mut ffi::OrtValue> = vec![ptr::null_mut(); outputs.len()];

        let status = unsafe {
            (api().run)(
                self.session,
                ptr::null(),
                c_input_names.as_ptr(),
                c_inputs.as_ptr(),
                c_inputs.len(),
                c_output_names.as_ptr(),
                c_output_names.len(),
                c_outputs.as_mut_ptr(),
            )
        };

        // Take ownership of whatever the runtime handed back, so it is
        // released on every path below.
        let returned: Vec<Option<Value>> = c_outputs
            .into_iter()
            .map(|v| (!v.is_null()).then(|| Value::from_raw(v)))
            .collect();

        if let Err(e) = check(status) {
            warn!("ort: run failed: {e}");
            return Err(e);
        }

        let mut results = HashMap::with_capacity(outputs.len());
        for (name, value) in outputs.into_iter().zip(returned) {
            match value {
                Some(value) => {
                    results.insert(name, value);
                }
                None => {
                    return Err(OrtError::Internal(format!(
                        "run succeeded but output {name:?} is missing"
                    )));
                }
            }
        }
        Ok(results)
    }

    #[cfg(test)]
    pub(crate) fn as_ptr(&self) -> *const ffi::OrtSession {
        self.session
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.session.is_null() {
            unsafe { (api().release_session)(self.session) };
            self.session = ptr::null_mut();
        }
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").field("session", &self.session).finish()
    }
}
