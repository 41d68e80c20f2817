//! Callback functions handed to `fmi2Instantiate`.
//!
//! The unit reports its own log messages through `logger` and allocates
//! through `allocateMemory`/`freeMemory`. The component environment points
//! to a context owned by the unit handle's [`Callbacks`], which routes
//! messages into the handle's diagnostic sink.

use crate::diagnostics::{DiagnosticSink, Severity};
use lib_types::Status;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::ptr::NonNull;
use std::sync::Arc;

/// `fmi2CallbackLogger`.
///
/// The C declaration is variadic. The message is forwarded as given,
/// without expanding printf-style arguments.
pub type LoggerFn = unsafe extern "C" fn(
    environment: *mut c_void,
    instance_name: *const c_char,
    status: c_int,
    category: *const c_char,
    message: *const c_char,
);
pub type AllocateMemoryFn = unsafe extern "C" fn(count: usize, size: usize) -> *mut c_void;
pub type FreeMemoryFn = unsafe extern "C" fn(object: *mut c_void);
pub type StepFinishedFn = unsafe extern "C" fn(environment: *mut c_void, status: c_int);

/// `fmi2CallbackFunctions`.
#[repr(C)]
#[derive(Debug)]
pub struct CallbackFunctions {
    pub logger: Option<LoggerFn>,
    pub allocate_memory: Option<AllocateMemoryFn>,
    pub free_memory: Option<FreeMemoryFn>,
    pub step_finished: Option<StepFinishedFn>,
    pub component_environment: *mut c_void,
}

/// State the callbacks reach through the component environment.
struct CallbackContext {
    sink: Arc<dyn DiagnosticSink>,
    instance_name: String,
}

/// Callback table plus the context its environment points at.
///
/// Both live at fixed heap addresses from construction until drop, and
/// are only reached through raw pointers in between. The unit may call
/// back until the instance is freed, so drop this after `fmi2FreeInstance`.
pub struct Callbacks {
    functions: NonNull<CallbackFunctions>,
    context: NonNull<CallbackContext>,
}

impl Callbacks {
    pub fn new(sink: Arc<dyn DiagnosticSink>, instance_name: impl Into<String>) -> Self {
        let context = NonNull::from(Box::leak(Box::new(CallbackContext {
            sink,
            instance_name: instance_name.into(),
        })));
        let functions = NonNull::from(Box::leak(Box::new(CallbackFunctions {
            logger: Some(log_message),
            allocate_memory: Some(allocate_memory),
            free_memory: Some(free_memory),
            step_finished: Some(step_finished),
            component_environment: context.as_ptr().cast(),
        })));
        Self { functions, context }
    }

    /// Pointer handed to `fmi2Instantiate`.
    pub fn as_ptr(&self) -> *const CallbackFunctions {
        self.functions.as_ptr()
    }
}

impl Drop for Callbacks {
    fn drop(&mut self) {
        // SAFETY: Both pointers came from `Box::leak` in `new` and are
        // reclaimed exactly once.
        unsafe {
            drop(Box::from_raw(self.functions.as_ptr()));
            drop(Box::from_raw(self.context.as_ptr()));
        }
    }
}

impl std::fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Callbacks").field("functions", &self.functions).finish()
    }
}

extern "C" {
    fn calloc(count: usize, size: usize) -> *mut c_void;
    fn free(object: *mut c_void);
}

/// Read a C string, returning None only if null.
///
/// Bytes that are not UTF-8 (Latin-1 text, for instance) are replaced
/// with U+FFFD.
///
/// # Safety
/// The pointer must be null or point to a valid null-terminated C string.
pub(crate) unsafe fn read_c_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    // SAFETY: Caller guarantees ptr is valid if not null
    Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

unsafe extern "C" fn log_message(
    environment: *mut c_void,
    instance_name: *const c_char,
    status: c_int,
    category: *const c_char,
    message: *const c_char,
) {
    if environment.is_null() {
        return;
    }
    // SAFETY: The environment is the boxed context the handle registered,
    // alive until the instance is freed.
    let context = unsafe { &*(environment as *const CallbackContext) };
    // SAFETY: The unit passes null or valid C strings.
    let (instance, category, message) = unsafe {
        (
            read_c_string(instance_name),
            read_c_string(category),
            read_c_string(message),
        )
    };

    let severity = Status::from_raw(status).map_or(Severity::Error, Severity::from_status);
    let module = instance.unwrap_or_else(|| context.instance_name.clone());
    let text = match category {
        Some(category) if !category.is_empty() => {
            format!("[{category}] {}", message.unwrap_or_default())
        }
        _ => message.unwrap_or_default(),
    };
    context.sink.log(severity, &module, &text);
}

unsafe extern "C" fn allocate_memory(count: usize, size: usize) -> *mut c_void {
    // SAFETY: calloc accepts any sizes and returns null on failure.
    unsafe { calloc(count, size) }
}

unsafe extern "C" fn free_memory(object: *mut c_void) {
    // SAFETY: Units only free what allocate_memory returned, or null.
    unsafe { free(object) }
}

unsafe extern "C" fn step_finished(environment: *mut c_void, status: c_int) {
    if environment.is_null() {
        return;
    }
    // SAFETY: See log_message.
    let context = unsafe { &*(environment as *const CallbackContext) };
    let status = Status::from_raw(status).unwrap_or(Status::Fatal);
    context.sink.log(
        Severity::Verbose,
        &context.instance_name,
        &format!("Asynchronous step finished with status {status}"),
    );
}
