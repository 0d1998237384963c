//! `extern "C"` boundary for `onboard-core`.
//!
//! ```text
//! C caller -> ABI entry (this crate) -> safe core (onboard-core) -> return
//! ```
//!
//! Every entry point catches unwinding panics and maps them to the
//! `StdException`/`UnknownException` error codes rather than letting them
//! cross the FFI boundary (undefined behavior in C callers). Every error
//! path also records a thread-local last-error slot, readable via
//! `onboard_get_error_code`/`onboard_get_error_description`.

use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_void};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;
use std::sync::Mutex;

use onboard_core::context::{last_error_code, last_error_description, set_last_error};
use onboard_core::error::{ConfigError, OnboardError, ERC_OK};
use onboard_core::option::{LogLevel, OptionId};
use onboard_core::wsr::WsrCallbackFn;
use onboard_core::{Builder, Context};

/// Legacy 3-argument logging callback.
pub type OnboardLoggingCallback3 =
    unsafe extern "C" fn(level: u32, message: *const c_char, userdata: *mut c_void);
/// 4-argument logging callback carrying a status code.
pub type OnboardLoggingCallback4 =
    unsafe extern "C" fn(level: u32, code: i32, message: *const c_char, userdata: *mut c_void);
/// WSR callback: see `onboard_core::wsr::CallbackWsr`.
pub type OnboardWsrCallbackFn = WsrCallbackFn;

enum HandleState {
    Building(Builder),
    Ready(Context),
    Destroyed,
}

/// Opaque handle returned to C callers.
pub struct OnboardHandle {
    state: Mutex<HandleState>,
}

fn record_and_code(err: &OnboardError) -> i32 {
    let code = err.code();
    set_last_error(code, err.to_string());
    code
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Runs `f`, converting any `Err` or caught panic into a stable error code
/// and recording it in the calling thread's last-error slot.
fn guard<F>(f: F) -> i32
where
    F: FnOnce() -> Result<(), OnboardError>,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(())) => ERC_OK,
        Ok(Err(e)) => record_and_code(&e),
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            record_and_code(&OnboardError::StdException { message })
        }
    }
}

/// # Safety
/// `ptr` must be a valid NUL-terminated C string for the duration of the call.
unsafe fn str_from_c(ptr: *const c_char) -> Result<String, OnboardError> {
    if ptr.is_null() {
        return Err(OnboardError::Internal {
            message: "null string pointer".to_string(),
        });
    }
    Ok(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
}

// ── Handle lifecycle ─────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn onboard_setopt_init() -> *mut OnboardHandle {
    let handle = Box::new(OnboardHandle {
        state: Mutex::new(HandleState::Building(Builder::new())),
    });
    Box::into_raw(handle)
}

/// # Safety
/// `handle` must be a live pointer returned by `onboard_setopt_init` and
/// not yet passed to `onboard_destroy`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_setopt_int(handle: *mut OnboardHandle, option_id: u32, value: i64) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Building(builder) = &mut *state else {
            return Err(OnboardError::Internal {
                message: "setopt called on a non-Building handle".to_string(),
            });
        };
        let option = OptionId::from_u32(option_id).ok_or(ConfigError::UnknownOptionId(option_id))?;
        builder.set_int(option, value)?;
        Ok(())
    })
}

/// # Safety
/// Same contract as `onboard_setopt_int`; `value` must be a valid
/// NUL-terminated C string for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_setopt_str(
    handle: *mut OnboardHandle,
    option_id: u32,
    value: *const c_char,
) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Building(builder) = &mut *state else {
            return Err(OnboardError::Internal {
                message: "setopt called on a non-Building handle".to_string(),
            });
        };
        let option = OptionId::from_u32(option_id).ok_or(ConfigError::UnknownOptionId(option_id))?;
        let s = unsafe { str_from_c(value) }?;
        builder.set_str(option, s)?;
        Ok(())
    })
}

/// # Safety
/// Same contract as `onboard_setopt_int`; `data` must point to at least
/// `len` readable bytes for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_setopt_bytes(
    handle: *mut OnboardHandle,
    option_id: u32,
    data: *const u8,
    len: usize,
) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Building(builder) = &mut *state else {
            return Err(OnboardError::Internal {
                message: "setopt called on a non-Building handle".to_string(),
            });
        };
        let option = OptionId::from_u32(option_id).ok_or(ConfigError::UnknownOptionId(option_id))?;
        if data.is_null() && len > 0 {
            return Err(OnboardError::Internal {
                message: "null byte buffer with nonzero length".to_string(),
            });
        }
        let bytes = if len == 0 {
            Vec::new()
        } else {
            unsafe { std::slice::from_raw_parts(data, len) }.to_vec()
        };
        builder.set_bytes(option, bytes)?;
        Ok(())
    })
}

/// # Safety
/// `callback` must be safe to invoke with `userdata` from any thread for
/// the resulting context's lifetime (the core does not serialize calls to
/// it).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_setopt_wsr_callback(
    handle: *mut OnboardHandle,
    callback: OnboardWsrCallbackFn,
    userdata: *mut c_void,
) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Building(builder) = &mut *state else {
            return Err(OnboardError::Internal {
                message: "setopt called on a non-Building handle".to_string(),
            });
        };
        unsafe { builder.set_wsr_callback(callback, userdata) };
        Ok(())
    })
}

/// # Safety
/// `handle` must be a live pointer returned by `onboard_setopt_init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_setopt_cleanup(handle: *mut OnboardHandle) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        if let HandleState::Building(builder) = &mut *state {
            builder.cleanup();
        }
        Ok(())
    })
}

/// Validates the accumulated option set and transitions the handle from
/// `Building` to `Ready`.
///
/// # Safety
/// `handle` must be a live pointer returned by `onboard_setopt_init`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_init_from_config_struct(handle: *mut OnboardHandle) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let mut state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Building(builder) = &mut *state else {
            return Err(OnboardError::Internal {
                message: "init called on a non-Building handle".to_string(),
            });
        };
        let ctx = builder.build()?;
        *state = HandleState::Ready(ctx);
        Ok(())
    })
}

/// Loads a JSON config document from `path`, applies the options at
/// `node_path` (empty string for the document root), and returns a
/// `Ready` handle.
///
/// # Safety
/// `path` and `node_path` must be valid NUL-terminated C strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_init_from_config_file(
    path: *const c_char,
    node_path: *const c_char,
) -> *mut OnboardHandle {
    let result = catch_unwind(AssertUnwindSafe(|| -> Result<OnboardHandle, OnboardError> {
        let path = unsafe { str_from_c(path) }?;
        let node_path = unsafe { str_from_c(node_path) }?;
        let text = std::fs::read_to_string(&path).map_err(|e| OnboardError::Internal {
            message: format!("failed to read config file {path}: {e}"),
        })?;
        let mut builder = Builder::new();
        onboard_core::config_file::load_into_builder(&mut builder, &text, &node_path)?;
        let ctx = builder.build()?;
        Ok(OnboardHandle {
            state: Mutex::new(HandleState::Ready(ctx)),
        })
    }));

    match result {
        Ok(Ok(handle)) => Box::into_raw(Box::new(handle)),
        Ok(Err(e)) => {
            record_and_code(&e);
            ptr::null_mut()
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            record_and_code(&OnboardError::StdException { message });
            ptr::null_mut()
        }
    }
}

/// Fills `buf` (exactly `len` bytes) with amplified randomness.
///
/// # Safety
/// `handle` must be `Ready`; `buf` must point to at least `len` writable
/// bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_get_randomness(handle: *mut OnboardHandle, buf: *mut u8, len: usize) -> i32 {
    guard(|| {
        let handle = unsafe { &*handle };
        let state = handle.state.lock().expect("handle mutex poisoned");
        let HandleState::Ready(ctx) = &*state else {
            return Err(OnboardError::NotReady);
        };
        let bytes = ctx.get_randomness(len)?;
        if buf.is_null() && len > 0 {
            return Err(OnboardError::Internal {
                message: "null output buffer with nonzero length".to_string(),
            });
        }
        if len > 0 {
            unsafe { std::slice::from_raw_parts_mut(buf, len) }.copy_from_slice(&bytes);
        }
        Ok(())
    })
}

/// Shuts the context down (idempotent) and frees the handle. The handle
/// pointer must not be used again after this call.
///
/// # Safety
/// `handle` must be a live pointer returned by `onboard_setopt_init` or
/// `onboard_init_from_config_file`, or null (a no-op).
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_destroy(handle: *mut OnboardHandle) -> i32 {
    if handle.is_null() {
        return ERC_OK;
    }
    guard(|| {
        let owned = unsafe { Box::from_raw(handle) };
        let mut state = owned.state.lock().expect("handle mutex poisoned");
        if let HandleState::Ready(ctx) = &mut *state {
            ctx.destroy();
        }
        *state = HandleState::Destroyed;
        drop(state);
        // owned's Box is dropped here, freeing the handle.
        Ok(())
    })
}

// ── Logging bridge ───────────────────────────────────────────────────────

/// # Safety
/// `callback` must be safe to invoke with `userdata` from any thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_set_logging_callback(
    callback: OnboardLoggingCallback3,
    userdata: *mut c_void,
    min_level: u32,
) -> i32 {
    guard(|| {
        let level = LogLevel::from_i64(min_level as i64).unwrap_or(LogLevel::Info);
        unsafe { onboard_core::logging::set_logging_callback_3(callback, userdata, level) };
        Ok(())
    })
}

/// # Safety
/// Same contract as `onboard_set_logging_callback`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_set_logging_callback_with_status(
    callback: OnboardLoggingCallback4,
    userdata: *mut c_void,
    min_level: u32,
) -> i32 {
    guard(|| {
        let level = LogLevel::from_i64(min_level as i64).unwrap_or(LogLevel::Info);
        unsafe { onboard_core::logging::set_logging_callback_4(callback, userdata, level) };
        Ok(())
    })
}

#[unsafe(no_mangle)]
pub extern "C" fn onboard_clear_logging_callback() -> i32 {
    guard(|| {
        onboard_core::logging::clear_logging_callback();
        Ok(())
    })
}

/// # Safety
/// `message` must be a valid NUL-terminated C string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_log_message(level: u32, code: i32, message: *const c_char) -> i32 {
    guard(|| {
        let level = LogLevel::from_i64(level as i64).ok_or(OnboardError::Internal {
            message: "invalid log level".to_string(),
        })?;
        let message = unsafe { str_from_c(message) }?;
        onboard_core::logging::log_message(level, code, &message);
        Ok(())
    })
}

// ── Error surface ────────────────────────────────────────────────────────

#[unsafe(no_mangle)]
pub extern "C" fn onboard_get_error_code() -> i32 {
    last_error_code()
}

/// Writes the calling thread's last-error description into `buf`
/// (truncated to `len - 1` bytes, NUL-terminated). Returns the number of
/// bytes written excluding the terminator.
///
/// # Safety
/// `buf` must point to at least `len` writable bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn onboard_get_error_description(buf: *mut c_char, len: usize) -> usize {
    if buf.is_null() || len == 0 {
        return 0;
    }
    let description = last_error_description();
    let c_string = CString::new(description.replace('\0', "")).unwrap_or_default();
    let bytes = c_string.as_bytes_with_nul();
    let copy_len = bytes.len().min(len);
    unsafe { std::slice::from_raw_parts_mut(buf as *mut u8, copy_len) }.copy_from_slice(&bytes[..copy_len]);
    if copy_len == len {
        // Truncated: force a NUL terminator into the last byte.
        unsafe { *buf.add(len - 1) = 0 };
        len - 1
    } else {
        copy_len - 1
    }
}
