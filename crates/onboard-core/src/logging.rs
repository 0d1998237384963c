//! Process-wide logging-callback bridge.
//!
//! Independent of the crate's own ambient `tracing` diagnostics: this
//! module is the public surface a caller registers a sink against.
//! Guarded by an `RwLock` so many threads can log concurrently while
//! registration/clearing is exclusive, and supports both the legacy
//! 3-argument callback signature and the 4-argument signature that also
//! carries a numeric status code.

use std::os::raw::{c_char, c_void};
use std::sync::RwLock;

use crate::option::LogLevel;

/// Legacy 3-argument logging callback: `(level, message, userdata)`.
pub type LoggingCallback3 =
    unsafe extern "C" fn(level: u32, message: *const c_char, userdata: *mut c_void);

/// 4-argument logging callback that also carries the numeric error/status
/// code associated with the message (0 when there is none).
pub type LoggingCallback4 =
    unsafe extern "C" fn(level: u32, code: i32, message: *const c_char, userdata: *mut c_void);

enum RegisteredCallback {
    Three(LoggingCallback3),
    Four(LoggingCallback4),
}

struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

struct Registration {
    callback: RegisteredCallback,
    userdata: SendPtr,
    min_level: LogLevel,
}

static REGISTRY: RwLock<Option<Registration>> = RwLock::new(None);

/// # Safety
/// `callback` must be safe to invoke with `userdata` from any thread that
/// might call [`log_message`].
pub unsafe fn set_logging_callback_3(callback: LoggingCallback3, userdata: *mut c_void, min_level: LogLevel) {
    let mut guard = REGISTRY.write().expect("logging registry poisoned");
    *guard = Some(Registration {
        callback: RegisteredCallback::Three(callback),
        userdata: SendPtr(userdata),
        min_level,
    });
}

/// # Safety
/// Same contract as [`set_logging_callback_3`].
pub unsafe fn set_logging_callback_4(callback: LoggingCallback4, userdata: *mut c_void, min_level: LogLevel) {
    let mut guard = REGISTRY.write().expect("logging registry poisoned");
    *guard = Some(Registration {
        callback: RegisteredCallback::Four(callback),
        userdata: SendPtr(userdata),
        min_level,
    });
}

pub fn clear_logging_callback() {
    let mut guard = REGISTRY.write().expect("logging registry poisoned");
    *guard = None;
}

/// Forwards `message` to the registered callback, if any, and at `level`
/// at or above the callback's registered threshold. `code` is `0` when
/// the message carries no associated error code.
pub fn log_message(level: LogLevel, code: i32, message: &str) {
    let guard = REGISTRY.read().expect("logging registry poisoned");
    let Some(registration) = guard.as_ref() else {
        return;
    };
    if level > registration.min_level {
        return;
    }
    let Ok(c_message) = std::ffi::CString::new(message) else {
        return;
    };
    match registration.callback {
        RegisteredCallback::Three(f) => unsafe {
            f(level as u32, c_message.as_ptr(), registration.userdata.0);
        },
        RegisteredCallback::Four(f) => unsafe {
            f(level as u32, code, c_message.as_ptr(), registration.userdata.0);
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    // Serializes tests against the process-wide registry.
    static TEST_LOCK: Mutex<()> = Mutex::new(());

    static CALL_COUNT: AtomicUsize = AtomicUsize::new(0);
    static LAST_CODE: std::sync::atomic::AtomicI32 = std::sync::atomic::AtomicI32::new(0);

    unsafe extern "C" fn counting_cb3(_level: u32, _message: *const c_char, _userdata: *mut c_void) {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
    }

    unsafe extern "C" fn counting_cb4(_level: u32, code: i32, _message: *const c_char, _userdata: *mut c_void) {
        CALL_COUNT.fetch_add(1, Ordering::SeqCst);
        LAST_CODE.store(code, Ordering::SeqCst);
    }

    #[test]
    fn three_arg_callback_is_invoked() {
        let _guard = TEST_LOCK.lock().unwrap();
        CALL_COUNT.store(0, Ordering::SeqCst);
        unsafe { set_logging_callback_3(counting_cb3, std::ptr::null_mut(), LogLevel::Info) };
        log_message(LogLevel::Info, 0, "hello");
        assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 1);
        clear_logging_callback();
    }

    #[test]
    fn four_arg_callback_receives_code() {
        let _guard = TEST_LOCK.lock().unwrap();
        CALL_COUNT.store(0, Ordering::SeqCst);
        unsafe { set_logging_callback_4(counting_cb4, std::ptr::null_mut(), LogLevel::Trace) };
        log_message(LogLevel::Error, 13801, "bad config");
        assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 1);
        assert_eq!(LAST_CODE.load(Ordering::SeqCst), 13801);
        clear_logging_callback();
    }

    #[test]
    fn messages_below_threshold_are_suppressed() {
        let _guard = TEST_LOCK.lock().unwrap();
        CALL_COUNT.store(0, Ordering::SeqCst);
        unsafe { set_logging_callback_3(counting_cb3, std::ptr::null_mut(), LogLevel::Error) };
        log_message(LogLevel::Trace, 0, "too verbose");
        assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 0);
        clear_logging_callback();
    }

    #[test]
    fn clear_logging_callback_stops_delivery() {
        let _guard = TEST_LOCK.lock().unwrap();
        CALL_COUNT.store(0, Ordering::SeqCst);
        unsafe { set_logging_callback_3(counting_cb3, std::ptr::null_mut(), LogLevel::Info) };
        clear_logging_callback();
        log_message(LogLevel::Info, 0, "nobody home");
        assert_eq!(CALL_COUNT.load(Ordering::SeqCst), 0);
    }
}
