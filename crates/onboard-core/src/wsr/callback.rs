//! Callback-backed WSR provider: forwards `fill` to a user-registered
//! C function pointer + opaque userdata.
//!
//! The core does not serialize calls to the callback — if the registered
//! function is not itself thread-safe, the caller must select
//! `CacheType::None` or `CacheType::Caching` (single refill worker) rather
//! than `MultiThread`. This matches the contract documented on
//! `tQO_RNG_GET_WSR_DATA_FN_PTR` in the original C header.

use std::os::raw::c_void;

use super::WsrProvider;
use crate::error::WsrError;

/// Signature of the user-supplied WSR callback: writes up to `len` bytes
/// into `buf`, returns the number of bytes actually written, or a negative
/// value on failure.
pub type WsrCallbackFn =
    unsafe extern "C" fn(userdata: *mut c_void, buf: *mut u8, len: usize) -> isize;

/// Wraps a raw function pointer + userdata so it can be stored behind
/// `Arc<dyn WsrProvider>`. The caller asserts (by registering it) that the
/// pair is safe to invoke from any thread, per the contract above.
struct SendPtr(*mut c_void);
unsafe impl Send for SendPtr {}
unsafe impl Sync for SendPtr {}

pub struct CallbackWsr {
    callback: WsrCallbackFn,
    userdata: SendPtr,
}

impl CallbackWsr {
    /// # Safety
    /// `callback` must be safe to invoke with `userdata` from any thread
    /// for the lifetime of the resulting provider.
    pub unsafe fn new(callback: WsrCallbackFn, userdata: *mut c_void) -> Self {
        CallbackWsr {
            callback,
            userdata: SendPtr(userdata),
        }
    }
}

impl WsrProvider for CallbackWsr {
    fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError> {
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = &mut buf[filled..];
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| unsafe {
                (self.callback)(self.userdata.0, remaining.as_mut_ptr(), remaining.len())
            }));
            let written = match result {
                Ok(n) => n,
                Err(_) => return Err(WsrError::CallbackPanicked),
            };
            if written < 0 {
                return Err(WsrError::CallbackFailed {
                    code: written as i32,
                });
            }
            let written = written as usize;
            if written == 0 || written > remaining.len() {
                return Err(WsrError::CallbackShortRead {
                    delivered: written,
                    expected: remaining.len(),
                });
            }
            filled += written;
        }
        Ok(())
    }
}
