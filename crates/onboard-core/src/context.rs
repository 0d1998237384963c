//! Config/option builder and the `Context` façade.
//!
//! `Builder` accumulates option values exactly like the C `setopt` family,
//! validates them once into an immutable [`Context`] at `build()`, and is
//! then consumed — any further `set_*` calls on the same handle are silent
//! no-ops, matching the documented ABI-compatibility behavior in the
//! original interface this was distilled from.
//!
//! `Context` itself is a small state machine: `Building -> Ready ->
//! Destroyed`. Only `Ready` accepts [`Context::get_randomness`];
//! `Destroyed` is terminal and `destroy()` is idempotent.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::os::raw::c_void;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::{Cache, CachePolicy};
use crate::error::{ConfigError, OnboardError};
use crate::extractor::{Extractor, ExtractorParams};
use crate::option::{CacheType, OptionId, OptionValue, WsrType};
use crate::seed::Seed;
use crate::wsr::{CallbackWsr, FileWsr, RdSeedWsr, WsrCallbackFn, WsrProvider};

thread_local! {
    static LAST_ERROR: RefCell<Option<(i32, String)>> = const { RefCell::new(None) };
}

/// Records the most recent error for the calling thread, for later
/// retrieval via `onboard_get_error_code`/`onboard_get_error_description`.
///
/// Deliberately thread-local, not process-wide: the original interface's
/// process-wide slot let one thread's error clobber another's before it
/// could be read.
pub fn set_last_error(code: i32, description: String) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some((code, description)));
}

pub fn last_error_code() -> i32 {
    LAST_ERROR.with(|slot| slot.borrow().as_ref().map(|(c, _)| *c).unwrap_or(0))
}

pub fn last_error_description() -> String {
    LAST_ERROR
        .with(|slot| slot.borrow().as_ref().map(|(_, d)| d.clone()))
        .unwrap_or_default()
}

/// Accumulates option values via `set_*` calls, then validates them into
/// a `Context` exactly once.
pub struct Builder {
    values: BTreeMap<OptionId, OptionValue>,
    wsr_callback: Option<(WsrCallbackFn, *mut c_void)>,
    consumed: bool,
}

impl Default for Builder {
    fn default() -> Self {
        Builder {
            values: BTreeMap::new(),
            wsr_callback: None,
            consumed: false,
        }
    }
}

// SAFETY: the raw callback pointer pair is only ever read back and handed
// to `CallbackWsr::new`, which itself documents the thread-safety
// requirement on the registered callback. The Builder does not invoke it.
unsafe impl Send for Builder {}

impl Builder {
    pub fn new() -> Self {
        Builder::default()
    }

    fn set(&mut self, option: OptionId, value: OptionValue) -> Result<(), ConfigError> {
        if self.consumed {
            return Ok(()); // silent no-op after build(), per ABI-compat contract
        }
        self.values.insert(option, value);
        Ok(())
    }

    pub fn set_int(&mut self, option: OptionId, value: i64) -> Result<(), ConfigError> {
        self.set(option, OptionValue::Int(value))
    }

    pub fn set_str(&mut self, option: OptionId, value: impl Into<String>) -> Result<(), ConfigError> {
        self.set(option, OptionValue::Str(value.into()))
    }

    pub fn set_bytes(&mut self, option: OptionId, value: impl Into<Vec<u8>>) -> Result<(), ConfigError> {
        self.set(option, OptionValue::Bytes(value.into()))
    }

    /// # Safety
    /// See [`CallbackWsr::new`]: the callback must be safe to invoke with
    /// `userdata` from any thread for the context's lifetime.
    pub unsafe fn set_wsr_callback(&mut self, callback: WsrCallbackFn, userdata: *mut c_void) {
        if self.consumed {
            return;
        }
        self.wsr_callback = Some((callback, userdata));
    }

    /// Clears every option set so far, restoring the builder to its
    /// freshly-constructed state. A no-op once consumed.
    pub fn cleanup(&mut self) {
        if self.consumed {
            return;
        }
        self.values.clear();
        self.wsr_callback = None;
    }

    pub(crate) fn get_int(&self, option: OptionId, default: i64) -> i64 {
        self.values.get(&option).and_then(OptionValue::as_int).unwrap_or(default)
    }

    /// Validates accumulated options and consumes the builder into a
    /// `Context`. Subsequent `set_*` calls on this builder become no-ops.
    pub fn build(&mut self) -> Result<Context, ConfigError> {
        if self.consumed {
            return Err(ConfigError::BuilderAlreadyConsumed);
        }
        self.consumed = true;

        let size = self.get_int(OptionId::CacheSize, 0).max(0) as usize;
        let mut prefill = self.get_int(OptionId::CachePrefill, 0).max(0) as usize;
        let mut refill_at = self.get_int(OptionId::CacheRefillAt, 0).max(0) as usize;

        let mut cache_type = CacheType::from_i64(self.get_int(OptionId::CacheType, 0))
            .ok_or(ConfigError::UnknownOptionId(OptionId::CacheType as u32))?;

        if size == 0 {
            // A zero-sized cache has no room for watermarks at all, so any
            // requested cache type is coerced to None regardless of what
            // the caller asked for.
            cache_type = CacheType::None;
        }

        if cache_type == CacheType::None {
            // size=0 is coerced rather than validated: a cache-less context
            // has no watermarks to violate.
            prefill = 0;
            refill_at = 0;
        } else {
            if prefill > size {
                return Err(ConfigError::PrefillExceedsSize { prefill, size });
            }
            if refill_at >= prefill {
                return Err(ConfigError::WatermarkInversion { refill_at, prefill });
            }
        }

        let thread_count = self.get_int(OptionId::CacheThreadCount, 0).max(0) as usize;
        let policy = match cache_type {
            CacheType::None => CachePolicy::None,
            CacheType::SyncCaching => CachePolicy::SyncCache,
            CacheType::Caching => CachePolicy::AsyncCache,
            CacheType::MultiThread => {
                let resolved = if thread_count == 0 {
                    std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(1)
                } else {
                    thread_count
                };
                CachePolicy::MultiThread {
                    thread_count: resolved,
                }
            }
        };

        let wsr_type = WsrType::from_i64(self.get_int(OptionId::WsrType, 0))
            .ok_or(ConfigError::UnknownOptionId(OptionId::WsrType as u32))?;
        let wsr: Arc<dyn WsrProvider> = match wsr_type {
            WsrType::RdSeed => Arc::new(RdSeedWsr::new()),
            WsrType::File => {
                let path = self
                    .values
                    .get(&OptionId::WsrPath)
                    .and_then(OptionValue::as_str)
                    .ok_or(ConfigError::MissingWsrPath)?;
                Arc::new(FileWsr::new(path))
            }
            WsrType::CallbackFunction => {
                let (callback, userdata) = self.wsr_callback.ok_or(ConfigError::MissingWsrCallback)?;
                // SAFETY: forwarding the caller-asserted contract from
                // `set_wsr_callback` unchanged.
                Arc::new(unsafe { CallbackWsr::new(callback, userdata) })
            }
        };

        let signature = self
            .values
            .get(&OptionId::SeedSignature)
            .and_then(OptionValue::as_bytes)
            .ok_or(ConfigError::FailedToAssignSeedSignature)?
            .to_vec();
        let content = self
            .values
            .get(&OptionId::SeedContent)
            .and_then(OptionValue::as_bytes)
            .ok_or(ConfigError::FailedToAssignSeedContent)?
            .to_vec();
        let seed = Seed::from_parts(content, signature)?;
        if seed.is_evaluation_mode() {
            tracing::warn!("context built with the insecure evaluation-mode seed");
            crate::logging::log_message(
                crate::option::LogLevel::Warning,
                0,
                "context built with the insecure evaluation-mode seed",
            );
        }

        let health_tests_enabled = self.get_int(OptionId::HealthTestsOutput, 1) != 0;

        let extractor = Arc::new(Extractor::new(seed, wsr, ExtractorParams::default(), health_tests_enabled));
        let cache = Cache::new(policy, size, prefill, refill_at, extractor);

        Ok(Context {
            cache,
            state: AtomicBool::new(true),
            destroyed: AtomicBool::new(false),
        })
    }
}

/// A fully validated, immutable entropy-amplification context.
///
/// Lifecycle: `Ready` (the only state a `Context` can observably be in —
/// `Building` is represented by `Builder`, which cannot yet answer
/// `get_randomness`) until [`Context::destroy`] moves it to `Destroyed`.
pub struct Context {
    cache: Cache,
    state: AtomicBool, // true while Ready
    destroyed: AtomicBool,
}

impl Context {
    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) && !self.destroyed.load(Ordering::Acquire)
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    /// Returns exactly `n` bytes of amplified randomness, or fails with no
    /// output consumed. Catches panics from within the cache/extractor
    /// pipeline and reports them as `OnboardError::StdException`, per the
    /// façade's "catch panics at the boundary" design note.
    pub fn get_randomness(&self, n: usize) -> Result<Vec<u8>, OnboardError> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(OnboardError::Destroyed);
        }
        if !self.state.load(Ordering::Acquire) {
            return Err(OnboardError::NotReady);
        }

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| self.cache.get_randomness(n)));
        match result {
            Ok(inner) => inner,
            Err(payload) => {
                let message = panic_message(&payload);
                Err(OnboardError::StdException { message })
            }
        }
    }

    /// Shuts down any refill workers, zeroizes cached bytes, and moves the
    /// context to `Destroyed`. Safe to call more than once.
    pub fn destroy(&mut self) {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return; // already destroyed
        }
        self.state.store(false, Ordering::Release);
        self.cache.shutdown();
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn panic_message(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::option::{CacheType, WsrType};
    use crate::seed::{SEED_CONTENT_LEN, SEED_SIGNATURE_LEN};

    fn eval_content() -> Vec<u8> {
        let mut v = b"evaluation".to_vec();
        v.resize(SEED_CONTENT_LEN, 0);
        v
    }

    fn basic_builder(cache_type: CacheType) -> Builder {
        let mut b = Builder::new();
        b.set_int(OptionId::CacheType, cache_type as i64).unwrap();
        b.set_int(OptionId::CacheSize, 256).unwrap();
        b.set_int(OptionId::CachePrefill, 128).unwrap();
        b.set_int(OptionId::CacheRefillAt, 32).unwrap();
        b.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
        b.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
        b.set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
            .unwrap();
        b
    }

    #[test]
    fn build_rejects_watermark_inversion() {
        let mut b = Builder::new();
        b.set_int(OptionId::CacheType, CacheType::Caching as i64).unwrap();
        b.set_int(OptionId::CacheSize, 100).unwrap();
        b.set_int(OptionId::CachePrefill, 10).unwrap();
        b.set_int(OptionId::CacheRefillAt, 20).unwrap();
        b.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
        b.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
        b.set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
            .unwrap();
        assert!(matches!(b.build(), Err(ConfigError::WatermarkInversion { .. })));
    }

    #[test]
    fn build_consumes_builder_freezing_further_setopt_calls() {
        let mut b = basic_builder(CacheType::None);
        let ctx = b.build().unwrap();
        assert!(ctx.is_ready());
        // Further set_int calls are silent no-ops, not errors.
        assert!(b.set_int(OptionId::CacheSize, 99999).is_ok());
        assert!(matches!(b.build(), Err(ConfigError::BuilderAlreadyConsumed)));
    }

    #[test]
    fn none_cache_type_produces_ready_context_immediately() {
        let mut b = basic_builder(CacheType::None);
        let ctx = b.build().unwrap();
        let out = ctx.get_randomness(16).unwrap();
        assert_eq!(out.len(), 16);
    }

    #[test]
    fn zero_cache_size_coerces_any_requested_cache_type_to_none() {
        let mut b = Builder::new();
        b.set_int(OptionId::CacheType, CacheType::Caching as i64).unwrap();
        b.set_int(OptionId::CacheSize, 0).unwrap();
        b.set_int(OptionId::CachePrefill, 0).unwrap();
        b.set_int(OptionId::CacheRefillAt, 0).unwrap();
        b.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
        b.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
        b.set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
            .unwrap();
        // Without the size==0 coercion this would fail with WatermarkInversion
        // (refill_at=0 is not strictly less than prefill=0).
        let mut ctx = b.build().expect("size=0 must coerce to CacheType::None, not fail validation");
        let out = ctx.get_randomness(8).unwrap();
        assert_eq!(out.len(), 8);
        ctx.destroy();
    }

    #[test]
    fn destroy_is_idempotent_and_rejects_further_requests() {
        let mut b = basic_builder(CacheType::None);
        let mut ctx = b.build().unwrap();
        ctx.destroy();
        ctx.destroy();
        assert!(ctx.is_destroyed());
        assert!(matches!(ctx.get_randomness(8), Err(OnboardError::Destroyed)));
    }

    #[test]
    fn missing_seed_content_is_a_config_error() {
        let mut b = Builder::new();
        b.set_int(OptionId::CacheType, CacheType::None as i64).unwrap();
        b.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
        b.set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
            .unwrap();
        assert!(matches!(b.build(), Err(ConfigError::FailedToAssignSeedContent)));
    }

    #[test]
    fn thread_count_zero_resolves_to_available_parallelism() {
        let mut b = Builder::new();
        b.set_int(OptionId::CacheType, CacheType::MultiThread as i64).unwrap();
        b.set_int(OptionId::CacheSize, 256).unwrap();
        b.set_int(OptionId::CachePrefill, 128).unwrap();
        b.set_int(OptionId::CacheRefillAt, 32).unwrap();
        b.set_int(OptionId::CacheThreadCount, 0).unwrap();
        b.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
        b.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
        b.set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
            .unwrap();
        let mut ctx = b.build().unwrap();
        assert!(ctx.is_ready());
        ctx.destroy();
    }

    #[test]
    fn last_error_slot_is_thread_local() {
        set_last_error(42, "boom".to_string());
        assert_eq!(last_error_code(), 42);
        assert_eq!(last_error_description(), "boom");
        let handle = std::thread::spawn(|| last_error_code());
        assert_eq!(handle.join().unwrap(), 0, "other threads must not see this thread's last error");
    }
}
