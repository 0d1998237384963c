//! Weak source of randomness (WSR) providers.
//!
//! A provider delivers raw, unconditioned bytes of unspecified quality —
//! it is the extractor's job, not the provider's, to make statistical
//! guarantees about the output. The core drives providers through
//! [`WsrProvider::fill`] only; internal retry/partial-read policy lives
//! with each provider, as described for each one below.

mod callback;
mod file;
mod rdseed;

pub use callback::{CallbackWsr, WsrCallbackFn};
pub use file::FileWsr;
pub use rdseed::RdSeedWsr;

use crate::error::WsrError;

/// Common operation every WSR provider implements: fill `buf` completely
/// with raw bytes, or fail with zero bytes written on error.
pub trait WsrProvider: Send + Sync {
    fn fill(&self, buf: &mut [u8]) -> Result<(), WsrError>;
}
