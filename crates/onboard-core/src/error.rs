//! Error taxonomy and stable numeric error codes.
//!
//! Every variant carries a fixed numeric code so that the FFI layer can
//! surface `onboard_get_error_code()` without re-deriving it from the enum
//! discriminant (which is not ABI-stable across crate versions).

use serde::{Deserialize, Serialize};

/// Floor of the general error-code space.
pub const ERC_FLOOR: i32 = 13800;
/// Floor of the WSR-callback error-code space.
pub const ERC_WSR_CB_FLOOR: i32 = 41000;
/// No error.
pub const ERC_OK: i32 = 0;

/// Errors raised while building a [`crate::context::Context`] from an
/// option set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("cache low watermark {refill_at} must be strictly less than prefill watermark {prefill}")]
    WatermarkInversion { refill_at: usize, prefill: usize },

    #[error("prefill watermark {prefill} must not exceed cache size {size}")]
    PrefillExceedsSize { prefill: usize, size: usize },

    #[error("cache type {cache_type:?} requires THREAD_COUNT > 0 entries or CACHE_TYPE=NONE")]
    InvalidThreadCountForCacheType { cache_type: crate::option::CacheType },

    #[error("WSR_TYPE=File requires WSR_PATH to be set")]
    MissingWsrPath,

    #[error("WSR_TYPE=Callback requires a callback to be registered via set_wsr_callback")]
    MissingWsrCallback,

    #[error("seed signature size {actual} does not match the expected size {expected}")]
    SeedSignatureSizeMismatch { expected: usize, actual: usize },

    #[error("seed content size {actual} does not match the expected size {expected}")]
    SeedContentSizeMismatch { expected: usize, actual: usize },

    #[error("failed to assign seed signature")]
    FailedToAssignSeedSignature,

    #[error("failed to assign seed content")]
    FailedToAssignSeedContent,

    #[error("seed signature verification failed")]
    SeedSignatureVerificationFailed,

    #[error("missing required option {option:?}")]
    MissingRequiredOption { option: crate::option::OptionId },

    #[error("unknown option id {0}")]
    UnknownOptionId(u32),

    #[error("option {option:?} does not accept this value type")]
    OptionValueTypeMismatch { option: crate::option::OptionId },

    #[error("builder has already been consumed by build()")]
    BuilderAlreadyConsumed,

    #[error("config file node path {0:?} did not resolve to a value")]
    ConfigFileNodeNotFound(String),

    #[error("config file is not valid JSON: {0}")]
    ConfigFileParseError(String),
}

impl ConfigError {
    /// Stable numeric code for this error, in the `ERC_FLOOR`-based space.
    pub fn code(&self) -> i32 {
        ERC_FLOOR
            + match self {
                ConfigError::WatermarkInversion { .. } => 1,
                ConfigError::PrefillExceedsSize { .. } => 2,
                ConfigError::InvalidThreadCountForCacheType { .. } => 3,
                ConfigError::MissingWsrPath => 4,
                ConfigError::MissingWsrCallback => 5,
                ConfigError::SeedSignatureSizeMismatch { .. } => 6,
                ConfigError::SeedContentSizeMismatch { .. } => 7,
                ConfigError::FailedToAssignSeedSignature => 8,
                ConfigError::FailedToAssignSeedContent => 9,
                ConfigError::SeedSignatureVerificationFailed => 10,
                ConfigError::MissingRequiredOption { .. } => 11,
                ConfigError::UnknownOptionId(_) => 12,
                ConfigError::OptionValueTypeMismatch { .. } => 13,
                ConfigError::BuilderAlreadyConsumed => 14,
                ConfigError::ConfigFileNodeNotFound(_) => 15,
                ConfigError::ConfigFileParseError(_) => 16,
            }
    }
}

/// Errors raised while driving a WSR provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type")]
pub enum WsrError {
    #[error("RDSEED instruction failed after {attempts} attempts")]
    RdSeedExhausted { attempts: u32 },

    #[error("RDSEED is not available on this target")]
    RdSeedUnavailable,

    #[error("failed to open WSR source file: {path}")]
    FileOpenFailed { path: String },

    #[error("WSR source file read failed: {message}")]
    FileReadFailed { message: String },

    #[error("WSR source file reached EOF before delivering the requested bytes")]
    FileExhausted,

    #[error("WSR callback returned failure code {code}")]
    CallbackFailed { code: i32 },

    #[error("WSR callback delivered {delivered} bytes, expected {expected}")]
    CallbackShortRead { delivered: usize, expected: usize },

    #[error("WSR callback panicked")]
    CallbackPanicked,
}

impl WsrError {
    /// Stable numeric code for this error, in the `ERC_WSR_CB_FLOOR`-based space.
    pub fn code(&self) -> i32 {
        ERC_WSR_CB_FLOOR
            + match self {
                WsrError::RdSeedExhausted { .. } => 1,
                WsrError::RdSeedUnavailable => 2,
                WsrError::FileOpenFailed { .. } => 3,
                WsrError::FileReadFailed { .. } => 4,
                WsrError::FileExhausted => 5,
                // A generic "unspecified" status, matching
                // QO_WSR_CB_RESULT_UNSPECIFIED_ERROR=41099: the callback's
                // own code is preserved in the Display text, not reused as
                // the stable status code.
                WsrError::CallbackFailed { .. } => 99,
                WsrError::CallbackShortRead { .. } => 46,
                WsrError::CallbackPanicked => 47,
            }
    }
}

/// Top-level error type returned by [`crate::context::Context`] operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "type")]
pub enum OnboardError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("weak source of randomness error: {0}")]
    Wsr(#[from] WsrError),

    #[error("continuous health test failed; context is degraded")]
    HealthTestFailed,

    #[error("context is in the degraded state and can no longer produce randomness")]
    Degraded,

    #[error("context has not finished building")]
    NotReady,

    #[error("context has already been destroyed")]
    Destroyed,

    #[error("cache underrun: fewer bytes were available than requested")]
    CacheUnderrun { requested: usize, available: usize },

    #[error("requested 0 bytes")]
    ZeroLengthRequest,

    #[error("an unexpected internal error occurred: {message}")]
    Internal { message: String },

    #[error("an unhandled panic was caught at the API boundary")]
    StdException { message: String },

    #[error("an unknown, non-Rust-panic exception was caught at the API boundary")]
    UnknownException,
}

impl OnboardError {
    /// Stable numeric code for this error, forwarding to the nested
    /// taxonomy's own code where one exists.
    pub fn code(&self) -> i32 {
        match self {
            OnboardError::Config(e) => e.code(),
            OnboardError::Wsr(e) => e.code(),
            OnboardError::HealthTestFailed => ERC_FLOOR + 50,
            OnboardError::Degraded => ERC_FLOOR + 51,
            OnboardError::NotReady => ERC_FLOOR + 52,
            OnboardError::Destroyed => ERC_FLOOR + 53,
            OnboardError::CacheUnderrun { .. } => ERC_FLOOR + 54,
            OnboardError::ZeroLengthRequest => ERC_FLOOR + 55,
            OnboardError::Internal { .. } => ERC_FLOOR + 56,
            OnboardError::StdException { .. } => ERC_FLOOR + 57,
            OnboardError::UnknownException => ERC_FLOOR + 58,
        }
    }
}
