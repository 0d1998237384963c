//! onboard-core: entropy amplification engine.
//!
//! Combines a fixed quantum seed with a weak source of randomness (WSR)
//! through an extraction driver, fronted by a watermark-refilled cache and
//! a config/façade layer modeled as a `Building -> Ready -> Destroyed`
//! lifecycle.
//!
//! The cryptographic extraction primitive itself, the WSR hardware/OS
//! internals, and the on-disk config file format are out of scope — see
//! [`extractor`] and [`config_file`] for the placeholder boundaries.

pub mod cache;
pub mod config_file;
pub mod context;
pub mod error;
pub mod extractor;
pub mod health;
pub mod logging;
pub mod option;
pub mod seed;
pub mod wsr;

pub use context::{Builder, Context};
pub use error::{ConfigError, OnboardError, WsrError};
pub use option::{CacheType, LogLevel, LogMode, OptionId, OptionValue, WsrType};
pub use seed::Seed;
