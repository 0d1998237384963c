//! Option identifiers, option values, and the enums addressed by them.
//!
//! Discriminants are fixed and must not be renumbered: they mirror the
//! stable option/enum space a C caller addresses by integer, not just by
//! name.

use serde::{Deserialize, Serialize};

/// Identifies a single configurable option in the option set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum OptionId {
    LoggingFilename = 0,
    LoggingLevel = 1,
    LoggingMode = 2,
    CacheType = 3,
    CacheSize = 4,
    CachePrefill = 5,
    CacheRefillAt = 6,
    WsrType = 7,
    WsrPath = 8,
    HealthTestsOutput = 9,
    SeedSignature = 10,
    SeedContent = 11,
    CacheThreadCount = 12,
    LicenseData = 13,
}

impl OptionId {
    /// Maps a raw integer (as received at the C ABI) to an `OptionId`.
    pub fn from_u32(v: u32) -> Option<Self> {
        use OptionId::*;
        Some(match v {
            0 => LoggingFilename,
            1 => LoggingLevel,
            2 => LoggingMode,
            3 => CacheType,
            4 => CacheSize,
            5 => CachePrefill,
            6 => CacheRefillAt,
            7 => WsrType,
            8 => WsrPath,
            9 => HealthTestsOutput,
            10 => SeedSignature,
            11 => SeedContent,
            12 => CacheThreadCount,
            13 => LicenseData,
            _ => return None,
        })
    }
}

/// Value carried for a given [`OptionId`]; the variant used depends on the
/// option (integers for enums/sizes, strings for paths, bytes for seed
/// material).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OptionValue {
    Int(i64),
    Str(String),
    Bytes(Vec<u8>),
}

impl OptionValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            OptionValue::Bytes(v) => Some(v),
            _ => None,
        }
    }
}

/// Selects the WSR provider backing a context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum WsrType {
    RdSeed = 0,
    File = 1,
    CallbackFunction = 2,
}

impl WsrType {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(WsrType::RdSeed),
            1 => Some(WsrType::File),
            2 => Some(WsrType::CallbackFunction),
            _ => None,
        }
    }
}

/// Selects the cache/refill policy fronting the extractor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum CacheType {
    None = 0,
    Caching = 1,
    SyncCaching = 2,
    MultiThread = 3,
}

impl CacheType {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(CacheType::None),
            1 => Some(CacheType::Caching),
            2 => Some(CacheType::SyncCaching),
            3 => Some(CacheType::MultiThread),
            _ => None,
        }
    }
}

/// Logging verbosity threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum LogLevel {
    None = 0,
    Critical = 1,
    Error = 2,
    Warning = 3,
    Info = 4,
    Debug = 5,
    Trace = 6,
}

impl LogLevel {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(LogLevel::None),
            1 => Some(LogLevel::Critical),
            2 => Some(LogLevel::Error),
            3 => Some(LogLevel::Warning),
            4 => Some(LogLevel::Info),
            5 => Some(LogLevel::Debug),
            6 => Some(LogLevel::Trace),
            _ => None,
        }
    }
}

/// Selects the logging sink. Sink formatting itself (syslog framing,
/// daily-file rotation, Windows event log) is out of scope; only the
/// selector value and its validation live here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u32)]
pub enum LogMode {
    Stdout = 0,
    Stderr = 1,
    Syslog = 2,
    DailyFile = 3,
    File = 4,
    Inherit = 5,
}

impl LogMode {
    pub fn from_i64(v: i64) -> Option<Self> {
        match v {
            0 => Some(LogMode::Stdout),
            1 => Some(LogMode::Stderr),
            2 => Some(LogMode::Syslog),
            3 => Some(LogMode::DailyFile),
            4 => Some(LogMode::File),
            5 => Some(LogMode::Inherit),
            _ => None,
        }
    }
}
