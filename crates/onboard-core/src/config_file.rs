//! JSON-document config-file loader.
//!
//! Stands in for the original file format (whose exact on-disk layout is
//! out of scope): a document is a JSON object whose keys are option names
//! and whose values map onto the same `OptionId` table `Builder::set_*`
//! uses. `node_path` selects a sub-object to read options from (empty or
//! `"/"` means the document root), so one file can carry more than one
//! named configuration.
//!
//! Loaded values go through the exact same validation path as
//! programmatic `set_*` calls — there is no separate, looser validation
//! for config-file-sourced options.

use serde_json::Value;

use crate::context::Builder;
use crate::error::ConfigError;
use crate::option::OptionId;

const OPTION_NAMES: &[(&str, OptionId)] = &[
    ("logging_filename", OptionId::LoggingFilename),
    ("logging_level", OptionId::LoggingLevel),
    ("logging_mode", OptionId::LoggingMode),
    ("cache_type", OptionId::CacheType),
    ("cache_size", OptionId::CacheSize),
    ("cache_prefill", OptionId::CachePrefill),
    ("cache_refill_at", OptionId::CacheRefillAt),
    ("wsr_type", OptionId::WsrType),
    ("wsr_path", OptionId::WsrPath),
    ("health_tests_output", OptionId::HealthTestsOutput),
    ("seed_signature", OptionId::SeedSignature),
    ("seed_content", OptionId::SeedContent),
    ("cache_thread_count", OptionId::CacheThreadCount),
    ("license_data", OptionId::LicenseData),
];

/// Parses `text` as JSON and applies the options found at `node_path`
/// (e.g. `"/profiles/default"`, or `""`/`"/"` for the document root) onto
/// `builder`.
pub fn load_into_builder(builder: &mut Builder, text: &str, node_path: &str) -> Result<(), ConfigError> {
    let root: Value = serde_json::from_str(text).map_err(|e| ConfigError::ConfigFileParseError(e.to_string()))?;
    let node = resolve_node_path(&root, node_path)?;

    let Value::Object(map) = node else {
        return Err(ConfigError::ConfigFileNodeNotFound(node_path.to_string()));
    };

    for (name, option_id) in OPTION_NAMES {
        let Some(value) = map.get(*name) else {
            continue;
        };
        apply_value(builder, *option_id, value)?;
    }
    Ok(())
}

fn resolve_node_path<'a>(root: &'a Value, node_path: &str) -> Result<&'a Value, ConfigError> {
    let trimmed = node_path.trim_matches('/');
    if trimmed.is_empty() {
        return Ok(root);
    }
    let mut current = root;
    for segment in trimmed.split('/') {
        current = current
            .get(segment)
            .ok_or_else(|| ConfigError::ConfigFileNodeNotFound(node_path.to_string()))?;
    }
    Ok(current)
}

fn apply_value(builder: &mut Builder, option_id: OptionId, value: &Value) -> Result<(), ConfigError> {
    match value {
        Value::Number(n) => {
            let as_int = n
                .as_i64()
                .ok_or(ConfigError::OptionValueTypeMismatch { option: option_id })?;
            builder.set_int(option_id, as_int)
        }
        Value::String(s) => match option_id {
            OptionId::SeedSignature | OptionId::SeedContent => {
                builder.set_bytes(option_id, s.as_bytes().to_vec())
            }
            _ => builder.set_str(option_id, s.clone()),
        },
        Value::Array(items) => {
            let bytes: Option<Vec<u8>> = items
                .iter()
                .map(|v| v.as_u64().and_then(|n| u8::try_from(n).ok()))
                .collect();
            let bytes = bytes.ok_or(ConfigError::OptionValueTypeMismatch { option: option_id })?;
            builder.set_bytes(option_id, bytes)
        }
        _ => Err(ConfigError::OptionValueTypeMismatch { option: option_id }),
    }
}
