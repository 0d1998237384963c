//! Builder -> Context state machine integration tests.

use onboard_core::option::{CacheType, OptionId, WsrType};
use onboard_core::{Builder, ConfigError, OnboardError};

const SEED_CONTENT_LEN: usize = 8164;
const SEED_SIGNATURE_LEN: usize = 132;

fn eval_content() -> Vec<u8> {
    let mut v = b"evaluation".to_vec();
    v.resize(SEED_CONTENT_LEN, 0);
    v
}

#[test]
fn config_round_trips_through_builder_into_a_working_context() {
    let mut builder = Builder::new();
    builder.set_int(OptionId::CacheType, CacheType::Caching as i64).unwrap();
    builder.set_int(OptionId::CacheSize, 2048).unwrap();
    builder.set_int(OptionId::CachePrefill, 1024).unwrap();
    builder.set_int(OptionId::CacheRefillAt, 256).unwrap();
    builder.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
    builder.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
    builder
        .set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
        .unwrap();

    let mut ctx = builder.build().expect("valid option set must build");
    assert!(ctx.is_ready());
    // No warm-up sleep: get_randomness blocks until the cache's refill
    // worker has caught up, rather than racing it.
    let bytes = ctx.get_randomness(128).expect("ready context should serve randomness");
    assert_eq!(bytes.len(), 128);
    ctx.destroy();
    assert!(ctx.is_destroyed());
}

#[test]
fn destroyed_context_rejects_get_randomness() {
    let mut builder = Builder::new();
    builder.set_int(OptionId::CacheType, CacheType::None as i64).unwrap();
    builder.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
    builder.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
    builder
        .set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
        .unwrap();
    let mut ctx = builder.build().unwrap();
    ctx.destroy();
    assert!(matches!(ctx.get_randomness(16), Err(OnboardError::Destroyed)));
}

#[test]
fn missing_wsr_path_for_file_provider_is_a_config_error() {
    let mut builder = Builder::new();
    builder.set_int(OptionId::CacheType, CacheType::None as i64).unwrap();
    builder.set_int(OptionId::WsrType, WsrType::File as i64).unwrap();
    builder.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
    builder
        .set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
        .unwrap();
    let err = builder.build().unwrap_err();
    assert_eq!(err, ConfigError::MissingWsrPath);
}

#[test]
fn builder_freeze_after_build_is_silent() {
    let mut builder = Builder::new();
    builder.set_int(OptionId::CacheType, CacheType::None as i64).unwrap();
    builder.set_int(OptionId::WsrType, WsrType::RdSeed as i64).unwrap();
    builder.set_bytes(OptionId::SeedContent, eval_content()).unwrap();
    builder
        .set_bytes(OptionId::SeedSignature, vec![0u8; SEED_SIGNATURE_LEN])
        .unwrap();
    let _ctx = builder.build().unwrap();

    // Per the documented ABI-compat behavior, setopt calls after build()
    // are silent no-ops, not errors.
    assert!(builder.set_int(OptionId::CacheSize, 999).is_ok());
    assert!(matches!(builder.build(), Err(ConfigError::BuilderAlreadyConsumed)));
}
