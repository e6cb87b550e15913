//! Tests for TOML loading, validation and overrides.

use std::collections::HashMap;
use std::io::Write;
use std::time::Duration;

use runesmith::{Config, GenerationMethod, RunesmithError};
use tempfile::NamedTempFile;

fn write_config(body: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

// ============================================================================
// Loading
// ============================================================================

#[test]
fn loads_full_document() {
    let file = write_config(
        r#"
        [dispatch]
        request_timeout_secs = 12
        enable_fallback = false

        [cache]
        max_entries = 25
        ttl_secs = 600

        [jobs]
        retention_secs = 120

        [routing]
        default_method = "mermaid"
        safe_default = "svg_template"
        fallback_order = ["python_chart"]
        decision_cache_ttl_secs = 30

        [logging]
        level = "debug"
        json = true
        "#,
    );

    let config = Config::load(Some(file.path())).unwrap();
    assert_eq!(config.dispatch.request_timeout(), Duration::from_secs(12));
    assert!(!config.dispatch.enable_fallback);
    assert!(config.dispatch.enable_cache);
    assert_eq!(config.cache.max_entries, 25);
    assert_eq!(config.cache.ttl_secs, 600);
    assert_eq!(config.cache.sweep_interval_secs, 300);
    assert_eq!(config.jobs.retention(), Duration::from_secs(120));
    assert_eq!(config.routing.default_method, GenerationMethod::Mermaid);
    assert_eq!(config.routing.safe_default, GenerationMethod::SvgTemplate);
    assert_eq!(
        config.routing.fallback_order,
        vec![GenerationMethod::PythonChart]
    );
    assert_eq!(config.routing.decision_cache_ttl, Duration::from_secs(30));
    assert_eq!(config.logging.level, "debug");
    assert!(config.logging.json);
}

#[test]
fn missing_explicit_path_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let err = Config::load(Some(&missing)).unwrap_err();
    assert!(matches!(err, RunesmithError::Configuration(msg) if msg.contains("not found")));
}

#[test]
fn malformed_toml_is_an_error() {
    let file = write_config("[dispatch\nrequest_timeout_secs = ");
    let err = Config::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, RunesmithError::Configuration(msg) if msg.contains("parse")));
}

#[test]
fn unknown_method_is_an_error() {
    let file = write_config("[routing]\ndefault_method = \"crayon\"\n");
    assert!(Config::load_from_file(file.path()).is_err());
}

#[test]
fn invalid_values_fail_validation() {
    let file = write_config("[cache]\nmax_entries = 0\n");
    let err = Config::load_from_file(file.path()).unwrap_err();
    assert!(matches!(err, RunesmithError::Configuration(msg) if msg.contains("max_entries")));
}

// ============================================================================
// Overrides
// ============================================================================

#[test]
fn overrides_replace_file_values() {
    let mut config = Config::default();
    config
        .apply_overrides(lookup(&[
            ("REQUEST_TIMEOUT", "5"),
            ("CACHE_TTL", "90"),
            ("ENABLE_CACHE", "false"),
            ("ENABLE_FALLBACK", "no"),
            ("JOB_CLEANUP_HOURS", "2"),
            ("LOG_LEVEL", " WARN "),
        ]))
        .unwrap();

    assert_eq!(config.dispatch.request_timeout_secs, 5);
    assert_eq!(config.cache.ttl_secs, 90);
    assert!(!config.dispatch.enable_cache);
    assert!(!config.dispatch.enable_fallback);
    assert_eq!(config.jobs.retention_secs, 7200);
    assert_eq!(config.logging.level, "warn");
}

#[test]
fn absent_overrides_leave_config_untouched() {
    let mut config = Config::default();
    config.apply_overrides(lookup(&[])).unwrap();
    assert_eq!(config, Config::default());
}

#[test]
fn malformed_override_is_rejected() {
    let mut config = Config::default();
    let err = config
        .apply_overrides(lookup(&[("REQUEST_TIMEOUT", "soon")]))
        .unwrap_err();
    assert!(matches!(err, RunesmithError::Configuration(msg) if msg.contains("REQUEST_TIMEOUT")));
}

#[test]
fn zero_timeout_override_fails_validation() {
    let mut config = Config::default();
    assert!(
        config
            .apply_overrides(lookup(&[("REQUEST_TIMEOUT", "0")]))
            .is_err()
    );
}
