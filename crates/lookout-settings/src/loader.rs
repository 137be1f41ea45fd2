//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`LookoutSettings::default()`]
//! 2. If the settings file exists, deep-merge its values over defaults
//! 3. Apply `LOOKOUT_*` environment variable overrides (highest priority)
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{BoundingBox, LookoutSettings};

/// Resolve the default settings file path (`~/.lookout/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".lookout").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<LookoutSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a file with invalid JSON is an error.
/// The result is validated before being returned.
pub fn load_settings_from_path(path: &Path) -> Result<LookoutSettings> {
    let mut settings = load_file_layer(path)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

fn load_file_layer(path: &Path) -> Result<LookoutSettings> {
    let defaults = serde_json::to_value(LookoutSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    Ok(serde_json::from_value(merged)?)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (fall back to file/default).
pub fn apply_env_overrides(settings: &mut LookoutSettings) {
    apply_overrides_from(settings, |name| std::env::var(name).ok());
}

/// Apply overrides from an arbitrary variable source.
///
/// Split out from [`apply_env_overrides`] so parsing can be tested without
/// touching the process environment.
pub fn apply_overrides_from<F>(settings: &mut LookoutSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let env = EnvReader { lookup: &lookup };

    // ── Server ──────────────────────────────────────────────────────
    if let Some(v) = env.string("LOOKOUT_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = env.parsed("LOOKOUT_PORT", |v| parse_u16_range(v, 0, 65535)) {
        settings.server.port = v;
    }
    if let Some(v) = env.parsed("LOOKOUT_PING_INTERVAL_MS", |v| {
        parse_u64_range(v, 1, 3_600_000)
    }) {
        settings.server.ping_interval_ms = v;
    }

    // ── Auth ────────────────────────────────────────────────────────
    if let Some(v) = env.string("LOOKOUT_JWT_SECRET") {
        settings.auth.jwt_secret = v;
    }

    // ── AIS feed ────────────────────────────────────────────────────
    if let Some(v) = env.parsed("LOOKOUT_AIS_ENABLED", parse_bool) {
        settings.ais.enabled = v;
    }
    if let Some(v) = env.string("LOOKOUT_AIS_API_KEY") {
        settings.ais.api_key = v;
    }
    if let Some(v) = env.string("LOOKOUT_AIS_ENDPOINT") {
        settings.ais.endpoint = v;
    }
    if let Some(v) = env.parsed("LOOKOUT_AIS_BASE_DELAY_MS", |v| {
        parse_u64_range(v, 1, 3_600_000)
    }) {
        settings.ais.base_delay_ms = v;
    }
    if let Some(v) = env.parsed("LOOKOUT_AIS_MAX_RETRIES", |v| parse_u32_range(v, 1, 1_000)) {
        settings.ais.max_retries = v;
    }
    if let Some(v) = env.parsed("LOOKOUT_AIS_BOUNDING_BOXES", |v| {
        serde_json::from_str::<Vec<BoundingBox>>(v).ok()
    }) {
        settings.ais.bounding_boxes = v;
    }
}

/// Thin wrapper over a variable lookup that logs rejected values.
struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn string(&self, name: &str) -> Option<String> {
        (self.lookup)(name).filter(|v| !v.is_empty())
    }

    fn parsed<T>(&self, name: &str, parse: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        let val = (self.lookup)(name)?;
        let result = parse(&val);
        if result.is_none() {
            tracing::warn!(key = name, value = %val, "invalid env var, ignoring");
        }
        result
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u32` within a range.
pub fn parse_u32_range(val: &str, min: u32, max: u32) -> Option<u32> {
    let n: u32 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"server": {"port": 8080, "host": "localhost"}});
        let source = serde_json::json!({"server": {"port": 9090}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["server"]["port"], 9090);
        assert_eq!(merged["server"]["host"], "localhost");
    }

    #[test]
    fn merge_array_replace() {
        let target = serde_json::json!({"items": [1, 2, 3]});
        let source = serde_json::json!({"items": [4, 5]});
        let merged = deep_merge(target, source);
        assert_eq!(merged["items"], serde_json::json!([4, 5]));
    }

    #[test]
    fn merge_null_preserves_target() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": null});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 1);
        assert_eq!(merged["b"], 2);
    }

    // ── load_settings_from_path ─────────────────────────────────────

    #[test]
    fn load_missing_file_returns_defaults() {
        let settings = load_file_layer(Path::new("/nonexistent/settings.json")).unwrap();
        assert_eq!(settings.server.port, 8080);
        assert!(!settings.ais.enabled);
    }

    #[test]
    fn load_partial_json_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(
            &path,
            r#"{"server": {"port": 9090}, "ais": {"baseDelayMs": 100, "boundingBoxes": [[[1, 2], [3, 4]]]}}"#,
        )
        .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.server.port, 9090);
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.ais.base_delay_ms, 100);
        assert_eq!(settings.ais.max_retries, 5);
        assert_eq!(
            settings.ais.bounding_boxes,
            vec![BoundingBox::new((1.0, 2.0), (3.0, 4.0))]
        );
    }

    #[test]
    fn load_keeps_secrets_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"auth": {"jwtSecret": "abc"}, "ais": {"apiKey": "k"}}"#)
            .unwrap();

        let settings = load_file_layer(&path).unwrap();
        assert_eq!(settings.auth.jwt_secret, "abc");
        assert_eq!(settings.ais.api_key, "k");
    }

    #[test]
    fn load_invalid_json_returns_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "not valid json").unwrap();

        let result = load_settings_from_path(&path);
        assert!(matches!(result, Err(SettingsError::Json(_))));
    }

    #[test]
    fn load_enabled_feed_without_key_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"ais": {"enabled": true}}"#).unwrap();

        let mut settings = load_file_layer(&path).unwrap();
        apply_overrides_from(&mut settings, lookup(&[]));
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    #[test]
    fn load_zero_ping_interval_fails_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"server": {"pingIntervalMs": 0}}"#).unwrap();

        assert!(matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        ));
    }

    // ── overrides ───────────────────────────────────────────────────

    #[test]
    fn env_overrides_apply() {
        let mut settings = LookoutSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("LOOKOUT_HOST", "127.0.0.1"),
                ("LOOKOUT_PORT", "9000"),
                ("LOOKOUT_PING_INTERVAL_MS", "1500"),
                ("LOOKOUT_JWT_SECRET", "secret"),
                ("LOOKOUT_AIS_ENABLED", "yes"),
                ("LOOKOUT_AIS_API_KEY", "api"),
                ("LOOKOUT_AIS_BASE_DELAY_MS", "250"),
                ("LOOKOUT_AIS_MAX_RETRIES", "7"),
                ("LOOKOUT_AIS_BOUNDING_BOXES", "[[[10, 20], [30, 40]]]"),
            ]),
        );
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.ping_interval_ms, 1500);
        assert_eq!(settings.auth.jwt_secret, "secret");
        assert!(settings.ais.enabled);
        assert_eq!(settings.ais.api_key, "api");
        assert_eq!(settings.ais.base_delay_ms, 250);
        assert_eq!(settings.ais.max_retries, 7);
        assert_eq!(settings.ais.bounding_boxes.len(), 1);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn invalid_env_values_ignored() {
        let mut settings = LookoutSettings::default();
        apply_overrides_from(
            &mut settings,
            lookup(&[
                ("LOOKOUT_PORT", "not-a-port"),
                ("LOOKOUT_PING_INTERVAL_MS", "0"),
                ("LOOKOUT_AIS_ENABLED", "maybe"),
                ("LOOKOUT_AIS_MAX_RETRIES", "0"),
                ("LOOKOUT_AIS_BOUNDING_BOXES", "[oops"),
                ("LOOKOUT_HOST", ""),
            ]),
        );
        let defaults = LookoutSettings::default();
        assert_eq!(settings.server.port, defaults.server.port);
        assert_eq!(settings.server.ping_interval_ms, defaults.server.ping_interval_ms);
        assert_eq!(settings.server.host, defaults.server.host);
        assert!(!settings.ais.enabled);
        assert_eq!(settings.ais.max_retries, defaults.ais.max_retries);
        assert!(settings.ais.bounding_boxes.is_empty());
    }

    // ── parsing ─────────────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        for v in ["true", "TRUE", "1", "yes", "on"] {
            assert_eq!(parse_bool(v), Some(true), "{v}");
        }
        for v in ["false", "0", "No", "off"] {
            assert_eq!(parse_bool(v), Some(false), "{v}");
        }
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_ranges() {
        assert_eq!(parse_u16_range("8080", 1, 65535), Some(8080));
        assert_eq!(parse_u16_range("0", 1, 65535), None);
        assert_eq!(parse_u32_range("5", 1, 10), Some(5));
        assert_eq!(parse_u32_range("11", 1, 10), None);
        assert_eq!(parse_u64_range("abc", 1, 10), None);
    }
}
