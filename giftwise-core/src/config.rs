//! Hook pipeline configuration
//!
//! The pipeline settings live under the `hooks` key of the host configuration.
//! They are rebuilt from raw JSON on every command invocation: each field is
//! checked on its own, and a bad field falls back to its default without
//! discarding the rest of the object.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::time::Duration;

/// Key of the pipeline section inside the host configuration
pub const HOST_CONFIG_KEY: &str = "hooks";

/// Per-call budget used when a phase does not configure one
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

/// Largest accepted per-call budget
pub const MAX_TIMEOUT_MS: u64 = 60_000;

/// Lifecycle point at which hooks run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Before the host command runs; hooks may rewrite the config.
    Before,
    /// After the host command completed; hooks only observe.
    After,
}

impl Phase {
    /// Key of this phase's section in the pipeline config
    pub fn config_key(self) -> &'static str {
        match self {
            Phase::Before => "beforePhase",
            Phase::After => "afterPhase",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Before => f.write_str("before"),
            Phase::After => f.write_str("after"),
        }
    }
}

/// Settings for one lifecycle phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhaseConfig {
    pub enabled: bool,
    /// Script paths, absolute or relative to the config directory
    pub scripts: Vec<String>,
    /// Wall-clock budget for each hook call, in milliseconds (1..=60000)
    pub timeout_ms: u64,
}

impl PhaseConfig {
    pub const DEFAULT: PhaseConfig = PhaseConfig {
        enabled: false,
        scripts: Vec::new(),
        timeout_ms: DEFAULT_TIMEOUT_MS,
    };

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for PhaseConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// The hook pipeline's own settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineConfig {
    /// Master switch
    pub enabled: bool,
    pub before_phase: PhaseConfig,
    pub after_phase: PhaseConfig,
    /// Abort the host command on the first hook error
    pub fail_on_error: bool,
    /// Emit progress and summary lines for every phase run
    pub verbose: bool,
}

impl PipelineConfig {
    pub const DEFAULT: PipelineConfig = PipelineConfig {
        enabled: false,
        before_phase: PhaseConfig::DEFAULT,
        after_phase: PhaseConfig::DEFAULT,
        fail_on_error: false,
        verbose: false,
    };

    /// Builds the pipeline config from the `hooks` section of a host config.
    ///
    /// A host config without a `hooks` key yields the defaults and no errors.
    pub fn from_host_config(host: &Map<String, Value>) -> (Self, Vec<String>) {
        match host.get(HOST_CONFIG_KEY) {
            Some(raw) => validate(raw),
            None => (Self::DEFAULT, Vec::new()),
        }
    }

    pub fn phase(&self, phase: Phase) -> &PhaseConfig {
        match phase {
            Phase::Before => &self.before_phase,
            Phase::After => &self.after_phase,
        }
    }

    fn phase_mut(&mut self, phase: Phase) -> &mut PhaseConfig {
        match phase {
            Phase::Before => &mut self.before_phase,
            Phase::After => &mut self.after_phase,
        }
    }

    /// See [`is_phase_active`]
    pub fn is_phase_active(&self, phase: Phase) -> bool {
        is_phase_active(self, phase)
    }

    /// True when at least one phase would run
    pub fn is_active(&self) -> bool {
        self.is_phase_active(Phase::Before) || self.is_phase_active(Phase::After)
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A phase runs only when the master switch and the phase switch are both on
/// and the phase lists at least one script.
pub fn is_phase_active(config: &PipelineConfig, phase: Phase) -> bool {
    let phase_config = config.phase(phase);
    config.enabled && phase_config.enabled && !phase_config.scripts.is_empty()
}

/// Validates and normalizes a raw pipeline config.
///
/// Never fails. Invalid fields keep their default value and add a message to
/// the returned list; anything that is not a JSON object yields the full
/// default config.
pub fn validate(raw: &Value) -> (PipelineConfig, Vec<String>) {
    let mut config = PipelineConfig::DEFAULT;
    let mut errors = Vec::new();

    let Some(object) = raw.as_object() else {
        errors.push(format!(
            "hooks configuration must be an object, got {}",
            json_type_name(raw)
        ));
        return (config, errors);
    };

    if let Some(enabled) = read_bool(object, "enabled", "enabled", &mut errors) {
        config.enabled = enabled;
    }
    if let Some(fail_on_error) = read_bool(object, "failOnError", "failOnError", &mut errors) {
        config.fail_on_error = fail_on_error;
    }
    if let Some(verbose) = read_bool(object, "verbose", "verbose", &mut errors) {
        config.verbose = verbose;
    }

    for phase in [Phase::Before, Phase::After] {
        let key = phase.config_key();
        match object.get(key) {
            None => {}
            Some(Value::Object(section)) => {
                validate_phase(section, key, config.phase_mut(phase), &mut errors)
            }
            Some(other) => errors.push(format!(
                "{key} must be an object, got {}",
                json_type_name(other)
            )),
        }
    }

    (config, errors)
}

/// [`validate`] without the error list, for callers that always need a full config
pub fn merge_with_defaults(partial: &Value) -> PipelineConfig {
    validate(partial).0
}

fn validate_phase(
    section: &Map<String, Value>,
    key: &str,
    phase: &mut PhaseConfig,
    errors: &mut Vec<String>,
) {
    if let Some(enabled) = read_bool(section, "enabled", &format!("{key}.enabled"), errors) {
        phase.enabled = enabled;
    }

    match section.get("scripts") {
        None => {}
        Some(Value::Array(entries)) => {
            let mut scripts = Vec::with_capacity(entries.len());
            for (index, entry) in entries.iter().enumerate() {
                match entry {
                    Value::String(path) if !path.trim().is_empty() => scripts.push(path.clone()),
                    other => errors.push(format!(
                        "{key}.scripts[{index}] must be a non-empty string, got {}",
                        json_type_name(other)
                    )),
                }
            }
            phase.scripts = scripts;
        }
        Some(other) => errors.push(format!(
            "{key}.scripts must be an array, got {}",
            json_type_name(other)
        )),
    }

    if let Some(raw) = section.get("timeoutMs") {
        match timeout_from_json(raw) {
            Some(timeout_ms) => phase.timeout_ms = timeout_ms,
            None => errors.push(format!(
                "{key}.timeoutMs must be an integer between 1 and {MAX_TIMEOUT_MS}, got {raw}"
            )),
        }
    }
}

fn read_bool(
    object: &Map<String, Value>,
    field: &str,
    label: &str,
    errors: &mut Vec<String>,
) -> Option<bool> {
    let value = object.get(field)?;
    match value.as_bool() {
        Some(flag) => Some(flag),
        None => {
            errors.push(format!(
                "{label} must be a boolean, got {}",
                json_type_name(value)
            ));
            None
        }
    }
}

/// Accepts whole numbers in range, including integral floats such as `100.0`
fn timeout_from_json(raw: &Value) -> Option<u64> {
    let millis = match raw.as_u64() {
        Some(millis) => millis,
        None => {
            let float = raw.as_f64()?;
            if float.fract() != 0.0 || float < 1.0 || float > MAX_TIMEOUT_MS as f64 {
                return None;
            }
            float as u64
        }
    };
    (1..=MAX_TIMEOUT_MS).contains(&millis).then_some(millis)
}

/// Short JSON type name for diagnostics
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn full_config() -> Value {
        json!({
            "enabled": true,
            "beforePhase": { "enabled": true, "scripts": ["a.lua", "/abs/b.mlua"], "timeoutMs": 250 },
            "afterPhase": { "enabled": false, "scripts": [], "timeoutMs": 60000 },
            "failOnError": true,
            "verbose": true
        })
    }

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert!(!config.enabled);
        assert!(!config.fail_on_error);
        assert!(!config.verbose);
        assert_eq!(config.before_phase.timeout_ms, 5000);
        assert!(config.after_phase.scripts.is_empty());
        assert_eq!(config.before_phase.timeout(), Duration::from_secs(5));
    }

    #[test]
    fn test_validate_full_config() {
        let (config, errors) = validate(&full_config());
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        assert!(config.enabled);
        assert!(config.fail_on_error);
        assert!(config.verbose);
        assert_eq!(config.before_phase.scripts, vec!["a.lua", "/abs/b.mlua"]);
        assert_eq!(config.before_phase.timeout_ms, 250);
        assert_eq!(config.after_phase.timeout_ms, 60000);
    }

    #[test]
    fn test_validate_non_object() {
        for raw in [json!(null), json!(true), json!(3), json!("hooks"), json!([1, 2])] {
            let (config, errors) = validate(&raw);
            assert_eq!(config, PipelineConfig::DEFAULT);
            assert_eq!(errors.len(), 1, "input {raw}");
        }
    }

    #[test]
    fn test_wrong_types_are_dropped_individually() {
        let raw = json!({
            "enabled": "yes",
            "failOnError": true,
            "beforePhase": { "enabled": 1, "scripts": "a.lua", "timeoutMs": 100 }
        });
        let (config, errors) = validate(&raw);
        assert_eq!(errors.len(), 3);
        assert!(!config.enabled);
        assert!(config.fail_on_error);
        assert!(!config.before_phase.enabled);
        assert!(config.before_phase.scripts.is_empty());
        assert_eq!(config.before_phase.timeout_ms, 100);
    }

    #[test]
    fn test_timeout_range() {
        for (raw, expected) in [
            (json!(1), Some(1)),
            (json!(60000), Some(60000)),
            (json!(100.0), Some(100)),
            (json!(0), None),
            (json!(-5), None),
            (json!(60001), None),
            (json!(1.5), None),
            (json!("100"), None),
        ] {
            let (config, errors) = validate(&json!({ "afterPhase": { "timeoutMs": raw } }));
            match expected {
                Some(ms) => {
                    assert!(errors.is_empty(), "input {raw}");
                    assert_eq!(config.after_phase.timeout_ms, ms);
                }
                None => {
                    assert_eq!(errors.len(), 1, "input {raw}");
                    assert!(errors[0].contains("afterPhase.timeoutMs"));
                    assert_eq!(config.after_phase.timeout_ms, DEFAULT_TIMEOUT_MS);
                }
            }
        }
    }

    #[test]
    fn test_script_entries_filtered_in_order() {
        let raw = json!({
            "beforePhase": { "scripts": ["one.lua", "", 7, null, "  ", "two.lua", {"p": 1}, "three.lua"] }
        });
        let (config, errors) = validate(&raw);
        assert_eq!(config.before_phase.scripts, vec!["one.lua", "two.lua", "three.lua"]);
        assert_eq!(errors.len(), 5);
        assert!(errors[0].contains("beforePhase.scripts[1]"));
    }

    #[test]
    fn test_validate_never_panics_on_odd_shapes() {
        let inputs = [
            json!({}),
            json!({ "beforePhase": null }),
            json!({ "beforePhase": [] }),
            json!({ "afterPhase": { "scripts": [[], {}, 1.5, false] } }),
            json!({ "enabled": null, "verbose": [], "failOnError": {} }),
            json!({ "beforePhase": { "timeoutMs": 1e300 } }),
            json!({ "beforePhase": { "timeoutMs": u64::MAX } }),
            json!({ "unknown": { "deeply": { "nested": true } } }),
        ];
        for raw in inputs {
            let (config, _errors) = validate(&raw);
            for phase in [Phase::Before, Phase::After] {
                let timeout = config.phase(phase).timeout_ms;
                assert!((1..=MAX_TIMEOUT_MS).contains(&timeout));
                assert!(config.phase(phase).scripts.iter().all(|s| !s.trim().is_empty()));
            }
        }
    }

    #[test]
    fn test_revalidation_is_idempotent() {
        let inputs = [
            full_config(),
            json!({ "enabled": 3, "beforePhase": { "scripts": ["x.lua", 1], "timeoutMs": 0 } }),
            json!("garbage"),
        ];
        for raw in inputs {
            let (normalized, _) = validate(&raw);
            let serialized = serde_json::to_value(&normalized).unwrap();
            let (again, errors) = validate(&serialized);
            assert!(errors.is_empty(), "errors on re-validation: {errors:?}");
            assert_eq!(again, normalized);
            assert_eq!(merge_with_defaults(&serialized), normalized);
        }
    }

    #[test]
    fn test_phase_activation_truth_table() {
        for master in [false, true] {
            for phase_enabled in [false, true] {
                for has_scripts in [false, true] {
                    let mut config = PipelineConfig::DEFAULT;
                    config.enabled = master;
                    config.after_phase.enabled = phase_enabled;
                    if has_scripts {
                        config.after_phase.scripts.push("/hooks/after.lua".to_string());
                    }
                    let expected = master && phase_enabled && has_scripts;
                    assert_eq!(is_phase_active(&config, Phase::After), expected);
                    assert!(!is_phase_active(&config, Phase::Before));
                    assert_eq!(config.is_active(), expected);
                }
            }
        }
    }

    #[test]
    fn test_from_host_config() {
        let host = json!({ "currency": "EUR", "hooks": { "enabled": true, "verbose": "loud" } });
        let (config, errors) = PipelineConfig::from_host_config(host.as_object().unwrap());
        assert!(config.enabled);
        assert_eq!(errors.len(), 1);

        let (config, errors) = PipelineConfig::from_host_config(&Map::new());
        assert_eq!(config, PipelineConfig::DEFAULT);
        assert!(errors.is_empty());
    }
}
