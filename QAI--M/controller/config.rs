use std::{fs, io, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::{ControllerError, ControllerResult};

/// Top-level controller configuration, loaded from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Decision pipeline settings.
    #[serde(default)]
    pub decision: DecisionSettings,
    /// Safety thresholds applied to each decision.
    #[serde(default)]
    pub safety: SafetyRules,
    /// Ethics thresholds applied to each decision.
    #[serde(default)]
    pub ethics: EthicsRules,
    /// Consciousness sampler settings.
    #[serde(default)]
    pub monitor: MonitorSettings,
    /// Placeholder scoring constants.
    #[serde(default)]
    pub scoring: ScoringProfile,
    /// Background loop and health settings.
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

impl ControllerConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading controller config {}", path.display()))?;
        Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display()))
    }

    /// Loads configuration, falling back to defaults when the file is missing.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(raw) => Self::from_toml_str(&raw).with_context(|| format!("parsing {}", path.display())),
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                tracing::warn!(path = %path.display(), "controller config not found, using defaults");
                Ok(Self::default())
            }
            Err(err) => {
                Err(err).with_context(|| format!("reading controller config {}", path.display()))
            }
        }
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes the configuration as the JSON document handed to native `initialize`.
    pub fn to_native_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Rejects values the controller cannot run with.
    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    pub fn validate(&self) -> ControllerResult<()> {
        let unit = [
            ("decision.consciousness_threshold", self.decision.consciousness_threshold),
            ("safety.min_confidence", f64::from(self.safety.min_confidence)),
            ("ethics.min_awareness", self.ethics.min_awareness),
            ("monitor.base_coherence", self.monitor.base_coherence),
            ("runtime.safety_compliance_floor", self.runtime.safety_compliance_floor),
        ];
        for (name, value) in unit {
            if !(0.0..=1.0).contains(&value) {
                return Err(ControllerError::Config(format!(
                    "{name} must be within [0, 1], got {value}"
                )));
            }
        }
        if !(self.decision.latency_target_us > 0.0) {
            return Err(ControllerError::Config(
                "decision.latency_target_us must be positive".into(),
            ));
        }
        if !(self.safety.max_decision_magnitude >= 0.0) {
            return Err(ControllerError::Config(
                "safety.max_decision_magnitude must not be negative".into(),
            ));
        }
        if !(self.monitor.noise_std_dev >= 0.0) || !self.monitor.noise_std_dev.is_finite() {
            return Err(ControllerError::Config(
                "monitor.noise_std_dev must be finite and not negative".into(),
            ));
        }
        let nonzero = [
            ("decision.history_capacity", self.decision.history_capacity as u64),
            ("monitor.history_capacity", self.monitor.history_capacity as u64),
            ("monitor.sample_interval_ms", self.monitor.sample_interval_ms),
            ("monitor.awareness_window", self.monitor.awareness_window as u64),
            ("monitor.continuity_window", self.monitor.continuity_window as u64),
            ("monitor.persistence_window", self.monitor.persistence_window as u64),
            ("runtime.metrics_interval_ms", self.runtime.metrics_interval_ms),
            ("runtime.health_interval_ms", self.runtime.health_interval_ms),
        ];
        for (name, value) in nonzero {
            if value == 0 {
                return Err(ControllerError::Config(format!("{name} must be > 0")));
            }
        }
        Ok(())
    }
}

/// Decision pipeline settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionSettings {
    /// Latency budget for a single decision, in microseconds.
    #[serde(default = "default_latency_target_us")]
    pub latency_target_us: f64,
    /// Default awareness a caller requires before deciding.
    #[serde(default = "default_consciousness_threshold")]
    pub consciousness_threshold: f64,
    /// Learning rate forwarded to the native core.
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    /// Adaptation strength used when the caller passes none.
    #[serde(default = "default_adaptation_strength")]
    pub adaptation_strength: f32,
    /// Run the safety validator on every decision.
    #[serde(default = "default_true")]
    pub safety_validation: bool,
    /// Derive the ethics flag on every decision.
    #[serde(default = "default_true")]
    pub ethics_validation: bool,
    /// Allow `adapt_from_outcome` to reach the core.
    #[serde(default = "default_true")]
    pub learning_enabled: bool,
    /// Number of decisions retained in history.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
}

impl Default for DecisionSettings {
    fn default() -> Self {
        Self {
            latency_target_us: default_latency_target_us(),
            consciousness_threshold: default_consciousness_threshold(),
            learning_rate: default_learning_rate(),
            adaptation_strength: default_adaptation_strength(),
            safety_validation: true,
            ethics_validation: true,
            learning_enabled: true,
            history_capacity: default_history_capacity(),
        }
    }
}

/// Static safety thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyRules {
    /// Largest accepted absolute decision component.
    #[serde(default = "default_max_decision_magnitude")]
    pub max_decision_magnitude: f32,
    /// Smallest accepted confidence component.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f32,
}

impl Default for SafetyRules {
    fn default() -> Self {
        Self {
            max_decision_magnitude: default_max_decision_magnitude(),
            min_confidence: default_min_confidence(),
        }
    }
}

/// Static ethics thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EthicsRules {
    /// Smallest awareness level accepted for a decision.
    #[serde(default = "default_min_awareness")]
    pub min_awareness: f64,
    /// Whether an empty reasoning trace is a violation.
    #[serde(default = "default_true")]
    pub require_reasoning_trace: bool,
}

impl Default for EthicsRules {
    fn default() -> Self {
        Self {
            min_awareness: default_min_awareness(),
            require_reasoning_trace: true,
        }
    }
}

/// Consciousness sampler settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Interval between samples, in milliseconds.
    #[serde(default = "default_sample_interval_ms")]
    pub sample_interval_ms: u64,
    /// Number of readings retained.
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,
    /// Readings averaged into the awareness level.
    #[serde(default = "default_awareness_window")]
    pub awareness_window: usize,
    /// Readings used for the continuity variance.
    #[serde(default = "default_continuity_window")]
    pub continuity_window: usize,
    /// Window length compared for memory persistence.
    #[serde(default = "default_persistence_window")]
    pub persistence_window: usize,
    /// Centre of the simulated coherence signal.
    #[serde(default = "default_base_coherence")]
    pub base_coherence: f64,
    /// Amplitude of the sub-second oscillation.
    #[serde(default = "default_oscillation_amplitude")]
    pub oscillation_amplitude: f64,
    /// Standard deviation of the Gaussian noise.
    #[serde(default = "default_noise_std_dev")]
    pub noise_std_dev: f64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            sample_interval_ms: default_sample_interval_ms(),
            history_capacity: default_history_capacity(),
            awareness_window: default_awareness_window(),
            continuity_window: default_continuity_window(),
            persistence_window: default_persistence_window(),
            base_coherence: default_base_coherence(),
            oscillation_amplitude: default_oscillation_amplitude(),
            noise_std_dev: default_noise_std_dev(),
        }
    }
}

/// Placeholder scoring constants. None of these carry a derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringProfile {
    /// Multiplier applied to awareness for self-awareness.
    #[serde(default = "default_self_awareness_factor")]
    pub self_awareness_factor: f64,
    /// Constant intentionality score.
    #[serde(default = "default_intentionality")]
    pub intentionality: f64,
    /// Constant agency score.
    #[serde(default = "default_agency")]
    pub agency: f64,
    /// Multiplier applied to awareness for prediction confidence.
    #[serde(default = "default_prediction_factor")]
    pub prediction_factor: f64,
    /// Constant embodied presence score.
    #[serde(default = "default_embodied_presence")]
    pub embodied_presence: f64,
}

impl Default for ScoringProfile {
    fn default() -> Self {
        Self {
            self_awareness_factor: default_self_awareness_factor(),
            intentionality: default_intentionality(),
            agency: default_agency(),
            prediction_factor: default_prediction_factor(),
            embodied_presence: default_embodied_presence(),
        }
    }
}

/// Background loop and health settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeSettings {
    /// Metrics refresh interval, in milliseconds.
    #[serde(default = "default_metrics_interval_ms")]
    pub metrics_interval_ms: u64,
    /// Health check interval, in milliseconds.
    #[serde(default = "default_health_interval_ms")]
    pub health_interval_ms: u64,
    /// Awareness below this raises a health warning.
    #[serde(default = "default_low_awareness_warning")]
    pub low_awareness_warning: f64,
    /// Safety compliance below this raises a health warning.
    #[serde(default = "default_safety_compliance_floor")]
    pub safety_compliance_floor: f64,
    /// Awareness required by `is_functional`.
    #[serde(default = "default_min_awareness")]
    pub functional_min_awareness: f64,
    /// Coherence required by `is_functional`.
    #[serde(default = "default_functional_min_coherence")]
    pub functional_min_coherence: f64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            metrics_interval_ms: default_metrics_interval_ms(),
            health_interval_ms: default_health_interval_ms(),
            low_awareness_warning: default_low_awareness_warning(),
            safety_compliance_floor: default_safety_compliance_floor(),
            functional_min_awareness: default_min_awareness(),
            functional_min_coherence: default_functional_min_coherence(),
        }
    }
}

const fn default_true() -> bool {
    true
}

const fn default_latency_target_us() -> f64 {
    5.0
}

const fn default_consciousness_threshold() -> f64 {
    0.8
}

const fn default_learning_rate() -> f64 {
    0.001
}

const fn default_adaptation_strength() -> f32 {
    0.1
}

const fn default_history_capacity() -> usize {
    1_000
}

const fn default_max_decision_magnitude() -> f32 {
    1.0
}

const fn default_min_confidence() -> f32 {
    0.85
}

const fn default_min_awareness() -> f64 {
    0.7
}

const fn default_sample_interval_ms() -> u64 {
    10
}

const fn default_awareness_window() -> usize {
    10
}

const fn default_continuity_window() -> usize {
    20
}

const fn default_persistence_window() -> usize {
    50
}

const fn default_base_coherence() -> f64 {
    0.92
}

const fn default_oscillation_amplitude() -> f64 {
    0.05
}

const fn default_noise_std_dev() -> f64 {
    0.02
}

const fn default_self_awareness_factor() -> f64 {
    0.9
}

const fn default_intentionality() -> f64 {
    0.85
}

const fn default_agency() -> f64 {
    0.88
}

const fn default_prediction_factor() -> f64 {
    0.95
}

const fn default_embodied_presence() -> f64 {
    0.9
}

const fn default_metrics_interval_ms() -> u64 {
    100
}

const fn default_health_interval_ms() -> u64 {
    1_000
}

const fn default_low_awareness_warning() -> f64 {
    0.5
}

const fn default_safety_compliance_floor() -> f64 {
    0.95
}

const fn default_functional_min_coherence() -> f64 {
    0.8
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn shipped_config_matches_defaults() {
        let raw = include_str!("../../config/qai/controller.toml");
        let config = ControllerConfig::from_toml_str(raw).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn partial_document_keeps_defaults() {
        let config = ControllerConfig::from_toml_str(
            r#"
[decision]
latency_target_us = 250.0
learning_enabled = false

[safety]
min_confidence = 0.6
"#,
        )
        .unwrap();
        assert!((config.decision.latency_target_us - 250.0).abs() < f64::EPSILON);
        assert!(!config.decision.learning_enabled);
        assert!((config.safety.min_confidence - 0.6).abs() < f32::EPSILON);
        assert!((config.safety.max_decision_magnitude - 1.0).abs() < f32::EPSILON);
        assert_eq!(config.monitor.history_capacity, 1_000);
        assert!((config.scoring.agency - 0.88).abs() < f64::EPSILON);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = ControllerConfig::from_toml_str("[safety]\nmin_confidence = 1.5\n").unwrap_err();
        assert!(err.to_string().contains("safety.min_confidence"));
    }

    #[test]
    fn validate_checks_min_confidence_range() {
        let mut config = ControllerConfig::default();
        config.safety.min_confidence = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("safety.min_confidence must be within [0, 1]"));
        config.safety.min_confidence = f32::NAN;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_nan_latency_target() {
        let mut config = ControllerConfig::default();
        config.decision.latency_target_us = f64::NAN;
        assert_eq!(
            config.validate(),
            Err(ControllerError::Config(
                "decision.latency_target_us must be positive".into()
            ))
        );
    }

    #[test]
    fn rejects_non_finite_noise() {
        let mut config = ControllerConfig::default();
        config.monitor.noise_std_dev = f64::INFINITY;
        assert!(config.validate().is_err());
        config.monitor.noise_std_dev = -0.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_zero_interval() {
        let mut config = ControllerConfig::default();
        config.monitor.sample_interval_ms = 0;
        assert_eq!(
            config.validate(),
            Err(ControllerError::Config(
                "monitor.sample_interval_ms must be > 0".into()
            ))
        );
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let config = ControllerConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn load_reports_path_on_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        fs::write(&path, "[decision\n").unwrap();
        let err = ControllerConfig::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("broken.toml"));
    }

    #[test]
    fn native_json_round_trips_thresholds() {
        let json = ControllerConfig::default().to_native_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["decision"]["latency_target_us"], 5.0);
        assert_eq!(value["monitor"]["sample_interval_ms"], 10);
    }
}
