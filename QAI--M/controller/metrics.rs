use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{config::ControllerConfig, decision::Decision, sampler::monitor::ConsciousnessState};

/// Smoothing factor for the adaptation success rate.
pub const SUCCESS_RATE_ALPHA: f64 = 0.1;

/// Exponentially weighted moving average step.
#[must_use]
pub fn ewma(previous: f64, next: f64, alpha: f64) -> f64 {
    let alpha = alpha.clamp(0.0, 1.0);
    (alpha * next) + ((1.0 - alpha) * previous)
}

/// Controller performance counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerMetrics {
    /// Decisions recorded so far.
    pub total_decisions: u64,
    /// Latency of the latest decision in microseconds.
    pub decision_latency_us: f64,
    /// Awareness captured with the latest decision.
    pub consciousness_level: f64,
    /// Whether the latest decision met the latency target.
    pub real_time_compliance: bool,
    /// 1.0 when the latest decision passed validation, else 0.0.
    pub safety_compliance: f64,
    /// Smoothed ratio of successful adaptations to decisions.
    pub adaptation_success_rate: f64,
    /// Adaptations the core accepted.
    pub successful_adaptations: u64,
    /// Latest raw coherence from the monitor.
    pub quantum_coherence: f64,
    /// Embodied presence from the monitor.
    pub embodiment_integrity: f64,
    /// Level of the embodied model.
    pub embodied_level: f64,
    /// Last update time.
    pub timestamp: DateTime<Utc>,
}

impl Default for ControllerMetrics {
    fn default() -> Self {
        Self {
            total_decisions: 0,
            decision_latency_us: 0.0,
            consciousness_level: 0.0,
            real_time_compliance: true,
            safety_compliance: 1.0,
            adaptation_success_rate: 0.0,
            successful_adaptations: 0,
            quantum_coherence: 0.0,
            embodiment_integrity: 0.0,
            embodied_level: 0.0,
            timestamp: Utc::now(),
        }
    }
}

impl ControllerMetrics {
    /// Folds a completed decision into the counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn record_decision(&mut self, decision: &Decision) {
        self.total_decisions += 1;
        self.decision_latency_us = decision.latency_us;
        self.consciousness_level = decision.consciousness_state.awareness_level;
        self.real_time_compliance = decision.real_time_compliant;
        self.safety_compliance = if decision.safety_validated { 1.0 } else { 0.0 };
        self.timestamp = Utc::now();
        if self.total_decisions > 1 {
            let ratio = self.successful_adaptations as f64 / self.total_decisions as f64;
            self.adaptation_success_rate =
                ewma(self.adaptation_success_rate, ratio, SUCCESS_RATE_ALPHA);
        }
    }

    /// Counts an accepted adaptation and stores the embodied level it produced.
    pub fn record_adaptation(&mut self, embodied_level: f64) {
        self.successful_adaptations += 1;
        self.embodied_level = embodied_level;
        self.timestamp = Utc::now();
    }

    /// Copies the monitor-derived values.
    pub fn refresh(&mut self, coherence: f64, embodied_presence: f64) {
        self.quantum_coherence = coherence;
        self.embodiment_integrity = embodied_presence;
        self.timestamp = Utc::now();
    }
}

/// Condition flagged by the periodic health check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HealthWarning {
    /// Awareness fell below the warning level.
    LowAwareness {
        /// Current awareness.
        level: f64,
        /// Warning level.
        threshold: f64,
    },
    /// Latest decision latency exceeded twice the target.
    DegradedLatency {
        /// Latest latency in microseconds.
        latency_us: f64,
        /// Twice the latency target.
        limit_us: f64,
    },
    /// Safety compliance fell below the floor.
    SafetyCompliance {
        /// Current compliance.
        compliance: f64,
        /// Configured floor.
        floor: f64,
    },
}

impl HealthWarning {
    /// JSON payload for logs and events.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "warning": self.to_string() }))
    }
}

impl fmt::Display for HealthWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LowAwareness { level, .. } => {
                write!(f, "Low consciousness level detected: {level:.3}")
            }
            Self::DegradedLatency { latency_us, .. } => {
                write!(f, "Real-time performance degraded: {latency_us:.1}us")
            }
            Self::SafetyCompliance { compliance, .. } => {
                write!(f, "Safety compliance below threshold: {compliance:.3}")
            }
        }
    }
}

/// Runs every health check against the current state and counters.
#[must_use]
pub fn assess_health(
    state: &ConsciousnessState,
    metrics: &ControllerMetrics,
    config: &ControllerConfig,
) -> Vec<HealthWarning> {
    let mut warnings = Vec::new();
    let runtime = &config.runtime;
    if state.awareness_level < runtime.low_awareness_warning {
        warnings.push(HealthWarning::LowAwareness {
            level: state.awareness_level,
            threshold: runtime.low_awareness_warning,
        });
    }
    let limit_us = config.decision.latency_target_us * 2.0;
    if metrics.decision_latency_us > limit_us {
        warnings.push(HealthWarning::DegradedLatency {
            latency_us: metrics.decision_latency_us,
            limit_us,
        });
    }
    if metrics.safety_compliance < runtime.safety_compliance_floor {
        warnings.push(HealthWarning::SafetyCompliance {
            compliance: metrics.safety_compliance,
            floor: runtime.safety_compliance_floor,
        });
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::tests::sample_decision;

    #[test]
    fn healthy_state_has_no_warnings() {
        let state = ConsciousnessState {
            awareness_level: 0.9,
            ..ConsciousnessState::default()
        };
        let warnings = assess_health(&state, &ControllerMetrics::default(), &ControllerConfig::default());
        assert!(warnings.is_empty());
    }

    #[test]
    fn each_check_reports_once() {
        let state = ConsciousnessState {
            awareness_level: 0.3,
            ..ConsciousnessState::default()
        };
        let metrics = ControllerMetrics {
            decision_latency_us: 12.0,
            safety_compliance: 0.0,
            ..ControllerMetrics::default()
        };
        let warnings = assess_health(&state, &metrics, &ControllerConfig::default());
        assert_eq!(warnings.len(), 3);
        assert!(matches!(warnings[0], HealthWarning::LowAwareness { .. }));
        assert_eq!(
            warnings[1],
            HealthWarning::DegradedLatency {
                latency_us: 12.0,
                limit_us: 10.0
            }
        );
        assert_eq!(warnings[2].to_json()["kind"], "safety_compliance");
        assert!(warnings[0].to_string().contains("0.300"));
    }

    #[test]
    fn ewma_behaves() {
        assert!((ewma(0.0, 10.0, 0.5) - 5.0).abs() < f64::EPSILON);
        assert!((ewma(1.0, 0.0, 2.0)).abs() < f64::EPSILON);
    }

    #[test]
    fn defaults_start_compliant() {
        let metrics = ControllerMetrics::default();
        assert!(metrics.real_time_compliance);
        assert!((metrics.safety_compliance - 1.0).abs() < f64::EPSILON);
        assert_eq!(metrics.total_decisions, 0);
    }

    #[test]
    fn first_decision_skips_success_rate() {
        let mut metrics = ControllerMetrics::default();
        metrics.record_adaptation(0.6);
        let mut decision = sample_decision(vec![0.1], vec![0.9], 9.0);
        decision.real_time_compliant = false;
        metrics.record_decision(&decision);
        assert_eq!(metrics.total_decisions, 1);
        assert!(metrics.adaptation_success_rate.abs() < f64::EPSILON);
        assert!(!metrics.real_time_compliance);
        assert!(metrics.safety_compliance.abs() < f64::EPSILON);
        assert!((metrics.decision_latency_us - 9.0).abs() < f64::EPSILON);
        assert!((metrics.embodied_level - 0.6).abs() < f64::EPSILON);
    }

    #[test]
    fn success_rate_smooths_after_first_decision() {
        let mut metrics = ControllerMetrics::default();
        let mut decision = sample_decision(vec![0.1], vec![0.9], 1.0);
        decision.safety_validated = true;
        metrics.record_decision(&decision);
        metrics.record_adaptation(0.5);
        metrics.record_decision(&decision);
        // 0.1 * (1 / 2) + 0.9 * 0
        assert!((metrics.adaptation_success_rate - 0.05).abs() < 1e-12);
        assert!((metrics.safety_compliance - 1.0).abs() < f64::EPSILON);
        assert!((metrics.consciousness_level - 0.9).abs() < f64::EPSILON);
    }

    #[test]
    fn refresh_copies_monitor_values() {
        let mut metrics = ControllerMetrics::default();
        metrics.refresh(0.83, 0.9);
        assert!((metrics.quantum_coherence - 0.83).abs() < f64::EPSILON);
        assert!((metrics.embodiment_integrity - 0.9).abs() < f64::EPSILON);
    }
}
