use std::{fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use super::Decision;
use crate::config::{EthicsRules, SafetyRules};

/// Outcome from a single reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewFinding {
    /// Reviewer name.
    pub reviewer: String,
    /// Whether every comparison held.
    pub passed: bool,
    /// One entry per failed comparison.
    pub violations: Vec<String>,
}

impl ReviewFinding {
    fn from_violations(reviewer: &str, violations: Vec<String>) -> Self {
        Self {
            reviewer: reviewer.into(),
            passed: violations.is_empty(),
            violations,
        }
    }
}

/// Deterministic, side-effect free check over a decision.
pub trait DecisionReviewer: Send + Sync {
    /// Reviewer name.
    fn name(&self) -> &str;

    /// Evaluates the decision.
    fn review(&self, decision: &Decision) -> ReviewFinding;
}

/// Magnitude, confidence, and latency limits.
#[derive(Debug, Clone)]
pub struct SafetyReviewer {
    rules: SafetyRules,
    latency_target_us: f64,
}

impl SafetyReviewer {
    /// Creates a reviewer.
    #[must_use]
    pub const fn new(rules: SafetyRules, latency_target_us: f64) -> Self {
        Self {
            rules,
            latency_target_us,
        }
    }
}

impl DecisionReviewer for SafetyReviewer {
    fn name(&self) -> &str {
        "safety"
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    fn review(&self, decision: &Decision) -> ReviewFinding {
        let mut violations = Vec::new();

        let magnitude = decision
            .decision_vector
            .iter()
            .map(|value| value.abs())
            .fold(0.0f32, |max, value| if value > max || value.is_nan() { value } else { max });
        if !(magnitude <= self.rules.max_decision_magnitude) {
            violations.push(format!(
                "Decision magnitude {magnitude:.3} exceeds limit {:.3}",
                self.rules.max_decision_magnitude
            ));
        }

        match decision
            .confidence_scores
            .iter()
            .copied()
            .reduce(|low, value| if value < low || value.is_nan() { value } else { low })
        {
            None => violations.push("No confidence scores provided".into()),
            Some(lowest) if !(lowest >= self.rules.min_confidence) => violations.push(format!(
                "Confidence {lowest:.3} below threshold {:.3}",
                self.rules.min_confidence
            )),
            Some(_) => {}
        }

        if !(decision.latency_us <= self.latency_target_us) {
            violations.push(format!(
                "Real-time constraint violation: {:.1}us exceeds {}us",
                decision.latency_us, self.latency_target_us
            ));
        }

        ReviewFinding::from_violations(self.name(), violations)
    }
}

/// Awareness and transparency requirements.
#[derive(Debug, Clone)]
pub struct EthicsReviewer {
    rules: EthicsRules,
}

impl EthicsReviewer {
    /// Creates a reviewer.
    #[must_use]
    pub const fn new(rules: EthicsRules) -> Self {
        Self { rules }
    }
}

impl DecisionReviewer for EthicsReviewer {
    fn name(&self) -> &str {
        "ethics"
    }

    #[allow(clippy::neg_cmp_op_on_partial_ord)]
    fn review(&self, decision: &Decision) -> ReviewFinding {
        let mut violations = Vec::new();
        let awareness = decision.consciousness_state.awareness_level;
        if !(awareness >= self.rules.min_awareness) {
            violations.push(format!(
                "Insufficient consciousness for ethical decision: {awareness:.3} < {:.3}",
                self.rules.min_awareness
            ));
        }
        if self.rules.require_reasoning_trace && decision.reasoning_trace.is_empty() {
            violations.push("No reasoning trace provided".into());
        }
        ReviewFinding::from_violations(self.name(), violations)
    }
}

/// Combined verdict over every reviewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Every reviewer passed.
    pub passed: bool,
    /// The safety reviewer passed.
    pub safety_passed: bool,
    /// The ethics reviewer passed.
    pub ethics_passed: bool,
    /// All violations, in reviewer order.
    pub violations: Vec<String>,
    /// Per-reviewer findings.
    pub findings: Vec<ReviewFinding>,
}

/// Runs the safety and ethics reviewers plus any extra ones.
#[derive(Clone)]
pub struct ThresholdValidator {
    safety: SafetyReviewer,
    ethics: EthicsReviewer,
    extra: Vec<Arc<dyn DecisionReviewer>>,
}

impl fmt::Debug for ThresholdValidator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThresholdValidator")
            .field("safety", &self.safety)
            .field("ethics", &self.ethics)
            .field("extra", &self.extra.len())
            .finish()
    }
}

impl ThresholdValidator {
    /// Creates a validator from static thresholds.
    #[must_use]
    pub const fn new(safety: SafetyRules, ethics: EthicsRules, latency_target_us: f64) -> Self {
        Self {
            safety: SafetyReviewer::new(safety, latency_target_us),
            ethics: EthicsReviewer::new(ethics),
            extra: Vec::new(),
        }
    }

    /// Adds a reviewer whose failures count toward the overall verdict.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn DecisionReviewer>) -> Self {
        self.extra.push(reviewer);
        self
    }

    /// Evaluates every reviewer.
    #[must_use]
    pub fn validate(&self, decision: &Decision) -> ValidationReport {
        let safety = self.safety.review(decision);
        let ethics = self.ethics.review(decision);
        let mut findings = vec![safety, ethics];
        findings.extend(self.extra.iter().map(|reviewer| reviewer.review(decision)));
        ValidationReport {
            passed: findings.iter().all(|finding| finding.passed),
            safety_passed: findings[0].passed,
            ethics_passed: findings[1].passed,
            violations: findings
                .iter()
                .flat_map(|finding| finding.violations.iter().cloned())
                .collect(),
            findings,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decision::tests::sample_decision;

    fn validator(min_confidence: f32) -> ThresholdValidator {
        ThresholdValidator::new(
            SafetyRules {
                min_confidence,
                ..SafetyRules::default()
            },
            EthicsRules::default(),
            5.0,
        )
    }

    #[test]
    fn compliant_decision_passes() {
        let decision = sample_decision(vec![0.2, -0.4], vec![0.9, 0.95], 2.0);
        let report = validator(0.85).validate(&decision);
        assert!(report.passed);
        assert!(report.violations.is_empty());
        assert_eq!(report.findings.len(), 2);
    }

    #[test]
    fn low_confidence_names_value_and_threshold() {
        let decision = sample_decision(vec![0.1, 0.1], vec![0.5, 0.9], 1.0);
        let report = validator(0.85).validate(&decision);
        assert!(!report.passed);
        assert!(!report.safety_passed);
        assert!(report.ethics_passed);
        assert_eq!(report.violations, vec!["Confidence 0.500 below threshold 0.850"]);
    }

    #[test]
    fn magnitude_and_latency_are_checked() {
        let decision = sample_decision(vec![1.5, 0.0], vec![0.99, 0.99], 12.0);
        let report = validator(0.85).validate(&decision);
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations[0].contains("magnitude 1.500"));
        assert!(report.violations[1].starts_with("Real-time constraint violation"));
    }

    #[test]
    fn nan_decision_component_fails_magnitude_check() {
        let decision = sample_decision(vec![0.1, f32::NAN, 0.2], vec![0.99, 0.99], 1.0);
        let report = validator(0.85).validate(&decision);
        assert!(!report.safety_passed);
        assert_eq!(report.violations.len(), 1);
        assert!(report.violations[0].contains("magnitude NaN"));
    }

    #[test]
    fn nan_confidence_fails_threshold() {
        let decision = sample_decision(vec![0.1, 0.1], vec![0.99, f32::NAN], 1.0);
        let report = validator(0.85).validate(&decision);
        assert!(!report.passed);
        assert_eq!(report.violations, vec!["Confidence NaN below threshold 0.850"]);
    }

    #[test]
    fn infinite_decision_component_fails_magnitude_check() {
        let decision = sample_decision(vec![f32::NEG_INFINITY], vec![0.99], 1.0);
        let report = validator(0.85).validate(&decision);
        assert!(report.violations[0].contains("magnitude inf"));
    }

    #[test]
    fn empty_confidence_is_a_violation() {
        let decision = sample_decision(vec![0.0], Vec::new(), 1.0);
        let report = validator(0.85).validate(&decision);
        assert_eq!(report.violations, vec!["No confidence scores provided"]);
    }

    #[test]
    fn ethics_requires_awareness_and_trace() {
        let mut decision = sample_decision(vec![0.0], vec![0.9], 1.0);
        decision.consciousness_state.awareness_level = 0.4;
        decision.reasoning_trace.clear();
        let report = validator(0.85).validate(&decision);
        assert!(report.safety_passed);
        assert!(!report.ethics_passed);
        assert_eq!(report.violations.len(), 2);
        assert!(report.violations[0].contains("0.400 < 0.700"));
        assert_eq!(report.violations[1], "No reasoning trace provided");
    }

    #[test]
    fn extra_reviewers_affect_verdict() {
        struct Veto;
        impl DecisionReviewer for Veto {
            fn name(&self) -> &str {
                "veto"
            }
            fn review(&self, _decision: &Decision) -> ReviewFinding {
                ReviewFinding::from_violations(self.name(), vec!["vetoed".into()])
            }
        }
        let decision = sample_decision(vec![0.0], vec![0.9], 1.0);
        let report = validator(0.85).with_reviewer(Arc::new(Veto)).validate(&decision);
        assert!(report.safety_passed && report.ethics_passed);
        assert!(!report.passed);
        assert_eq!(report.violations, vec!["vetoed"]);
    }

    #[test]
    fn validation_is_deterministic() {
        let decision = sample_decision(vec![2.0], vec![0.1], 50.0);
        let validator = validator(0.85);
        assert_eq!(validator.validate(&decision), validator.validate(&decision));
    }
}
