//! Decision records, their bounded history, and the helpers that shape pipeline inputs.

/// Reasoning trace and context hashing.
pub mod reasoning;
/// Safety and ethics threshold checks.
pub mod validator;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    engine::{CONTEXT_LEN, DECISION_LEN},
    sampler::{monitor::ConsciousnessState, ring::BoundedBuffer},
};
use validator::ValidationReport;

/// One completed decision. Retained copies are shared and never change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// Unique identifier.
    pub id: Uuid,
    /// When the pipeline started.
    pub timestamp: DateTime<Utc>,
    /// The padded context handed to the core.
    pub input: Vec<f32>,
    /// Decision vector returned by the core.
    pub decision_vector: Vec<f32>,
    /// Per-component confidence returned by the core.
    pub confidence_scores: Vec<f32>,
    /// Human-readable reasoning steps.
    pub reasoning_trace: Vec<String>,
    /// Monitor snapshot taken when the request was admitted.
    pub consciousness_state: ConsciousnessState,
    /// Combined validation verdict. Stays `false` when validation is disabled.
    pub safety_validated: bool,
    /// Mirrors the combined verdict, when ethics validation is enabled.
    pub ethics_validated: bool,
    /// Latency stayed within the real-time target.
    pub real_time_compliant: bool,
    /// End-to-end pipeline latency in microseconds.
    pub latency_us: f64,
    /// Latency of the core call alone in microseconds.
    pub core_latency_us: f64,
    /// Digest of the raw context.
    pub context_hash: String,
    /// Violations reported by validation.
    pub violations: Vec<String>,
}

impl Decision {
    /// Folds a validation report into the record. The ethics flag mirrors the
    /// combined verdict when ethics validation is enabled.
    #[must_use]
    pub fn with_validation(mut self, report: &ValidationReport, ethics_enabled: bool) -> Self {
        self.safety_validated = report.passed;
        self.ethics_validated = ethics_enabled && report.passed;
        self.violations.clone_from(&report.violations);
        self
    }

    /// Whether any validation failed.
    #[must_use]
    pub fn has_violations(&self) -> bool {
        !self.violations.is_empty()
    }
}

/// Pads with zeros or truncates the context to the core's input length.
#[must_use]
pub fn prepare_context(context: &[f32]) -> Box<[f32; CONTEXT_LEN]> {
    let mut buffer = Box::new([0.0f32; CONTEXT_LEN]);
    let take = context.len().min(CONTEXT_LEN);
    buffer[..take].copy_from_slice(&context[..take]);
    buffer
}

/// Resizes outcome feedback to the decision length by repeating it cyclically.
/// Empty feedback becomes all zeros.
#[must_use]
pub fn resize_feedback(outcome: &[f32]) -> [f32; DECISION_LEN] {
    let mut feedback = [0.0f32; DECISION_LEN];
    if outcome.is_empty() {
        return feedback;
    }
    for (slot, value) in feedback.iter_mut().zip(outcome.iter().cycle()) {
        *slot = *value;
    }
    feedback
}

/// Bounded, shared log of recent decisions, oldest first.
#[derive(Debug, Clone)]
pub struct DecisionHistory {
    inner: Arc<RwLock<BoundedBuffer<Arc<Decision>>>>,
}

impl DecisionHistory {
    /// Creates an empty history.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(BoundedBuffer::new(capacity))),
        }
    }

    /// Appends a decision, evicting the oldest once full.
    pub fn record(&self, decision: Arc<Decision>) {
        self.inner.write().push(decision);
    }

    /// Most recent decision.
    #[must_use]
    pub fn last(&self) -> Option<Arc<Decision>> {
        self.inner.read().last().cloned()
    }

    /// The newest `n` decisions, oldest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Arc<Decision>> {
        self.inner.read().tail(n).cloned().collect()
    }

    /// Every retained decision, oldest first.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Arc<Decision>> {
        self.inner.read().to_vec()
    }

    /// Looks up a retained decision.
    #[must_use]
    pub fn find(&self, id: Uuid) -> Option<Arc<Decision>> {
        self.inner
            .read()
            .iter()
            .find(|decision| decision.id == id)
            .cloned()
    }

    /// Number of retained decisions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.read().len()
    }

    /// Whether nothing has been retained.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.read().is_empty()
    }

    /// Maximum number of retained decisions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.read().capacity()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_decision(
        decision_vector: Vec<f32>,
        confidence_scores: Vec<f32>,
        latency_us: f64,
    ) -> Decision {
        Decision {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            input: vec![0.0; CONTEXT_LEN],
            decision_vector,
            confidence_scores,
            reasoning_trace: vec!["Context analysis: 0 input features processed".into()],
            consciousness_state: ConsciousnessState {
                awareness_level: 0.9,
                ..ConsciousnessState::default()
            },
            safety_validated: false,
            ethics_validated: false,
            real_time_compliant: latency_us <= 5.0,
            latency_us,
            core_latency_us: latency_us / 2.0,
            context_hash: "0123456789abcdef".into(),
            violations: Vec::new(),
        }
    }

    #[test]
    fn context_is_padded_and_truncated() {
        let short = prepare_context(&[1.0, 2.0]);
        assert_eq!(&short[..3], &[1.0, 2.0, 0.0]);
        assert!(short[2..].iter().all(|v| *v == 0.0));

        let long: Vec<f32> = (0..600).map(|v| v as f32).collect();
        let truncated = prepare_context(&long);
        assert_eq!(truncated[CONTEXT_LEN - 1], 511.0);
    }

    #[test]
    fn feedback_repeats_cyclically() {
        let feedback = resize_feedback(&[1.0, -1.0, 0.5]);
        assert_eq!(&feedback[..6], &[1.0, -1.0, 0.5, 1.0, -1.0, 0.5]);
        assert_eq!(feedback[15], 1.0);
        assert_eq!(resize_feedback(&[]), [0.0; DECISION_LEN]);

        let long: Vec<f32> = (0..20).map(|v| v as f32).collect();
        assert_eq!(resize_feedback(&long)[15], 15.0);
    }

    #[test]
    fn validation_sets_flags_and_violations() {
        let report = ValidationReport {
            passed: false,
            safety_passed: false,
            ethics_passed: true,
            violations: vec!["Confidence 0.500 below threshold 0.850".into()],
            findings: Vec::new(),
        };
        let decision = sample_decision(vec![0.1], vec![0.5], 1.0).with_validation(&report, true);
        assert!(!decision.safety_validated);
        assert!(!decision.ethics_validated);
        assert!(decision.has_violations());

        let clean = ValidationReport {
            passed: true,
            safety_passed: true,
            ethics_passed: true,
            violations: Vec::new(),
            findings: Vec::new(),
        };
        let decision = sample_decision(vec![0.1], vec![0.9], 1.0).with_validation(&clean, true);
        assert!(decision.safety_validated && decision.ethics_validated);
        let decision = sample_decision(vec![0.1], vec![0.9], 1.0).with_validation(&clean, false);
        assert!(decision.safety_validated && !decision.ethics_validated);
    }

    #[test]
    fn history_keeps_newest_entries() {
        let history = DecisionHistory::new(3);
        let mut ids = Vec::new();
        for _ in 0..5 {
            let decision = Arc::new(sample_decision(vec![0.0], vec![0.9], 1.0));
            ids.push(decision.id);
            history.record(decision);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.capacity(), 3);
        let retained: Vec<Uuid> = history.snapshot().iter().map(|d| d.id).collect();
        assert_eq!(retained, ids[2..].to_vec());
        assert_eq!(history.last().map(|d| d.id), Some(ids[4]));
        assert_eq!(history.recent(2).len(), 2);
        assert!(history.find(ids[0]).is_none());
        assert!(history.find(ids[3]).is_some());
    }
}
