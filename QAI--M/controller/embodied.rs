//! In-process embodied state model fed by decisions and their outcomes.

use serde::{Deserialize, Serialize};

use crate::sampler::ring::BoundedBuffer;

/// Number of context values kept as the awareness vector.
pub const AWARENESS_LEN: usize = 64;
/// Number of decision values kept as the intention vector.
pub const INTENTION_LEN: usize = 32;
/// Number of outcome scalars remembered.
pub const MEMORY_LEN: usize = 128;

/// Derived scores after the latest update.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct EmbodiedScores {
    /// Smoothness of the awareness vector.
    pub continuity: f32,
    /// One minus the spread of remembered outcomes.
    pub memory_persistence: f32,
    /// Smoothness of the intention vector.
    pub intention_stability: f32,
    /// One minus the spread of the awareness vector.
    pub self_model_accuracy: f32,
    /// How well a linear trend predicts each remembered outcome.
    pub world_model_fidelity: f32,
    /// Mean of world-model fidelity and memory persistence.
    pub prediction_confidence: f32,
}

impl EmbodiedScores {
    /// Mean of continuity, memory persistence, intention stability, and self-model accuracy.
    #[must_use]
    pub fn level(&self) -> f32 {
        (self.continuity
            + self.memory_persistence
            + self.intention_stability
            + self.self_model_accuracy)
            / 4.0
    }
}

/// Rolling embodied model.
#[derive(Debug, Clone)]
pub struct EmbodiedModel {
    awareness: Vec<f32>,
    intention: Vec<f32>,
    memory: BoundedBuffer<f32>,
    scores: EmbodiedScores,
    updates: u64,
}

impl Default for EmbodiedModel {
    fn default() -> Self {
        Self::new()
    }
}

impl EmbodiedModel {
    /// Creates a model with every score at zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            awareness: Vec::with_capacity(AWARENESS_LEN),
            intention: Vec::with_capacity(INTENTION_LEN),
            memory: BoundedBuffer::new(MEMORY_LEN),
            scores: EmbodiedScores::default(),
            updates: 0,
        }
    }

    /// Replaces the awareness and intention vectors, remembers the outcome,
    /// and returns the new level.
    pub fn update(&mut self, context: &[f32], decision: &[f32], outcome: f32) -> f32 {
        self.awareness.clear();
        self.awareness
            .extend(context.iter().take(AWARENESS_LEN).copied());
        self.intention.clear();
        self.intention
            .extend(decision.iter().take(INTENTION_LEN).copied());
        self.memory.push(outcome);

        let memory = self.memory.to_vec();
        let memory_persistence = spread(&memory).map_or(0.0, |sd| (1.0 - sd).max(0.0));
        let world_model_fidelity = trend_fidelity(&memory);
        self.scores = EmbodiedScores {
            continuity: smoothness(&self.awareness),
            memory_persistence,
            intention_stability: smoothness(&self.intention),
            self_model_accuracy: spread(&self.awareness).map_or(0.0, |sd| 1.0 - sd.min(1.0)),
            world_model_fidelity,
            prediction_confidence: (world_model_fidelity + memory_persistence) / 2.0,
        };
        self.updates += 1;
        self.scores.level()
    }

    /// Current level.
    #[must_use]
    pub fn level(&self) -> f32 {
        self.scores.level()
    }

    /// Current scores.
    #[must_use]
    pub const fn scores(&self) -> EmbodiedScores {
        self.scores
    }

    /// Number of updates applied.
    #[must_use]
    pub const fn updates(&self) -> u64 {
        self.updates
    }

    /// Number of remembered outcomes.
    #[must_use]
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }
}

/// Mean of `1 - min(|delta|, 1)` over adjacent pairs. 0.5 with fewer than two values.
#[allow(clippy::cast_precision_loss)]
fn smoothness(values: &[f32]) -> f32 {
    if values.len() < 2 {
        return 0.5;
    }
    let total: f32 = values
        .windows(2)
        .map(|pair| 1.0 - (pair[1] - pair[0]).abs().min(1.0))
        .sum();
    total / (values.len() - 1) as f32
}

/// Population standard deviation. `None` when empty.
#[allow(clippy::cast_precision_loss)]
fn spread(values: &[f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    Some(variance.sqrt())
}

/// One minus the mean error of linear extrapolation from the two previous values.
/// 0.5 with fewer than three values.
#[allow(clippy::cast_precision_loss)]
fn trend_fidelity(values: &[f32]) -> f32 {
    if values.len() < 3 {
        return 0.5;
    }
    let errors: Vec<f32> = values
        .windows(3)
        .map(|w| ((w[1] + (w[1] - w[0])) - w[2]).abs())
        .collect();
    1.0 - (errors.iter().sum::<f32>() / errors.len() as f32).min(1.0)
}
