use super::{CoreOutput, DecisionCore, CONTEXT_LEN, DECISION_LEN};
use crate::error::{ControllerError, ControllerResult};

const CHUNK: usize = CONTEXT_LEN / DECISION_LEN;

/// Deterministic stand-in for the native core.
///
/// Each decision component is `tanh(gain * chunk_mean + bias)` over one
/// 32-wide slice of the context. Confidence starts at `base_confidence` and
/// drops with the slice's spread. Adaptation nudges the bias vector.
#[derive(Debug, Clone)]
pub struct StubCore {
    gain: f32,
    base_confidence: f32,
    spread_penalty: f32,
    bias: [f32; DECISION_LEN],
    initialized: bool,
    decisions: u64,
    adaptations: u64,
}

impl Default for StubCore {
    fn default() -> Self {
        Self::new(1.0, 0.95)
    }
}

impl StubCore {
    /// Creates an uninitialized stub.
    #[must_use]
    pub fn new(gain: f32, base_confidence: f32) -> Self {
        Self {
            gain,
            base_confidence: base_confidence.clamp(0.0, 1.0),
            spread_penalty: 0.5,
            bias: [0.0; DECISION_LEN],
            initialized: false,
            decisions: 0,
            adaptations: 0,
        }
    }

    /// Sets how strongly slice spread lowers confidence.
    #[must_use]
    pub fn with_spread_penalty(mut self, penalty: f32) -> Self {
        self.spread_penalty = penalty.max(0.0);
        self
    }

    /// Current bias vector.
    #[must_use]
    pub const fn bias(&self) -> &[f32; DECISION_LEN] {
        &self.bias
    }

    /// Number of successful decisions.
    #[must_use]
    pub const fn decisions(&self) -> u64 {
        self.decisions
    }

    /// Number of successful adaptations.
    #[must_use]
    pub const fn adaptations(&self) -> u64 {
        self.adaptations
    }

    fn ensure_initialized(&self) -> ControllerResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(ControllerError::ExternalCall("stub core used before initialize".into()))
        }
    }
}

impl DecisionCore for StubCore {
    fn name(&self) -> &str {
        "stub"
    }

    fn initialize(&mut self, config_json: &str) -> ControllerResult<()> {
        serde_json::from_str::<serde_json::Value>(config_json)
            .map_err(|err| ControllerError::Initialization(format!("stub config: {err}")))?;
        self.initialized = true;
        Ok(())
    }

    #[allow(clippy::cast_precision_loss)]
    fn decide(&mut self, input: &[f32; CONTEXT_LEN]) -> ControllerResult<CoreOutput> {
        self.ensure_initialized()?;
        let mut output = CoreOutput::default();
        for (idx, chunk) in input.chunks_exact(CHUNK).enumerate() {
            let mean = chunk.iter().sum::<f32>() / CHUNK as f32;
            let spread = (chunk.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / CHUNK as f32).sqrt();
            output.decision[idx] = (self.gain * mean + self.bias[idx]).tanh();
            output.confidence[idx] =
                (self.base_confidence - self.spread_penalty * spread).clamp(0.0, 1.0);
        }
        self.decisions += 1;
        Ok(output)
    }

    fn adapt(&mut self, feedback: &[f32; DECISION_LEN], strength: f32) -> ControllerResult<()> {
        self.ensure_initialized()?;
        if !strength.is_finite() {
            return Err(ControllerError::ExternalCall(format!(
                "non-finite adaptation strength {strength}"
            )));
        }
        for (bias, signal) in self.bias.iter_mut().zip(feedback) {
            *bias = (*bias + strength * signal).clamp(-1.0, 1.0);
        }
        self.adaptations += 1;
        Ok(())
    }
}
