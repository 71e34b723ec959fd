use std::f64::consts::TAU;

use chrono::{DateTime, Utc};
use rand::{rngs::SmallRng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::{
    config::MonitorSettings,
    error::{ControllerError, ControllerResult},
};

/// Produces one coherence reading per sampler tick.
pub trait CoherenceSource: Send {
    /// Measures coherence at `now`. Implementations return values in `[0, 1]`.
    fn measure(&mut self, now: DateTime<Utc>) -> f64;
}

/// Base level plus a one-second sine oscillation plus Gaussian noise, clamped to `[0, 1]`.
#[derive(Debug, Clone)]
pub struct OscillatingCoherence {
    base: f64,
    amplitude: f64,
    noise: Normal<f64>,
    rng: SmallRng,
}

impl OscillatingCoherence {
    /// Builds the source from monitor settings, seeded from entropy.
    pub fn from_settings(settings: &MonitorSettings) -> ControllerResult<Self> {
        Self::new(
            settings.base_coherence,
            settings.oscillation_amplitude,
            settings.noise_std_dev,
            SmallRng::from_entropy(),
        )
    }

    /// Builds the source with an explicit RNG.
    pub fn new(base: f64, amplitude: f64, noise_std_dev: f64, rng: SmallRng) -> ControllerResult<Self> {
        if noise_std_dev < 0.0 || !noise_std_dev.is_finite() {
            return Err(ControllerError::Config(format!(
                "noise standard deviation must be finite and not negative, got {noise_std_dev}"
            )));
        }
        let noise = Normal::new(0.0, noise_std_dev)
            .map_err(|err| ControllerError::Config(format!("noise distribution: {err}")))?;
        Ok(Self {
            base,
            amplitude,
            noise,
            rng,
        })
    }
}

impl CoherenceSource for OscillatingCoherence {
    fn measure(&mut self, now: DateTime<Utc>) -> f64 {
        let phase = f64::from(now.timestamp_subsec_nanos()) / 1e9;
        let oscillation = (phase * TAU).sin() * self.amplitude;
        let noise = self.noise.sample(&mut self.rng);
        (self.base + oscillation + noise).clamp(0.0, 1.0)
    }
}

/// Replays a fixed list of readings in a loop.
#[derive(Debug, Clone)]
pub struct ScriptedCoherence {
    readings: Vec<f64>,
    cursor: usize,
}

impl ScriptedCoherence {
    /// Creates a source cycling through `readings`. An empty list always yields zero.
    #[must_use]
    pub fn new(readings: Vec<f64>) -> Self {
        Self {
            readings,
            cursor: 0,
        }
    }

    /// A source that always reports `value`.
    #[must_use]
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }
}

impl CoherenceSource for ScriptedCoherence {
    fn measure(&mut self, _now: DateTime<Utc>) -> f64 {
        if self.readings.is_empty() {
            return 0.0;
        }
        let value = self.readings[self.cursor % self.readings.len()];
        self.cursor = self.cursor.wrapping_add(1);
        value.clamp(0.0, 1.0)
    }
}
