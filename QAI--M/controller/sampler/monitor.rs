use std::{fmt, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};

use super::{
    coherence::CoherenceSource, mean, ring::BoundedBuffer, variance, MetricSampler,
    DEFAULT_AVERAGE,
};
use crate::{
    config::{MonitorSettings, ScoringProfile},
    lifecycle::LifecycleWatch,
};

/// One monitor tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonitorReading {
    /// When the tick ran.
    pub timestamp: DateTime<Utc>,
    /// Measured coherence.
    pub coherence: f64,
    /// Windowed mean coherence at this tick.
    pub awareness: f64,
    /// Inverse-variance continuity at this tick.
    pub continuity: f64,
}

/// Snapshot of every derived consciousness score.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ConsciousnessState {
    /// Windowed mean coherence.
    pub awareness_level: f64,
    /// Awareness scaled by the profile factor.
    pub self_awareness: f64,
    /// Profile constant.
    pub intentionality: f64,
    /// Profile constant.
    pub agency: f64,
    /// Latest raw coherence.
    pub temporal_coherence: f64,
    /// Correlation of the recent window against the preceding one.
    pub memory_persistence: f64,
    /// Awareness scaled by the prediction factor.
    pub prediction_confidence: f64,
    /// Mean of awareness and continuity.
    pub meta_cognition: f64,
    /// Profile constant.
    pub embodied_presence: f64,
    /// Latest continuity.
    pub consciousness_continuity: f64,
}

#[derive(Debug)]
struct MonitorState {
    coherence: MetricSampler,
    readings: BoundedBuffer<MonitorReading>,
}

/// Periodic sampler of simulated consciousness metrics.
#[derive(Clone)]
pub struct ConsciousnessMonitor {
    settings: MonitorSettings,
    scoring: ScoringProfile,
    state: Arc<RwLock<MonitorState>>,
    source: Arc<Mutex<Box<dyn CoherenceSource>>>,
}

impl fmt::Debug for ConsciousnessMonitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsciousnessMonitor")
            .field("readings", &self.len())
            .field("interval_ms", &self.settings.sample_interval_ms)
            .finish()
    }
}

impl ConsciousnessMonitor {
    /// Creates a monitor with an empty history.
    #[must_use]
    pub fn new(
        settings: MonitorSettings,
        scoring: ScoringProfile,
        source: Box<dyn CoherenceSource>,
    ) -> Self {
        let capacity = settings.history_capacity;
        Self {
            settings,
            scoring,
            state: Arc::new(RwLock::new(MonitorState {
                coherence: MetricSampler::new(capacity),
                readings: BoundedBuffer::new(capacity),
            })),
            source: Arc::new(Mutex::new(source)),
        }
    }

    /// Takes one reading at `now` and appends it to the history.
    pub fn tick(&self, now: DateTime<Utc>) -> MonitorReading {
        let coherence = self.source.lock().measure(now);
        let mut state = self.state.write();
        state.coherence.record_at(now, coherence);
        let reading = MonitorReading {
            timestamp: now,
            coherence,
            awareness: Self::awareness_of(&state.coherence, &self.settings),
            continuity: Self::continuity_of(&state.coherence, &self.settings),
        };
        state.readings.push(reading);
        reading
    }

    /// Spawns the sampling loop. It exits once the lifecycle leaves `Active`
    /// and resolves to the number of ticks taken.
    pub fn spawn(&self, mut lifecycle: LifecycleWatch) -> JoinHandle<u64> {
        let monitor = self.clone();
        let period = Duration::from_millis(self.settings.sample_interval_ms.max(1));
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut ticks = 0u64;
            while lifecycle.is_active() {
                tokio::select! {
                    _ = ticker.tick() => {
                        monitor.tick(Utc::now());
                        ticks += 1;
                    }
                    () = lifecycle.deactivated() => break,
                }
            }
            tracing::debug!(ticks, "consciousness sampler stopped");
            ticks
        })
    }

    /// Windowed mean coherence, or the default when the window is not yet full.
    #[must_use]
    pub fn awareness(&self) -> f64 {
        Self::awareness_of(&self.state.read().coherence, &self.settings)
    }

    /// Continuity of the recent coherence window.
    #[must_use]
    pub fn continuity(&self) -> f64 {
        Self::continuity_of(&self.state.read().coherence, &self.settings)
    }

    /// Pearson correlation of the newest window against the one before it.
    #[must_use]
    pub fn memory_persistence(&self) -> f64 {
        let state = self.state.read();
        let window = self.settings.persistence_window;
        if state.coherence.len() < window {
            return DEFAULT_AVERAGE;
        }
        let values = state.coherence.latest_values(window * 2);
        let recent = &values[values.len() - window..];
        let older = if values.len() >= window * 2 {
            &values[..window]
        } else {
            recent
        };
        pearson(recent, older).map_or(DEFAULT_AVERAGE, |corr| corr.clamp(0.0, 1.0))
    }

    /// Most recent reading.
    #[must_use]
    pub fn latest(&self) -> Option<MonitorReading> {
        self.state.read().readings.last().copied()
    }

    /// Copy of the reading history, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<MonitorReading> {
        self.state.read().readings.to_vec()
    }

    /// Number of retained readings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.read().readings.len()
    }

    /// Whether no reading has been taken yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Derives the current consciousness state. All zeros before the first tick.
    #[must_use]
    pub fn state(&self) -> ConsciousnessState {
        let Some(latest) = self.latest() else {
            return ConsciousnessState::default();
        };
        let awareness = self.awareness();
        let continuity = self.continuity();
        ConsciousnessState {
            awareness_level: latest.awareness,
            self_awareness: awareness * self.scoring.self_awareness_factor,
            intentionality: self.scoring.intentionality,
            agency: self.scoring.agency,
            temporal_coherence: latest.coherence,
            memory_persistence: self.memory_persistence(),
            prediction_confidence: awareness * self.scoring.prediction_factor,
            meta_cognition: (awareness + continuity) / 2.0,
            embodied_presence: self.scoring.embodied_presence,
            consciousness_continuity: latest.continuity,
        }
    }

    fn awareness_of(coherence: &MetricSampler, settings: &MonitorSettings) -> f64 {
        coherence.latest_average(settings.awareness_window)
    }

    fn continuity_of(coherence: &MetricSampler, settings: &MonitorSettings) -> f64 {
        coherence
            .latest_variance(settings.continuity_window)
            .map_or(DEFAULT_AVERAGE, |var| (1.0 / (1.0 + var * 10.0)).clamp(0.0, 1.0))
    }
}

fn pearson(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.len() != b.len() || a.len() < 2 {
        return None;
    }
    let (var_a, var_b) = (variance(a), variance(b));
    // Flat windows carry no correlation signal.
    if var_a < f64::EPSILON || var_b < f64::EPSILON {
        return None;
    }
    let (mean_a, mean_b) = (mean(a.iter().copied()), mean(b.iter().copied()));
    let covariance: f64 = a
        .iter()
        .zip(b)
        .map(|(x, y)| (x - mean_a) * (y - mean_b))
        .sum();
    #[allow(clippy::cast_precision_loss)]
    let denominator = (var_a * var_b).sqrt() * a.len() as f64;
    Some(covariance / denominator)
}
