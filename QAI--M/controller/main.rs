//! Controller runtime: lifecycle, background loops, and the decision and adaptation pipelines.

use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use chrono::Utc;
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use shared_logging::LogLevel;
use tokio::{
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use uuid::Uuid;

use crate::{
    config::ControllerConfig,
    decision::{
        prepare_context, reasoning, resize_feedback,
        validator::{DecisionReviewer, ThresholdValidator},
        Decision, DecisionHistory,
    },
    embodied::{EmbodiedModel, EmbodiedScores},
    engine::{stub::StubCore, CoreHandle},
    error::{ControllerError, ControllerResult},
    lifecycle::{Lifecycle, LifecycleState, LifecycleWatch},
    metrics::{assess_health, ControllerMetrics, HealthWarning},
    sampler::{
        coherence::{CoherenceSource, OscillatingCoherence},
        monitor::{ConsciousnessMonitor, ConsciousnessState},
    },
    telemetry::{
        ControllerTelemetry, EVENT_ADAPTATION_COMPLETED, EVENT_DECISION_COMPLETED,
        EVENT_DECISION_VIOLATIONS, EVENT_HEALTH_WARNING, EVENT_INITIALIZED, EVENT_SHUTDOWN,
    },
};

/// Awareness gained per unit of adaptation strength.
pub const LEARNING_BOOST_FACTOR: f32 = 0.01;

#[derive(Debug, Default)]
struct BackgroundTasks {
    sampler: Option<JoinHandle<u64>>,
    loops: Vec<JoinHandle<()>>,
}

/// Orchestrates the monitor, the decision core, validation, and bookkeeping.
///
/// Every method takes `&self`; wrap the controller in an `Arc` to share it
/// across tasks. Core access is serialized by the [`CoreHandle`].
#[derive(Debug)]
pub struct RealAiController {
    config: ControllerConfig,
    core: CoreHandle,
    monitor: ConsciousnessMonitor,
    validator: ThresholdValidator,
    lifecycle: Lifecycle,
    metrics: Arc<RwLock<ControllerMetrics>>,
    history: DecisionHistory,
    embodied: Mutex<EmbodiedModel>,
    telemetry: ControllerTelemetry,
    tasks: Mutex<BackgroundTasks>,
}

impl RealAiController {
    /// Creates an idle controller around a core and a coherence source.
    #[must_use]
    pub fn new(
        config: ControllerConfig,
        core: CoreHandle,
        source: Box<dyn CoherenceSource>,
    ) -> Self {
        let monitor = ConsciousnessMonitor::new(config.monitor.clone(), config.scoring.clone(), source);
        let validator = ThresholdValidator::new(
            config.safety.clone(),
            config.ethics.clone(),
            config.decision.latency_target_us,
        );
        Self {
            history: DecisionHistory::new(config.decision.history_capacity),
            core,
            monitor,
            validator,
            lifecycle: Lifecycle::new(),
            metrics: Arc::new(RwLock::new(ControllerMetrics::default())),
            embodied: Mutex::new(EmbodiedModel::new()),
            telemetry: ControllerTelemetry::tracing_only("controller"),
            tasks: Mutex::new(BackgroundTasks::default()),
            config,
        }
    }

    /// Creates a controller backed by the in-process stub core and the
    /// oscillating coherence source described by `config.monitor`.
    pub fn with_stub_core(config: ControllerConfig) -> ControllerResult<Self> {
        let source = OscillatingCoherence::from_settings(&config.monitor)?;
        Ok(Self::new(config, CoreHandle::new(StubCore::default()), Box::new(source)))
    }

    /// Attaches telemetry sinks for observability.
    #[must_use]
    pub fn with_telemetry(mut self, telemetry: ControllerTelemetry) -> Self {
        self.telemetry = telemetry;
        self
    }

    /// Adds a reviewer whose failures count toward each decision's verdict.
    #[must_use]
    pub fn with_reviewer(mut self, reviewer: Arc<dyn DecisionReviewer>) -> Self {
        self.validator = self.validator.with_reviewer(reviewer);
        self
    }

    /// Validates the configuration, initializes the core, activates the
    /// lifecycle, and starts the sampler, metrics, and health loops.
    pub async fn initialize(&self) -> ControllerResult<()> {
        match self.lifecycle.state() {
            LifecycleState::Idle => {}
            state => {
                return Err(ControllerError::Initialization(format!(
                    "controller is {state}, expected idle"
                )))
            }
        }
        self.config.validate()?;
        let native_config = self
            .config
            .to_native_json()
            .map_err(|err| ControllerError::Initialization(err.to_string()))?;
        if let Err(err) = self.core.initialize(native_config).await {
            self.log(
                LogLevel::Error,
                "controller.initialize.failed",
                json!({ "core": self.core.name(), "error": err.to_string() }),
            );
            return Err(err);
        }
        if !self.lifecycle.activate() {
            return Err(ControllerError::Initialization(
                "controller left idle during initialization".into(),
            ));
        }

        {
            let mut tasks = self.tasks.lock();
            tasks.sampler = Some(self.monitor.spawn(self.lifecycle.watch()));
            tasks.loops.push(self.spawn_metrics_loop());
            tasks.loops.push(self.spawn_health_loop());
        }

        let payload = json!({
            "core": self.core.name(),
            "sample_interval_ms": self.config.monitor.sample_interval_ms,
            "latency_target_us": self.config.decision.latency_target_us,
        });
        self.log(LogLevel::Info, EVENT_INITIALIZED, payload.clone());
        self.emit(EVENT_INITIALIZED, payload).await;
        Ok(())
    }

    /// Runs one decision.
    ///
    /// `requirement` overrides the configured consciousness threshold. Threshold
    /// violations never fail the call; they are recorded on the returned decision.
    pub async fn make_decision(
        &self,
        context: &[f32],
        requirement: Option<f64>,
    ) -> ControllerResult<Arc<Decision>> {
        if !self.lifecycle.is_active() {
            return Err(ControllerError::Inactive);
        }
        let started = Instant::now();
        let timestamp = Utc::now();
        let state = self.monitor.state();
        let required = requirement.unwrap_or(self.config.decision.consciousness_threshold);
        if state.awareness_level < required {
            return Err(ControllerError::InsufficientConsciousness {
                level: state.awareness_level,
                required,
            });
        }

        let input = prepare_context(context);
        let input_snapshot = input.to_vec();
        let timed = self.core.decide(input).await?;
        let latency_us = micros(started.elapsed());
        let decision_vector = timed.output.decision.to_vec();

        let mut decision = Decision {
            id: Uuid::new_v4(),
            timestamp,
            input: input_snapshot,
            reasoning_trace: reasoning::reasoning_trace(context.len(), &decision_vector, &state),
            decision_vector,
            confidence_scores: timed.output.confidence.to_vec(),
            consciousness_state: state,
            safety_validated: false,
            ethics_validated: false,
            real_time_compliant: latency_us <= self.config.decision.latency_target_us,
            latency_us,
            core_latency_us: micros(timed.elapsed),
            context_hash: reasoning::context_hash(context),
            violations: Vec::new(),
        };
        if self.config.decision.safety_validation {
            let report = self.validator.validate(&decision);
            decision = decision.with_validation(&report, self.config.decision.ethics_validation);
        }

        self.metrics.write().record_decision(&decision);
        let decision = Arc::new(decision);
        self.history.record(Arc::clone(&decision));

        if decision.has_violations() {
            let payload = json!({
                "decision_id": decision.id,
                "violations": decision.violations,
            });
            self.log(LogLevel::Warn, EVENT_DECISION_VIOLATIONS, payload.clone());
            self.emit(EVENT_DECISION_VIOLATIONS, payload).await;
        }
        let payload = json!({
            "decision_id": decision.id,
            "latency_us": decision.latency_us,
            "real_time_compliant": decision.real_time_compliant,
            "safety_validated": decision.safety_validated,
            "context_hash": decision.context_hash,
        });
        self.log(LogLevel::Info, EVENT_DECISION_COMPLETED, payload.clone());
        self.emit(EVENT_DECISION_COMPLETED, payload).await;
        Ok(decision)
    }

    /// Feeds an outcome back into the core.
    ///
    /// Returns `Ok(false)` when learning is disabled. `strength` defaults to
    /// the configured adaptation strength.
    pub async fn adapt_from_outcome(
        &self,
        decision: &Decision,
        outcome: &[f32],
        strength: Option<f32>,
    ) -> ControllerResult<bool> {
        if !self.config.decision.learning_enabled {
            return Ok(false);
        }
        if !self.lifecycle.is_active() {
            return Err(ControllerError::Inactive);
        }
        let strength = strength.unwrap_or(self.config.decision.adaptation_strength);
        let feedback = resize_feedback(outcome);
        let elapsed = self.core.adapt(feedback, strength).await?;

        #[allow(clippy::cast_precision_loss)]
        let outcome_mean = feedback.iter().sum::<f32>() / feedback.len() as f32;
        let embodied_level = self.embodied.lock().update(
            &decision.input,
            &decision.decision_vector,
            outcome_mean,
        );
        self.metrics
            .write()
            .record_adaptation(f64::from(embodied_level));

        let current = self.monitor.state().awareness_level;
        let enhanced = (current + f64::from(strength * LEARNING_BOOST_FACTOR)).min(1.0);
        self.log(
            LogLevel::Debug,
            "controller.learning.boost",
            json!({ "from": current, "to": enhanced }),
        );
        let payload = json!({
            "decision_id": decision.id,
            "strength": strength,
            "embodied_level": embodied_level,
            "latency_us": micros(elapsed),
        });
        self.log(LogLevel::Info, EVENT_ADAPTATION_COMPLETED, payload.clone());
        self.emit(EVENT_ADAPTATION_COMPLETED, payload).await;
        Ok(true)
    }

    /// Whether the controller is active and every functional threshold holds.
    #[must_use]
    pub fn is_functional(&self) -> bool {
        if !self.lifecycle.is_active() {
            return false;
        }
        let state = self.monitor.state();
        let metrics = self.metrics.read();
        let runtime = &self.config.runtime;
        state.awareness_level >= runtime.functional_min_awareness
            && state.temporal_coherence >= runtime.functional_min_coherence
            && metrics.real_time_compliance
            && metrics.safety_compliance >= runtime.safety_compliance_floor
    }

    /// Stops the loops and waits for them. Repeated calls are no-ops.
    pub async fn shutdown(&self) {
        if !self.lifecycle.stop() {
            return;
        }
        let tasks = std::mem::take(&mut *self.tasks.lock());
        let ticks = match tasks.sampler {
            Some(handle) => handle.await.unwrap_or_else(|err| {
                tracing::error!(error = %err, "consciousness sampler task failed");
                0
            }),
            None => 0,
        };
        for handle in tasks.loops {
            if let Err(err) = handle.await {
                tracing::error!(error = %err, "controller loop task failed");
            }
        }
        let payload = json!({
            "sampler_ticks": ticks,
            "total_decisions": self.metrics.read().total_decisions,
        });
        self.log(LogLevel::Info, EVENT_SHUTDOWN, payload.clone());
        self.emit(EVENT_SHUTDOWN, payload).await;
    }

    /// Current counters.
    #[must_use]
    pub fn metrics(&self) -> ControllerMetrics {
        self.metrics.read().clone()
    }

    /// Current consciousness state.
    #[must_use]
    pub fn consciousness_state(&self) -> ConsciousnessState {
        self.monitor.state()
    }

    /// Health checks against the current state, as the health loop runs them.
    #[must_use]
    pub fn health_warnings(&self) -> Vec<HealthWarning> {
        assess_health(&self.monitor.state(), &self.metrics.read(), &self.config)
    }

    /// Scores of the embodied model.
    #[must_use]
    pub fn embodied_scores(&self) -> EmbodiedScores {
        self.embodied.lock().scores()
    }

    /// Retained decisions.
    #[must_use]
    pub const fn history(&self) -> &DecisionHistory {
        &self.history
    }

    /// The consciousness monitor.
    #[must_use]
    pub const fn monitor(&self) -> &ConsciousnessMonitor {
        &self.monitor
    }

    /// Effective configuration.
    #[must_use]
    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn lifecycle_state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Label of the decision core.
    #[must_use]
    pub fn core_name(&self) -> &str {
        self.core.name()
    }

    fn spawn_metrics_loop(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        let metrics = Arc::clone(&self.metrics);
        let period = Duration::from_millis(self.config.runtime.metrics_interval_ms.max(1));
        run_periodic(self.lifecycle.watch(), period, move || {
            let state = monitor.state();
            metrics
                .write()
                .refresh(state.temporal_coherence, state.embodied_presence);
        })
    }

    fn spawn_health_loop(&self) -> JoinHandle<()> {
        let monitor = self.monitor.clone();
        let metrics = Arc::clone(&self.metrics);
        let config = self.config.clone();
        let telemetry = self.telemetry.clone();
        let period = Duration::from_millis(self.config.runtime.health_interval_ms.max(1));
        let mut lifecycle = self.lifecycle.watch();
        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            while lifecycle.is_active() {
                tokio::select! {
                    _ = ticker.tick() => {
                        let warnings = assess_health(&monitor.state(), &metrics.read(), &config);
                        for warning in warnings {
                            let payload = json!({
                                "message": warning.to_string(),
                                "warning": warning.to_json(),
                            });
                            telemetry.log_or_warn(LogLevel::Warn, EVENT_HEALTH_WARNING, payload.clone());
                            if let Err(err) = telemetry.event(EVENT_HEALTH_WARNING, payload).await {
                                tracing::warn!(error = %err, "health event publish failed");
                            }
                        }
                    }
                    () = lifecycle.deactivated() => break,
                }
            }
        })
    }

    fn log(&self, level: LogLevel, message: &str, payload: serde_json::Value) {
        self.telemetry.log_or_warn(level, message, payload);
    }

    async fn emit(&self, event_type: &str, payload: serde_json::Value) {
        if let Err(err) = self.telemetry.event(event_type, payload).await {
            tracing::warn!(error = %err, event_type, "controller event publish failed");
        }
    }
}

fn micros(elapsed: Duration) -> f64 {
    elapsed.as_secs_f64() * 1e6
}

fn run_periodic<F>(mut lifecycle: LifecycleWatch, period: Duration, mut tick: F) -> JoinHandle<()>
where
    F: FnMut() + Send + 'static,
{
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        while lifecycle.is_active() {
            tokio::select! {
                _ = ticker.tick() => tick(),
                () = lifecycle.deactivated() => break,
            }
        }
    })
}
