//! Opaque decision core: the capability trait, a serializing async handle, and implementations.

/// Native library bindings.
#[cfg(feature = "native")]
pub mod ffi;
/// Deterministic in-process core.
pub mod stub;

use std::{
    fmt,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::{ControllerError, ControllerResult};

/// Length of the context buffer handed to the core.
pub const CONTEXT_LEN: usize = 512;
/// Length of the decision and confidence buffers returned by the core.
pub const DECISION_LEN: usize = 16;

/// Fixed-size buffers produced by one decision call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoreOutput {
    /// Decision vector.
    pub decision: [f32; DECISION_LEN],
    /// Per-component confidence.
    pub confidence: [f32; DECISION_LEN],
}

impl Default for CoreOutput {
    fn default() -> Self {
        Self {
            decision: [0.0; DECISION_LEN],
            confidence: [0.0; DECISION_LEN],
        }
    }
}

/// A core output plus the wall-clock time the external call took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimedOutput {
    /// Buffers returned by the core.
    pub output: CoreOutput,
    /// Duration of the external call alone.
    pub elapsed: Duration,
}

/// Black-box computation behind the decision pipeline.
///
/// Calls are blocking and run on a blocking worker; implementations never
/// see two calls at once.
pub trait DecisionCore: Send + 'static {
    /// Label used in logs.
    fn name(&self) -> &str;

    /// Hands the serialized controller configuration to the core.
    fn initialize(&mut self, config_json: &str) -> ControllerResult<()>;

    /// Computes a decision for a padded context buffer.
    fn decide(&mut self, input: &[f32; CONTEXT_LEN]) -> ControllerResult<CoreOutput>;

    /// Applies outcome feedback with the given strength.
    fn adapt(&mut self, feedback: &[f32; DECISION_LEN], strength: f32) -> ControllerResult<()>;
}

/// Shared handle serializing every call into one core, first come first served.
///
/// Calls are not cancellable: dropping the returned future leaves the call
/// running to completion, and the handle stays locked until it finishes.
#[derive(Clone)]
pub struct CoreHandle {
    name: Arc<str>,
    inner: Arc<Mutex<Box<dyn DecisionCore>>>,
}

impl fmt::Debug for CoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreHandle").field("core", &self.name).finish()
    }
}

impl CoreHandle {
    /// Wraps a core.
    #[must_use]
    pub fn new(core: impl DecisionCore) -> Self {
        Self::from_boxed(Box::new(core))
    }

    /// Wraps an already boxed core.
    #[must_use]
    pub fn from_boxed(core: Box<dyn DecisionCore>) -> Self {
        Self {
            name: Arc::from(core.name()),
            inner: Arc::new(Mutex::new(core)),
        }
    }

    /// Core label.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Initializes the core. Failures map to [`ControllerError::Initialization`].
    pub async fn initialize(&self, config_json: String) -> ControllerResult<()> {
        self.run(move |core| core.initialize(&config_json))
            .await
            .map(|(result, _)| result)
            .and_then(|result| {
                result.map_err(|err| match err {
                    ControllerError::Initialization(_) => err,
                    other => ControllerError::Initialization(other.to_string()),
                })
            })
    }

    /// Runs one decision call and times it.
    pub async fn decide(&self, input: Box<[f32; CONTEXT_LEN]>) -> ControllerResult<TimedOutput> {
        let (result, elapsed) = self.run(move |core| core.decide(&input)).await?;
        Ok(TimedOutput {
            output: result?,
            elapsed,
        })
    }

    /// Runs one adaptation call and returns its duration.
    pub async fn adapt(
        &self,
        feedback: [f32; DECISION_LEN],
        strength: f32,
    ) -> ControllerResult<Duration> {
        let (result, elapsed) = self.run(move |core| core.adapt(&feedback, strength)).await?;
        result.map(|()| elapsed)
    }

    async fn run<T, F>(&self, call: F) -> ControllerResult<(T, Duration)>
    where
        T: Send + 'static,
        F: FnOnce(&mut dyn DecisionCore) -> T + Send + 'static,
    {
        let mut guard = Arc::clone(&self.inner).lock_owned().await;
        tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let value = call(&mut **guard);
            (value, started.elapsed())
        })
        .await
        .map_err(|err| ControllerError::ExternalCall(format!("core worker failed: {err}")))
    }
}
