#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! GAIA QAI real-time decision controller: consciousness sampling, threshold
//! validation, and orchestration of an opaque decision core.

/// Controller error taxonomy.
#[path = "../error.rs"]
pub mod error;

/// TOML configuration.
#[path = "../config.rs"]
pub mod config;

/// Lifecycle state shared with the background loops.
#[path = "../lifecycle.rs"]
pub mod lifecycle;

/// Bounded metric sampling and the consciousness monitor.
#[path = "../sampler/main.rs"]
pub mod sampler;

/// Decision core capability and its serializing handle.
#[path = "../engine/main.rs"]
pub mod engine;

/// Decision records, validation, and history.
#[path = "../decision/main.rs"]
pub mod decision;

/// Embodied state model.
#[path = "../embodied.rs"]
pub mod embodied;

/// Performance counters and health checks.
#[path = "../metrics.rs"]
pub mod metrics;

/// Structured logging and event emission.
#[path = "../telemetry.rs"]
pub mod telemetry;

/// High-level runtime entrypoints.
#[path = "../main.rs"]
pub mod orchestration_entry;

pub use config::ControllerConfig;
pub use engine::{stub::StubCore, CoreHandle, DecisionCore};
pub use decision::{validator::ThresholdValidator, Decision, DecisionHistory};
pub use error::{ControllerError, ControllerResult};
pub use lifecycle::{Lifecycle, LifecycleState};
pub use metrics::ControllerMetrics;
pub use orchestration_entry::RealAiController;
pub use sampler::{monitor::ConsciousnessState, MetricSampler};
pub use telemetry::ControllerTelemetry;
