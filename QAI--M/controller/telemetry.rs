use std::{fmt, path::PathBuf, sync::Arc};

use anyhow::Result;
use serde_json::Value;
use shared_event_bus::{EventPublisher, EventRecord};
use shared_logging::{JsonLogger, LogLevel, LogRecord};

/// Emitted once the controller is active.
pub const EVENT_INITIALIZED: &str = "controller.initialized";
/// Emitted for every recorded decision.
pub const EVENT_DECISION_COMPLETED: &str = "controller.decision.completed";
/// Emitted when a decision failed validation.
pub const EVENT_DECISION_VIOLATIONS: &str = "controller.decision.violations";
/// Emitted after a successful adaptation.
pub const EVENT_ADAPTATION_COMPLETED: &str = "controller.adaptation.completed";
/// Emitted by the health loop.
pub const EVENT_HEALTH_WARNING: &str = "controller.health.warning";
/// Emitted once on shutdown.
pub const EVENT_SHUTDOWN: &str = "controller.shutdown";

/// Builder configuring controller telemetry sinks.
pub struct ControllerTelemetryBuilder {
    module: String,
    log_path: Option<PathBuf>,
    min_level: LogLevel,
    event_publisher: Option<Arc<dyn EventPublisher>>,
}

impl ControllerTelemetryBuilder {
    /// Creates a new builder for the given module label.
    #[must_use]
    pub fn new(module: impl Into<String>) -> Self {
        Self {
            module: module.into(),
            log_path: None,
            min_level: LogLevel::Debug,
            event_publisher: None,
        }
    }

    /// Sets the JSON log path.
    #[must_use]
    pub fn log_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_path = Some(path.into());
        self
    }

    /// Drops JSON log records below this level.
    #[must_use]
    pub const fn min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Registers the event publisher to emit controller events.
    #[must_use]
    pub fn event_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.event_publisher = Some(publisher);
        self
    }

    /// Finalizes the builder.
    pub fn build(self) -> Result<ControllerTelemetry> {
        let logger = match self.log_path {
            Some(path) => Some(JsonLogger::with_min_level(path, self.min_level)?),
            None => None,
        };
        Ok(ControllerTelemetry::from_parts(
            self.module,
            logger,
            self.event_publisher,
        ))
    }
}

/// Telemetry handle shared by the controller and its background loops.
///
/// Every record is mirrored to `tracing` whether or not a sink is configured.
#[derive(Clone)]
pub struct ControllerTelemetry {
    inner: Arc<TelemetryInner>,
}

impl fmt::Debug for ControllerTelemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerTelemetry")
            .field("module", &self.inner.module)
            .field("logger", &self.inner.logger.as_ref().map(JsonLogger::path))
            .field("events", &self.inner.publisher.is_some())
            .finish()
    }
}

struct TelemetryInner {
    module: String,
    logger: Option<JsonLogger>,
    publisher: Option<Arc<dyn EventPublisher>>,
}

impl ControllerTelemetry {
    fn from_parts(
        module: String,
        logger: Option<JsonLogger>,
        publisher: Option<Arc<dyn EventPublisher>>,
    ) -> Self {
        Self {
            inner: Arc::new(TelemetryInner {
                module,
                logger,
                publisher,
            }),
        }
    }

    /// Telemetry without sinks; records only reach `tracing`.
    #[must_use]
    pub fn tracing_only(module: impl Into<String>) -> Self {
        Self::from_parts(module.into(), None, None)
    }

    /// Returns a builder for this telemetry helper.
    #[must_use]
    pub fn builder(module: impl Into<String>) -> ControllerTelemetryBuilder {
        ControllerTelemetryBuilder::new(module)
    }

    /// Module label stamped on every record.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.inner.module
    }

    /// Logs a structured record.
    pub fn log(&self, level: LogLevel, message: &str, metadata: Value) -> Result<()> {
        let module = self.inner.module.as_str();
        match level {
            LogLevel::Debug => tracing::debug!(module, fields = %metadata, "{message}"),
            LogLevel::Info => tracing::info!(module, fields = %metadata, "{message}"),
            LogLevel::Warn => tracing::warn!(module, fields = %metadata, "{message}"),
            LogLevel::Error => tracing::error!(module, fields = %metadata, "{message}"),
        }
        if let Some(logger) = &self.inner.logger {
            let record = LogRecord::new(module, level, message).with_fields(&metadata);
            logger.log(&record)?;
        }
        Ok(())
    }

    /// Logs a record and reports a failing sink through `tracing` instead of returning it.
    ///
    /// Returns `true` when the record reached every configured sink.
    pub fn log_or_warn(&self, level: LogLevel, message: &str, metadata: Value) -> bool {
        match self.log(level, message, metadata) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(
                    module = %self.inner.module,
                    level = level.label(),
                    error = %err,
                    record = message,
                    "controller log sink failed"
                );
                false
            }
        }
    }

    /// Emits an event entry on the configured bus.
    pub async fn event(&self, event_type: &str, payload: Value) -> Result<()> {
        tracing::trace!(module = %self.inner.module, event_type, "controller event");
        if let Some(publisher) = &self.inner.publisher {
            let record = EventRecord::new(self.inner.module.clone(), event_type, payload);
            publisher.publish(record).await?;
        }
        Ok(())
    }
}
