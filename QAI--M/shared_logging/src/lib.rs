#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    missing_docs,
    rust_2018_idioms
)]

//! Structured JSON-lines logging for controller audit trails.

use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use anyhow::Result;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Log severity level, ordered from least to most severe.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Debug information.
    Debug,
    /// Informational events.
    Info,
    /// Warning indicator.
    Warn,
    /// Error indicator.
    Error,
}

impl LogLevel {
    /// Lowercase label used in human-facing output.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Structured log record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    /// Timestamp in ISO8601.
    pub timestamp: DateTime<Utc>,
    /// Component emitting the log.
    pub module: String,
    /// Severity.
    pub level: LogLevel,
    /// Message key, e.g. `controller.decision.completed`.
    pub message: String,
    /// Arbitrary JSON fields.
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl LogRecord {
    /// Creates a record stamped with the current time.
    #[must_use]
    pub fn new(module: impl Into<String>, level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            module: module.into(),
            level,
            message: message.into(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Adds a single metadata field.
    #[must_use]
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Merges every field of a JSON object into the metadata. Non-objects are ignored.
    #[must_use]
    pub fn with_fields(self, fields: &serde_json::Value) -> Self {
        match fields.as_object() {
            Some(obj) => obj
                .iter()
                .fold(self, |record, (key, value)| record.with_field(key.as_str(), value.clone())),
            None => self,
        }
    }
}

/// Thread-safe append-only JSON-lines logger.
#[derive(Debug)]
pub struct JsonLogger {
    path: PathBuf,
    min_level: LogLevel,
    writer: Mutex<File>,
}

impl JsonLogger {
    /// Creates or opens a logger at the given path, accepting every level.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_min_level(path, LogLevel::Debug)
    }

    /// Creates or opens a logger that drops records below `min_level`.
    pub fn with_min_level(path: impl AsRef<Path>, min_level: LogLevel) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)?;
        Ok(Self {
            path,
            min_level,
            writer: Mutex::new(file),
        })
    }

    /// Writes a record as one JSON line. Returns `false` when filtered out.
    pub fn log(&self, record: &LogRecord) -> Result<bool> {
        if record.level < self.min_level {
            return Ok(false);
        }
        let mut writer = self.writer.lock();
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(true)
    }

    /// Minimum level accepted by this logger.
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Returns the underlying file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_json_lines_with_fields() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::new(dir.path().join("nested/controller.log")).unwrap();
        let record = LogRecord::new("controller", LogLevel::Info, "decision.completed")
            .with_field("latency_us", 3.5)
            .with_fields(&serde_json::json!({ "compliant": true }));
        assert!(logger.log(&record).unwrap());
        let content = fs::read_to_string(logger.path()).unwrap();
        assert!(content.contains("\"message\":\"decision.completed\""));
        assert!(content.contains("\"latency_us\":3.5"));
        assert!(content.contains("\"compliant\":true"));
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn merged_fields_override_and_ignore_non_objects() {
        let record = LogRecord::new("controller", LogLevel::Warn, "health.warning")
            .with_field("level", 0.9)
            .with_fields(&serde_json::json!({ "level": 0.3, "kind": "low_awareness" }))
            .with_fields(&serde_json::json!([1, 2]));
        assert_eq!(record.metadata.len(), 2);
        assert_eq!(record.metadata["level"], 0.3);
        assert_eq!(record.metadata["kind"], "low_awareness");
    }

    #[test]
    fn drops_records_below_min_level() {
        let dir = tempdir().unwrap();
        let logger = JsonLogger::with_min_level(dir.path().join("warn.log"), LogLevel::Warn).unwrap();
        assert!(!logger
            .log(&LogRecord::new("controller", LogLevel::Debug, "noise"))
            .unwrap());
        assert!(logger
            .log(&LogRecord::new("controller", LogLevel::Error, "fault"))
            .unwrap());
        let content = fs::read_to_string(logger.path()).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("fault"));
    }

    #[test]
    fn levels_are_ordered_by_severity() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!(LogLevel::Warn.label(), "warn");
    }
}
