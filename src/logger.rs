use std::{fmt, sync::Arc};

use serde_json::Value;
use tracing::Level;
use tracing_core::LevelFilter;

/// Structured fields attached to a [`Logger`].
pub type Fields = serde_json::Map<String, Value>;

/// A single log line as handed to a [`LogSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    pub level: Level,
    pub message: String,
    pub fields: Fields,
}

/// Destination for records produced by a [`Logger`].
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &Record);
}

/// Target of the events written by [`TracingSink`].
pub const CALL_LOG_TARGET: &str = "gateway_log::calls";

/// Event field holding a record's fields, rendered as a JSON object.
pub const FIELDS_KEY: &str = "fields";

/// Forwards records to the `tracing` macros under [`CALL_LOG_TARGET`].
///
/// The fields travel as one JSON string under [`FIELDS_KEY`];
/// [`JsonFormat`](crate::format::JsonFormat) turns it back into an object.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn emit(&self, record: &Record) {
        let fields = Value::Object(record.fields.clone()).to_string();
        let fields = fields.as_str();
        match record.level {
            Level::ERROR => {
                tracing::error!(target: CALL_LOG_TARGET, fields, "{}", record.message)
            }
            Level::WARN => {
                tracing::warn!(target: CALL_LOG_TARGET, fields, "{}", record.message)
            }
            Level::INFO => {
                tracing::info!(target: CALL_LOG_TARGET, fields, "{}", record.message)
            }
            Level::DEBUG => {
                tracing::debug!(target: CALL_LOG_TARGET, fields, "{}", record.message)
            }
            Level::TRACE => {
                tracing::trace!(target: CALL_LOG_TARGET, fields, "{}", record.message)
            }
        }
    }
}

/// Immutable leveled logger.
///
/// Every transformation ([`Logger::with_level`], [`Logger::with_fields`])
/// returns a new handle; the sink is shared, the level and fields are not.
#[derive(Clone)]
pub struct Logger {
    level: LevelFilter,
    fields: Fields,
    sink: Arc<dyn LogSink>,
}

impl Logger {
    /// Logger writing to [`TracingSink`].
    pub fn new(level: LevelFilter) -> Self {
        Self::with_sink(level, Arc::new(TracingSink))
    }

    pub fn with_sink(level: LevelFilter, sink: Arc<dyn LogSink>) -> Self {
        Self {
            level,
            fields: Fields::new(),
            sink,
        }
    }

    pub fn level(&self) -> LevelFilter {
        self.level
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    /// Copy of this logger at a different level.
    pub fn with_level(&self, level: LevelFilter) -> Self {
        Self {
            level,
            ..self.clone()
        }
    }

    /// Copy of this logger with `fields` merged over the existing ones.
    pub fn with_fields(&self, fields: Fields) -> Self {
        let mut logger = self.clone();
        logger.fields.extend(fields);
        logger
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut logger = self.clone();
        logger.fields.insert(key.into(), value.into());
        logger
    }

    pub fn enabled(&self, level: Level) -> bool {
        level <= self.level
    }

    pub fn log(&self, level: Level, message: impl Into<String>) {
        if !self.enabled(level) {
            return;
        }
        self.sink.emit(&Record {
            level,
            message: message.into(),
            fields: self.fields.clone(),
        });
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(Level::ERROR, message)
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(Level::WARN, message)
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(Level::INFO, message)
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(Level::DEBUG, message)
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(Level::TRACE, message)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LevelFilter::INFO)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemorySink;

    #[test]
    fn with_level_leaves_base_untouched() {
        let base = Logger::new(LevelFilter::WARN);
        let debug = base.with_level(LevelFilter::DEBUG);

        assert_eq!(base.level(), LevelFilter::WARN);
        assert_eq!(debug.level(), LevelFilter::DEBUG);
    }

    #[test]
    fn with_fields_merges_and_overrides() {
        let base = Logger::default().with_field("a", 1).with_field("b", "x");
        let mut extra = Fields::new();
        extra.insert("b".into(), "y".into());
        extra.insert("c".into(), true.into());

        let merged = base.with_fields(extra);

        assert_eq!(merged.fields()["a"], 1);
        assert_eq!(merged.fields()["b"], "y");
        assert_eq!(merged.fields()["c"], true);
        assert_eq!(base.fields()["b"], "x");
        assert!(!base.fields().contains_key("c"));
    }

    #[test]
    fn records_above_level_are_dropped() {
        let sink = MemorySink::new();
        let logger = Logger::with_sink(LevelFilter::WARN, sink.clone()).with_field("k", "v");

        logger.info("quiet");
        logger.debug("quieter");
        logger.warn("loud");
        logger.error("louder");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, Level::WARN);
        assert_eq!(records[0].message, "loud");
        assert_eq!(records[0].fields["k"], "v");
        assert_eq!(records[1].level, Level::ERROR);
    }

    #[test]
    fn off_drops_everything() {
        let sink = MemorySink::new();
        let logger = Logger::with_sink(LevelFilter::OFF, sink.clone());

        logger.error("nothing");

        assert!(sink.records().is_empty());
    }
}
