//! Diagnostics Sink
//!
//! Collects `(level, source, message, data)` entries from both surfaces and
//! the relay. A sink must never block or fail the caller: the presentation
//! keeps running whether or not anybody reads the log.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Severity of a diagnostics entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Verbose detail
    Debug,
    /// Normal operation
    Info,
    /// Something unexpected but recoverable
    Warn,
    /// A failure the operator should see
    Error,
}

/// Which part of the system produced an entry
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogSource {
    /// The relay owning both surfaces
    Relay,
    /// Operator-facing control surface
    Control,
    /// Audience-facing display surface
    Display,
}

/// One diagnostics entry
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch
    pub ts: i64,
    /// Severity
    pub level: LogLevel,
    /// Producer
    pub source: LogSource,
    /// Message text
    pub msg: String,
    /// Optional structured payload
    pub data: serde_json::Value,
}

impl LogEntry {
    /// Create an entry stamped with the current time
    pub fn new(level: LogLevel, source: LogSource, msg: impl Into<String>) -> Self {
        Self {
            ts: chrono::Utc::now().timestamp_millis(),
            level,
            source,
            msg: msg.into(),
            data: serde_json::Value::Null,
        }
    }

    /// Attach structured data
    #[must_use]
    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = data;
        self
    }
}

/// Destination for diagnostics entries
pub trait DiagnosticsSink: Send + Sync {
    /// Record an entry; must not block
    fn record(&self, entry: LogEntry);

    /// Convenience wrapper around [`record`](Self::record)
    fn log(&self, level: LogLevel, source: LogSource, msg: &str) {
        self.record(LogEntry::new(level, source, msg));
    }
}

/// Sink that re-emits entries as `tracing` events
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn record(&self, entry: LogEntry) {
        let source = format!("{:?}", entry.source).to_uppercase();
        match entry.level {
            LogLevel::Debug => {
                tracing::debug!(source = %source, data = %entry.data, "{}", entry.msg);
            }
            LogLevel::Info => {
                tracing::info!(source = %source, data = %entry.data, "{}", entry.msg);
            }
            LogLevel::Warn => {
                tracing::warn!(source = %source, data = %entry.data, "{}", entry.msg);
            }
            LogLevel::Error => {
                tracing::error!(source = %source, data = %entry.data, "{}", entry.msg);
            }
        }
    }
}

/// Sink that forwards entries over a bounded channel
///
/// When the channel is full or closed the entry is dropped.
#[derive(Clone, Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<LogEntry>,
}

impl ChannelSink {
    /// Create a sink and the receiver that drains it
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<LogEntry>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl DiagnosticsSink for ChannelSink {
    fn record(&self, entry: LogEntry) {
        if let Err(e) = self.tx.try_send(entry) {
            tracing::trace!(error = %e, "Diagnostics entry dropped");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_sink_forwards() {
        let (sink, mut rx) = ChannelSink::new(4);
        sink.log(LogLevel::Info, LogSource::Relay, "Forwarded item to display");
        let entry = rx.try_recv().unwrap();
        assert_eq!(entry.level, LogLevel::Info);
        assert_eq!(entry.source, LogSource::Relay);
        assert_eq!(entry.msg, "Forwarded item to display");
        assert!(entry.ts > 0);
    }

    #[test]
    fn test_channel_sink_never_blocks_when_full() {
        let (sink, mut rx) = ChannelSink::new(1);
        sink.log(LogLevel::Info, LogSource::Display, "first");
        sink.log(LogLevel::Info, LogSource::Display, "second");
        assert_eq!(rx.try_recv().unwrap().msg, "first");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_channel_sink_survives_closed_receiver() {
        let (sink, rx) = ChannelSink::new(1);
        drop(rx);
        sink.log(LogLevel::Error, LogSource::Control, "nobody listening");
    }

    #[test]
    fn test_entry_serializes_levels_uppercase() {
        let entry = LogEntry::new(LogLevel::Warn, LogSource::Display, "x")
            .with_data(serde_json::json!({"port": 4312}));
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["level"], "WARN");
        assert_eq!(json["source"], "DISPLAY");
        assert_eq!(json["data"]["port"], 4312);
    }
}
