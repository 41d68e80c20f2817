//! Diagnostic records emitted around native calls.
//!
//! Every dispatched call produces exactly one record on the handle's
//! [`DiagnosticSink`]. Messages the unit logs itself through its callback
//! go to the same sink.

use crate::config::DispatchConfig;
use lib_types::Status;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Mutex, MutexGuard};

/// Severity of a diagnostic record, most severe first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Fatal,
    Error,
    Warning,
    Info,
    /// Mode transitions and other low-frequency calls.
    Verbose,
    /// High-frequency numeric calls.
    Debug,
}

impl Severity {
    /// Severity for a message the unit logged with `status`.
    pub fn from_status(status: Status) -> Self {
        match status {
            Status::Ok => Self::Info,
            Status::Warning => Self::Warning,
            Status::Discard | Status::Error => Self::Error,
            Status::Fatal => Self::Fatal,
            Status::Pending => Self::Verbose,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
            Self::Verbose => "verbose",
            Self::Debug => "debug",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Receiver of `(severity, module, message)` records.
///
/// A sink may drop anything; callers must not rely on records being kept.
pub trait DiagnosticSink: Send + Sync {
    fn log(&self, severity: Severity, module: &str, message: &str);
}

/// Forwards records to `tracing`, dropping those less severe than the
/// threshold.
#[derive(Clone, Copy, Debug)]
pub struct TracingSink {
    pub threshold: Severity,
}

impl TracingSink {
    pub fn new(threshold: Severity) -> Self {
        Self { threshold }
    }

    /// Sink honouring the configured `log_threshold`.
    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.log_threshold)
    }

    /// Whether records of `severity` are forwarded.
    pub fn keeps(&self, severity: Severity) -> bool {
        severity <= self.threshold
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(Severity::Verbose)
    }
}

impl DiagnosticSink for TracingSink {
    fn log(&self, severity: Severity, module: &str, message: &str) {
        if !self.keeps(severity) {
            return;
        }
        match severity {
            Severity::Fatal | Severity::Error => {
                tracing::error!(module, severity = %severity, "{message}")
            }
            Severity::Warning => tracing::warn!(module, "{message}"),
            Severity::Info => tracing::info!(module, "{message}"),
            Severity::Verbose => tracing::debug!(module, "{message}"),
            Severity::Debug => tracing::trace!(module, "{message}"),
        }
    }
}

/// One captured record.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub module: String,
    pub message: String,
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct CaptureSink {
    records: Mutex<Vec<DiagnosticRecord>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<DiagnosticRecord>> {
        // A panic while pushing cannot leave the vector inconsistent.
        self.records.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of all records so far.
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.lock().iter().filter(|r| r.severity == severity).count()
    }

    /// Remove and return all records.
    pub fn take(&self) -> Vec<DiagnosticRecord> {
        std::mem::take(&mut *self.lock())
    }
}

impl DiagnosticSink for CaptureSink {
    fn log(&self, severity: Severity, module: &str, message: &str) {
        self.lock().push(DiagnosticRecord {
            severity,
            module: module.to_string(),
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_severity_order() {
        assert!(Severity::Fatal < Severity::Error);
        assert!(Severity::Verbose < Severity::Debug);
        assert_eq!(Severity::from_status(Status::Discard), Severity::Error);
        assert_eq!(Severity::from_status(Status::Ok), Severity::Info);
    }

    #[test]
    fn test_capture_sink() {
        let sink = CaptureSink::new();
        sink.log(Severity::Verbose, "unit", "fmi2EnterEventMode");
        sink.log(Severity::Debug, "unit", "fmi2SetTime");
        assert_eq!(sink.len(), 2);
        assert_eq!(sink.count(Severity::Debug), 1);

        let records = sink.take();
        assert_eq!(records[0].message, "fmi2EnterEventMode");
        assert!(sink.is_empty());
    }

    #[derive(Clone, Default)]
    struct Buffer(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Buffer {
        fn write(&mut self, bytes: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(bytes);
            Ok(bytes.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Everything `sink` forwards to tracing while `f` runs.
    fn traced(sink: &TracingSink, f: impl FnOnce(&TracingSink)) -> String {
        let buffer = Buffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || f(sink));
        let bytes = buffer.0.lock().unwrap().clone();
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn test_tracing_sink_threshold_from_config() {
        let quiet = TracingSink::from_config(&DispatchConfig {
            log_threshold: Severity::Warning,
            ..Default::default()
        });
        assert!(quiet.keeps(Severity::Error));
        assert!(!quiet.keeps(Severity::Info));

        let output = traced(&quiet, |sink| {
            sink.log(Severity::Debug, "unit", "fmi2SetTime(time = 1)");
            sink.log(Severity::Verbose, "unit", "fmi2EnterEventMode()");
            sink.log(Severity::Error, "unit", "state vector rejected");
        });
        assert!(output.contains("state vector rejected"));
        assert!(!output.contains("fmi2SetTime"));
        assert!(!output.contains("fmi2EnterEventMode"));

        let chatty = TracingSink::from_config(&DispatchConfig {
            log_threshold: Severity::Debug,
            ..Default::default()
        });
        let output = traced(&chatty, |sink| sink.log(Severity::Debug, "unit", "fmi2SetTime(time = 1)"));
        assert!(output.contains("fmi2SetTime"));

        let default = TracingSink::from_config(&DispatchConfig::default());
        assert!(default.keeps(Severity::Verbose));
        assert!(!default.keeps(Severity::Debug));
    }
}
