//! Run telemetry events and sinks.
//!
//! Every run ends with a single [`TelemetryEvent::RunFinished`] event that
//! summarises what happened. Nothing is transmitted anywhere; the CLI prints
//! events to stderr as JSON lines when verbose output is requested.

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};

use crate::upvotes::RunReport;

/// A structured telemetry event emitted by a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Summarises a finished run.
    RunFinished {
        /// `done`, `rate_limited`, or `failed`.
        outcome: String,
        /// Items that received a score.
        scored: u64,
        /// Items that were skipped.
        skipped: u64,
        /// Scores written back.
        written: u64,
        /// Rate limit points spent.
        rate_limit_cost: u64,
    },
}

impl From<&RunReport> for TelemetryEvent {
    fn from(report: &RunReport) -> Self {
        Self::RunFinished {
            outcome: report.outcome.as_str().to_owned(),
            scored: report.counters.scored,
            skipped: report.counters.skipped,
            written: report.counters.written,
            rate_limit_cost: report.rate_limit_cost,
        }
    }
}

/// A sink that can record telemetry events.
pub trait TelemetrySink: Send + Sync {
    /// Records a telemetry event.
    fn record(&self, event: TelemetryEvent);
}

/// Telemetry sink that drops all events.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetrySink;

impl TelemetrySink for NoopTelemetrySink {
    fn record(&self, _event: TelemetryEvent) {}
}

/// Records telemetry events as JSON lines (JSONL) on a writer.
///
/// Write failures are dropped: telemetry never fails a run.
#[derive(Debug)]
pub struct JsonlTelemetrySink<W> {
    writer: Mutex<W>,
}

impl<W: Write> JsonlTelemetrySink<W> {
    /// Creates a sink that appends one JSON object per line to `writer`.
    #[must_use]
    pub const fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Returns the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns the poisoned lock error when a writer panicked mid-record.
    pub fn into_inner(self) -> Result<W, PoisonError<W>> {
        self.writer.into_inner()
    }
}

impl JsonlTelemetrySink<io::Stderr> {
    /// Sink writing to the process's stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> TelemetrySink for JsonlTelemetrySink<W> {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };
        let Ok(mut writer) = self.writer.lock() else {
            return;
        };

        let _ignored = writeln!(writer, "{serialised}");
    }
}
