//! Application telemetry events and sinks.
//!
//! magpie is a local-first tool, but it still benefits from lightweight
//! telemetry to capture operational signals: run counts, per-source fetch
//! failures, and the active checkpoint-database schema version.

use std::io;

use serde::{Deserialize, Serialize};

use crate::comment::Origin;

/// A structured telemetry event emitted by magpie.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// Records the current database schema version after migrations apply.
    SchemaVersionRecorded {
        /// Diesel migration version string (e.g. `20260801000000`).
        schema_version: String,
    },
    /// Records the headline counts of a committed run.
    RunCompleted {
        /// Distinct comments surviving the merge.
        merged_count: u64,
        /// Comments classified and committed.
        classified_count: u64,
        /// Records dropped across both sources.
        dropped_count: u64,
    },
    /// Records a terminal fetch failure for one source.
    SourceFetchFailed {
        /// Which origin failed.
        origin: Origin,
        /// Rendered failure detail.
        message: String,
    },
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

/// Records telemetry events to stderr as JSON lines (JSONL).
///
/// This is intended for local debugging and is not transmitted anywhere.
#[derive(Debug, Default)]
pub struct StderrJsonlTelemetrySink;

impl TelemetrySink for StderrJsonlTelemetrySink {
    fn record(&self, event: TelemetryEvent) {
        let Ok(serialised) = serde_json::to_string(&event) else {
            return;
        };

        let _ignored = writeln_stderr(&serialised);
    }
}

fn writeln_stderr(message: &str) -> io::Result<()> {
    use io::Write;

    let mut stderr = io::stderr().lock();
    writeln!(stderr, "{message}")
}

#[cfg(any(test, feature = "test-support"))]
pub mod test_support {
    //! Recording sink for assertions in tests.

    use std::sync::Mutex;

    use super::{TelemetryEvent, TelemetrySink};

    /// Telemetry sink that stores every event for later inspection.
    #[derive(Debug, Default)]
    pub struct RecordingTelemetrySink {
        events: Mutex<Vec<TelemetryEvent>>,
    }

    impl RecordingTelemetrySink {
        /// Returns a copy of all recorded events.
        #[must_use]
        pub fn events(&self) -> Vec<TelemetryEvent> {
            self.events
                .lock()
                .map(|events| events.clone())
                .unwrap_or_default()
        }
    }

    impl TelemetrySink for RecordingTelemetrySink {
        fn record(&self, event: TelemetryEvent) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }
    }
}
