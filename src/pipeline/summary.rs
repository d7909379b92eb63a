//! Run summaries reported to the caller.
//!
//! A completed run always reports counts of merged, classified, and dropped
//! records plus per-source failure status — never a silent partial success.

use crate::comment::Origin;

/// What happened to one source during a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceReport {
    /// Raw records handed to the normaliser.
    pub records_fetched: u64,
    /// Records dropped because required fields were missing or malformed.
    pub dropped_schema: u64,
    /// Records dropped by the English-language heuristic.
    pub dropped_non_english: u64,
    /// Terminal failure for this source, when one occurred.
    pub failure: Option<String>,
    /// True when the cursor moved past its pre-run value.
    pub checkpoint_advanced: bool,
    /// True when fetching stopped early (stop signal or working-set bound).
    pub paused: bool,
}

impl SourceReport {
    /// Records dropped for any reason.
    #[must_use]
    pub const fn dropped(&self) -> u64 {
        self.dropped_schema + self.dropped_non_english
    }
}

/// Outcome of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Distinct comments surviving the merge.
    pub merged_count: u64,
    /// Comments classified and committed (always equals `merged_count` once
    /// the sink accepts the batch; classification is total).
    pub classified_count: u64,
    /// True when the sink confirmed the batch.
    pub committed: bool,
    /// Snapshot-source report.
    pub snapshot: SourceReport,
    /// Live-source report.
    pub live: SourceReport,
}

impl RunSummary {
    /// True when both sources ran to completion and the batch committed.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.committed
            && self.snapshot.failure.is_none()
            && self.live.failure.is_none()
            && !self.snapshot.paused
            && !self.live.paused
    }

    /// Total records dropped across both sources.
    #[must_use]
    pub const fn dropped_count(&self) -> u64 {
        self.snapshot.dropped() + self.live.dropped()
    }

    /// Failure messages by source, for callers that report per-origin status.
    #[must_use]
    pub fn failures_by_source(&self) -> Vec<(Origin, &str)> {
        let mut failures = Vec::new();
        if let Some(message) = self.snapshot.failure.as_deref() {
            failures.push((Origin::Snapshot, message));
        }
        if let Some(message) = self.live.failure.as_deref() {
            failures.push((Origin::Live, message));
        }
        failures
    }
}
