//! Aggregation pipeline orchestrating sources, merge, classification, sink.
//!
//! One run moves through fetching (both sources in parallel, merging as pages
//! arrive), classifying, and committing. Commit is atomic with respect to
//! checkpoint updates: the sink must confirm the batch before any cursor
//! advances, so a failed run retries from exactly where the previous
//! committed run ended.

mod checkpoint;
mod sink;
mod summary;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use sink::{CommentSink, JsonlSink};
pub use summary::{RunSummary, SourceReport};

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::classify::DialogueActClassifier;
use crate::comment::{
    AggregationError, ClassifiedComment, MergeSet, Origin, RawRecord, is_probably_english,
    normalize,
};
use crate::source::CommentSource;
use crate::telemetry::{TelemetryEvent, TelemetrySink};

/// Cooperative cancellation handle.
///
/// Requesting a stop lets in-flight page fetches finish, then halts each
/// fetch loop before it starts a new page, leaving checkpoints consistent
/// for resumption.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    stopped: Arc<AtomicBool>,
}

impl StopSignal {
    /// Creates a signal in the running state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Asks the pipeline to halt after the current page.
    pub fn request_stop(&self) {
        self.stopped.store(true, Ordering::SeqCst);
    }

    /// True once a stop has been requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }
}

/// Tunable limits for one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Upper bound on merged-but-uncommitted comments held in memory.
    /// Reaching it pauses fetching instead of growing without limit.
    pub max_buffered_comments: usize,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_buffered_comments: 50_000,
        }
    }
}

/// Collaborators injected into a pipeline run.
///
/// Everything is borrowed: the pipeline owns no I/O resources and performs no
/// environment lookups of its own.
pub struct PipelineDeps<'run> {
    /// Bulk-export adapter.
    pub snapshot: &'run dyn CommentSource,
    /// Live-API adapter.
    pub live: &'run dyn CommentSource,
    /// Pre-loaded dialogue-act model.
    pub classifier: &'run DialogueActClassifier,
    /// Per-source cursor persistence.
    pub checkpoints: &'run dyn CheckpointStore,
    /// Destination for the classified batch.
    pub sink: &'run dyn CommentSink,
    /// Telemetry sink for operational events.
    pub telemetry: &'run dyn TelemetrySink,
}

/// What one fetch loop produced, before checkpoints are finalised.
struct SourceOutcome {
    origin: Origin,
    initial: Checkpoint,
    cursor: Checkpoint,
    records_fetched: u64,
    dropped_schema: u64,
    dropped_non_english: u64,
    failure: Option<AggregationError>,
    paused: bool,
}

impl SourceOutcome {
    fn starting(origin: Origin, initial: Checkpoint) -> Self {
        Self {
            origin,
            cursor: initial.clone(),
            initial,
            records_fetched: 0,
            dropped_schema: 0,
            dropped_non_english: 0,
            failure: None,
            paused: false,
        }
    }

    fn failed_at_start(origin: Origin, error: AggregationError) -> Self {
        let mut outcome = Self::starting(origin, Checkpoint::Start);
        outcome.failure = Some(error);
        outcome
    }
}

/// Aggregation pipeline over injected collaborators.
pub struct Pipeline<'run> {
    deps: PipelineDeps<'run>,
    options: PipelineOptions,
}

impl<'run> Pipeline<'run> {
    /// Creates a pipeline with default options.
    #[must_use]
    pub fn new(deps: PipelineDeps<'run>) -> Self {
        Self {
            deps,
            options: PipelineOptions::default(),
        }
    }

    /// Overrides the run limits.
    #[must_use]
    pub const fn with_options(mut self, options: PipelineOptions) -> Self {
        self.options = options;
        self
    }

    /// Executes one aggregation run.
    ///
    /// A terminal failure in one source does not abort the other: the run
    /// proceeds with whatever was collected and reports the failure in the
    /// summary, leaving the failed source's checkpoint to retry next run.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::SinkCommitFailure`] when the sink rejects
    /// the batch (no checkpoint advances), or [`AggregationError::Io`] when a
    /// checkpoint cannot be read or written after a confirmed commit.
    pub async fn run(&self, stop: &StopSignal) -> Result<RunSummary, AggregationError> {
        let working = Mutex::new(MergeSet::new());

        let (snapshot_outcome, live_outcome) = tokio::join!(
            self.drive_source(self.deps.snapshot, &working, stop),
            self.drive_source(self.deps.live, &working, stop),
        );

        let merge_set = working.into_inner();
        let stats = merge_set.stats();
        let merged = merge_set.into_sorted();
        let merged_count = u64::try_from(merged.len()).unwrap_or(u64::MAX);
        tracing::info!(
            merged = merged_count,
            inserted = stats.inserted,
            replaced = stats.replaced,
            retained = stats.retained,
            "merge complete"
        );

        let classified: Vec<ClassifiedComment> = merged
            .into_iter()
            .map(|comment| {
                let classification = self.deps.classifier.classify(&comment.body_text);
                ClassifiedComment::new(comment, classification)
            })
            .collect();
        let classified_count = u64::try_from(classified.len()).unwrap_or(u64::MAX);

        // Commit before any checkpoint moves; a sink failure leaves every
        // cursor at its pre-run value so the retry is idempotent.
        self.deps.sink.write_batch(&classified)?;

        let snapshot_report = self.finalise_source(snapshot_outcome)?;
        let live_report = self.finalise_source(live_outcome)?;

        let summary = RunSummary {
            merged_count,
            classified_count,
            committed: true,
            snapshot: snapshot_report,
            live: live_report,
        };

        self.deps.telemetry.record(TelemetryEvent::RunCompleted {
            merged_count,
            classified_count,
            dropped_count: summary.dropped_count(),
        });
        tracing::info!(
            merged = summary.merged_count,
            classified = summary.classified_count,
            dropped = summary.dropped_count(),
            complete = summary.is_complete(),
            "run committed"
        );

        Ok(summary)
    }

    /// Drives one source to exhaustion, failure, or pause, merging each page
    /// into the shared working set as it arrives.
    async fn drive_source(
        &self,
        source: &dyn CommentSource,
        working: &Mutex<MergeSet>,
        stop: &StopSignal,
    ) -> SourceOutcome {
        let origin = source.origin();
        let initial = match self.deps.checkpoints.read(origin) {
            Ok(cursor) => cursor,
            Err(error) => return SourceOutcome::failed_at_start(origin, error),
        };
        let mut outcome = SourceOutcome::starting(origin, initial);

        loop {
            if stop.is_stopped() {
                tracing::info!(origin = %origin, "stop requested, pausing fetch");
                outcome.paused = true;
                break;
            }
            if working.lock().await.len() >= self.options.max_buffered_comments {
                tracing::warn!(origin = %origin, "working-set bound reached, pausing fetch");
                outcome.paused = true;
                break;
            }

            let page = match source.fetch_page(&outcome.cursor).await {
                Ok(page) => page,
                Err(error) => {
                    tracing::warn!(origin = %origin, error = %error, "source fetch failed");
                    outcome.failure = Some(error);
                    break;
                }
            };

            merge_page(&mut outcome, page.records, working).await;
            outcome.cursor = page.next;
            if page.exhausted {
                break;
            }
        }

        outcome
    }

    /// Advances the source's checkpoint (only past pages that were merged and
    /// committed) and converts the outcome into its report.
    fn finalise_source(&self, outcome: SourceOutcome) -> Result<SourceReport, AggregationError> {
        let advanced = outcome.cursor != outcome.initial;
        if advanced {
            self.deps.checkpoints.write(outcome.origin, &outcome.cursor)?;
        }
        if let Some(error) = &outcome.failure {
            self.deps.telemetry.record(TelemetryEvent::SourceFetchFailed {
                origin: outcome.origin,
                message: error.to_string(),
            });
        }

        Ok(SourceReport {
            records_fetched: outcome.records_fetched,
            dropped_schema: outcome.dropped_schema,
            dropped_non_english: outcome.dropped_non_english,
            failure: outcome.failure.map(|error| error.to_string()),
            checkpoint_advanced: advanced,
            paused: outcome.paused,
        })
    }
}

/// Normalises and merges one page under the working-set lock.
async fn merge_page(
    outcome: &mut SourceOutcome,
    records: Vec<RawRecord>,
    working: &Mutex<MergeSet>,
) {
    let mut guard = working.lock().await;
    for record in records {
        outcome.records_fetched += 1;
        match normalize(&record) {
            Ok(comment) if is_probably_english(&comment.body_text) => {
                guard.merge(comment);
            }
            Ok(_) => outcome.dropped_non_english += 1,
            Err(error) => {
                tracing::debug!(origin = %outcome.origin, error = %error, "record dropped");
                outcome.dropped_schema += 1;
            }
        }
    }
}
