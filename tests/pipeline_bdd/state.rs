//! Scenario state for pipeline BDD tests.

use std::sync::Arc;

use magpie::comment::{AggregationError, ClassifiedComment, RawRecord};
use magpie::pipeline::RunSummary;
use magpie::pipeline::test_support::InMemoryCheckpointStore;
use rstest_bdd::Slot;
use rstest_bdd_macros::ScenarioState;

/// Pages scripted for one source, in fetch order.
pub(crate) type ScriptedPages = Vec<Result<Vec<RawRecord>, AggregationError>>;

/// State shared across steps in a pipeline scenario.
#[derive(ScenarioState, Default)]
pub struct PipelineState {
    /// Pages the snapshot source will serve.
    pub(crate) snapshot_pages: Slot<ScriptedPages>,
    /// Pages the live source will serve.
    pub(crate) live_pages: Slot<ScriptedPages>,
    /// Checkpoint store under test.
    pub(crate) store: Slot<Arc<InMemoryCheckpointStore>>,
    /// Whether the sink rejects every batch.
    pub(crate) sink_fails: Slot<bool>,
    /// Summary of a committed run.
    pub(crate) summary: Slot<RunSummary>,
    /// Error from a failed run.
    pub(crate) error: Slot<AggregationError>,
    /// Batch the sink accepted.
    pub(crate) batch: Slot<Vec<ClassifiedComment>>,
}

/// Appends a page to a scripted-pages slot, initialising it on first use.
pub(crate) fn push_page(slot: &Slot<ScriptedPages>, page: Result<Vec<RawRecord>, AggregationError>) {
    if slot.with_mut(|pages| pages.push(page.clone())).is_none() {
        slot.set(vec![page]);
    }
}

/// RFC 3339 timestamp on the fixture day at the given hour.
pub(crate) fn hour_timestamp(hour: u32) -> String {
    format!("2019-05-03T{hour:02}:00:00Z")
}
