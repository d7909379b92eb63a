//! Per-source cursors and the store that persists them between runs.

use serde::{Deserialize, Serialize};

use crate::comment::{AggregationError, Origin};

/// How far a source has been consumed.
///
/// Cursors are opaque to the pipeline: it reads one at start, hands it to the
/// matching adapter, and writes the adapter's updated cursor back only after
/// the sink confirms the batch. Page cursors belong to the live source,
/// offset cursors to the snapshot source.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Checkpoint {
    /// Nothing consumed yet; the adapter starts from the beginning.
    #[default]
    Start,
    /// Next page to request from the live API.
    Page {
        /// 1-based page number to fetch next.
        next_page: u32,
    },
    /// Number of export records already merged and committed.
    Offset {
        /// Records to skip when resuming.
        records_consumed: u64,
    },
}

/// Narrow persistence interface for per-source cursors.
///
/// Reading a source that has never been checkpointed yields
/// [`Checkpoint::Start`]. Writes must be atomic per source: a partially
/// written cursor would desynchronise resumption.
pub trait CheckpointStore: Send + Sync {
    /// Loads the cursor for `origin`, or [`Checkpoint::Start`] when absent.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Io`] when the store cannot be read.
    fn read(&self, origin: Origin) -> Result<Checkpoint, AggregationError>;

    /// Persists the cursor for `origin`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Io`] when the store cannot be written.
    fn write(&self, origin: Origin, checkpoint: &Checkpoint) -> Result<(), AggregationError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::Checkpoint;

    #[rstest]
    #[case::start(Checkpoint::Start, r#"{"kind":"start"}"#)]
    #[case::page(Checkpoint::Page { next_page: 3 }, r#"{"kind":"page","next_page":3}"#)]
    #[case::offset(
        Checkpoint::Offset { records_consumed: 1200 },
        r#"{"kind":"offset","records_consumed":1200}"#
    )]
    fn cursors_round_trip_through_json(#[case] checkpoint: Checkpoint, #[case] expected: &str) {
        let serialised = serde_json::to_string(&checkpoint).expect("should serialise");
        assert_eq!(serialised, expected);

        let parsed: Checkpoint = serde_json::from_str(&serialised).expect("should deserialise");
        assert_eq!(parsed, checkpoint);
    }
}
