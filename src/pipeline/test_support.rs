//! Scripted collaborators for pipeline tests.
//!
//! These fakes let tests script source pages, capture committed batches, and
//! inspect checkpoint writes without touching the network or the filesystem.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use crate::comment::{AggregationError, ClassifiedComment, Origin, RawRecord};
use crate::source::{CommentSource, SourcePage};

use super::checkpoint::{Checkpoint, CheckpointStore};
use super::sink::CommentSink;

/// Checkpoint store backed by a process-local map.
#[derive(Debug, Default)]
pub struct InMemoryCheckpointStore {
    entries: Mutex<HashMap<Origin, Checkpoint>>,
}

impl InMemoryCheckpointStore {
    /// Returns the stored cursor for `origin`, if any write happened.
    #[must_use]
    pub fn stored(&self, origin: Origin) -> Option<Checkpoint> {
        self.entries
            .lock()
            .ok()
            .and_then(|entries| entries.get(&origin).cloned())
    }

    /// Seeds a cursor as if a previous run had committed it.
    pub fn seed(&self, origin: Origin, checkpoint: Checkpoint) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(origin, checkpoint);
        }
    }
}

impl CheckpointStore for InMemoryCheckpointStore {
    fn read(&self, origin: Origin) -> Result<Checkpoint, AggregationError> {
        Ok(self.stored(origin).unwrap_or_default())
    }

    fn write(&self, origin: Origin, checkpoint: &Checkpoint) -> Result<(), AggregationError> {
        self.seed(origin, checkpoint.clone());
        Ok(())
    }
}

/// Sink that captures every committed batch.
#[derive(Debug, Default)]
pub struct CollectingSink {
    batches: Mutex<Vec<Vec<ClassifiedComment>>>,
}

impl CollectingSink {
    /// The most recently committed batch.
    #[must_use]
    pub fn last_batch(&self) -> Option<Vec<ClassifiedComment>> {
        self.batches
            .lock()
            .ok()
            .and_then(|batches| batches.last().cloned())
    }

    /// Number of commits accepted so far.
    #[must_use]
    pub fn commit_count(&self) -> usize {
        self.batches.lock().map(|batches| batches.len()).unwrap_or(0)
    }
}

impl CommentSink for CollectingSink {
    fn write_batch(&self, batch: &[ClassifiedComment]) -> Result<(), AggregationError> {
        if let Ok(mut batches) = self.batches.lock() {
            batches.push(batch.to_vec());
        }
        Ok(())
    }
}

/// Sink that rejects every batch.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingSink;

impl CommentSink for FailingSink {
    fn write_batch(&self, _batch: &[ClassifiedComment]) -> Result<(), AggregationError> {
        Err(AggregationError::SinkCommitFailure {
            message: "scripted sink failure".to_owned(),
        })
    }
}

/// Source that serves pre-scripted pages keyed by cursor position.
///
/// Pages use live-style page cursors regardless of origin; the pipeline
/// treats cursors as opaque, so the scripts stay simple.
#[derive(Debug)]
pub struct ScriptedSource {
    origin: Origin,
    pages: Vec<Result<Vec<RawRecord>, AggregationError>>,
}

impl ScriptedSource {
    /// Creates a source serving `pages` in order.
    #[must_use]
    pub const fn new(origin: Origin, pages: Vec<Result<Vec<RawRecord>, AggregationError>>) -> Self {
        Self { origin, pages }
    }
}

#[async_trait]
impl CommentSource for ScriptedSource {
    fn origin(&self) -> Origin {
        self.origin
    }

    async fn fetch_page(&self, checkpoint: &Checkpoint) -> Result<SourcePage, AggregationError> {
        let index = match checkpoint {
            Checkpoint::Start => 0_usize,
            Checkpoint::Page { next_page } => {
                usize::try_from(next_page.saturating_sub(1)).unwrap_or(usize::MAX)
            }
            Checkpoint::Offset { records_consumed } => {
                usize::try_from(*records_consumed).unwrap_or(usize::MAX)
            }
        };

        match self.pages.get(index) {
            None => Ok(SourcePage {
                records: Vec::new(),
                next: checkpoint.clone(),
                exhausted: true,
            }),
            Some(Err(error)) => Err(error.clone()),
            Some(Ok(records)) => {
                let next_page = u32::try_from(index).unwrap_or(u32::MAX).saturating_add(2);
                Ok(SourcePage {
                    records: records.clone(),
                    next: Checkpoint::Page { next_page },
                    exhausted: index + 1 >= self.pages.len(),
                })
            }
        }
    }
}

/// Builds a snapshot-export raw record for a fixed test repository.
#[must_use]
pub fn snapshot_export_record(id: u64, body: &str, updated_at: &str) -> RawRecord {
    let value = json!({
        "owner": "realm",
        "repo": "realm-java",
        "pullreq_id": 5473,
        "id": id,
        "body": body,
        "author": "reviewer",
        "created_at": "2019-05-01T00:00:00Z",
        "updated_at": updated_at
    });
    raw_record(Origin::Snapshot, value)
}

/// Builds a live-API raw record for the same test repository.
#[must_use]
pub fn live_api_record(id: u64, body: &str, updated_at: &str) -> RawRecord {
    let value = json!({
        "id": id,
        "body": body,
        "user": { "login": "reviewer" },
        "pull_request_url": "https://api.github.com/repos/realm/realm-java/pulls/5473",
        "created_at": "2019-05-01T00:00:00Z",
        "updated_at": updated_at
    });
    raw_record(Origin::Live, value)
}

fn raw_record(origin: Origin, value: serde_json::Value) -> RawRecord {
    let serde_json::Value::Object(fields) = value else {
        return RawRecord::new(origin, serde_json::Map::new());
    };
    RawRecord::new(origin, fields)
}
