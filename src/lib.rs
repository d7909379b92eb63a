//! magpie library crate: pull-request comment aggregation and classification.
//!
//! magpie merges GitHub pull-request review comments from two origins — a
//! bulk GHTorrent-style snapshot export and the live paginated REST API —
//! into one deduplicated set, labels each comment's dialogue act with a
//! pre-trained model, and commits the classified batch to a JSONL sink.
//! Checkpoints persisted per source make runs incremental and resumable.

pub mod classify;
pub mod comment;
pub mod config;
pub mod persistence;
pub mod pipeline;
pub mod source;
pub mod telemetry;

pub use classify::{Classification, DialogueAct, DialogueActClassifier};
pub use comment::{AggregationError, CanonicalComment, ClassifiedComment, CommentId, Origin};
pub use config::MagpieConfig;
pub use pipeline::{
    Checkpoint, CheckpointStore, CommentSink, JsonlSink, Pipeline, PipelineDeps, PipelineOptions,
    RunSummary, StopSignal,
};
pub use source::{AccessToken, CommentSource, LiveSource, RepositoryTarget, SnapshotSource};
