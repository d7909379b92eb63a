//! Sink interface and the shipped JSONL implementation.
//!
//! A batch is all-or-nothing: checkpoint advancement depends on full-batch
//! success, so partial writes are not acceptable. The JSONL sink gets that by
//! writing the whole batch to a sibling temp file and renaming it over the
//! target only once every byte is flushed.

use std::fs;
use std::io::Write;

use camino::Utf8PathBuf;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::classify::DialogueAct;
use crate::comment::{AggregationError, ClassifiedComment, Origin};

/// External collaborator receiving the finalised comment set.
pub trait CommentSink: Send + Sync {
    /// Writes the batch atomically.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::SinkCommitFailure`] when any part of the
    /// write fails; the caller must then leave every checkpoint untouched.
    fn write_batch(&self, batch: &[ClassifiedComment]) -> Result<(), AggregationError>;
}

/// One classified comment as serialised to the output file.
#[derive(Debug, Serialize)]
struct ExportedComment<'comment> {
    comment_id: String,
    repository: &'comment str,
    pull_request: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    author: Option<&'comment str>,
    body: &'comment str,
    created_at: &'comment DateTime<Utc>,
    updated_at: &'comment DateTime<Utc>,
    origin: Origin,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    truncated: bool,
    dialogue_act: DialogueAct,
    act_confidence: f64,
}

impl<'comment> From<&'comment ClassifiedComment> for ExportedComment<'comment> {
    fn from(classified: &'comment ClassifiedComment) -> Self {
        let comment = classified.comment();
        Self {
            comment_id: comment.comment_id.to_string(),
            repository: &comment.repository,
            pull_request: comment.pull_request,
            author: comment.author.as_deref(),
            body: &comment.body_text,
            created_at: &comment.created_at,
            updated_at: &comment.updated_at,
            origin: comment.origin,
            truncated: comment.truncated,
            dialogue_act: classified.dialogue_act(),
            act_confidence: classified.act_confidence(),
        }
    }
}

/// Sink writing one JSON object per comment, committed atomically.
#[derive(Debug, Clone)]
pub struct JsonlSink {
    path: Utf8PathBuf,
}

impl JsonlSink {
    /// Creates a sink targeting `path`.
    #[must_use]
    pub fn new(path: impl Into<Utf8PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn commit_failure(&self, detail: &str) -> AggregationError {
        AggregationError::SinkCommitFailure {
            message: format!("{path}: {detail}", path = self.path),
        }
    }
}

impl CommentSink for JsonlSink {
    fn write_batch(&self, batch: &[ClassifiedComment]) -> Result<(), AggregationError> {
        let mut buffer: Vec<u8> = Vec::new();
        for classified in batch {
            serde_json::to_writer(&mut buffer, &ExportedComment::from(classified))
                .map_err(|error| self.commit_failure(&error.to_string()))?;
            writeln!(buffer).map_err(|error| self.commit_failure(&error.to_string()))?;
        }

        let staging_path = Utf8PathBuf::from(format!("{path}.tmp", path = self.path));
        fs::write(&staging_path, &buffer)
            .map_err(|error| self.commit_failure(&error.to_string()))?;
        fs::rename(&staging_path, &self.path)
            .map_err(|error| self.commit_failure(&error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::{CommentSink, JsonlSink};
    use crate::classify::{Classification, DialogueAct};
    use crate::comment::{
        AggregationError, CanonicalComment, ClassifiedComment, CommentId, Origin,
    };

    fn classified(id: u64, body: &str) -> ClassifiedComment {
        let comment = CanonicalComment {
            comment_id: CommentId::Natural(id),
            repository: "realm/realm-java".to_owned(),
            pull_request: 5473,
            author: Some("reviewer".to_owned()),
            body_text: body.to_owned(),
            created_at: Utc
                .with_ymd_and_hms(2019, 5, 3, 14, 3, 0)
                .single()
                .expect("valid timestamp"),
            updated_at: Utc
                .with_ymd_and_hms(2019, 5, 4, 9, 0, 0)
                .single()
                .expect("valid timestamp"),
            origin: Origin::Live,
            truncated: false,
        };
        ClassifiedComment::new(comment, Classification::new(DialogueAct::Statement, 0.9))
    }

    #[fixture]
    fn output_dir() -> tempfile::TempDir {
        tempfile::tempdir().expect("temp dir should create")
    }

    fn sink_in(dir: &tempfile::TempDir) -> (JsonlSink, camino::Utf8PathBuf) {
        let path = camino::Utf8PathBuf::from_path_buf(dir.path().join("classified.jsonl"))
            .expect("temp path should be UTF-8");
        (JsonlSink::new(path.clone()), path)
    }

    #[rstest]
    fn writes_one_json_object_per_comment(output_dir: tempfile::TempDir) {
        let (sink, path) = sink_in(&output_dir);

        sink.write_batch(&[classified(1, "First"), classified(2, "Second")])
            .expect("batch should commit");

        let contents = std::fs::read_to_string(&path).expect("output should exist");
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value =
            serde_json::from_str(lines.first().expect("first line")).expect("valid JSON");
        assert_eq!(first.get("comment_id").and_then(|v| v.as_str()), Some("gh:1"));
        assert_eq!(
            first.get("dialogue_act").and_then(|v| v.as_str()),
            Some("Statement")
        );
        assert_eq!(first.get("origin").and_then(|v| v.as_str()), Some("live"));
    }

    #[rstest]
    fn empty_batch_produces_empty_file(output_dir: tempfile::TempDir) {
        let (sink, path) = sink_in(&output_dir);

        sink.write_batch(&[]).expect("empty batch should commit");

        let contents = std::fs::read_to_string(&path).expect("output should exist");
        assert!(contents.is_empty());
    }

    #[rstest]
    fn no_staging_file_remains_after_commit(output_dir: tempfile::TempDir) {
        let (sink, path) = sink_in(&output_dir);

        sink.write_batch(&[classified(1, "First")])
            .expect("batch should commit");

        assert!(!std::path::Path::new(&format!("{path}.tmp")).exists());
    }

    #[rstest]
    fn unwritable_target_is_commit_failure() {
        let sink = JsonlSink::new("/nonexistent/directory/classified.jsonl");

        let error = sink
            .write_batch(&[classified(1, "First")])
            .expect_err("should fail");
        assert!(matches!(error, AggregationError::SinkCommitFailure { .. }));
    }
}
