//! Snapshot source adapter reading a bulk export file.
//!
//! The snapshot is a GHTorrent-style export of the `pull_request_comments`
//! collection: JSON Lines, one document per line, in ascending creation
//! order. The cursor counts records already consumed, so a resumed run skips
//! exactly what previous runs merged and committed. The adapter never blocks
//! on the network; an unreadable file fails the whole source with
//! [`AggregationError::SourceUnavailable`].

use std::fs::File;
use std::io::{BufRead, BufReader};

use async_trait::async_trait;
use camino::Utf8PathBuf;
use serde_json::{Map, Value};

use crate::comment::{AggregationError, Origin, RawRecord};
use crate::pipeline::Checkpoint;

use super::{CommentSource, SourcePage};

/// Bulk-export source reading fixed-size pages from a JSONL file.
#[derive(Debug, Clone)]
pub struct SnapshotSource {
    path: Utf8PathBuf,
    page_size: u64,
}

impl SnapshotSource {
    /// Creates an adapter over the export at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when `page_size` is zero.
    pub fn new(path: impl Into<Utf8PathBuf>, page_size: u64) -> Result<Self, AggregationError> {
        if page_size == 0 {
            return Err(AggregationError::Configuration {
                message: "snapshot page size must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            path: path.into(),
            page_size,
        })
    }

    fn unavailable(&self, detail: &str) -> AggregationError {
        AggregationError::SourceUnavailable {
            origin: Origin::Snapshot,
            message: format!("{path}: {detail}", path = self.path),
        }
    }

    fn read_page(&self, records_consumed: u64) -> Result<SourcePage, AggregationError> {
        let file = File::open(&self.path)
            .map_err(|error| self.unavailable(&error.to_string()))?;
        let reader = BufReader::new(file);

        let mut records = Vec::new();
        let mut seen: u64 = 0;
        for line_result in reader.lines() {
            let line = line_result.map_err(|error| self.unavailable(&error.to_string()))?;
            seen += 1;
            if seen <= records_consumed {
                continue;
            }

            records.push(parse_line(&line));
            if records_length(&records) == self.page_size {
                break;
            }
        }

        let read = records_length(&records);
        Ok(SourcePage {
            records,
            next: Checkpoint::Offset {
                records_consumed: records_consumed + read,
            },
            exhausted: read < self.page_size,
        })
    }
}

/// Parses one export line.
///
/// A line that is not a JSON object still becomes a record — with no fields —
/// so the normaliser drops and counts it as a schema mismatch instead of the
/// adapter losing it silently.
fn parse_line(line: &str) -> RawRecord {
    let fields = serde_json::from_str::<Value>(line)
        .ok()
        .and_then(|value| match value {
            Value::Object(object) => Some(object),
            _ => None,
        })
        .unwrap_or_else(Map::new);
    RawRecord::new(Origin::Snapshot, fields)
}

fn records_length(records: &[RawRecord]) -> u64 {
    u64::try_from(records.len()).unwrap_or(u64::MAX)
}

#[async_trait]
impl CommentSource for SnapshotSource {
    fn origin(&self) -> Origin {
        Origin::Snapshot
    }

    async fn fetch_page(&self, checkpoint: &Checkpoint) -> Result<SourcePage, AggregationError> {
        let records_consumed = match checkpoint {
            Checkpoint::Start => 0,
            Checkpoint::Offset { records_consumed } => *records_consumed,
            Checkpoint::Page { .. } => {
                return Err(AggregationError::Configuration {
                    message: "snapshot source cannot resume from a page cursor".to_owned(),
                });
            }
        };

        self.read_page(records_consumed)
    }
}
