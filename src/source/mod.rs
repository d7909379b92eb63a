//! Source adapters producing raw comment records.
//!
//! Each adapter hides one origin's pagination and rate-limit mechanics behind
//! [`CommentSource`]: the pipeline asks for one page at a time, starting from
//! a [`Checkpoint`], and receives records in ascending time order within that
//! source. The trait-based design enables mocking in pipeline tests while the
//! real implementations talk to the bulk export and the GitHub API.

mod backoff;
mod live;
pub mod rate_limit;
mod snapshot;

pub use backoff::BackoffPolicy;
pub use live::LiveSource;
pub use snapshot::SnapshotSource;

use async_trait::async_trait;

use crate::comment::{AggregationError, Origin, RawRecord};
use crate::pipeline::Checkpoint;

/// One fetched page of raw records plus the cursor to resume from.
#[derive(Debug, Clone, PartialEq)]
pub struct SourcePage {
    /// Records in ascending time order within the source.
    pub records: Vec<RawRecord>,
    /// Cursor covering everything up to and including this page. Persisting
    /// it and fetching again continues exactly after these records.
    pub next: Checkpoint,
    /// True when the source has no further data behind `next` right now.
    pub exhausted: bool,
}

/// A lazy, restartable producer of raw comment records from one origin.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentSource: Send + Sync {
    /// Which origin this adapter reads.
    fn origin(&self) -> Origin;

    /// Fetches the next page after `checkpoint`.
    ///
    /// Finite per invocation and restartable: fetching from the same
    /// checkpoint twice yields the same records.
    async fn fetch_page(&self, checkpoint: &Checkpoint) -> Result<SourcePage, AggregationError>;
}

/// Personal access token for the live API, validated non-blank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Validates that the token is non-empty and trims whitespace.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when the supplied string
    /// is blank.
    pub fn new(token: impl AsRef<str>) -> Result<Self, AggregationError> {
        let trimmed = token.as_ref().trim();
        if trimmed.is_empty() {
            return Err(AggregationError::Configuration {
                message: "access token is required".to_owned(),
            });
        }
        Ok(Self(trimmed.to_owned()))
    }
}

impl AsRef<str> for AccessToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Repository coordinates targeted by the live adapter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryTarget {
    owner: String,
    repo: String,
}

impl RepositoryTarget {
    /// Validates owner and repository names.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when either part is blank.
    pub fn new(owner: &str, repo: &str) -> Result<Self, AggregationError> {
        if owner.trim().is_empty() || repo.trim().is_empty() {
            return Err(AggregationError::Configuration {
                message: "repository owner and name are both required".to_owned(),
            });
        }
        Ok(Self {
            owner: owner.trim().to_owned(),
            repo: repo.trim().to_owned(),
        })
    }

    /// `owner/repo` form used in logs and summaries.
    #[must_use]
    pub fn slug(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    /// API path listing every review comment in the repository.
    pub(crate) fn review_comments_path(&self) -> String {
        format!("/repos/{}/{}/pulls/comments", self.owner, self.repo)
    }
}
