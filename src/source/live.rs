//! Live-API source adapter backed by Octocrab.
//!
//! Reads the repository-wide review-comment listing
//! (`/repos/{owner}/{repo}/pulls/comments`) sorted by creation time, one page
//! per [`CommentSource::fetch_page`] call. Rate-limit rejections are retried
//! with exponential backoff; once the retry budget is spent the fetch fails
//! with [`AggregationError::RateLimitExhausted`] and the run resumes from the
//! checkpoint next time.

use async_trait::async_trait;
use http::{StatusCode, Uri};
use octocrab::{Octocrab, Page};
use serde_json::{Map, Value};

use crate::comment::{AggregationError, Origin, RawRecord};
use crate::pipeline::Checkpoint;

use super::rate_limit::RateLimitInfo;
use super::{AccessToken, BackoffPolicy, CommentSource, RepositoryTarget, SourcePage};

/// Live GitHub REST source for one repository.
#[derive(Debug)]
pub struct LiveSource {
    client: Octocrab,
    target: RepositoryTarget,
    per_page: u8,
    backoff: BackoffPolicy,
}

/// Outcome of a single page request, before backoff is applied.
enum FetchAttempt {
    Fetched(SourcePage),
    RateLimited {
        rate_limit: Option<RateLimitInfo>,
        message: String,
    },
}

impl LiveSource {
    /// Builds an authenticated adapter for the given repository.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::InvalidUrl`] when the API base URI cannot
    /// be parsed or [`AggregationError::Api`] when the client cannot be
    /// constructed.
    pub fn new(
        token: &AccessToken,
        api_base: &str,
        target: RepositoryTarget,
        per_page: u8,
        backoff: BackoffPolicy,
    ) -> Result<Self, AggregationError> {
        let base_uri: Uri = api_base
            .parse::<Uri>()
            .map_err(|error| AggregationError::InvalidUrl(error.to_string()))?;

        let client = Octocrab::builder()
            .personal_token(token.as_ref())
            .base_uri(base_uri)
            .map_err(|error| AggregationError::Api {
                message: format!("build client failed: {error}"),
            })?
            .build()
            .map_err(|error| map_octocrab_error("build client", &error))?;

        Ok(Self {
            client,
            target,
            per_page,
            backoff,
        })
    }

    /// Requests one page, classifying rate-limit rejections as retryable.
    async fn fetch_page_once(&self, page_number: u32) -> Result<FetchAttempt, AggregationError> {
        let page_value = page_number.to_string();
        let per_page_value = self.per_page.to_string();
        let query = [
            ("sort", "created"),
            ("direction", "asc"),
            ("page", page_value.as_str()),
            ("per_page", per_page_value.as_str()),
        ];

        let page: Page<Map<String, Value>> = match self
            .client
            .get(self.target.review_comments_path(), Some(&query))
            .await
        {
            Ok(page) => page,
            Err(octocrab::Error::GitHub { source, .. }) if is_rate_limit_error(&source) => {
                return Ok(FetchAttempt::RateLimited {
                    rate_limit: self.fetch_rate_limit_info().await,
                    message: source.message,
                });
            }
            Err(error) => return Err(map_octocrab_error("list review comments", &error)),
        };

        let has_next = page.next.is_some();
        let records: Vec<RawRecord> = page
            .items
            .into_iter()
            .map(|fields| RawRecord::new(Origin::Live, fields))
            .collect();

        // A partial page is re-fetched on the next run so late arrivals at
        // its tail are not skipped; the merge rule absorbs the re-reads.
        let next = if has_next {
            Checkpoint::Page {
                next_page: page_number.saturating_add(1),
            }
        } else {
            Checkpoint::Page {
                next_page: page_number,
            }
        };

        Ok(FetchAttempt::Fetched(SourcePage {
            records,
            next,
            exhausted: !has_next,
        }))
    }

    /// Fetches a rate-limit snapshot for error context, best effort.
    async fn fetch_rate_limit_info(&self) -> Option<RateLimitInfo> {
        let rate = self.client.ratelimit().get().await.ok()?.rate;
        let Ok(remaining) = u32::try_from(rate.remaining) else {
            return None;
        };
        Some(RateLimitInfo::new(remaining, rate.reset))
    }
}

#[async_trait]
impl CommentSource for LiveSource {
    fn origin(&self) -> Origin {
        Origin::Live
    }

    async fn fetch_page(&self, checkpoint: &Checkpoint) -> Result<SourcePage, AggregationError> {
        let page_number = match checkpoint {
            Checkpoint::Start => 1,
            Checkpoint::Page { next_page } => (*next_page).max(1),
            Checkpoint::Offset { .. } => {
                return Err(AggregationError::Configuration {
                    message: "live source cannot resume from a record-offset cursor".to_owned(),
                });
            }
        };

        let mut last_rate_limit: Option<RateLimitInfo> = None;
        let mut last_message = String::new();

        for attempt in 0..=self.backoff.max_retries() {
            match self.fetch_page_once(page_number).await? {
                FetchAttempt::Fetched(page) => return Ok(page),
                FetchAttempt::RateLimited {
                    rate_limit,
                    message,
                } => {
                    last_rate_limit = rate_limit;
                    last_message = message;
                }
            }

            let Some(delay) = self.backoff.delay_for(attempt) else {
                break;
            };
            tracing::warn!(
                repository = %self.target.slug(),
                page = page_number,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                "rate limited, backing off before retry"
            );
            tokio::time::sleep(delay).await;
        }

        Err(AggregationError::RateLimitExhausted {
            attempts: self.backoff.max_retries(),
            rate_limit: last_rate_limit,
            message: last_message,
        })
    }
}

/// Checks whether the GitHub error is a rate-limit rejection, based on the
/// HTTP status and the message / documentation URL content.
fn is_rate_limit_error(source: &octocrab::GitHubError) -> bool {
    let status_matches = matches!(
        source.status_code,
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS
    );

    let message_matches = source.message.to_lowercase().contains("rate limit")
        || source
            .documentation_url
            .as_deref()
            .is_some_and(|docs_url| docs_url.contains("rate-limit"));

    status_matches && message_matches
}

const fn is_auth_failure(status: StatusCode) -> bool {
    matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
}

const fn is_network_error(error: &octocrab::Error) -> bool {
    matches!(
        error,
        octocrab::Error::Http { .. }
            | octocrab::Error::Hyper { .. }
            | octocrab::Error::Service { .. }
    )
}

fn map_octocrab_error(operation: &str, error: &octocrab::Error) -> AggregationError {
    if let octocrab::Error::GitHub { source, .. } = error {
        return if is_auth_failure(source.status_code) {
            AggregationError::Authentication {
                message: format!(
                    "{operation} failed: GitHub returned {status} {message}",
                    status = source.status_code,
                    message = source.message
                ),
            }
        } else {
            AggregationError::Api {
                message: format!(
                    "{operation} failed with status {status}: {message}",
                    status = source.status_code,
                    message = source.message
                ),
            }
        };
    }

    if is_network_error(error) {
        return AggregationError::Network {
            message: format!("{operation} failed: {error}"),
        };
    }

    AggregationError::Api {
        message: format!("{operation} failed: {error}"),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use rstest::{fixture, rstest};

    use super::LiveSource;
    use crate::comment::AggregationError;
    use crate::pipeline::Checkpoint;
    use crate::source::{AccessToken, BackoffPolicy, CommentSource, RepositoryTarget};

    #[fixture]
    fn source() -> LiveSource {
        let token = AccessToken::new("valid-token").expect("token should validate");
        let target = RepositoryTarget::new("owner", "repo").expect("target should validate");
        LiveSource::new(
            &token,
            "https://api.github.com",
            target,
            100,
            BackoffPolicy::new(Duration::from_millis(1), Duration::from_millis(2), 1),
        )
        .expect("client should build")
    }

    #[rstest]
    fn invalid_api_base_is_rejected() {
        let token = AccessToken::new("valid-token").expect("token should validate");
        let target = RepositoryTarget::new("owner", "repo").expect("target should validate");

        let error = LiveSource::new(
            &token,
            "not a uri",
            target,
            100,
            BackoffPolicy::default(),
        )
        .expect_err("should reject base");
        assert!(matches!(error, AggregationError::InvalidUrl(_)));
    }

    #[rstest]
    #[tokio::test]
    async fn offset_cursor_is_rejected(source: LiveSource) {
        let error = source
            .fetch_page(&Checkpoint::Offset {
                records_consumed: 10,
            })
            .await
            .expect_err("offset cursors belong to the snapshot source");
        assert!(matches!(error, AggregationError::Configuration { .. }));
    }
}
