//! Error types surfaced by the aggregation core.

use thiserror::Error;

use crate::source::rate_limit::RateLimitInfo;

use super::model::Origin;

/// Errors raised while aggregating, classifying, or committing comments.
///
/// Per-record problems (`SchemaMismatch`) are recovered locally: the record is
/// dropped and counted. Source-level problems (`SourceUnavailable`,
/// `RateLimitExhausted`) fail one adapter without aborting the run. Commit and
/// classifier-load problems are fatal for the run.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AggregationError {
    /// A source could not be reached at all for this run.
    #[error("{origin} source unavailable: {message}")]
    SourceUnavailable {
        /// Which origin failed.
        origin: Origin,
        /// Detail from the underlying transport or store.
        message: String,
    },

    /// The live API rate limit persisted through every backoff attempt.
    #[error("rate limit still exhausted after {attempts} attempts: {message}")]
    RateLimitExhausted {
        /// Number of retry attempts made before giving up.
        attempts: u32,
        /// Rate limit snapshot from the API, when one could be fetched.
        rate_limit: Option<RateLimitInfo>,
        /// Detail from the final rejected request.
        message: String,
    },

    /// A raw record was missing fields the normaliser requires.
    #[error("{origin} record failed normalisation: {message}")]
    SchemaMismatch {
        /// Origin of the malformed record.
        origin: Origin,
        /// Which field was absent or malformed.
        message: String,
    },

    /// The sink rejected the batch; no checkpoint may advance.
    #[error("sink commit failed: {message}")]
    SinkCommitFailure {
        /// Detail from the sink implementation.
        message: String,
    },

    /// The dialogue-act model could not be loaded at startup.
    #[error("classifier model load failed: {message}")]
    ClassifierLoadFailure {
        /// Detail about the missing or malformed model file.
        message: String,
    },

    /// A required configuration value was absent or rejected.
    #[error("configuration error: {message}")]
    Configuration {
        /// Details about the configuration failure.
        message: String,
    },

    /// The authentication token was rejected by the live API.
    #[error("GitHub rejected the token: {message}")]
    Authentication {
        /// Error message returned with the 401/403 response.
        message: String,
    },

    /// The live API returned a non-authentication error.
    #[error("GitHub API error: {message}")]
    Api {
        /// Response body describing the failure.
        message: String,
    },

    /// Networking failed while calling the live API.
    #[error("network error talking to GitHub: {message}")]
    Network {
        /// Transport-level error detail.
        message: String,
    },

    /// A URL or URI could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Local I/O operation failed.
    #[error("I/O error: {message}")]
    Io {
        /// Error detail from the underlying I/O operation.
        message: String,
    },
}
