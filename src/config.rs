//! Application configuration loaded from CLI, environment, and files.
//!
//! This module provides a unified configuration struct that merges values
//! from command-line arguments, environment variables, and configuration
//! files using ortho-config's layered approach. The aggregation core never
//! performs its own environment lookups: everything it needs arrives here,
//! already resolved, before the pipeline runs.
//!
//! # Precedence
//!
//! Configuration values are loaded with the following precedence (lowest to
//! highest):
//!
//! 1. **Defaults** – Built-in application defaults
//! 2. **Configuration file** – `.magpie.toml` in current directory, home
//!    directory, or XDG config directory
//! 3. **Environment variables** – `MAGPIE_TOKEN`, or legacy `GITHUB_TOKEN`
//! 4. **Command-line arguments** – `--token`/`-t` and friends
//!
//! # Configuration File
//!
//! Place `.magpie.toml` in the current directory, home directory, or XDG
//! config directory with:
//!
//! ```toml
//! token = "ghp_example"
//! owner = "octocat"
//! repo = "hello-world"
//! snapshot_path = "exports/pull_request_comments.jsonl"
//! model_path = "models/dialogue_acts.json"
//! database_url = "magpie.sqlite"
//! output_path = "classified_comments.jsonl"
//! ```

use std::env;
use std::time::Duration;

use camino::Utf8PathBuf;
use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};

use crate::comment::AggregationError;
use crate::pipeline::PipelineOptions;
use crate::source::BackoffPolicy;

/// Application configuration supporting CLI, environment, and file sources.
///
/// # Environment Variables
///
/// - `MAGPIE_TOKEN`, `GITHUB_TOKEN`, or `--token`: Authentication token
/// - `MAGPIE_OWNER` or `--owner`: Repository owner
/// - `MAGPIE_REPO` or `--repo`: Repository name
/// - `MAGPIE_SNAPSHOT_PATH` or `--snapshot-path`: Bulk export JSONL file
/// - `MAGPIE_MODEL_PATH` or `--model-path`: Dialogue-act model JSON file
/// - `MAGPIE_DATABASE_URL` or `--database-url`: Checkpoint `SQLite` path
/// - `MAGPIE_OUTPUT_PATH` or `--output-path`: Classified-comment JSONL file
#[derive(Debug, Clone, Deserialize, Serialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(
    prefix = "MAGPIE",
    discovery(
        dotfile_name = ".magpie.toml",
        config_file_name = "magpie.toml",
        app_name = "magpie"
    )
)]
pub struct MagpieConfig {
    /// Personal access token for GitHub API authentication.
    ///
    /// Can be provided via:
    /// - CLI: `--token <TOKEN>` or `-t <TOKEN>`
    /// - Environment: `MAGPIE_TOKEN` or `GITHUB_TOKEN` (legacy)
    /// - Config file: `token = "..."`
    #[ortho_config(cli_short = 't')]
    pub token: Option<String>,

    /// Repository owner (e.g., "octocat").
    #[ortho_config(cli_short = 'o')]
    pub owner: Option<String>,

    /// Repository name (e.g., "hello-world").
    #[ortho_config(cli_short = 'r')]
    pub repo: Option<String>,

    /// Base URL of the GitHub API, overridable for GitHub Enterprise.
    #[ortho_config()]
    pub api_base: String,

    /// Path to the bulk snapshot export (JSON Lines).
    #[ortho_config()]
    pub snapshot_path: Option<String>,

    /// Path to the pre-trained dialogue-act model (JSON).
    #[ortho_config()]
    pub model_path: Option<String>,

    /// Local `SQLite` database URL/path holding per-source checkpoints.
    ///
    /// Diesel uses a filesystem path for `SQLite` connections. The same value
    /// is also used by the Diesel CLI via `DATABASE_URL` when running
    /// migrations.
    #[ortho_config()]
    pub database_url: Option<String>,

    /// Path the classified-comment batch is committed to (JSON Lines).
    #[ortho_config()]
    pub output_path: Option<String>,

    /// Runs database migrations and exits.
    ///
    /// When set, magpie initialises the database at `database_url`, applies
    /// any pending Diesel migrations, records the schema version in
    /// telemetry, and exits without fetching anything.
    #[ortho_config()]
    pub migrate_db: bool,

    /// Records requested per page from both sources.
    #[ortho_config()]
    pub per_page: u8,

    /// Upper bound on merged-but-uncommitted comments held in memory.
    #[ortho_config()]
    pub max_buffered_comments: usize,

    /// Retry budget when the live API reports rate limiting.
    #[ortho_config()]
    pub rate_limit_max_retries: u32,

    /// First backoff delay in milliseconds; doubles per attempt.
    #[ortho_config()]
    pub rate_limit_base_delay_ms: u64,

    /// Backoff delay ceiling in milliseconds.
    #[ortho_config()]
    pub rate_limit_max_delay_ms: u64,
}

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_PER_PAGE: u8 = 100;
const DEFAULT_MAX_BUFFERED_COMMENTS: usize = 50_000;
const DEFAULT_RATE_LIMIT_MAX_RETRIES: u32 = 5;
const DEFAULT_RATE_LIMIT_BASE_DELAY_MS: u64 = 500;
const DEFAULT_RATE_LIMIT_MAX_DELAY_MS: u64 = 60_000;

impl Default for MagpieConfig {
    fn default() -> Self {
        Self {
            token: None,
            owner: None,
            repo: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            snapshot_path: None,
            model_path: None,
            database_url: None,
            output_path: None,
            migrate_db: false,
            per_page: DEFAULT_PER_PAGE,
            max_buffered_comments: DEFAULT_MAX_BUFFERED_COMMENTS,
            rate_limit_max_retries: DEFAULT_RATE_LIMIT_MAX_RETRIES,
            rate_limit_base_delay_ms: DEFAULT_RATE_LIMIT_BASE_DELAY_MS,
            rate_limit_max_delay_ms: DEFAULT_RATE_LIMIT_MAX_DELAY_MS,
        }
    }
}

impl MagpieConfig {
    /// Resolves the token from configuration or the legacy `GITHUB_TOKEN`
    /// environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when no token source
    /// provides a value.
    pub fn resolve_token(&self) -> Result<String, AggregationError> {
        self.token
            .clone()
            .or_else(|| env::var("GITHUB_TOKEN").ok())
            .ok_or_else(|| missing("an access token (use --token or MAGPIE_TOKEN)"))
    }

    /// Returns owner and repo if both are configured.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when owner or repo is
    /// missing.
    pub fn require_repository_info(&self) -> Result<(&str, &str), AggregationError> {
        match (&self.owner, &self.repo) {
            (Some(owner), Some(repo)) => Ok((owner.as_str(), repo.as_str())),
            (None, _) => Err(missing("a repository owner (use --owner or -o)")),
            (_, None) => Err(missing("a repository name (use --repo or -r)")),
        }
    }

    /// Returns the snapshot export path.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when not configured.
    pub fn require_snapshot_path(&self) -> Result<Utf8PathBuf, AggregationError> {
        self.snapshot_path
            .as_deref()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| missing("a snapshot export path (use --snapshot-path)"))
    }

    /// Returns the classifier model path.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when not configured.
    pub fn require_model_path(&self) -> Result<Utf8PathBuf, AggregationError> {
        self.model_path
            .as_deref()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| missing("a classifier model path (use --model-path)"))
    }

    /// Returns the checkpoint database URL.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when not configured.
    pub fn require_database_url(&self) -> Result<&str, AggregationError> {
        self.database_url
            .as_deref()
            .ok_or_else(|| missing("a checkpoint database URL (use --database-url)"))
    }

    /// Returns the sink output path.
    ///
    /// # Errors
    ///
    /// Returns [`AggregationError::Configuration`] when not configured.
    pub fn require_output_path(&self) -> Result<Utf8PathBuf, AggregationError> {
        self.output_path
            .as_deref()
            .map(Utf8PathBuf::from)
            .ok_or_else(|| missing("an output path (use --output-path)"))
    }

    /// Backoff schedule for the live adapter, from the rate-limit knobs.
    #[must_use]
    pub const fn backoff_policy(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_millis(self.rate_limit_base_delay_ms),
            Duration::from_millis(self.rate_limit_max_delay_ms),
            self.rate_limit_max_retries,
        )
    }

    /// Pipeline limits derived from the configuration.
    #[must_use]
    pub const fn pipeline_options(&self) -> PipelineOptions {
        PipelineOptions {
            max_buffered_comments: self.max_buffered_comments,
        }
    }
}

fn missing(what: &str) -> AggregationError {
    AggregationError::Configuration {
        message: format!("{what} is required"),
    }
}
