//! magpie CLI entrypoint for comment aggregation runs.

use std::io::{self, Write};
use std::process::ExitCode;

use magpie::classify::DialogueActClassifier;
use magpie::comment::AggregationError;
use magpie::config::MagpieConfig;
use magpie::persistence::{SqliteCheckpointStore, migrate_database};
use magpie::pipeline::{JsonlSink, Pipeline, PipelineDeps, RunSummary, StopSignal};
use magpie::source::{AccessToken, LiveSource, RepositoryTarget, SnapshotSource};
use magpie::telemetry::StderrJsonlTelemetrySink;
use ortho_config::OrthoConfig;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            if writeln!(io::stderr().lock(), "{error}").is_err() {
                return ExitCode::FAILURE;
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), AggregationError> {
    let config = load_config()?;
    let telemetry = StderrJsonlTelemetrySink;

    if config.migrate_db {
        let database_url = config.require_database_url()?;
        let schema_version = migrate_database(database_url, &telemetry)
            .map_err(|error| AggregationError::Io {
                message: error.to_string(),
            })?;
        return write_line(&format!(
            "Checkpoint database migrated, schema version {version}",
            version = schema_version.as_str()
        ));
    }

    let classifier = DialogueActClassifier::load(&config.require_model_path()?)?;

    let snapshot = SnapshotSource::new(
        config.require_snapshot_path()?,
        u64::from(config.per_page),
    )?;

    let token = AccessToken::new(config.resolve_token()?)?;
    let (owner, repo) = config.require_repository_info()?;
    let target = RepositoryTarget::new(owner, repo)?;
    let live = LiveSource::new(
        &token,
        &config.api_base,
        target,
        config.per_page,
        config.backoff_policy(),
    )?;

    let checkpoints = SqliteCheckpointStore::new(config.require_database_url()?)
        .map_err(|error| AggregationError::Io {
            message: error.to_string(),
        })?;
    let sink = JsonlSink::new(config.require_output_path()?);

    let stop = StopSignal::new();
    let stop_on_interrupt = stop.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("interrupt received, finishing the current page");
            stop_on_interrupt.request_stop();
        }
    });

    let pipeline = Pipeline::new(PipelineDeps {
        snapshot: &snapshot,
        live: &live,
        classifier: &classifier,
        checkpoints: &checkpoints,
        sink: &sink,
        telemetry: &telemetry,
    })
    .with_options(config.pipeline_options());

    let summary = pipeline.run(&stop).await?;
    write_summary(&summary)
}

/// Loads configuration from CLI, environment, and files.
///
/// # Errors
///
/// Returns [`AggregationError::Configuration`] when ortho-config fails to
/// parse arguments or load configuration files.
fn load_config() -> Result<MagpieConfig, AggregationError> {
    MagpieConfig::load().map_err(|error| AggregationError::Configuration {
        message: error.to_string(),
    })
}

fn write_summary(summary: &RunSummary) -> Result<(), AggregationError> {
    let status = if summary.is_complete() {
        "complete"
    } else {
        "incomplete (resume from checkpoints)"
    };

    let mut message = format!(
        "Run {status}: merged {merged}, classified {classified}, dropped {dropped}",
        merged = summary.merged_count,
        classified = summary.classified_count,
        dropped = summary.dropped_count(),
    );
    for (origin, failure) in summary.failures_by_source() {
        message.push_str(&format!("\n{origin} source failed: {failure}"));
    }

    write_line(&message)
}

fn write_line(message: &str) -> Result<(), AggregationError> {
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{message}").map_err(|error| AggregationError::Io {
        message: error.to_string(),
    })
}
