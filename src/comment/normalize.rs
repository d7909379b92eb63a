//! Origin-specific mapping from raw records to canonical comments.
//!
//! Normalisation is a pure function: the same [`RawRecord`] always produces
//! the same [`CanonicalComment`], including its identity. Records missing a
//! required field fail with [`AggregationError::SchemaMismatch`] so the
//! pipeline can drop and count them instead of losing them silently.

use chrono::{DateTime, Utc};
use url::Url;

use super::error::AggregationError;
use super::identity::derive_comment_id;
use super::model::{CanonicalComment, CommentId, Origin, RawRecord};

/// Body length at which the bulk export is known to truncate comment text.
const EXPORT_TRUNCATION_LENGTH: usize = 255;

/// Maps a raw record into a canonical comment.
///
/// # Errors
///
/// Returns [`AggregationError::SchemaMismatch`] when a required field is
/// absent or malformed for the record's origin.
pub fn normalize(record: &RawRecord) -> Result<CanonicalComment, AggregationError> {
    match record.origin() {
        Origin::Snapshot => normalize_snapshot(record),
        Origin::Live => normalize_live(record),
    }
}

/// Normalises a GHTorrent-style export document.
///
/// The export carries repository coordinates as separate `owner` and `repo`
/// fields and may omit the natural comment id, in which case the identity is
/// derived deterministically.
fn normalize_snapshot(record: &RawRecord) -> Result<CanonicalComment, AggregationError> {
    let owner = require_str(record, "owner")?;
    let repo = require_str(record, "repo")?;
    let pull_request = require_u64(record, "pullreq_id")?;
    let body_text = require_str(record, "body")?.to_owned();
    let created_at = parse_timestamp(record, "created_at", require_str(record, "created_at")?)?;
    let updated_at = optional_timestamp(record, "updated_at")?.unwrap_or(created_at);

    let repository = format!("{owner}/{repo}");
    let author = author_field(record);
    let comment_id = record.u64_field("id").map_or_else(
        || derive_comment_id(&repository, pull_request, author.as_deref(), &created_at),
        CommentId::Natural,
    );
    let truncated = body_text.chars().count() == EXPORT_TRUNCATION_LENGTH;

    Ok(CanonicalComment {
        comment_id,
        repository,
        pull_request,
        author,
        body_text,
        created_at,
        updated_at,
        origin: Origin::Snapshot,
        truncated,
    })
}

/// Normalises a live API review-comment object.
///
/// Repository coordinates and the pull request number are recovered from the
/// record's `pull_request_url`, which the repo-wide listing always includes.
fn normalize_live(record: &RawRecord) -> Result<CanonicalComment, AggregationError> {
    let natural_id = require_u64(record, "id")?;
    let body_text = require_str(record, "body")?.to_owned();
    let created_at = parse_timestamp(record, "created_at", require_str(record, "created_at")?)?;
    let updated_at = optional_timestamp(record, "updated_at")?.unwrap_or(created_at);
    let (repository, pull_request) =
        parse_pull_request_url(record, require_str(record, "pull_request_url")?)?;

    Ok(CanonicalComment {
        comment_id: CommentId::Natural(natural_id),
        repository,
        pull_request,
        author: author_field(record),
        body_text,
        created_at,
        updated_at,
        origin: Origin::Live,
        truncated: false,
    })
}

fn author_field(record: &RawRecord) -> Option<String> {
    record
        .str_field("author")
        .or_else(|| record.nested_str_field("user", "login"))
        .map(str::to_owned)
}

fn require_str<'record>(
    record: &'record RawRecord,
    name: &str,
) -> Result<&'record str, AggregationError> {
    record
        .str_field(name)
        .ok_or_else(|| schema_mismatch(record.origin(), &format!("missing field `{name}`")))
}

fn require_u64(record: &RawRecord, name: &str) -> Result<u64, AggregationError> {
    record
        .u64_field(name)
        .ok_or_else(|| schema_mismatch(record.origin(), &format!("missing numeric field `{name}`")))
}

fn parse_timestamp(
    record: &RawRecord,
    name: &str,
    value: &str,
) -> Result<DateTime<Utc>, AggregationError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| {
            schema_mismatch(
                record.origin(),
                &format!("field `{name}` is not a valid RFC 3339 timestamp: {error}"),
            )
        })
}

fn optional_timestamp(
    record: &RawRecord,
    name: &str,
) -> Result<Option<DateTime<Utc>>, AggregationError> {
    record
        .str_field(name)
        .map(|value| parse_timestamp(record, name, value))
        .transpose()
}

/// Extracts `owner/repo` and the pull request number from a
/// `https://api.github.com/repos/{owner}/{repo}/pulls/{number}` URL.
fn parse_pull_request_url(
    record: &RawRecord,
    raw_url: &str,
) -> Result<(String, u64), AggregationError> {
    let parsed = Url::parse(raw_url).map_err(|error| {
        schema_mismatch(
            record.origin(),
            &format!("field `pull_request_url` is not a valid URL: {error}"),
        )
    })?;

    let invalid_path = || {
        schema_mismatch(
            record.origin(),
            "field `pull_request_url` must match /repos/{owner}/{repo}/pulls/{number}",
        )
    };

    let mut segments = parsed.path_segments().ok_or_else(invalid_path)?;
    if segments.next() != Some("repos") {
        return Err(invalid_path());
    }
    let owner = segments.next().ok_or_else(invalid_path)?;
    let repo = segments.next().ok_or_else(invalid_path)?;
    if segments.next() != Some("pulls") {
        return Err(invalid_path());
    }
    let number = segments
        .next()
        .and_then(|segment| segment.parse::<u64>().ok())
        .ok_or_else(invalid_path)?;

    Ok((format!("{owner}/{repo}"), number))
}

fn schema_mismatch(origin: Origin, message: &str) -> AggregationError {
    AggregationError::SchemaMismatch {
        origin,
        message: message.to_owned(),
    }
}
