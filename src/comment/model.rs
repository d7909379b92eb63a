//! Data model for raw, canonical, and classified comments.
//!
//! [`RawRecord`] is the origin-tagged payload exactly as an adapter received
//! it. [`CanonicalComment`] is the unit of truth after normalisation, and
//! [`ClassifiedComment`] pairs a merged comment with its dialogue-act label.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::classify::{Classification, DialogueAct};

/// Which side of the aggregation a record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Periodic bulk database export of historical comments.
    Snapshot,
    /// Paginated, rate-limited REST API delivering near-real-time comments.
    Live,
}

impl Origin {
    /// Conflict-resolution priority. Live data is fresher than any snapshot,
    /// so it wins ties on `updated_at`.
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Snapshot => 1,
            Self::Live => 2,
        }
    }

    /// Stable lowercase name used in checkpoints, logs, and summaries.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Snapshot => "snapshot",
            Self::Live => "live",
        }
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An opaque payload as received from one adapter.
///
/// The fields are never mutated after construction; the normaliser reads them
/// and either produces a [`CanonicalComment`] or drops the record with a
/// schema-mismatch count.
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    origin: Origin,
    fields: Map<String, Value>,
}

impl RawRecord {
    /// Wraps an origin-tagged field map.
    #[must_use]
    pub const fn new(origin: Origin, fields: Map<String, Value>) -> Self {
        Self { origin, fields }
    }

    /// The origin that produced this record.
    #[must_use]
    pub const fn origin(&self) -> Origin {
        self.origin
    }

    /// Borrow a field as a string, if present and string-typed.
    #[must_use]
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(Value::as_str)
    }

    /// Read a field as an unsigned integer, if present and numeric.
    #[must_use]
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.fields.get(name).and_then(Value::as_u64)
    }

    /// Borrow a nested field (`outer.inner`) as a string.
    #[must_use]
    pub fn nested_str_field(&self, outer: &str, inner: &str) -> Option<&str> {
        self.fields
            .get(outer)
            .and_then(Value::as_object)
            .and_then(|object| object.get(inner))
            .and_then(Value::as_str)
    }
}

/// Stable cross-origin comment identity.
///
/// When an origin supplies the natural GitHub comment id it is used directly;
/// otherwise a deterministic digest over (repository, PR number, author,
/// created-at) is synthesised. The two spaces are kept distinct so a derived
/// digest can never collide with a real id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CommentId {
    /// Natural id assigned by GitHub.
    Natural(u64),
    /// Deterministically derived 64-bit digest.
    Derived(u64),
}

impl fmt::Display for CommentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Natural(id) => write!(f, "gh:{id}"),
            Self::Derived(digest) => write!(f, "drv:{digest:016x}"),
        }
    }
}

/// The unit of truth: one normalised pull-request review comment.
///
/// Exactly one `CanonicalComment` survives per [`CommentId`] in the merged
/// output; the merge rule in [`super::MergeSet`] keeps the one with the latest
/// `updated_at`, breaking ties on [`Origin::priority`].
#[derive(Debug, Clone, PartialEq)]
pub struct CanonicalComment {
    /// Stable cross-origin identity.
    pub comment_id: CommentId,
    /// Repository coordinates in `owner/repo` form.
    pub repository: String,
    /// Pull request number the comment belongs to.
    pub pull_request: u64,
    /// Author login, when the origin still knows it.
    pub author: Option<String>,
    /// Full comment text.
    pub body_text: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last-update timestamp; equals `created_at` when the origin omits it.
    pub updated_at: DateTime<Utc>,
    /// Which source produced this version of the comment.
    pub origin: Origin,
    /// True when the body carries the bulk-export truncation signature
    /// (exactly 255 characters); the live version is preferred when present.
    pub truncated: bool,
}

impl CanonicalComment {
    /// Priority used to break `updated_at` ties during merging.
    #[must_use]
    pub const fn source_priority(&self) -> u8 {
        self.origin.priority()
    }
}

/// A merged comment together with its dialogue-act label.
///
/// Created only after a [`CanonicalComment`] survives merging, and immutable
/// from then on.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedComment {
    comment: CanonicalComment,
    dialogue_act: DialogueAct,
    act_confidence: f64,
}

impl ClassifiedComment {
    /// Pairs a merged comment with its classification.
    #[must_use]
    pub const fn new(comment: CanonicalComment, classification: Classification) -> Self {
        Self {
            comment,
            dialogue_act: classification.act(),
            act_confidence: classification.confidence(),
        }
    }

    /// The underlying canonical comment.
    #[must_use]
    pub const fn comment(&self) -> &CanonicalComment {
        &self.comment
    }

    /// The assigned dialogue act.
    #[must_use]
    pub const fn dialogue_act(&self) -> DialogueAct {
        self.dialogue_act
    }

    /// Probability of the chosen label, in `[0.0, 1.0]`.
    #[must_use]
    pub const fn act_confidence(&self) -> f64 {
        self.act_confidence
    }
}
