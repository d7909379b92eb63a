//! Canonical comment domain: records, identity, normalisation, and merging.
//!
//! Everything downstream of the source adapters speaks in the types defined
//! here. Adapters hand over origin-tagged [`RawRecord`]s; the normaliser maps
//! them into [`CanonicalComment`]s with a stable cross-origin identity; the
//! [`MergeSet`] reconciles both sources into a single deduplicated set.

mod error;
mod identity;
mod language;
mod merge;
mod model;
mod normalize;

pub use error::AggregationError;
pub use identity::derive_comment_id;
pub use language::is_probably_english;
pub use merge::{MergeOutcome, MergeSet, MergeStats};
pub use model::{CanonicalComment, ClassifiedComment, CommentId, Origin, RawRecord};
pub use normalize::normalize;
