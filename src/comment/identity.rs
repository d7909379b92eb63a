//! Deterministic cross-origin identity derivation.
//!
//! The bulk export does not always carry the natural GitHub comment id. When
//! it is absent, identity is synthesised from a stable tuple so the same
//! comment normalises to the same id on every run, from either origin. The
//! tuple — repository, pull request number, author, creation timestamp — is a
//! policy choice; it mirrors the lookup key the snapshot store itself uses.

use chrono::{DateTime, SecondsFormat, Utc};

use super::model::CommentId;

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0100_0000_01b3;

/// Derives a stable [`CommentId`] for a record without a natural id.
///
/// The digest is FNV-1a over `repository | pull_request | author |
/// created_at`, with the timestamp rendered as RFC 3339 UTC so the input is
/// canonical regardless of how the origin spelled it.
#[must_use]
pub fn derive_comment_id(
    repository: &str,
    pull_request: u64,
    author: Option<&str>,
    created_at: &DateTime<Utc>,
) -> CommentId {
    let canonical = format!(
        "{repository}|{pull_request}|{author}|{created_at}",
        author = author.unwrap_or(""),
        created_at = created_at.to_rfc3339_opts(SecondsFormat::Secs, true),
    );
    CommentId::Derived(fnv1a_64(canonical.as_bytes()))
}

fn fnv1a_64(bytes: &[u8]) -> u64 {
    let mut hash = FNV_OFFSET_BASIS;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use rstest::rstest;

    use super::derive_comment_id;
    use crate::comment::model::CommentId;

    fn created_at() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 3, 14, 3, 0)
            .single()
            .expect("valid timestamp")
    }

    #[rstest]
    fn identical_tuples_derive_identical_ids() {
        let first = derive_comment_id("realm/realm-java", 5473, Some("alice"), &created_at());
        let second = derive_comment_id("realm/realm-java", 5473, Some("alice"), &created_at());
        assert_eq!(first, second);
    }

    #[rstest]
    #[case::different_repository("other/repo", 5473, Some("alice"))]
    #[case::different_pull_request("realm/realm-java", 5474, Some("alice"))]
    #[case::different_author("realm/realm-java", 5473, Some("bob"))]
    #[case::missing_author("realm/realm-java", 5473, None)]
    fn changed_tuple_changes_id(
        #[case] repository: &str,
        #[case] pull_request: u64,
        #[case] author: Option<&str>,
    ) {
        let base = derive_comment_id("realm/realm-java", 5473, Some("alice"), &created_at());
        let other = derive_comment_id(repository, pull_request, author, &created_at());
        assert_ne!(base, other);
    }

    #[rstest]
    fn derived_ids_are_tagged_as_derived() {
        let id = derive_comment_id("realm/realm-java", 5473, Some("alice"), &created_at());
        assert!(matches!(id, CommentId::Derived(_)));
        assert!(id.to_string().starts_with("drv:"));
    }
}
