//! Reconciliation of both source streams into one deduplicated set.
//!
//! The merge rule is local to a single `comment_id`: insert when absent,
//! replace only when the incoming record is strictly newer, or tied on
//! `updated_at` with a higher source priority. Because the decision depends
//! only on the two candidate records, merging is commutative and idempotent —
//! feeding the same record twice, or the two sources in any interleaving,
//! yields the same final set.

use std::collections::HashMap;

use super::model::{CanonicalComment, CommentId};

/// What happened to one incoming comment during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// No entry existed for this id; the comment was inserted.
    Inserted,
    /// An older (or lower-priority tied) entry was replaced.
    Replaced,
    /// The existing entry won; the incoming comment was discarded.
    Retained,
}

/// Running counts of merge decisions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Comments inserted under a previously unseen id.
    pub inserted: u64,
    /// Comments that replaced an existing entry.
    pub replaced: u64,
    /// Incoming comments discarded in favour of the existing entry.
    pub retained: u64,
}

/// Working set of merged comments keyed by [`CommentId`].
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use magpie::comment::{CanonicalComment, CommentId, MergeOutcome, MergeSet, Origin};
///
/// let comment = CanonicalComment {
///     comment_id: CommentId::Natural(1),
///     repository: "octo/repo".to_owned(),
///     pull_request: 7,
///     author: Some("alice".to_owned()),
///     body_text: "Looks good".to_owned(),
///     created_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///     updated_at: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///     origin: Origin::Live,
///     truncated: false,
/// };
///
/// let mut set = MergeSet::new();
/// assert_eq!(set.merge(comment.clone()), MergeOutcome::Inserted);
/// assert_eq!(set.merge(comment), MergeOutcome::Retained);
/// assert_eq!(set.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MergeSet {
    entries: HashMap<CommentId, CanonicalComment>,
    stats: MergeStats,
}

impl MergeSet {
    /// Creates an empty merge set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies the replace-if-newer rule to one incoming comment.
    pub fn merge(&mut self, incoming: CanonicalComment) -> MergeOutcome {
        match self.entries.get(&incoming.comment_id) {
            None => {
                self.stats.inserted += 1;
                self.entries.insert(incoming.comment_id, incoming);
                MergeOutcome::Inserted
            }
            Some(current) if incoming_wins(current, &incoming) => {
                self.stats.replaced += 1;
                self.entries.insert(incoming.comment_id, incoming);
                MergeOutcome::Replaced
            }
            Some(_) => {
                self.stats.retained += 1;
                MergeOutcome::Retained
            }
        }
    }

    /// Number of distinct comments currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no comments have been merged yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Counts of merge decisions made so far.
    #[must_use]
    pub const fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Consumes the set, yielding comments in deterministic id order.
    #[must_use]
    pub fn into_sorted(self) -> Vec<CanonicalComment> {
        let mut comments: Vec<CanonicalComment> = self.entries.into_values().collect();
        comments.sort_by_key(|comment| comment.comment_id);
        comments
    }
}

/// The incoming comment wins when strictly newer, or tied on `updated_at`
/// with a strictly higher source priority.
fn incoming_wins(current: &CanonicalComment, incoming: &CanonicalComment) -> bool {
    if incoming.updated_at != current.updated_at {
        return incoming.updated_at > current.updated_at;
    }
    incoming.source_priority() > current.source_priority()
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, TimeZone, Utc};
    use rstest::{fixture, rstest};

    use super::{MergeOutcome, MergeSet};
    use crate::comment::model::{CanonicalComment, CommentId, Origin};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2019, 5, 3, hour, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    fn comment(id: u64, origin: Origin, updated_hour: u32) -> CanonicalComment {
        CanonicalComment {
            comment_id: CommentId::Natural(id),
            repository: "realm/realm-java".to_owned(),
            pull_request: 5473,
            author: Some("reviewer".to_owned()),
            body_text: format!("{origin} version"),
            created_at: at(1),
            updated_at: at(updated_hour),
            origin,
            truncated: false,
        }
    }

    #[fixture]
    fn snapshot_old() -> CanonicalComment {
        comment(1, Origin::Snapshot, 2)
    }

    #[fixture]
    fn live_new() -> CanonicalComment {
        comment(1, Origin::Live, 3)
    }

    #[rstest]
    fn merging_same_record_twice_is_idempotent(snapshot_old: CanonicalComment) {
        let mut set = MergeSet::new();

        assert_eq!(set.merge(snapshot_old.clone()), MergeOutcome::Inserted);
        assert_eq!(set.merge(snapshot_old.clone()), MergeOutcome::Retained);

        let merged = set.into_sorted();
        assert_eq!(merged, vec![snapshot_old]);
    }

    #[rstest]
    fn merge_is_order_independent(snapshot_old: CanonicalComment, live_new: CanonicalComment) {
        let mut oldest_first = MergeSet::new();
        oldest_first.merge(snapshot_old.clone());
        oldest_first.merge(live_new.clone());

        let mut newest_first = MergeSet::new();
        newest_first.merge(live_new.clone());
        newest_first.merge(snapshot_old);

        assert_eq!(oldest_first.into_sorted(), newest_first.into_sorted());
    }

    #[rstest]
    fn newer_updated_at_wins(snapshot_old: CanonicalComment, live_new: CanonicalComment) {
        let mut set = MergeSet::new();
        set.merge(snapshot_old);
        assert_eq!(set.merge(live_new.clone()), MergeOutcome::Replaced);

        let merged = set.into_sorted();
        assert_eq!(merged, vec![live_new]);
    }

    #[rstest]
    fn older_record_never_replaces_newer(snapshot_old: CanonicalComment, live_new: CanonicalComment) {
        let mut set = MergeSet::new();
        set.merge(live_new.clone());
        assert_eq!(set.merge(snapshot_old), MergeOutcome::Retained);

        assert_eq!(set.into_sorted(), vec![live_new]);
    }

    #[rstest]
    #[case::snapshot_then_live(Origin::Snapshot, Origin::Live)]
    #[case::live_then_snapshot(Origin::Live, Origin::Snapshot)]
    fn equal_timestamps_break_ties_on_priority(#[case] first: Origin, #[case] second: Origin) {
        let mut set = MergeSet::new();
        set.merge(comment(1, first, 2));
        set.merge(comment(1, second, 2));

        let merged = set.into_sorted();
        let winner = merged.first().expect("one comment should survive");
        assert_eq!(winner.origin, Origin::Live);
    }

    #[rstest]
    fn distinct_ids_do_not_collide() {
        let mut set = MergeSet::new();
        set.merge(comment(1, Origin::Snapshot, 2));
        set.merge(comment(2, Origin::Live, 2));
        set.merge(comment(3, Origin::Snapshot, 2));

        assert_eq!(set.len(), 3);
        let ids: Vec<CommentId> = set
            .into_sorted()
            .iter()
            .map(|merged| merged.comment_id)
            .collect();
        assert_eq!(
            ids,
            vec![
                CommentId::Natural(1),
                CommentId::Natural(2),
                CommentId::Natural(3)
            ]
        );
    }

    #[rstest]
    fn stats_track_merge_decisions(snapshot_old: CanonicalComment, live_new: CanonicalComment) {
        let mut set = MergeSet::new();
        set.merge(snapshot_old.clone());
        set.merge(live_new);
        set.merge(snapshot_old);

        let stats = set.stats();
        assert_eq!(stats.inserted, 1);
        assert_eq!(stats.replaced, 1);
        assert_eq!(stats.retained, 1);
    }
}
