//! Applying remote progress and three-way conflict detection

use crate::models::{Conflict, FieldPath, Item, RemoteSnapshot, SubUnit};

/// Apply authoritative remote progress onto a local item.
///
/// Status and rating are overwritten. Completion marks are copied only when
/// the remote defines them, so a local completion is never cleared. Title,
/// author, external reference and total are left alone.
pub fn apply_remote(existing: &mut Item, remote: &RemoteSnapshot) {
    existing.status = remote.status;
    existing.rating = remote.rating;

    for (current, entry) in existing.sub_units.iter_mut().zip(&remote.sub_units) {
        if let Some(completed_at) = entry.completed_at {
            current.completed_at = Some(completed_at);
        }
    }

    if existing.sub_units.len() > remote.sub_units.len() {
        existing.sub_units.truncate(remote.sub_units.len());
    } else {
        let start = existing.sub_units.len();
        existing.sub_units.extend(
            remote.sub_units[start..]
                .iter()
                .enumerate()
                .map(|(offset, entry)| SubUnit {
                    completed_at: entry.completed_at,
                    ..SubUnit::new(start + offset)
                }),
        );
    }

    tracing::debug!(
        "Applied remote progress to item {}: status={}, rating={}",
        existing.id,
        existing.status,
        existing.rating
    );
}

/// Value form of [`apply_remote`]
#[must_use]
pub fn applied_remote(mut existing: Item, remote: &RemoteSnapshot) -> Item {
    apply_remote(&mut existing, remote);
    existing
}

/// Full item as the remote store sees it, given the last common base.
///
/// Unlike [`apply_remote`] this mirrors the remote exactly, including
/// completions it does not hold, so it can take part in a three-way compare.
#[must_use]
pub fn remote_view(base: &Item, remote: &RemoteSnapshot) -> Item {
    let sub_units = remote
        .sub_units
        .iter()
        .enumerate()
        .map(|(index, entry)| SubUnit {
            index,
            external_ref: base.sub_units.get(index).and_then(|s| s.external_ref),
            completed_at: entry.completed_at,
        })
        .collect();
    Item {
        id: base.id,
        title: base.title.clone(),
        author: base.author.clone(),
        total_sub_units: remote.total_sub_units,
        status: remote.status,
        rating: remote.rating,
        external_ref: remote.external_ref,
        sub_units,
    }
}

/// Result of a three-way merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Every non-divergent edit applied; divergent paths keep the local value
    pub merged: Item,
    /// Paths changed on both sides to different values
    pub paths: Vec<FieldPath>,
}

impl MergeOutcome {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.paths.is_empty()
    }
}

#[derive(Default)]
struct Merger {
    paths: Vec<FieldPath>,
}

impl Merger {
    fn field<T: PartialEq + Clone>(
        &mut self,
        path: impl FnOnce() -> FieldPath,
        local: &T,
        remote: &T,
        base: &T,
    ) -> T {
        if local == remote || remote == base {
            local.clone()
        } else if local == base {
            remote.clone()
        } else {
            self.paths.push(path());
            local.clone()
        }
    }

    fn sub_units(
        &mut self,
        local: &[SubUnit],
        remote: &[SubUnit],
        base: &[SubUnit],
    ) -> Vec<SubUnit> {
        let len = self.field(
            || FieldPath::key("subUnits"),
            &local.len(),
            &remote.len(),
            &base.len(),
        );

        // A position missing on one side compares as an empty sub-unit.
        let at = |list: &[SubUnit], index: usize| {
            list.get(index)
                .cloned()
                .unwrap_or_else(|| SubUnit::new(index))
        };

        (0..len)
            .map(|index| {
                let (l, r, b) = (at(local, index), at(remote, index), at(base, index));
                let path = |name: &str| FieldPath::key("subUnits").then_index(index).then_key(name);
                SubUnit {
                    index,
                    external_ref: self.field(
                        || path("externalRef"),
                        &l.external_ref,
                        &r.external_ref,
                        &b.external_ref,
                    ),
                    completed_at: self.field(
                        || path("completedAt"),
                        &l.completed_at,
                        &r.completed_at,
                        &b.completed_at,
                    ),
                }
            })
            .collect()
    }
}

/// Three-way merge of `local` and `remote` against their common `base`.
pub fn three_way(local: &Item, remote: &Item, base: &Item) -> MergeOutcome {
    let Item {
        id,
        title,
        author,
        total_sub_units,
        status,
        rating,
        external_ref,
        sub_units,
    } = local;

    let mut merger = Merger::default();
    let merged = Item {
        id: *id,
        title: merger.field(|| FieldPath::key("title"), title, &remote.title, &base.title),
        author: merger.field(|| FieldPath::key("author"), author, &remote.author, &base.author),
        total_sub_units: merger.field(
            || FieldPath::key("totalSubUnits"),
            total_sub_units,
            &remote.total_sub_units,
            &base.total_sub_units,
        ),
        status: merger.field(|| FieldPath::key("status"), status, &remote.status, &base.status),
        rating: merger.field(|| FieldPath::key("rating"), rating, &remote.rating, &base.rating),
        external_ref: merger.field(
            || FieldPath::key("externalRef"),
            external_ref,
            &remote.external_ref,
            &base.external_ref,
        ),
        sub_units: merger.sub_units(sub_units, &remote.sub_units, &base.sub_units),
    };

    MergeOutcome {
        merged,
        paths: merger.paths,
    }
}

/// Detect divergent edits; `None` when local and remote merge cleanly.
pub fn detect_conflicts(local: &Item, remote: &Item, base: &Item) -> Option<Conflict> {
    let outcome = three_way(local, remote, base);
    if outcome.is_clean() {
        return None;
    }

    tracing::warn!(
        "Item {} diverged at {}",
        local.id,
        outcome
            .paths
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    Some(Conflict::new(
        local.id,
        outcome.paths,
        local.clone(),
        remote.clone(),
        outcome.merged,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, ReadingStatus, RemoteSubUnit};
    use chrono::{DateTime, TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn stamp(day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, 8, 30, 0).unwrap()
    }

    fn base() -> Item {
        Item::new(
            ItemId::new(5),
            "Title",
            "Writer",
            ReadingStatus::Reading,
            vec![SubUnit::with_ref(0, 50), SubUnit::with_ref(1, 51)],
            Some(3),
        )
    }

    fn remote(
        status: ReadingStatus,
        rating: u8,
        completions: &[Option<DateTime<Utc>>],
    ) -> RemoteSnapshot {
        RemoteSnapshot {
            status,
            rating,
            total_sub_units: Some(3),
            external_ref: None,
            sub_units: completions
                .iter()
                .map(|completed_at| RemoteSubUnit {
                    completed_at: *completed_at,
                })
                .collect(),
        }
    }

    #[test]
    fn apply_remote_only_touches_progress() {
        let mut local = base();
        local.external_ref = Some(900);
        let result = applied_remote(
            local.clone(),
            &remote(ReadingStatus::Read, 4, &[Some(stamp(1)), None]),
        );

        assert_eq!(result.status, ReadingStatus::Read);
        assert_eq!(result.rating, 4);
        assert_eq!(result.title, local.title);
        assert_eq!(result.author, local.author);
        assert_eq!(result.external_ref, Some(900));
        assert_eq!(result.total_sub_units, Some(3));
        assert_eq!(result.sub_units[0].completed_at, Some(stamp(1)));
        assert_eq!(result.sub_units[0].external_ref, Some(50));
    }

    #[test]
    fn apply_remote_never_clears_local_completion() {
        let mut local = base();
        local.sub_units[1].completed_at = Some(stamp(2));
        apply_remote(&mut local, &remote(ReadingStatus::Reading, 0, &[None, None]));
        assert_eq!(local.sub_units[1].completed_at, Some(stamp(2)));
    }

    #[test]
    fn apply_remote_creates_and_removes_positions() {
        let mut local = base();
        apply_remote(
            &mut local,
            &remote(ReadingStatus::Reading, 0, &[None, None, Some(stamp(3))]),
        );
        assert_eq!(local.sub_units.len(), 3);
        assert_eq!(local.sub_units[2].index, 2);
        assert_eq!(local.sub_units[2].external_ref, None);
        assert_eq!(local.sub_units[2].completed_at, Some(stamp(3)));

        apply_remote(&mut local, &remote(ReadingStatus::Reading, 0, &[None]));
        assert_eq!(local.sub_units.len(), 1);
        assert!(local.is_well_formed());
    }

    #[test]
    fn remote_authority_without_local_divergence() {
        let mut local = base();
        local.rating = 0;
        let base = local.clone();
        let snapshot = remote(ReadingStatus::Read, 4, &[None, None]);

        assert!(detect_conflicts(&local, &remote_view(&base, &snapshot), &base).is_none());
        let result = applied_remote(local, &snapshot);
        assert_eq!(result.status, ReadingStatus::Read);
        assert_eq!(result.rating, 4);
    }

    #[test]
    fn divergent_rating_is_reported_and_status_merged() {
        let base = base();
        let mut local = base.clone();
        local.rating = 3;
        let remote_item = remote_view(&base, &remote(ReadingStatus::Dropped, 5, &[None, None]));

        let conflict = detect_conflicts(&local, &remote_item, &base).expect("conflict");
        assert_eq!(conflict.paths, vec![FieldPath::key("rating")]);
        assert_eq!(conflict.proposed.status, ReadingStatus::Dropped);
        assert_eq!(conflict.proposed.rating, 3);
        assert_eq!(conflict.local, local);
        assert_eq!(conflict.remote, remote_item);
    }

    #[test]
    fn one_sided_changes_are_taken_without_paths() {
        let base = base();
        let mut local = base.clone();
        local.title = "Local Title".to_string();
        local.sub_units[0].completed_at = Some(stamp(4));
        let mut remote_item = base.clone();
        remote_item.status = ReadingStatus::OnHold;
        remote_item.sub_units[1].completed_at = Some(stamp(5));

        let outcome = three_way(&local, &remote_item, &base);
        assert!(outcome.is_clean());
        assert_eq!(outcome.merged.title, "Local Title");
        assert_eq!(outcome.merged.status, ReadingStatus::OnHold);
        assert_eq!(outcome.merged.sub_units[0].completed_at, Some(stamp(4)));
        assert_eq!(outcome.merged.sub_units[1].completed_at, Some(stamp(5)));
    }

    #[test]
    fn identical_edits_on_both_sides_do_not_conflict() {
        let base = base();
        let mut local = base.clone();
        local.rating = 2;
        let remote_item = local.clone();
        assert!(three_way(&local, &remote_item, &base).is_clean());
    }

    #[test]
    fn divergent_sub_unit_paths_are_collected() {
        let base = base();
        let mut local = base.clone();
        local.sub_units[1].completed_at = Some(stamp(6));
        let mut remote_item = base.clone();
        remote_item.sub_units[1].completed_at = Some(stamp(7));

        let conflict = detect_conflicts(&local, &remote_item, &base).expect("conflict");
        assert_eq!(
            conflict.paths,
            vec![FieldPath::key("subUnits").then_index(1).then_key("completedAt")]
        );
        assert!(conflict.matches_path(&FieldPath::key("subUnits")));
        assert!(!conflict.matches_path(&FieldPath::key("rating")));
    }

    #[test]
    fn merged_sub_units_stay_contiguous_when_lengths_change() {
        let base = base();
        let mut local = base.clone();
        local.sub_units.push(SubUnit::with_ref(2, 52));
        local.sub_units.push(SubUnit::with_ref(3, 53));
        let mut remote_item = base.clone();
        remote_item.sub_units.truncate(1);

        let outcome = three_way(&local, &remote_item, &base);
        assert_eq!(outcome.paths, vec![FieldPath::key("subUnits")]);
        assert_eq!(outcome.merged.sub_units.len(), 4);
        assert!(outcome.merged.is_well_formed());
    }
}
