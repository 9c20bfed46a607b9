//! Merging freshly observed structure into a cached item

use crate::models::{Item, StructuralSnapshot, SubUnit};

/// Merge `observed` structure into `existing`, returning whether anything changed.
///
/// Reading progress (status, rating, completion marks) is never touched.
/// Sub-units beyond the observed length are dropped; the list stays contiguous.
pub fn reconcile(existing: &mut Item, observed: &StructuralSnapshot) -> bool {
    let StructuralSnapshot {
        id,
        title,
        author,
        total_sub_units,
        sub_units,
    } = observed;

    let mut changed = false;
    changed |= adopt(&mut existing.id, id);
    changed |= adopt(&mut existing.title, title);
    changed |= adopt(&mut existing.author, author);
    changed |= adopt(&mut existing.total_sub_units, total_sub_units);
    changed |= reconcile_sub_units(&mut existing.sub_units, sub_units);

    if changed {
        tracing::debug!(
            "Observed structure changed item {} ({} sub-units)",
            existing.id,
            existing.sub_units.len()
        );
    }
    changed
}

/// Value form of [`reconcile`]
#[must_use]
pub fn reconciled(mut existing: Item, observed: &StructuralSnapshot) -> (Item, bool) {
    let changed = reconcile(&mut existing, observed);
    (existing, changed)
}

fn adopt<T: PartialEq + Clone>(target: &mut T, observed: &T) -> bool {
    if target == observed {
        false
    } else {
        target.clone_from(observed);
        true
    }
}

fn reconcile_sub_units(existing: &mut Vec<SubUnit>, observed: &[SubUnit]) -> bool {
    let mut changed = existing.len() != observed.len();

    for (current, seen) in existing.iter_mut().zip(observed) {
        // Only a defined observed ref is adopted; a sub-unit may gain or
        // correct its identity once published, never lose it.
        if let Some(external_ref) = seen.external_ref {
            if current.external_ref != Some(external_ref) {
                current.external_ref = Some(external_ref);
                changed = true;
            }
        }
    }

    if existing.len() > observed.len() {
        existing.truncate(observed.len());
    } else {
        let start = existing.len();
        existing.extend(
            observed[start..]
                .iter()
                .enumerate()
                .map(|(offset, seen)| SubUnit {
                    index: start + offset,
                    ..seen.clone()
                }),
        );
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ItemId, ReadingStatus};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn existing() -> Item {
        let mut item = Item::new(
            ItemId::new(1),
            "Old Title",
            "Writer",
            ReadingStatus::Reading,
            vec![SubUnit::with_ref(0, 10), SubUnit::new(1), SubUnit::new(2)],
            None,
        );
        item.rating = 4;
        item.sub_units[0].completed_at = Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap());
        item
    }

    fn observed(refs: &[u64]) -> StructuralSnapshot {
        StructuralSnapshot::from_chapter_refs(ItemId::new(1), "New Title", "Writer", refs, Some(5))
    }

    #[test]
    fn reconcile_is_idempotent() {
        let snapshot = observed(&[10, 11, 12, 13]);
        let (once, first_changed) = reconciled(existing(), &snapshot);
        let (twice, second_changed) = reconciled(once.clone(), &snapshot);

        assert!(first_changed);
        assert!(!second_changed);
        assert_eq!(once, twice);
    }

    #[test]
    fn reconcile_overwrites_structural_fields_only() {
        let (item, changed) = reconciled(existing(), &observed(&[10, 11, 12]));
        assert!(changed);
        assert_eq!(item.title, "New Title");
        assert_eq!(item.total_sub_units, Some(5));
        assert_eq!(item.status, ReadingStatus::Reading);
        assert_eq!(item.rating, 4);
        assert!(item.sub_units[0].is_read());
        assert_eq!(item.sub_units[1].external_ref, Some(11));
    }

    #[test]
    fn reconcile_shrinks_trailing_positions() {
        let mut item = existing();
        item.title = "New Title".to_string();
        item.total_sub_units = Some(5);

        let changed = reconcile(&mut item, &observed(&[10, 11]));
        assert!(changed);
        assert_eq!(item.sub_units.len(), 2);
        assert!(item.is_well_formed());
    }

    #[test]
    fn reconcile_shrink_without_other_differences_still_changes() {
        let mut item = existing();
        let snapshot = StructuralSnapshot {
            id: item.id,
            title: item.title.clone(),
            author: item.author.clone(),
            total_sub_units: item.total_sub_units,
            sub_units: vec![SubUnit::new(0)],
        };
        assert!(reconcile(&mut item, &snapshot));
        assert_eq!(item.sub_units.len(), 1);
        assert_eq!(item.sub_units[0].external_ref, Some(10));
    }

    #[test]
    fn reconcile_adopts_new_sub_units_with_positional_indices() {
        let (item, changed) = reconciled(existing(), &observed(&[10, 11, 12, 13, 14]));
        assert!(changed);
        assert_eq!(item.sub_units.len(), 5);
        assert_eq!(item.sub_units[4], SubUnit::with_ref(4, 14));
        assert!(item.is_well_formed());
    }

    #[test]
    fn reconcile_keeps_ref_when_observed_is_undefined() {
        let mut item = existing();
        let mut snapshot = observed(&[]);
        snapshot.sub_units = vec![SubUnit::new(0), SubUnit::new(1), SubUnit::new(2)];
        reconcile(&mut item, &snapshot);
        assert_eq!(item.sub_units[0].external_ref, Some(10));
    }

    #[test]
    fn reconcile_unchanged_snapshot_reports_no_change() {
        let mut item = existing();
        let snapshot = StructuralSnapshot {
            id: item.id,
            title: item.title.clone(),
            author: item.author.clone(),
            total_sub_units: item.total_sub_units,
            sub_units: item.sub_units.clone(),
        };
        assert!(!reconcile(&mut item, &snapshot));
        assert_eq!(item, existing());
    }
}
