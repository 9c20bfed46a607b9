//! Reading list service: reconcile, sync, resolve, then persist and notify.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::db::{Database, LibSqlListStore, ListStore, StoreState};
use crate::error::{Error, Result};
use crate::merge::{applied_remote, remote_view, three_way};
use crate::models::{
    Conflict, Item, ItemId, ReadingList, RemoteSnapshot, Side, StructuralSnapshot,
};
use crate::notify::{Change, ChangeBus};
use crate::reconcile::reconciled;
use crate::remote::RemoteStore;

/// Result of merging an observed snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObserveOutcome {
    pub item: Item,
    pub changed: bool,
}

/// Summary of one sync round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Items created locally from the remote list
    pub created: Vec<ItemId>,
    /// Items updated by authoritative remote progress
    pub applied: Vec<ItemId>,
    /// Items where local and remote edits merged cleanly
    pub merged: Vec<ItemId>,
    /// Items with divergent edits, now waiting for a user choice
    pub conflicts: Vec<ItemId>,
    /// Items skipped because an earlier conflict is still unresolved
    pub skipped: Vec<ItemId>,
    /// Items sent to the remote store
    pub pushed: Vec<ItemId>,
}

/// Service owning the local store, the optional remote, and the change bus.
///
/// The store sits behind one async mutex that is held for the whole of each
/// operation, remote round trips included, so no two mutations of the same
/// item are ever in flight.
#[derive(Clone)]
pub struct ReadingListService<R> {
    db: Arc<Mutex<Database>>,
    remote: Option<R>,
    bus: ChangeBus,
}

impl<R: RemoteStore> ReadingListService<R> {
    /// Open a service backed by the database file at `db_path`.
    pub async fn open_path(
        db_path: impl Into<PathBuf>,
        remote: Option<R>,
        bus: ChangeBus,
    ) -> Result<Self> {
        let db_path = db_path.into();
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path).await?;
        if remote.is_none() {
            tracing::info!("Running in local-only mode (no remote configured)");
        }
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            remote,
            bus,
        })
    }

    /// Open an in-memory service (primarily for tests).
    pub async fn open_in_memory(remote: Option<R>, bus: ChangeBus) -> Result<Self> {
        let db = Database::open_in_memory().await?;
        Ok(Self {
            db: Arc::new(Mutex::new(db)),
            remote,
            bus,
        })
    }

    pub const fn bus(&self) -> &ChangeBus {
        &self.bus
    }

    pub const fn has_remote(&self) -> bool {
        self.remote.is_some()
    }

    fn require_remote(&self) -> Result<&R> {
        self.remote
            .as_ref()
            .ok_or_else(|| Error::Config("no remote store configured".to_string()))
    }

    fn notify(&self, changes: &[Change]) {
        if changes.is_empty() {
            return;
        }
        let report = self.bus.dispatch(changes);
        tracing::debug!(
            "Dispatched {} changes ({} deliveries, {} failed)",
            changes.len(),
            report.delivered,
            report.failed
        );
    }

    /// Full local reading list.
    pub async fn list(&self) -> Result<ReadingList> {
        let db = self.db.lock().await;
        LibSqlListStore::new(db.connection()).load().await
    }

    /// One item by id.
    pub async fn get(&self, id: ItemId) -> Result<Option<Item>> {
        Ok(self.list().await?.remove(&id))
    }

    /// Merge freshly observed structure into the cached record.
    ///
    /// Unknown ids become new unread items. Persists and notifies only on change.
    pub async fn observe(&self, snapshot: &StructuralSnapshot) -> Result<ObserveOutcome> {
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());
        let mut list = store.load().await?;

        let (item, changed) = match list.get(&snapshot.id) {
            Some(existing) => reconciled(existing.clone(), snapshot),
            None => (Item::from_snapshot(snapshot), true),
        };

        if changed {
            list.insert(item.id, item.clone());
            store.save(&list).await?;
            self.notify(&[Change::updated(item.clone())]);
        }

        Ok(ObserveOutcome { item, changed })
    }

    /// Store a locally edited item.
    pub async fn save_item(&self, item: Item) -> Result<()> {
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());
        let mut list = store.load().await?;

        if list.get(&item.id) == Some(&item) {
            return Ok(());
        }
        list.insert(item.id, item.clone());
        store.save(&list).await?;
        self.notify(&[Change::updated(item)]);
        Ok(())
    }

    /// Apply a local edit to an existing item and store it.
    pub async fn update_item(&self, id: ItemId, edit: impl FnOnce(&mut Item)) -> Result<Item> {
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());
        let mut list = store.load().await?;

        let current = list
            .get(&id)
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        let mut item = current.clone();
        edit(&mut item);
        item.renumber();

        if &item != current {
            list.insert(id, item.clone());
            store.save(&list).await?;
            self.notify(&[Change::updated(item.clone())]);
        }
        Ok(item)
    }

    /// Delete an item along with its sync base and any pending conflict.
    ///
    /// Returns whether the item was on the local list.
    pub async fn remove(&self, id: ItemId) -> Result<bool> {
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());
        let mut state = store.load_state().await?;

        let existed = state.list.remove(&id).is_some();
        let had_base = state.bases.remove(&id).is_some();
        let had_conflict = state.conflicts.remove(&id).is_some();
        if !(existed || had_base || had_conflict) {
            return Ok(false);
        }

        store.save_state(&state).await?;
        if existed {
            self.notify(&[Change::removed(id)]);
        }
        Ok(existed)
    }

    /// Conflicts waiting for a user choice.
    pub async fn conflicts(&self) -> Result<Vec<Conflict>> {
        let db = self.db.lock().await;
        let state = LibSqlListStore::new(db.connection()).load_state().await?;
        Ok(state.conflicts.into_values().collect())
    }

    /// Reconcile the local list with the remote store.
    ///
    /// Every merge runs on an in-memory copy. Pushes happen before the local
    /// commit, so a failed round trip leaves local state untouched; listeners
    /// are notified only after the commit succeeds.
    pub async fn sync(&self) -> Result<SyncReport> {
        let remote = self.require_remote()?;
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());

        let mut state = store.load_state().await?;
        let remote_list = remote.fetch_all().await?;

        let mut report = SyncReport::default();
        let mut changes = Vec::new();
        let mut pushes = Vec::new();

        for (id, snapshot) in &remote_list {
            let id = *id;
            if state.conflicts.contains_key(&id) {
                report.skipped.push(id);
                continue;
            }

            let Some(local) = state.list.get(&id).cloned() else {
                let item = Item::from_remote(id, snapshot);
                state.bases.insert(id, item.clone());
                state.list.insert(id, item.clone());
                changes.push(Change::updated(item));
                report.created.push(id);
                continue;
            };

            let merged = match state.bases.get(&id) {
                Some(base) if *base != local => {
                    let remote_item = remote_view(base, snapshot);
                    let outcome = three_way(&local, &remote_item, base);
                    if !outcome.is_clean() {
                        tracing::warn!(
                            "Item {} has divergent edits; waiting for resolution",
                            id
                        );
                        let conflict =
                            Conflict::new(id, outcome.paths, local, remote_item, outcome.merged);
                        state.conflicts.insert(id, conflict);
                        report.conflicts.push(id);
                        continue;
                    }
                    report.merged.push(id);
                    outcome.merged
                }
                // First sync, or no local edits since the base.
                base => {
                    let mut applied = applied_remote(local.clone(), snapshot);
                    adopt_remote_fields(&mut applied, snapshot, base.is_some());
                    if applied != local {
                        report.applied.push(id);
                    }
                    applied
                }
            };

            if RemoteSnapshot::from_item(&merged) != *snapshot {
                pushes.push(merged.clone());
            }
            if merged != local {
                changes.push(Change::updated(merged.clone()));
            }
            state.bases.insert(id, merged.clone());
            state.list.insert(id, merged);
        }

        // Items tracked locally that the remote has never seen.
        for (id, item) in &state.list {
            if !remote_list.contains_key(id)
                && !state.bases.contains_key(id)
                && item.is_in_list()
            {
                pushes.push(item.clone());
            }
        }
        for item in &pushes {
            state.bases.insert(item.id, item.clone());
        }

        for item in &pushes {
            remote.set(item.id, item).await?;
            report.pushed.push(item.id);
        }

        store.save_state(&state).await?;
        tracing::info!(
            "Sync finished: {} created, {} applied, {} merged, {} conflicts, {} pushed",
            report.created.len(),
            report.applied.len(),
            report.merged.len(),
            report.conflicts.len(),
            report.pushed.len()
        );

        self.notify(&changes);
        Ok(report)
    }

    /// Resolve a pending conflict by picking one full snapshot.
    pub async fn resolve(&self, id: ItemId, side: Side) -> Result<Item> {
        let db = self.db.lock().await;
        let store = LibSqlListStore::new(db.connection());
        let mut state: StoreState = store.load_state().await?;

        let mut conflict = state
            .conflicts
            .remove(&id)
            .ok_or_else(|| Error::NotFound(format!("conflict for item {id}")))?;
        conflict.resolve(side);
        let remote_version = conflict.remote.clone();
        let item = conflict.into_value()?;

        // Without a remote the next sync sees a local-only edit and pushes it.
        let base = match &self.remote {
            Some(remote) if item != remote_version => {
                remote.set(id, &item).await?;
                item.clone()
            }
            _ => remote_version,
        };

        let previous = state.list.insert(id, item.clone());
        state.bases.insert(id, base);
        store.save_state(&state).await?;
        tracing::info!("Resolved conflict for item {} ({:?})", id, side);

        if previous.as_ref() != Some(&item) {
            self.notify(&[Change::updated(item.clone())]);
        }
        Ok(item)
    }
}

/// Copy the remote-held fields `apply_remote` leaves alone.
///
/// With a base the remote is the only side that moved, so its values win
/// outright. On a first sync an absent remote value keeps the local one.
fn adopt_remote_fields(item: &mut Item, remote: &RemoteSnapshot, synced: bool) {
    if synced || remote.external_ref.is_some() {
        item.external_ref = remote.external_ref;
    }
    if synced || remote.total_sub_units.is_some() {
        item.total_sub_units = remote.total_sub_units;
    }
}
