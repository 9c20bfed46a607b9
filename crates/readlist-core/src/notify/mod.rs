//! In-process change notification.
//!
//! Listeners register for one item, a set of items, or every item and get a
//! [`Subscription`] token back; dropping the token deregisters the listener.
//! A batch is delivered synchronously in order: each change reaches every
//! matching listener (in registration order) before the next change is
//! processed. A panicking listener is logged and skipped so the rest still
//! receive the change.

use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::record::ItemRecord;
use crate::models::{Item, ItemId};

type Callback = dyn Fn(ItemId, Option<&Item>) + Send + Sync;

/// Which identities a listener wants to hear about
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenerFilter {
    Single(ItemId),
    Set(HashSet<ItemId>),
    All,
}

impl ListenerFilter {
    pub fn set(ids: impl IntoIterator<Item = ItemId>) -> Self {
        Self::Set(ids.into_iter().collect())
    }

    #[must_use]
    pub fn matches(&self, id: ItemId) -> bool {
        match self {
            Self::Single(single) => *single == id,
            Self::Set(ids) => ids.contains(&id),
            Self::All => true,
        }
    }
}

/// New value of one identity; `None` means it was deleted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub id: ItemId,
    pub item: Option<Item>,
}

impl Change {
    #[must_use]
    pub fn updated(item: Item) -> Self {
        Self {
            id: item.id,
            item: Some(item),
        }
    }

    #[must_use]
    pub const fn removed(id: ItemId) -> Self {
        Self { id, item: None }
    }
}

/// Delivery counts for one dispatched batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

struct Entry {
    key: u64,
    filter: ListenerFilter,
    callback: Arc<Callback>,
}

#[derive(Default)]
struct Registry {
    next_key: u64,
    entries: Vec<Entry>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Registry of change listeners
#[derive(Clone, Default)]
pub struct ChangeBus {
    registry: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ChangeBus {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("ChangeBus")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl ChangeBus {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process-wide bus, created on first use
    pub fn global() -> &'static Self {
        static GLOBAL: OnceLock<ChangeBus> = OnceLock::new();
        GLOBAL.get_or_init(Self::new)
    }

    /// Register `callback` for changes matching `filter`
    pub fn subscribe<F>(&self, filter: ListenerFilter, callback: F) -> Subscription
    where
        F: Fn(ItemId, Option<&Item>) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let key = registry.next_key;
        registry.next_key += 1;
        registry.entries.push(Entry {
            key,
            filter,
            callback: Arc::new(callback),
        });
        Subscription {
            key,
            registry: Arc::downgrade(&self.registry),
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    /// Deliver a batch of changes to matching listeners
    pub fn dispatch(&self, batch: &[Change]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for change in batch {
            // Listeners may subscribe or unsubscribe while being called.
            let callbacks = lock(&self.registry)
                .entries
                .iter()
                .filter(|entry| entry.filter.matches(change.id))
                .map(|entry| Arc::clone(&entry.callback))
                .collect::<Vec<_>>();

            for callback in callbacks {
                let outcome = catch_unwind(AssertUnwindSafe(|| {
                    callback(change.id, change.item.as_ref());
                }));
                if outcome.is_ok() {
                    report.delivered += 1;
                } else {
                    report.failed += 1;
                    tracing::error!("Change listener panicked while handling item {}", change.id);
                }
            }
        }

        report
    }

    /// Decode a wire batch and dispatch it
    pub fn dispatch_message(&self, raw: &str) -> Result<DispatchReport> {
        let message: ChangeBatchMessage = serde_json::from_str(raw)
            .map_err(|error| Error::MalformedStoredData(format!("change batch: {error}")))?;
        let changes = message.into_changes()?;
        Ok(self.dispatch(&changes))
    }
}

/// Owned registration; dropping it removes the listener
#[must_use = "dropping a subscription unregisters its listener"]
pub struct Subscription {
    key: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Subscription {
    /// Explicitly unregister (same as dropping)
    pub fn unsubscribe(self) {}
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("Subscription")
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|entry| entry.key != self.key);
        }
    }
}

/// Wire form of a change batch: `{"changes":[{"id":5,"item":{..}|null}]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatchMessage {
    pub changes: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRecord {
    pub id: ItemId,
    pub item: Option<ItemRecord>,
}

impl ChangeBatchMessage {
    #[must_use]
    pub fn from_changes(changes: &[Change]) -> Self {
        Self {
            changes: changes
                .iter()
                .map(|change| ChangeRecord {
                    id: change.id,
                    item: change.item.as_ref().map(Item::to_record),
                })
                .collect(),
        }
    }

    pub fn into_changes(self) -> Result<Vec<Change>> {
        self.changes
            .into_iter()
            .map(|record| {
                let item = record
                    .item
                    .map(|item| Item::from_record(record.id, item))
                    .transpose()?;
                Ok(Change {
                    id: record.id,
                    item,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingStatus;
    use pretty_assertions::assert_eq;

    type Log = Arc<Mutex<Vec<(&'static str, u64, Option<String>)>>>;

    fn item(id: u64, title: &str) -> Item {
        Item::new(ItemId::new(id), title, "A", ReadingStatus::Reading, Vec::new(), None)
    }

    fn recorder(log: &Log, name: &'static str) -> impl Fn(ItemId, Option<&Item>) + Send + Sync {
        let log = Arc::clone(log);
        move |id: ItemId, item: Option<&Item>| {
            log.lock()
                .unwrap()
                .push((name, id.get(), item.map(|i| i.title.clone())));
        }
    }

    #[test]
    fn dispatch_filters_by_identity() {
        let bus = ChangeBus::new();
        let log: Log = Arc::default();
        let _single = bus.subscribe(
            ListenerFilter::Single(ItemId::new(5)),
            recorder(&log, "single"),
        );
        let _set = bus.subscribe(
            ListenerFilter::set([ItemId::new(5), ItemId::new(7)]),
            recorder(&log, "set"),
        );
        let _all = bus.subscribe(ListenerFilter::All, recorder(&log, "all"));

        let report = bus.dispatch(&[Change::updated(item(5, "X")), Change::updated(item(9, "Y"))]);

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                ("single", 5, Some("X".to_string())),
                ("set", 5, Some("X".to_string())),
                ("all", 5, Some("X".to_string())),
                ("all", 9, Some("Y".to_string())),
            ]
        );
        assert_eq!(report, DispatchReport { delivered: 4, failed: 0 });
    }

    #[test]
    fn deletion_is_delivered_as_none() {
        let bus = ChangeBus::new();
        let log: Log = Arc::default();
        let _all = bus.subscribe(ListenerFilter::All, recorder(&log, "all"));

        bus.dispatch(&[Change::removed(ItemId::new(3))]);
        assert_eq!(*log.lock().unwrap(), vec![("all", 3, None)]);
    }

    #[test]
    fn dropping_subscription_unregisters() {
        let bus = ChangeBus::new();
        let log: Log = Arc::default();
        let subscription = bus.subscribe(ListenerFilter::All, recorder(&log, "all"));
        let kept = bus.subscribe(ListenerFilter::All, recorder(&log, "kept"));
        assert_eq!(bus.listener_count(), 2);

        subscription.unsubscribe();
        assert_eq!(bus.listener_count(), 1);

        bus.dispatch(&[Change::removed(ItemId::new(1))]);
        assert_eq!(*log.lock().unwrap(), vec![("kept", 1, None)]);

        drop(kept);
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_bus_is_harmless() {
        let bus = ChangeBus::new();
        let subscription = bus.subscribe(ListenerFilter::All, |_, _| {});
        drop(bus);
        drop(subscription);
    }

    #[test]
    fn panicking_listener_does_not_block_others() {
        let bus = ChangeBus::new();
        let log: Log = Arc::default();
        let _bad = bus.subscribe(ListenerFilter::All, |_, _| panic!("listener failure"));
        let _good = bus.subscribe(ListenerFilter::All, recorder(&log, "good"));

        let report = bus.dispatch(&[
            Change::removed(ItemId::new(1)),
            Change::removed(ItemId::new(2)),
        ]);

        assert_eq!(report, DispatchReport { delivered: 2, failed: 2 });
        assert_eq!(
            *log.lock().unwrap(),
            vec![("good", 1, None), ("good", 2, None)]
        );
    }

    #[test]
    fn dispatch_message_decodes_wire_batch() {
        let bus = ChangeBus::new();
        let log: Log = Arc::default();
        let _all = bus.subscribe(ListenerFilter::All, recorder(&log, "all"));

        let raw = r#"{"changes":[
            {"id":5,"item":{"title":"X","author":"A","totalSubUnits":null,"status":"read"}},
            {"id":6,"item":null}
        ]}"#;
        let report = bus.dispatch_message(raw).unwrap();

        assert_eq!(report.delivered, 2);
        assert_eq!(
            *log.lock().unwrap(),
            vec![("all", 5, Some("X".to_string())), ("all", 6, None)]
        );
        assert!(matches!(
            bus.dispatch_message("{\"changes\":5}"),
            Err(Error::MalformedStoredData(_))
        ));
    }

    #[test]
    fn message_roundtrips_changes() {
        let changes = vec![Change::updated(item(1, "One")), Change::removed(ItemId::new(2))];
        let message = ChangeBatchMessage::from_changes(&changes);
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["changes"][1], serde_json::json!({ "id": 2, "item": null }));
        assert_eq!(message.into_changes().unwrap(), changes);
    }
}
