//! Reading list document store

use libsql::{params, Connection};

use crate::error::{Error, Result};
use crate::models::record::{decode_table, encode_table};
use crate::models::{decode_conflicts, encode_conflicts, ConflictTable, ReadingList};

/// Key of the local reading list document
pub const LIST_KEY: &str = "readingList.list";
/// Key of the last synced (common base) snapshots
pub const BASE_KEY: &str = "readingList.base";
/// Key of the pending conflicts awaiting a user choice
pub const CONFLICTS_KEY: &str = "readingList.conflicts";

/// Everything the store holds, written together by [`ListStore::save_state`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub list: ReadingList,
    pub bases: ReadingList,
    pub conflicts: ConflictTable,
}

/// Trait for reading list storage operations (async)
#[allow(async_fn_in_trait)]
pub trait ListStore {
    /// Load the full identity -> item table
    async fn load(&self) -> Result<ReadingList>;

    /// Replace the stored table
    async fn save(&self, list: &ReadingList) -> Result<()>;

    /// Load list, bases and conflicts
    async fn load_state(&self) -> Result<StoreState>;

    /// Replace list, bases and conflicts in one transaction
    async fn save_state(&self, state: &StoreState) -> Result<()>;
}

/// libSQL implementation of `ListStore`
pub struct LibSqlListStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlListStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl ListStore for LibSqlListStore<'_> {
    async fn load(&self) -> Result<ReadingList> {
        match self.get_value(LIST_KEY).await? {
            Some(raw) => decode_table(&raw),
            None => Ok(ReadingList::new()),
        }
    }

    async fn save(&self, list: &ReadingList) -> Result<()> {
        let raw = encode_table(list)?;
        self.set_value(LIST_KEY, &raw).await?;
        tracing::debug!("Saved reading list with {} items", list.len());
        Ok(())
    }

    async fn load_state(&self) -> Result<StoreState> {
        let list = self.load().await?;
        let bases = match self.get_value(BASE_KEY).await? {
            Some(raw) => decode_table(&raw)?,
            None => ReadingList::new(),
        };
        let conflicts = match self.get_value(CONFLICTS_KEY).await? {
            Some(raw) => decode_conflicts(&raw)?,
            None => ConflictTable::new(),
        };
        Ok(StoreState {
            list,
            bases,
            conflicts,
        })
    }

    async fn save_state(&self, state: &StoreState) -> Result<()> {
        let entries = [
            (LIST_KEY, encode_table(&state.list)?),
            (BASE_KEY, encode_table(&state.bases)?),
            (CONFLICTS_KEY, encode_conflicts(&state.conflicts)?),
        ];

        self.conn.execute("BEGIN TRANSACTION", ()).await?;
        for (key, raw) in &entries {
            if let Err(error) = self.set_value(key, raw).await {
                self.conn.execute("ROLLBACK", ()).await.ok();
                return Err(error);
            }
        }
        if let Err(error) = self.conn.execute("COMMIT", ()).await {
            self.conn.execute("ROLLBACK", ()).await.ok();
            return Err(error.into());
        }

        tracing::debug!(
            "Saved reading list state: {} items, {} bases, {} conflicts",
            state.list.len(),
            state.bases.len(),
            state.conflicts.len()
        );
        Ok(())
    }
}

impl LibSqlListStore<'_> {
    async fn get_value(&self, key: &str) -> Result<Option<String>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv_store WHERE key = ?", [key])
            .await
            .map_err(|error| Error::persistence(&format!("failed to read '{key}'"), error))?;

        match rows.next().await? {
            Some(row) => Ok(Some(row.get(0)?)),
            None => Ok(None),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        self.conn
            .execute(
                "INSERT OR REPLACE INTO kv_store (key, value, updated_at) VALUES (?, ?, ?)",
                params![key, value, now],
            )
            .await
            .map_err(|error| Error::persistence(&format!("failed to write '{key}'"), error))?;
        Ok(())
    }
}
