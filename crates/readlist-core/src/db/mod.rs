//! Database layer for Readlist

mod connection;
mod list_store;
mod migrations;

pub use connection::Database;
pub use list_store::{LibSqlListStore, ListStore, StoreState, BASE_KEY, CONFLICTS_KEY, LIST_KEY};
