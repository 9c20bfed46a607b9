//! readlist-core - Core library for Readlist
//!
//! This crate contains the reading list models, structural reconciliation,
//! remote merge and conflict handling, change notification, and the
//! persistence and remote adapters used by the CLI.

pub mod config;
pub mod db;
pub mod error;
pub mod merge;
pub mod models;
pub mod notify;
pub mod reconcile;
pub mod remote;
pub mod services;
pub mod util;

pub use error::{Error, Result};
pub use models::{Item, ItemId};
