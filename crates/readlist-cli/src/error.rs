use std::io;

use readlist_core::ItemId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] readlist_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    #[error("Item {id} has no chapter {index}")]
    ChapterOutOfRange { id: ItemId, index: usize },
    #[error("Title cannot be empty")]
    EmptyTitle,
    #[error(
        "Sync is not configured. Set READLIST_REMOTE_URL (and READLIST_REMOTE_TOKEN) or add remote_url to the config file."
    )]
    SyncNotConfigured,
}
