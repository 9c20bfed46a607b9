//! Service layer for Readlist

mod reading_list;

pub use reading_list::{ObserveOutcome, ReadingListService, SyncReport};
