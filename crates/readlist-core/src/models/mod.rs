//! Data models for Readlist

mod conflict;
mod item;
pub mod record;
mod snapshot;
mod status;

pub use conflict::{
    decode_conflicts, encode_conflicts, Conflict, ConflictRecord, ConflictTable, FieldPath,
    PathSegment, Resolution, Side,
};
pub use item::{Item, ItemId, SubUnit, SITE_BASE_URL};
pub use record::{ReadingList, RemoteList};
pub use snapshot::{
    parse_chapter_stat, RemoteSnapshot, RemoteSubUnit, StructuralSnapshot, ANONYMOUS_AUTHOR,
    MAX_SUB_UNITS,
};
pub use status::ReadingStatus;
