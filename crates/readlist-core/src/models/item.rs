//! Reading list item model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use super::ReadingStatus;

/// Base URL of the site items are read on
pub const SITE_BASE_URL: &str = "https://archiveofourown.org";

/// Opaque identity of a tracked item (the work id on the source site)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(u64);

impl ItemId {
    /// Wrap a raw id
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw numeric id
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

impl From<u64> for ItemId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}

/// One chapter-like element of an item, owned by its parent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubUnit {
    /// Position in the parent's list
    pub index: usize,
    /// Identity assigned by the source once published
    pub external_ref: Option<u64>,
    /// When the user finished this sub-unit; `None` means not read yet
    pub completed_at: Option<DateTime<Utc>>,
}

impl SubUnit {
    /// An unread sub-unit without external identity
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self {
            index,
            external_ref: None,
            completed_at: None,
        }
    }

    /// An unread sub-unit with a known external identity
    #[must_use]
    pub const fn with_ref(index: usize, external_ref: u64) -> Self {
        Self {
            index,
            external_ref: Some(external_ref),
            completed_at: None,
        }
    }

    /// Whether the user finished this sub-unit
    #[must_use]
    pub const fn is_read(&self) -> bool {
        self.completed_at.is_some()
    }

    /// Completion date formatted as `YYYY-MM-DD`
    #[must_use]
    pub fn completed_text(&self) -> Option<String> {
        self.completed_at
            .map(|stamp| stamp.format("%Y-%m-%d").to_string())
    }

    /// Link to this sub-unit on the source site.
    ///
    /// Unidentified sub-units past the first get an `ao3e-chapter` placeholder
    /// path. `workskin` appends the `#workskin` fragment.
    #[must_use]
    pub fn href(&self, item_id: ItemId, absolute: bool, workskin: bool) -> String {
        let base = if absolute { SITE_BASE_URL } else { "" };
        let chapter = match self.external_ref {
            Some(external_ref) => format!("/chapters/{external_ref}"),
            None if self.index == 0 => String::new(),
            None => format!("/ao3e-chapter/{}", self.index),
        };
        let fragment = if workskin { "#workskin" } else { "" };
        format!("{base}/works/{item_id}{chapter}{fragment}")
    }
}

/// Tracked reading progress on one unit of content
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Identity, never part of the serialized payload
    pub id: ItemId,
    pub title: String,
    pub author: String,
    /// Total announced sub-units; `None` while the content is still being produced
    pub total_sub_units: Option<u32>,
    pub status: ReadingStatus,
    pub rating: u8,
    /// Bookmark reference on the source site
    pub external_ref: Option<u64>,
    /// Sub-units in reading order, `sub_units[i].index == i`
    pub sub_units: Vec<SubUnit>,
}

impl Item {
    /// Create an item with the given structure and a zero rating
    #[must_use]
    pub fn new(
        id: ItemId,
        title: impl Into<String>,
        author: impl Into<String>,
        status: ReadingStatus,
        sub_units: Vec<SubUnit>,
        total_sub_units: Option<u32>,
    ) -> Self {
        let mut item = Self {
            id,
            title: title.into(),
            author: author.into(),
            total_sub_units,
            status,
            rating: 0,
            external_ref: None,
            sub_units,
        };
        item.renumber();
        item
    }

    /// Re-establish `sub_units[i].index == i`
    pub fn renumber(&mut self) {
        for (index, sub_unit) in self.sub_units.iter_mut().enumerate() {
            sub_unit.index = index;
        }
    }

    /// Check the positional invariant
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.sub_units
            .iter()
            .enumerate()
            .all(|(index, sub_unit)| sub_unit.index == index)
    }

    #[must_use]
    pub fn is_any_read(&self) -> bool {
        self.sub_units.iter().any(SubUnit::is_read)
    }

    #[must_use]
    pub fn is_all_read(&self) -> bool {
        self.sub_units.iter().all(SubUnit::is_read)
    }

    /// Whether fewer sub-units exist than announced (or the total is unknown)
    #[must_use]
    pub fn is_work_in_progress(&self) -> bool {
        match self.total_sub_units {
            None => true,
            Some(total) => usize::try_from(total).ok() != Some(self.sub_units.len()),
        }
    }

    #[must_use]
    pub fn read_count(&self) -> usize {
        self.sub_units.iter().filter(|s| s.is_read()).count()
    }

    #[must_use]
    pub fn last_read_index(&self) -> Option<usize> {
        self.sub_units.iter().rposition(SubUnit::is_read)
    }

    #[must_use]
    pub fn first_unread_index(&self) -> Option<usize> {
        self.sub_units.iter().position(|s| !s.is_read())
    }

    /// Whether the item belongs on the user's list at all
    #[must_use]
    pub fn is_in_list(&self) -> bool {
        self.is_any_read() || self.status != ReadingStatus::Unread
    }

    #[must_use]
    pub fn link_url(&self) -> String {
        format!("{SITE_BASE_URL}/works/{}", self.id)
    }

    #[must_use]
    pub fn bookmark_url(&self) -> Option<String> {
        self.external_ref
            .map(|bookmark| format!("{SITE_BASE_URL}/bookmarks/{bookmark}"))
    }

    /// Mark a sub-unit as read at the given time
    pub fn mark_read(&mut self, index: usize, at: DateTime<Utc>) -> bool {
        self.sub_units.get_mut(index).is_some_and(|sub_unit| {
            sub_unit.completed_at = Some(at);
            true
        })
    }
}
