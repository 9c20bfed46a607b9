//! Observed and remote views of an item

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

use super::{Item, ItemId, ReadingStatus, SubUnit};
use crate::error::{Error, Result};

/// Author shown when a listing names nobody
pub const ANONYMOUS_AUTHOR: &str = "Anonymous";

/// Upper bound on sub-units built from a parsed chapter count
pub const MAX_SUB_UNITS: u32 = 10_000;

/// Structure freshly observed on the source (title, author, sub-units)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructuralSnapshot {
    pub id: ItemId,
    pub title: String,
    pub author: String,
    pub total_sub_units: Option<u32>,
    pub sub_units: Vec<SubUnit>,
}

impl StructuralSnapshot {
    /// Snapshot of a work page: one sub-unit per published chapter id.
    ///
    /// A single-chapter work exposes no chapter list, so an empty `refs`
    /// yields one unidentified sub-unit.
    #[must_use]
    pub fn from_chapter_refs(
        id: ItemId,
        title: impl Into<String>,
        author: impl Into<String>,
        refs: &[u64],
        total_sub_units: Option<u32>,
    ) -> Self {
        let sub_units = if refs.is_empty() {
            vec![SubUnit::new(0)]
        } else {
            refs.iter()
                .enumerate()
                .map(|(index, external_ref)| SubUnit::with_ref(index, *external_ref))
                .collect()
        };
        Self {
            id,
            title: title.into().trim().to_string(),
            author: author.into().trim().to_string(),
            total_sub_units,
            sub_units,
        }
    }

    /// Snapshot of a listing entry.
    ///
    /// `chapters` is the listing stat text, `"<written>/<total>"` where the
    /// total may be `?`. Authors are joined with `", "`.
    pub fn from_listing(
        id: ItemId,
        title: impl Into<String>,
        authors: &[&str],
        chapters: &str,
    ) -> Result<Self> {
        let (written, total) = parse_chapter_stat(chapters)?;
        let author = if authors.is_empty() {
            ANONYMOUS_AUTHOR.to_string()
        } else {
            authors.join(", ")
        };
        Ok(Self {
            id,
            title: title.into().trim().to_string(),
            author,
            total_sub_units: total,
            sub_units: (0..written as usize).map(SubUnit::new).collect(),
        })
    }
}

/// Parse `"3/10"` or `"3/?"` into written and total counts.
///
/// Counts above [`MAX_SUB_UNITS`] or above a known total are rejected.
pub fn parse_chapter_stat(text: &str) -> Result<(u32, Option<u32>)> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([0-9][0-9,]*)\s*/\s*([0-9][0-9,]*|\?)\s*$").expect("Invalid regex")
    });

    let invalid = || Error::InvalidInput(format!("invalid chapter count '{text}'"));
    let captures = pattern.captures(text).ok_or_else(invalid)?;
    let parse = |raw: &str| raw.replace(',', "").parse::<u32>().map_err(|_| invalid());

    let written = parse(&captures[1])?;
    let total = match &captures[2] {
        "?" => None,
        raw => Some(parse(raw)?),
    };

    if written > MAX_SUB_UNITS || total.is_some_and(|total| written > total) {
        return Err(invalid());
    }
    Ok((written, total))
}

/// Completion state of one position as held by the remote store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RemoteSubUnit {
    pub completed_at: Option<DateTime<Utc>>,
}

/// Authoritative progress data held by the remote store
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RemoteSnapshot {
    pub status: ReadingStatus,
    pub rating: u8,
    pub total_sub_units: Option<u32>,
    pub external_ref: Option<u64>,
    pub sub_units: Vec<RemoteSubUnit>,
}

impl RemoteSnapshot {
    /// The part of an item the remote store keeps
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            status: item.status,
            rating: item.rating,
            total_sub_units: item.total_sub_units,
            external_ref: item.external_ref,
            sub_units: item
                .sub_units
                .iter()
                .map(|sub_unit| RemoteSubUnit {
                    completed_at: sub_unit.completed_at,
                })
                .collect(),
        }
    }
}

impl Item {
    /// Local record for an id that so far only exists remotely.
    ///
    /// Title and author stay empty until the source is observed.
    #[must_use]
    pub fn from_remote(id: ItemId, remote: &RemoteSnapshot) -> Self {
        let sub_units = remote
            .sub_units
            .iter()
            .enumerate()
            .map(|(index, entry)| SubUnit {
                completed_at: entry.completed_at,
                ..SubUnit::new(index)
            })
            .collect();
        Self {
            id,
            title: String::new(),
            author: String::new(),
            total_sub_units: remote.total_sub_units,
            status: remote.status,
            rating: remote.rating,
            external_ref: remote.external_ref,
            sub_units,
        }
    }

    /// Fresh, unread record built from an observed snapshot
    #[must_use]
    pub fn from_snapshot(snapshot: &StructuralSnapshot) -> Self {
        Self::new(
            snapshot.id,
            snapshot.title.clone(),
            snapshot.author.clone(),
            ReadingStatus::Unread,
            snapshot.sub_units.clone(),
            snapshot.total_sub_units,
        )
    }
}
