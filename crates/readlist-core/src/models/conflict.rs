//! Sync conflict model

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::record::ItemRecord;
use super::{Item, ItemId};
use crate::error::{Error, Result};

/// One step of a field path: a named field or a list position
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

/// Location of a field inside an item, e.g. `subUnits.2.completedAt`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// Path to a top-level field
    #[must_use]
    pub fn key(name: &str) -> Self {
        Self(vec![PathSegment::Key(name.to_string())])
    }

    #[must_use]
    pub fn then_key(mut self, name: &str) -> Self {
        self.0.push(PathSegment::Key(name.to_string()));
        self
    }

    #[must_use]
    pub fn then_index(mut self, index: usize) -> Self {
        self.0.push(PathSegment::Index(index));
        self
    }

    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Whether the two paths agree on their common prefix, i.e. one
    /// addresses a field inside (or equal to) the other.
    ///
    /// Sharing a single position is not enough: `subUnits.1` does not
    /// overlap `subUnits.2.completedAt` even though both start at
    /// `subUnits`. Looser any-position matching would tie every sub-unit
    /// path to every other one.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.0.iter().zip(&other.0).all(|(a, b)| a == b)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (position, segment) in self.0.iter().enumerate() {
            if position > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Index(index) => write!(f, "{index}")?,
                PathSegment::Key(key) => f.write_str(key)?,
            }
        }
        Ok(())
    }
}

/// Which candidate the user picked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Local,
    Remote,
}

/// Resolution state of a conflict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Resolution {
    #[default]
    Unresolved,
    ChoseLocal,
    ChoseRemote,
}

/// Divergence between local and remote edits of one item since their common base
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub item_id: ItemId,
    /// Paths edited on both sides to different values
    pub paths: Vec<FieldPath>,
    pub local: Item,
    pub remote: Item,
    /// Non-divergent edits merged, divergent paths holding the local value
    pub proposed: Item,
    resolution: Resolution,
}

impl Conflict {
    #[must_use]
    pub const fn new(
        item_id: ItemId,
        paths: Vec<FieldPath>,
        local: Item,
        remote: Item,
        proposed: Item,
    ) -> Self {
        Self {
            item_id,
            paths,
            local,
            remote,
            proposed,
            resolution: Resolution::Unresolved,
        }
    }

    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        !matches!(self.resolution, Resolution::Unresolved)
    }

    /// Pick one full snapshot as the outcome
    pub fn resolve(&mut self, side: Side) {
        self.resolution = match side {
            Side::Local => Resolution::ChoseLocal,
            Side::Remote => Resolution::ChoseRemote,
        };
    }

    /// The chosen snapshot; fails while unresolved
    pub fn value(&self) -> Result<&Item> {
        match self.resolution {
            Resolution::ChoseLocal => Ok(&self.local),
            Resolution::ChoseRemote => Ok(&self.remote),
            Resolution::Unresolved => Err(Error::ConflictUnresolved(self.item_id)),
        }
    }

    /// Consume the conflict, keeping the chosen snapshot
    pub fn into_value(self) -> Result<Item> {
        match self.resolution {
            Resolution::ChoseLocal => Ok(self.local),
            Resolution::ChoseRemote => Ok(self.remote),
            Resolution::Unresolved => Err(Error::ConflictUnresolved(self.item_id)),
        }
    }

    /// Whether a rendered field is under dispute
    #[must_use]
    pub fn matches_path(&self, path: &FieldPath) -> bool {
        self.paths.iter().any(|disputed| disputed.overlaps(path))
    }

    #[must_use]
    pub fn to_record(&self) -> ConflictRecord {
        ConflictRecord {
            item_id: self.item_id,
            paths: self.paths.clone(),
            local: self.local.to_record(),
            remote: self.remote.to_record(),
            result: self.proposed.to_record(),
            resolution: self.resolution,
        }
    }

    pub fn from_record(record: ConflictRecord) -> Result<Self> {
        let id = record.item_id;
        Ok(Self {
            item_id: id,
            paths: record.paths,
            local: Item::from_record(id, record.local)?,
            remote: Item::from_record(id, record.remote)?,
            proposed: Item::from_record(id, record.result)?,
            resolution: record.resolution,
        })
    }
}

/// Serialized `Conflict`; the embedded items take their id from `itemId`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub item_id: ItemId,
    pub paths: Vec<FieldPath>,
    pub local: ItemRecord,
    pub remote: ItemRecord,
    pub result: ItemRecord,
    #[serde(default)]
    pub resolution: Resolution,
}

/// Pending conflicts keyed by item identity
pub type ConflictTable = BTreeMap<ItemId, Conflict>;

pub fn encode_conflicts(conflicts: &ConflictTable) -> Result<String> {
    let records = conflicts.values().map(Conflict::to_record).collect::<Vec<_>>();
    serde_json::to_string(&records).map_err(|error| Error::InvalidInput(error.to_string()))
}

pub fn decode_conflicts(raw: &str) -> Result<ConflictTable> {
    let records: Vec<ConflictRecord> = serde_json::from_str(raw)
        .map_err(|error| Error::MalformedStoredData(format!("conflicts: {error}")))?;
    records
        .into_iter()
        .map(|record| {
            let conflict = Conflict::from_record(record)?;
            Ok((conflict.item_id, conflict))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ReadingStatus;
    use pretty_assertions::assert_eq;

    fn item(rating: u8) -> Item {
        let mut item = Item::new(
            ItemId::new(5),
            "T",
            "A",
            ReadingStatus::Reading,
            Vec::new(),
            None,
        );
        item.rating = rating;
        item
    }

    fn conflict() -> Conflict {
        Conflict::new(
            ItemId::new(5),
            vec![
                FieldPath::key("rating"),
                FieldPath::key("subUnits").then_index(2).then_key("completedAt"),
            ],
            item(3),
            item(5),
            item(3),
        )
    }

    #[test]
    fn value_fails_until_resolved() {
        let mut conflict = conflict();
        assert!(matches!(
            conflict.value(),
            Err(Error::ConflictUnresolved(id)) if id == ItemId::new(5)
        ));

        conflict.resolve(Side::Local);
        assert_eq!(conflict.value().unwrap(), &conflict.local);

        conflict.resolve(Side::Remote);
        assert_eq!(conflict.resolution(), Resolution::ChoseRemote);
        assert_eq!(conflict.into_value().unwrap().rating, 5);
    }

    #[test]
    fn matches_path_uses_common_prefix() {
        let conflict = conflict();
        assert!(conflict.matches_path(&FieldPath::key("rating")));
        assert!(conflict.matches_path(&FieldPath::key("subUnits")));
        assert!(conflict.matches_path(&FieldPath::key("subUnits").then_index(2)));
        assert!(!conflict.matches_path(&FieldPath::key("subUnits").then_index(1)));
        assert!(!conflict.matches_path(&FieldPath::key("status")));
    }

    #[test]
    fn field_path_display_and_wire_form() {
        let path = FieldPath::key("subUnits").then_index(2).then_key("completedAt");
        assert_eq!(path.to_string(), "subUnits.2.completedAt");
        assert_eq!(
            serde_json::to_string(&path).unwrap(),
            r#"["subUnits",2,"completedAt"]"#
        );
        let parsed: FieldPath = serde_json::from_str(r#"["subUnits",2,"completedAt"]"#).unwrap();
        assert_eq!(parsed, path);
    }

    #[test]
    fn conflict_table_survives_storage() {
        let mut table = ConflictTable::new();
        let mut stored = conflict();
        stored.resolve(Side::Remote);
        table.insert(stored.item_id, stored);

        let decoded = decode_conflicts(&encode_conflicts(&table).unwrap()).unwrap();
        assert_eq!(decoded, table);
        assert_eq!(decoded[&ItemId::new(5)].local.id, ItemId::new(5));
    }
}
