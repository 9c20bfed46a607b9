//! Wire format for stored and remote records.
//!
//! Encoding is explicit per entity. Item ids never appear inside a payload:
//! they are the keys of the surrounding table. Sub-unit indices are implied
//! by array position. Timestamps travel as Unix milliseconds.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Item, ItemId, ReadingStatus, RemoteSnapshot, RemoteSubUnit, SubUnit};
use crate::error::{Error, Result};
use crate::util::{from_epoch_millis, to_epoch_millis};

/// Local reading list, keyed by item identity
pub type ReadingList = BTreeMap<ItemId, Item>;

/// Remote reading list, keyed by item identity
pub type RemoteList = BTreeMap<ItemId, RemoteSnapshot>;

/// Serialized `Item`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRecord {
    pub title: String,
    pub author: String,
    pub total_sub_units: Option<u32>,
    pub status: ReadingStatus,
    #[serde(default)]
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<u64>,
    #[serde(default)]
    pub sub_units: Vec<SubUnitRecord>,
}

/// Serialized `SubUnit`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubUnitRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

/// Serialized `RemoteSnapshot`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRecord {
    #[serde(default)]
    pub sub_units: Vec<RemoteSubUnitRecord>,
    pub total_sub_units: Option<u32>,
    pub status: ReadingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<u64>,
    #[serde(default)]
    pub rating: u8,
}

/// Serialized `RemoteSubUnit`
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSubUnitRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<i64>,
}

fn decode_timestamp(
    id: ItemId,
    index: usize,
    millis: Option<i64>,
) -> Result<Option<chrono::DateTime<chrono::Utc>>> {
    millis
        .map(|value| {
            from_epoch_millis(value).ok_or_else(|| {
                Error::MalformedStoredData(format!(
                    "item {id} sub-unit {index}: timestamp {value} out of range"
                ))
            })
        })
        .transpose()
}

impl Item {
    /// Encode without the identity and positional fields
    #[must_use]
    pub fn to_record(&self) -> ItemRecord {
        let Self {
            id: _,
            title,
            author,
            total_sub_units,
            status,
            rating,
            external_ref,
            sub_units,
        } = self;
        ItemRecord {
            title: title.clone(),
            author: author.clone(),
            total_sub_units: *total_sub_units,
            status: *status,
            rating: *rating,
            external_ref: *external_ref,
            sub_units: sub_units
                .iter()
                .map(|sub_unit| SubUnitRecord {
                    external_ref: sub_unit.external_ref,
                    completed_at: sub_unit.completed_at.map(to_epoch_millis),
                })
                .collect(),
        }
    }

    /// Decode a record stored under `id`, restoring sub-unit indices
    pub fn from_record(id: ItemId, record: ItemRecord) -> Result<Self> {
        let sub_units = record
            .sub_units
            .into_iter()
            .enumerate()
            .map(|(index, sub_unit)| {
                Ok(SubUnit {
                    index,
                    external_ref: sub_unit.external_ref,
                    completed_at: decode_timestamp(id, index, sub_unit.completed_at)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            id,
            title: record.title,
            author: record.author,
            total_sub_units: record.total_sub_units,
            status: record.status,
            rating: record.rating,
            external_ref: record.external_ref,
            sub_units,
        })
    }
}

impl RemoteSnapshot {
    #[must_use]
    pub fn to_record(&self) -> RemoteRecord {
        RemoteRecord {
            sub_units: self
                .sub_units
                .iter()
                .map(|entry| RemoteSubUnitRecord {
                    completed_at: entry.completed_at.map(to_epoch_millis),
                })
                .collect(),
            total_sub_units: self.total_sub_units,
            status: self.status,
            external_ref: self.external_ref,
            rating: self.rating,
        }
    }

    pub fn from_record(id: ItemId, record: RemoteRecord) -> Result<Self> {
        let sub_units = record
            .sub_units
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                Ok(RemoteSubUnit {
                    completed_at: decode_timestamp(id, index, entry.completed_at)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            status: record.status,
            rating: record.rating,
            total_sub_units: record.total_sub_units,
            external_ref: record.external_ref,
            sub_units,
        })
    }
}

/// Parse a table key back into an identity
pub fn parse_key(key: &str) -> Result<ItemId> {
    key.parse()
        .map_err(|_| Error::MalformedStoredData(format!("invalid item key '{key}'")))
}

/// Serialize the whole local list as one JSON document
pub fn encode_table(list: &ReadingList) -> Result<String> {
    let records = list
        .iter()
        .map(|(id, item)| (id.to_string(), item.to_record()))
        .collect::<BTreeMap<_, _>>();
    serde_json::to_string(&records).map_err(|error| Error::InvalidInput(error.to_string()))
}

/// Parse a JSON document produced by [`encode_table`]
pub fn decode_table(raw: &str) -> Result<ReadingList> {
    let records: BTreeMap<String, ItemRecord> = serde_json::from_str(raw)
        .map_err(|error| Error::MalformedStoredData(format!("reading list: {error}")))?;
    records
        .into_iter()
        .map(|(key, record)| {
            let id = parse_key(&key)?;
            Ok((id, Item::from_record(id, record)?))
        })
        .collect()
}

/// Decode a remote table as returned by the remote store
pub fn decode_remote_records(records: BTreeMap<String, RemoteRecord>) -> Result<RemoteList> {
    records
        .into_iter()
        .map(|(key, record)| {
            let id = parse_key(&key)?;
            Ok((id, RemoteSnapshot::from_record(id, record)?))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn sample() -> Item {
        let mut item = Item::new(
            ItemId::new(77),
            "Title",
            "Author",
            ReadingStatus::OnHold,
            vec![SubUnit::with_ref(0, 501), SubUnit::new(1)],
            None,
        );
        item.rating = 3;
        item.sub_units[0].completed_at = Some(Utc.timestamp_millis_opt(1_600_000_000_000).unwrap());
        item
    }

    #[test]
    fn item_payload_excludes_identity_and_indices() {
        let value = serde_json::to_value(sample().to_record()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "title": "Title",
                "author": "Author",
                "totalSubUnits": null,
                "status": "onHold",
                "rating": 3,
                "subUnits": [
                    { "externalRef": 501, "completedAt": 1_600_000_000_000_i64 },
                    {}
                ]
            })
        );
    }

    #[test]
    fn table_decode_restores_ids_from_keys() {
        let mut list = ReadingList::new();
        list.insert(ItemId::new(77), sample());
        let raw = encode_table(&list).unwrap();
        assert!(raw.starts_with("{\"77\":"));

        let decoded = decode_table(&raw).unwrap();
        assert_eq!(decoded, list);
        assert!(decoded[&ItemId::new(77)].is_well_formed());
    }

    #[test]
    fn decode_defaults_missing_optional_fields() {
        let raw = r#"{"5":{"title":"T","author":"A","status":"reading"}}"#;
        let decoded = decode_table(raw).unwrap();
        let item = &decoded[&ItemId::new(5)];
        assert_eq!(item.rating, 0);
        assert_eq!(item.total_sub_units, None);
        assert!(item.sub_units.is_empty());
    }

    #[test]
    fn decode_rejects_malformed_payloads() {
        assert!(matches!(
            decode_table("not json"),
            Err(Error::MalformedStoredData(_))
        ));
        assert!(matches!(
            decode_table(r#"{"abc":{"title":"T","author":"A","status":"read"}}"#),
            Err(Error::MalformedStoredData(_))
        ));
        assert!(matches!(
            decode_table(r#"{"1":{"title":"T","author":"A","status":"finished"}}"#),
            Err(Error::MalformedStoredData(_))
        ));
    }

    #[test]
    fn remote_records_decode() {
        let raw = r#"{"8":{
            "subUnits":[{"completedAt":1000},{}],
            "totalSubUnits":2,"status":"read","rating":4
        }}"#;
        let records: BTreeMap<String, RemoteRecord> = serde_json::from_str(raw).unwrap();
        let list = decode_remote_records(records).unwrap();
        let remote = &list[&ItemId::new(8)];
        assert_eq!(remote.status, ReadingStatus::Read);
        assert_eq!(remote.rating, 4);
        assert_eq!(remote.sub_units.len(), 2);
        assert!(remote.sub_units[0].completed_at.is_some());
        assert_eq!(remote.to_record().sub_units[1], RemoteSubUnitRecord::default());
    }
}
