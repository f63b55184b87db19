//! Database model for stored message fragments.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use querystream_core::errors::{Error, Result, ValidationError};
use querystream_core::{ChunkType, NewFragment, PhysicalFragment};

use crate::schema::message_fragments;

/// Database model for one fragment row.
#[derive(
    Debug, Clone, Queryable, Identifiable, Insertable, Selectable, Serialize, Deserialize,
)]
#[diesel(table_name = message_fragments)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct MessageFragmentDB {
    pub id: String,
    pub message_id: String,
    pub chunk_type: String,
    pub sequence: i32,
    pub fragment_index: i32,
    pub fragment_count: i32,
    /// Compact JSON document.
    pub payload: String,
    /// RFC 3339 timestamp.
    pub created_at: String,
}

fn to_column(field: &'static str, value: u32) -> Result<i32> {
    i32::try_from(value).map_err(|_| {
        Error::Validation(ValidationError::OutOfRange {
            field,
            value: i64::from(value),
        })
    })
}

fn from_column(field: &'static str, value: i32) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        Error::Validation(ValidationError::OutOfRange {
            field,
            value: i64::from(value),
        })
    })
}

impl MessageFragmentDB {
    /// Build a row for `fragment` with a fresh id and the current time.
    pub fn from_new(fragment: &NewFragment, id: String, created_at: DateTime<Utc>) -> Result<Self> {
        if fragment.fragment_count == 0 || fragment.fragment_index >= fragment.fragment_count {
            return Err(Error::Validation(ValidationError::InvalidInput(format!(
                "fragment_index {} is outside 0..{}",
                fragment.fragment_index, fragment.fragment_count
            ))));
        }

        Ok(Self {
            id,
            message_id: fragment.message_id.clone(),
            chunk_type: fragment.chunk_type.as_str().to_string(),
            sequence: to_column("sequence", fragment.sequence)?,
            fragment_index: to_column("fragment_index", fragment.fragment_index)?,
            fragment_count: to_column("fragment_count", fragment.fragment_count)?,
            payload: serde_json::to_string(&fragment.payload)?,
            created_at: created_at.to_rfc3339(),
        })
    }

    /// Byte length of the stored payload text.
    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }
}

/// Converts a stored row. A payload that is not valid JSON becomes `null`, so
/// the merge step reports only the group it belongs to. Coordinates that
/// cannot be read are an error.
impl TryFrom<MessageFragmentDB> for PhysicalFragment {
    type Error = Error;

    fn try_from(db: MessageFragmentDB) -> Result<Self> {
        let chunk_type: ChunkType = db.chunk_type.parse()?;
        let created_at = DateTime::parse_from_rfc3339(&db.created_at)
            .map_err(ValidationError::DateTimeParse)?
            .with_timezone(&Utc);
        let payload = match serde_json::from_str::<Value>(&db.payload) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(
                    "Stored payload of fragment {} ({}#{} part {}) is not valid JSON: {}",
                    db.id, db.chunk_type, db.sequence, db.fragment_index, e
                );
                Value::Null
            }
        };

        Ok(PhysicalFragment {
            id: db.id,
            message_id: db.message_id,
            chunk_type,
            sequence: from_column("sequence", db.sequence)?,
            fragment_index: from_column("fragment_index", db.fragment_index)?,
            fragment_count: from_column("fragment_count", db.fragment_count)?,
            payload,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_fragment(index: u32, count: u32) -> NewFragment {
        NewFragment {
            message_id: "msg-1".to_string(),
            chunk_type: ChunkType::Data,
            sequence: 2,
            fragment_index: index,
            fragment_count: count,
            payload: json!({ "rows": [1, 2], "schema": {}, "name": "r" }),
        }
    }

    #[test]
    fn test_row_conversion_round_trips() {
        let now = Utc::now();
        let db = MessageFragmentDB::from_new(&new_fragment(1, 3), "id-1".to_string(), now).unwrap();

        assert_eq!(db.chunk_type, "data");
        assert_eq!(db.payload, r#"{"name":"r","rows":[1,2],"schema":{}}"#);

        let fragment = PhysicalFragment::try_from(db).unwrap();
        assert_eq!(fragment.fragment_index, 1);
        assert_eq!(fragment.fragment_count, 3);
        assert_eq!(fragment.chunk_type, ChunkType::Data);
        assert_eq!(fragment.created_at.timestamp(), now.timestamp());
    }

    #[test]
    fn test_index_outside_count_is_rejected() {
        let err = MessageFragmentDB::from_new(&new_fragment(3, 3), "id".to_string(), Utc::now());
        assert!(matches!(
            err,
            Err(Error::Validation(ValidationError::InvalidInput(_)))
        ));
    }

    #[test]
    fn test_unknown_chunk_type_is_rejected() {
        let mut db =
            MessageFragmentDB::from_new(&new_fragment(0, 1), "id".to_string(), Utc::now()).unwrap();
        db.chunk_type = "table".to_string();

        let err = PhysicalFragment::try_from(db).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::UnknownChunkType(_))
        ));
    }

    #[test]
    fn test_corrupt_payload_becomes_null() {
        let mut db =
            MessageFragmentDB::from_new(&new_fragment(0, 1), "id".to_string(), Utc::now()).unwrap();
        db.payload = r#"{"rows":[1,2"#.to_string();

        let fragment = PhysicalFragment::try_from(db).unwrap();
        assert_eq!(fragment.payload, Value::Null);
        assert_eq!(fragment.sequence, 2);
    }

    #[test]
    fn test_unreadable_created_at_is_rejected() {
        let mut db =
            MessageFragmentDB::from_new(&new_fragment(0, 1), "id".to_string(), Utc::now()).unwrap();
        db.created_at = "yesterday".to_string();

        let err = PhysicalFragment::try_from(db).unwrap_err();
        assert!(matches!(
            err,
            Error::Validation(ValidationError::DateTimeParse(_))
        ));
    }
}
