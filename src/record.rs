//! Record model for the Stratus record store.
//!
//! A record is a bag of user attributes under a record type, addressed by a
//! `type/id` identifier. Server-managed metadata travels under
//! underscore-prefixed keys and is split out of the attribute map on decode.

use chrono::{DateTime, Utc};
use serde_json::{json, Map, Value};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::value;

#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    record_type: String,
    name: String,
    attributes: Map<String, Value>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub updated_by: Option<String>,
    pub owner_id: Option<String>,
    pub access: Option<Value>,
    pub transient: Map<String, Value>,
}

impl Record {
    /// A record type is valid when it is non-empty and does not start with
    /// the reserved underscore prefix.
    pub fn valid_type(record_type: &str) -> bool {
        !record_type.is_empty() && !record_type.starts_with('_')
    }

    /// Split a full `type/id` identifier. The id portion may itself contain
    /// slashes.
    pub fn parse_id(id: &str) -> Result<(String, String)> {
        match id.split_once('/') {
            Some((record_type, name)) if !name.is_empty() => {
                Ok((record_type.to_string(), name.to_string()))
            }
            _ => Err(Error::InvalidArgumentType(
                "record id must be in the format `type/id`".to_string(),
            )),
        }
    }

    /// Create an empty record with a generated id.
    pub fn new(record_type: impl Into<String>) -> Result<Self> {
        let name = Uuid::new_v4().to_string();
        Self::with_id(record_type, name)
    }

    /// Create an empty record with a caller-chosen id portion.
    pub fn with_id(record_type: impl Into<String>, name: impl Into<String>) -> Result<Self> {
        let record_type = record_type.into();
        if !Self::valid_type(&record_type) {
            return Err(Error::InvalidRecordType(record_type));
        }
        Ok(Self {
            record_type,
            name: name.into(),
            attributes: Map::new(),
            created_at: None,
            updated_at: None,
            created_by: None,
            updated_by: None,
            owner_id: None,
            access: None,
            transient: Map::new(),
        })
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    /// The id portion after the record type.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The full `type/id` identifier.
    pub fn id(&self) -> String {
        format!("{}/{}", self.record_type, self.name)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Set a user attribute. Underscore-prefixed keys are reserved for
    /// server metadata.
    pub fn set(&mut self, key: &str, attr: impl Into<Value>) -> Result<()> {
        if key.starts_with('_') {
            return Err(Error::InvalidArgumentType(format!(
                "attribute key {:?} is reserved",
                key
            )));
        }
        self.attributes.insert(key.to_string(), attr.into());
        Ok(())
    }

    pub fn attributes(&self) -> &Map<String, Value> {
        &self.attributes
    }

    pub fn to_wire(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("_id".to_string(), json!(self.id()));
        if let Some(access) = &self.access {
            payload.insert("_access".to_string(), access.clone());
        }
        for (key, attr) in &self.attributes {
            payload.insert(key.clone(), attr.clone());
        }
        Value::Object(payload)
    }

    pub fn from_wire(payload: &Value) -> Result<Self> {
        let map = payload.as_object().ok_or_else(|| {
            Error::MalformedWireValue("record payload must be an object".to_string())
        })?;
        let id = map.get("_id").and_then(Value::as_str).ok_or_else(|| {
            Error::MalformedWireValue("record payload requires a string _id".to_string())
        })?;
        let (record_type, name) = Self::parse_id(id)
            .map_err(|_| Error::MalformedWireValue(format!("bad record _id {:?}", id)))?;
        let mut record = Self::with_id(record_type, name)?;

        for (key, attr) in map {
            match key.as_str() {
                "_id" => {}
                "_created_at" => record.created_at = Some(parse_timestamp(attr)?),
                "_updated_at" => record.updated_at = Some(parse_timestamp(attr)?),
                "_created_by" => record.created_by = as_string(attr),
                "_updated_by" => record.updated_by = as_string(attr),
                "_ownerID" => record.owner_id = as_string(attr),
                "_access" => record.access = Some(attr.clone()),
                "_transient" => {
                    if let Some(entries) = attr.as_object() {
                        record.transient = entries.clone();
                    }
                }
                key if key.starts_with('_') => {
                    // unrecognized metadata from a newer server, drop it
                }
                _ => {
                    value::check_wire_value(attr)?;
                    record.attributes.insert(key.clone(), attr.clone());
                }
            }
        }

        Ok(record)
    }
}

fn parse_timestamp(attr: &Value) -> Result<DateTime<Utc>> {
    let raw = attr.as_str().ok_or_else(|| {
        Error::MalformedWireValue("record timestamp must be a string".to_string())
    })?;
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::MalformedWireValue(format!("bad record timestamp {:?}: {}", raw, e)))
}

fn as_string(attr: &Value) -> Option<String> {
    attr.as_str().map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_type() {
        assert!(Record::valid_type("note"));
        assert!(!Record::valid_type(""));
        assert!(!Record::valid_type("_user"));
    }

    #[test]
    fn test_parse_id_keeps_extra_slashes() {
        let (record_type, name) = Record::parse_id("note/a/b").unwrap();
        assert_eq!(record_type, "note");
        assert_eq!(name, "a/b");
        assert!(Record::parse_id("note").is_err());
    }

    #[test]
    fn test_new_generates_an_id() {
        let record = Record::new("note").unwrap();
        assert!(record.id().starts_with("note/"));
        assert!(!record.name().is_empty());
    }

    #[test]
    fn test_set_rejects_reserved_keys() {
        let mut record = Record::new("note").unwrap();
        assert!(record.set("_ownerID", "u1").is_err());
        assert!(record.set("title", "hello").is_ok());
    }
}
