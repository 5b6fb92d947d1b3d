//! References to records by their full `type/id` identifier.

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::record::Record;

/// A pointer to another record, serialized as `{"$type": "ref", "$id": ...}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    id: String,
}

impl Reference {
    /// Create a reference from a full record id in `type/id` format.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        // parse solely to test for id validity
        Record::parse_id(&id)?;
        Ok(Self { id })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "$type": "ref",
            "$id": self.id,
        })
    }

    pub fn from_wire(value: &Value) -> Result<Self> {
        match value.get("$id").and_then(Value::as_str) {
            Some(id) => Self::new(id),
            None => Err(Error::MalformedWireValue(
                "ref value requires a string $id".to_string(),
            )),
        }
    }
}

impl From<Reference> for Value {
    fn from(reference: Reference) -> Value {
        reference.to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bare_id() {
        assert!(Reference::new("no-slash").is_err());
        assert!(Reference::new("").is_err());
    }

    #[test]
    fn test_wire_shape() {
        let reference = Reference::new("note/abc").unwrap();
        assert_eq!(
            reference.to_wire(),
            json!({"$type": "ref", "$id": "note/abc"})
        );
        assert_eq!(Reference::from_wire(&reference.to_wire()).unwrap(), reference);
    }
}
