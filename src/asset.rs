//! Named asset pointers stored on records.
//!
//! Upload and signing are server concerns; the client only carries the
//! `{"$type": "asset", "$name": .., "$url": ..}` wire shape.

use serde_json::{json, Value};

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    name: String,
    url: Option<String>,
}

impl Asset {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::InvalidArgumentType(
                "asset name should not be empty".to_string(),
            ));
        }
        Ok(Self {
            name,
            url: Some(url.into()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn to_wire(&self) -> Value {
        match &self.url {
            Some(url) => json!({"$type": "asset", "$name": self.name, "$url": url}),
            None => json!({"$type": "asset", "$name": self.name}),
        }
    }

    /// Server responses may omit `$url` for assets pending processing.
    pub fn from_wire(value: &Value) -> Result<Self> {
        let name = value
            .get("$name")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::MalformedWireValue("asset value requires a string $name".to_string())
            })?;
        if name.is_empty() {
            return Err(Error::MalformedWireValue(
                "asset value has an empty $name".to_string(),
            ));
        }
        Ok(Self {
            name: name.to_string(),
            url: value
                .get("$url")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

impl From<Asset> for Value {
    fn from(asset: Asset) -> Value {
        asset.to_wire()
    }
}
