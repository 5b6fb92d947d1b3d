//! Geographic coordinates as understood by the Stratus record store.

use serde_json::{json, Value};

use crate::error::{Error, Result};

/// A latitude/longitude pair. Range-checked at construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Geolocation {
    latitude: f64,
    longitude: f64,
}

impl Geolocation {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(Error::InvalidArgumentType(format!(
                "latitude {} is not in expected range (-90, 90)",
                latitude
            )));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(Error::InvalidArgumentType(format!(
                "longitude {} is not in expected range (-180, 180)",
                longitude
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn to_wire(&self) -> Value {
        json!({
            "$type": "geo",
            "$lat": self.latitude,
            "$lng": self.longitude,
        })
    }

    pub fn from_wire(value: &Value) -> Result<Self> {
        let lat = value.get("$lat").and_then(Value::as_f64);
        let lng = value.get("$lng").and_then(Value::as_f64);
        match (lat, lng) {
            (Some(lat), Some(lng)) => Self::new(lat, lng)
                .map_err(|_| Error::MalformedWireValue("geo value out of range".to_string())),
            _ => Err(Error::MalformedWireValue(
                "geo value requires numeric $lat and $lng".to_string(),
            )),
        }
    }
}

impl From<Geolocation> for Value {
    fn from(loc: Geolocation) -> Value {
        loc.to_wire()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_out_of_range() {
        assert!(Geolocation::new(91.0, 0.0).is_err());
        assert!(Geolocation::new(-91.0, 0.0).is_err());
        assert!(Geolocation::new(0.0, 181.0).is_err());
        assert!(Geolocation::new(0.0, -181.0).is_err());
        assert!(Geolocation::new(10.0, 20.0).is_ok());
    }

    #[test]
    fn test_wire_round_trip() {
        let loc = Geolocation::new(10.0, 20.0).unwrap();
        let wire = loc.to_wire();
        assert_eq!(wire["$type"], "geo");
        assert_eq!(wire["$lat"], json!(10.0));
        assert_eq!(wire["$lng"], json!(20.0));
        assert_eq!(Geolocation::from_wire(&wire).unwrap(), loc);
    }

    #[test]
    fn test_from_wire_rejects_missing_fields() {
        assert!(Geolocation::from_wire(&json!({"$type": "geo", "$lat": 1.0})).is_err());
    }
}
