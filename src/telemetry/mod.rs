//! ISS telemetry: the sample model, the backend fetch wrapper and the
//! background poller that drives it on a fixed interval.

mod client;
mod poller;

pub use client::{fetch_latest, FetchError, HttpSource, TelemetrySource};
pub use poller::{PollEvent, Poller};

use serde::{Deserialize, Deserializer};

use crate::geo::EARTH_RADIUS_KM;

/// One telemetry row as served by the backend
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssSample {
    #[serde(deserialize_with = "numeric")]
    pub latitude: f64,
    #[serde(deserialize_with = "numeric")]
    pub longitude: f64,
    /// Kilometers above the surface
    #[serde(deserialize_with = "numeric")]
    pub altitude: f64,
    /// km/h
    #[serde(default, deserialize_with = "optional_numeric")]
    pub velocity: Option<f64>,
    /// Unix seconds
    #[serde(default, deserialize_with = "optional_numeric")]
    pub timestamp: Option<f64>,
    /// When the backend pulled the row, as the backend formats it (UTC)
    #[serde(default, deserialize_with = "optional_text")]
    pub fetched_at: Option<String>,
}

impl IssSample {
    /// Altitude in Earth radii, never negative
    pub fn altitude_ratio(&self) -> f64 {
        (self.altitude / EARTH_RADIUS_KM).max(0.0)
    }
}

/// Response envelope: `{"last_row": {...}}`
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    last_row: Option<IssSample>,
}

/// Decode a response body. `Ok(None)` when the backend has no row yet.
pub fn decode_latest(body: &mut [u8]) -> Result<Option<IssSample>, simd_json::Error> {
    let envelope: Envelope = simd_json::serde::from_slice(body)?;
    Ok(envelope.last_row)
}

/// The backend is loose about types: numbers may arrive quoted
#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Number(f64),
    Text(String),
    Flag(bool),
}

impl Loose {
    fn as_number(&self) -> Option<f64> {
        match self {
            Loose::Number(n) => Some(*n),
            Loose::Text(s) => s.trim().parse().ok(),
            Loose::Flag(_) => None,
        }
    }
}

fn numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = Loose::deserialize(deserializer)?;
    value
        .as_number()
        .filter(|n| n.is_finite())
        .ok_or_else(|| serde::de::Error::custom("expected a finite number"))
}

fn optional_numeric<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_number()).filter(|n| n.is_finite()))
}

fn optional_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Loose>::deserialize(deserializer)?;
    Ok(value.and_then(|v| match v {
        Loose::Text(s) => Some(s),
        Loose::Number(n) => Some(n.to_string()),
        Loose::Flag(_) => None,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(json: &str) -> Result<Option<IssSample>, simd_json::Error> {
        let mut body = json.as_bytes().to_vec();
        decode_latest(&mut body)
    }

    #[test]
    fn test_decode_full_row() {
        let sample = decode(
            r#"{"last_row":{"latitude":51.6,"longitude":-12.25,"altitude":418.9,
                "velocity":27580.4,"timestamp":1700000000,"fetched_at":"2023-11-14 22:13:20"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(sample.latitude, 51.6);
        assert_eq!(sample.longitude, -12.25);
        assert_eq!(sample.altitude, 418.9);
        assert_eq!(sample.velocity, Some(27580.4));
        assert_eq!(sample.timestamp, Some(1_700_000_000.0));
        assert_eq!(sample.fetched_at.as_deref(), Some("2023-11-14 22:13:20"));
    }

    #[test]
    fn test_decode_quoted_numbers() {
        let sample = decode(
            r#"{"last_row":{"latitude":"-33.5","longitude":" 151.0 ","altitude":"420","velocity":"fast"}}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(sample.latitude, -33.5);
        assert_eq!(sample.longitude, 151.0);
        assert_eq!(sample.altitude, 420.0);
        assert_eq!(sample.velocity, None);
        assert_eq!(sample.timestamp, None);
        assert_eq!(sample.fetched_at, None);
    }

    #[test]
    fn test_decode_missing_or_null_row() {
        assert_eq!(decode(r#"{"last_row":null}"#).unwrap(), None);
        assert_eq!(decode(r#"{"status":"warming up"}"#).unwrap(), None);
    }

    #[test]
    fn test_decode_rejects_bad_position() {
        assert!(decode(r#"{"last_row":{"latitude":"north","longitude":0,"altitude":400}}"#).is_err());
        assert!(decode(r#"{"last_row":{"longitude":0,"altitude":400}}"#).is_err());
        assert!(decode("not json").is_err());
    }

    #[test]
    fn test_altitude_ratio() {
        let mut body = br#"{"last_row":{"latitude":0,"longitude":0,"altitude":637.1}}"#.to_vec();
        let sample = decode_latest(&mut body).unwrap().unwrap();
        assert!((sample.altitude_ratio() - 0.1).abs() < 1e-12);

        let below = IssSample {
            altitude: -5.0,
            ..sample
        };
        assert_eq!(below.altitude_ratio(), 0.0);
    }
}
