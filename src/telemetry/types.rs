//! # Telemetry Reading Decoder
//!
//! Decodes the reporting service's JSON batch into [`TelemetryReading`]s.
//!
//! Wire shape of one record:
//!
//! ```json
//! {"timestamp": "2024-01-01T00:00:00Z",
//!  "sensors": {"temperature": 21.5},
//!  "location": {"lat": 10.1234, "lon": 20.5678}}
//! ```
//!
//! A batch is decoded all-or-nothing: one bad record rejects the batch.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;

use crate::error::PollError;

/// Epoch values at or above this magnitude are milliseconds, below it seconds.
///
/// 1e11 seconds is year ~5138; 1e11 milliseconds is March 1973.
pub const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// One timestamped temperature + position sample
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryReading {
    pub timestamp: DateTime<Utc>,
    pub temperature_celsius: f64,
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Deserialize)]
struct WireBatch {
    #[serde(default)]
    readings: Option<Vec<WireReading>>,
}

#[derive(Debug, Deserialize)]
struct WireReading {
    timestamp: WireTimestamp,
    sensors: WireSensors,
    location: WireLocation,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireTimestamp {
    Text(String),
    Epoch(f64),
}

#[derive(Debug, Deserialize)]
struct WireSensors {
    temperature: f64,
}

#[derive(Debug, Deserialize)]
struct WireLocation {
    lat: f64,
    lon: f64,
}

/// Decode a telemetry response body
///
/// # Arguments
///
/// * `body` - Raw response body
///
/// # Returns
///
/// * `Ok(readings)` - Records in the order received; empty when `readings`
///   is missing or `null`
/// * `Err(PollError::Malformed)` - Body is not a JSON object, `readings` is
///   not an array, or any record is incomplete
///
/// # Examples
///
/// ```
/// use rover_remote::telemetry::parse_readings;
///
/// let body = r#"{"readings":[{"timestamp":"2024-01-01T00:00:00Z",
///     "sensors":{"temperature":21.5},"location":{"lat":10.1234,"lon":20.5678}}]}"#;
/// let readings = parse_readings(body).unwrap();
/// assert_eq!(readings.len(), 1);
/// assert_eq!(readings[0].temperature_celsius, 21.5);
///
/// assert!(parse_readings("{}").unwrap().is_empty());
/// ```
pub fn parse_readings(body: &str) -> Result<Vec<TelemetryReading>, PollError> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| PollError::Malformed(e.to_string()))?;
    if !value.is_object() {
        return Err(PollError::Malformed("expected a JSON object".to_string()));
    }
    let batch: WireBatch = serde_json::from_value(value)
        .map_err(|e| PollError::Malformed(e.to_string()))?;

    batch
        .readings
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, wire)| {
            let timestamp = decode_timestamp(&wire.timestamp).ok_or_else(|| {
                PollError::Malformed(format!("reading {}: invalid timestamp {:?}", index, wire.timestamp))
            })?;

            Ok(TelemetryReading {
                timestamp,
                temperature_celsius: wire.sensors.temperature,
                latitude: wire.location.lat,
                longitude: wire.location.lon,
            })
        })
        .collect()
}

fn decode_timestamp(raw: &WireTimestamp) -> Option<DateTime<Utc>> {
    match raw {
        WireTimestamp::Epoch(value) => from_epoch(*value),
        WireTimestamp::Text(text) => {
            let text = text.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(value) = text.parse::<f64>() {
                return from_epoch(value);
            }
            // ISO-8601 without an offset is taken as UTC
            NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
    }
}

fn from_epoch(value: f64) -> Option<DateTime<Utc>> {
    if !value.is_finite() {
        return None;
    }
    let millis = if value.abs() >= EPOCH_MILLIS_THRESHOLD {
        value
    } else {
        value * 1000.0
    };
    Utc.timestamp_millis_opt(millis.round() as i64).single()
}
