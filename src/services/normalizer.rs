//! Maps the upstream GeoJSON feed into [`Event`] records.
//!
//! Upstream records are read into typed, all-optional structs. A field with an
//! unexpected JSON type reads as absent, so one odd record never sinks the
//! batch and missing values are never turned into zeros.

use crate::models::event::{Event, EVENT_SOURCE};
use chrono::{DateTime, SecondsFormat};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Default, Deserialize)]
pub struct Feature {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub properties: Option<Properties>,
    #[serde(default, deserialize_with = "lenient")]
    pub geometry: Option<Geometry>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Properties {
    #[serde(default, deserialize_with = "lenient")]
    pub mag: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub time: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub place: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub code: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Geometry {
    #[serde(default, deserialize_with = "lenient_coordinates")]
    pub coordinates: Vec<Option<f64>>,
}

/// Reads `T` if the value has the right shape, `None` otherwise.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Ids are usually strings; numeric ids are kept in their decimal form.
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(id) => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    })
}

/// Coordinates are read element by element; a non-numeric entry reads as absent.
fn lenient_coordinates<'de, D>(deserializer: D) -> Result<Vec<Option<f64>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value
        .as_array()
        .map(|items| items.iter().map(Value::as_f64).collect())
        .unwrap_or_default())
}

/// Normalize a whole feed payload. Anything without a `features` array yields
/// no events.
pub fn normalize(payload: &Value) -> Vec<Event> {
    let Some(features) = payload.get("features").and_then(Value::as_array) else {
        debug!("payload has no features collection");
        return Vec::new();
    };

    features
        .iter()
        .map(|raw| {
            let feature: Feature = serde_json::from_value(raw.clone()).unwrap_or_default();
            normalize_feature(&feature)
        })
        .collect()
}

pub fn normalize_feature(feature: &Feature) -> Event {
    let empty_props = Properties::default();
    let props = feature.properties.as_ref().unwrap_or(&empty_props);
    let coords = feature
        .geometry
        .as_ref()
        .map(|g| g.coordinates.as_slice())
        .unwrap_or(&[]);
    let coord = |i: usize| coords.get(i).copied().flatten();

    let lon = coord(0);
    let lat = coord(1);

    // The composite id is a last resort and can collide for co-located,
    // simultaneous events.
    let id = non_empty(&feature.id)
        .or_else(|| non_empty(&props.code))
        .map(str::to_string)
        .unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                display_or_unknown(lon),
                display_or_unknown(lat),
                display_or_unknown(props.time)
            )
        });

    let place = non_empty(&props.place)
        .or_else(|| non_empty(&props.title))
        .unwrap_or_default()
        .to_string();

    Event {
        id,
        mag: props.mag,
        depth_km: coord(2),
        time: props.time.and_then(iso_time).unwrap_or_default(),
        lat,
        lon,
        place,
        source: EVENT_SOURCE.to_string(),
    }
}

/// Epoch milliseconds to `YYYY-MM-DDTHH:MM:SS.mmmZ`.
pub fn iso_time(epoch_millis: f64) -> Option<String> {
    if !epoch_millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(epoch_millis.trunc() as i64)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

fn display_or_unknown(value: Option<f64>) -> String {
    value.map_or_else(|| "unknown".to_string(), |v| v.to_string())
}
