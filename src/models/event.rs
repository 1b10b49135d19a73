use serde::{Deserialize, Serialize};

pub const EVENT_SOURCE: &str = "usgs";

/// A normalized seismic event, the record shared by the server and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mag: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth_km: Option<f64>,
    pub time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lon: Option<f64>,
    #[serde(default)]
    pub place: String,
    pub source: String,
}

impl Event {
    /// Both coordinates are needed to put the event on a map.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.lat, self.lon) {
            (Some(lat), Some(lon)) => Some((lat, lon)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Event {
        Event {
            id: "x1".into(),
            mag: None,
            depth_km: Some(10.0),
            time: "2023-11-14T22:13:20.000Z".into(),
            lat: Some(14.5),
            lon: None,
            place: String::new(),
            source: EVENT_SOURCE.into(),
        }
    }

    #[test]
    fn test_missing_fields_are_omitted_not_zeroed() {
        let value = serde_json::to_value(sample()).unwrap();
        assert!(value.get("mag").is_none());
        assert!(value.get("lon").is_none());
        assert_eq!(value["depth_km"], json!(10.0));
    }

    #[test]
    fn test_position_requires_both_coordinates() {
        let mut ev = sample();
        assert_eq!(ev.position(), None);
        ev.lon = Some(121.5);
        assert_eq!(ev.position(), Some((14.5, 121.5)));
    }
}
