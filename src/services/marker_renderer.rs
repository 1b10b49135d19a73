//! Turns the filtered event set into map markers.
//!
//! Every render clears the layer and rebuilds it from scratch; marker counts
//! after filtering are small enough that diffing by id is not worth it.

use crate::models::event::Event;
use crate::models::marker::{Cluster, DepthBand, Marker};
use std::collections::BTreeMap;

pub const MIN_RADIUS: f64 = 6.0;
pub const RADIUS_PER_MAG: f64 = 6.0;

/// A clustering marker group on some map surface.
pub trait MarkerLayer {
    fn clear_layers(&mut self);
    fn add_marker(&mut self, marker: Marker);
}

/// Replace everything on `layer` with markers for the mappable events.
/// Returns how many markers were added.
pub fn render_markers<L: MarkerLayer + ?Sized>(layer: &mut L, events: &[Event]) -> usize {
    layer.clear_layers();
    let mut added = 0;
    for marker in events.iter().filter_map(build_marker) {
        layer.add_marker(marker);
        added += 1;
    }
    added
}

/// `None` when the event lacks a coordinate.
pub fn build_marker(ev: &Event) -> Option<Marker> {
    let (lat, lon) = ev.position()?;
    let band = DepthBand::from_depth(ev.depth_km);

    Some(Marker {
        id: ev.id.clone(),
        lat,
        lon,
        radius: marker_radius(ev.mag),
        band,
        fill_color: band.color(),
        stroke_color: "#333",
        weight: 1,
        fill_opacity: 0.8,
        popup: popup_text(ev),
    })
}

pub fn marker_radius(mag: Option<f64>) -> f64 {
    f64::max(MIN_RADIUS, mag.unwrap_or(1.0) * RADIUS_PER_MAG)
}

fn popup_text(ev: &Event) -> String {
    format!(
        "{}\nMag: {}\nDepth: {}\nTime: {}",
        ev.place,
        ev.mag.map_or_else(|| "n/a".to_string(), |m| m.to_string()),
        ev.depth_km.map_or_else(|| "n/a".to_string(), |d| format!("{} km", d)),
        ev.time
    )
}

/// In-memory cluster group. Holds the markers of the last render and can
/// aggregate them into grid cells the way a map does at low zoom.
#[derive(Debug, Default)]
pub struct ClusterGroup {
    markers: Vec<Marker>,
}

impl ClusterGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    /// Group markers into `cell_deg`-sized lat/lon cells. Each cluster sits at
    /// the centroid of its members.
    pub fn clusters(&self, cell_deg: f64) -> Vec<Cluster> {
        if !(cell_deg.is_finite() && cell_deg > 0.0) {
            return self
                .markers
                .iter()
                .map(|m| Cluster {
                    lat: m.lat,
                    lon: m.lon,
                    count: 1,
                })
                .collect();
        }

        let mut cells: BTreeMap<(i64, i64), (f64, f64, usize)> = BTreeMap::new();
        for m in &self.markers {
            let key = (
                (m.lat / cell_deg).floor() as i64,
                (m.lon / cell_deg).floor() as i64,
            );
            let cell = cells.entry(key).or_insert((0.0, 0.0, 0));
            cell.0 += m.lat;
            cell.1 += m.lon;
            cell.2 += 1;
        }

        cells
            .into_values()
            .map(|(lat_sum, lon_sum, count)| Cluster {
                lat: lat_sum / count as f64,
                lon: lon_sum / count as f64,
                count,
            })
            .collect()
    }
}

impl MarkerLayer for ClusterGroup {
    fn clear_layers(&mut self) {
        self.markers.clear();
    }

    fn add_marker(&mut self, marker: Marker) {
        self.markers.push(marker);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::event::EVENT_SOURCE;

    fn event(id: &str, mag: Option<f64>, depth_km: Option<f64>, lat: Option<f64>, lon: Option<f64>) -> Event {
        Event {
            id: id.into(),
            mag,
            depth_km,
            time: "2023-11-14T22:13:20.000Z".into(),
            lat,
            lon,
            place: "Luzon".into(),
            source: EVENT_SOURCE.into(),
        }
    }

    #[test]
    fn test_unknown_depth_gets_neutral_color() {
        for mag in [None, Some(1.0), Some(8.2)] {
            let marker = build_marker(&event("n", mag, None, Some(1.0), Some(2.0))).unwrap();
            assert_eq!(marker.band, DepthBand::Unknown);
            assert_eq!(marker.fill_color, "#999");
        }
    }

    #[test]
    fn test_depth_band_colors() {
        let colors: Vec<&str> = [Some(10.0), Some(150.0), Some(600.0)]
            .into_iter()
            .map(|d| build_marker(&event("d", Some(3.0), d, Some(0.0), Some(0.0))).unwrap().fill_color)
            .collect();
        assert_eq!(colors, vec!["#e53935", "#fb8c00", "#1e88e5"]);
    }

    #[test]
    fn test_radius_scales_with_magnitude() {
        assert_eq!(marker_radius(None), 6.0);
        assert_eq!(marker_radius(Some(0.4)), 6.0);
        assert_eq!(marker_radius(Some(-0.5)), 6.0);
        assert_eq!(marker_radius(Some(4.5)), 27.0);
    }

    #[test]
    fn test_popup_lists_place_mag_depth_time() {
        let marker = build_marker(&event("p", Some(4.5), Some(33.0), Some(14.5), Some(121.5))).unwrap();
        assert_eq!(
            marker.popup,
            "Luzon\nMag: 4.5\nDepth: 33 km\nTime: 2023-11-14T22:13:20.000Z"
        );

        let bare = build_marker(&event("q", None, None, Some(14.5), Some(121.5))).unwrap();
        assert!(bare.popup.contains("Mag: n/a"));
        assert!(bare.popup.contains("Depth: n/a"));
    }

    #[test]
    fn test_render_skips_unmappable_and_replaces_previous() {
        let mut group = ClusterGroup::new();
        let first = vec![
            event("a", Some(2.0), Some(5.0), Some(10.0), Some(20.0)),
            event("b", Some(2.0), Some(5.0), None, Some(20.0)),
            event("c", Some(2.0), Some(5.0), Some(10.0), None),
        ];
        assert_eq!(render_markers(&mut group, &first), 1);
        assert_eq!(group.markers()[0].id, "a");

        let second = vec![
            event("d", None, None, Some(1.0), Some(1.0)),
            event("e", None, None, Some(2.0), Some(2.0)),
        ];
        render_markers(&mut group, &second);
        let ids: Vec<&str> = group.markers().iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, vec!["d", "e"]);

        render_markers(&mut group, &[]);
        assert!(group.is_empty());
    }

    #[test]
    fn test_clusters_group_nearby_markers() {
        let mut group = ClusterGroup::new();
        render_markers(
            &mut group,
            &[
                event("a", None, None, Some(14.1), Some(121.1)),
                event("b", None, None, Some(14.3), Some(121.5)),
                event("c", None, None, Some(-33.0), Some(151.0)),
            ],
        );

        let clusters = group.clusters(5.0);
        assert_eq!(clusters.len(), 2);
        let luzon = clusters.iter().find(|c| c.count == 2).unwrap();
        assert!((luzon.lat - 14.2).abs() < 1e-9);
        assert!((luzon.lon - 121.3).abs() < 1e-9);

        assert_eq!(group.clusters(0.0).len(), 3);
    }
}
