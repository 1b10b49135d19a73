use serde::Serialize;

pub const SHALLOW_MAX_KM: f64 = 70.0;
pub const INTERMEDIATE_MAX_KM: f64 = 300.0;

/// Depth ranges used to color-code markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DepthBand {
    Shallow,
    Intermediate,
    Deep,
    Unknown,
}

impl DepthBand {
    pub fn from_depth(depth_km: Option<f64>) -> Self {
        match depth_km {
            None => DepthBand::Unknown,
            Some(d) if d <= SHALLOW_MAX_KM => DepthBand::Shallow,
            Some(d) if d <= INTERMEDIATE_MAX_KM => DepthBand::Intermediate,
            Some(_) => DepthBand::Deep,
        }
    }

    pub fn color(self) -> &'static str {
        match self {
            DepthBand::Shallow => "#e53935",
            DepthBand::Intermediate => "#fb8c00",
            DepthBand::Deep => "#1e88e5",
            DepthBand::Unknown => "#999",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            DepthBand::Shallow => "Shallow (<=70 km)",
            DepthBand::Intermediate => "Intermediate (70-300 km)",
            DepthBand::Deep => "Deep (>300 km)",
            DepthBand::Unknown => "Unknown depth",
        }
    }
}

/// A circle marker ready to be handed to a marker layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub radius: f64,
    pub band: DepthBand,
    pub fill_color: &'static str,
    pub stroke_color: &'static str,
    pub weight: u32,
    pub fill_opacity: f64,
    pub popup: String,
}

/// A group of markers aggregated into one grid cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cluster {
    pub lat: f64,
    pub lon: f64,
    pub count: usize,
}
