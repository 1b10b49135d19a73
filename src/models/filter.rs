use serde::{Deserialize, Serialize};

/// Thresholds set from the dashboard's filter form.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterCriteria {
    pub min_mag: f64,
    pub max_depth_km: Option<f64>,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            min_mag: 0.0,
            max_depth_km: None,
        }
    }
}
