use crate::models::event::Event;
use crate::models::filter::FilterCriteria;
use crate::models::marker::DepthBand;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use prettytable::{format, Cell, Row, Table};

/// Cell size, in degrees, used for the cluster summary line.
const SUMMARY_CELL_DEG: f64 = 5.0;

pub struct DisplayFormatter;

impl DisplayFormatter {
    pub fn new() -> Self {
        Self
    }

    pub fn format_header(&self, text: &str) -> String {
        format!("\n=== {} ===", text.bright_white().bold())
    }

    pub fn format_status(
        &self,
        total: usize,
        criteria: &FilterCriteria,
        last_updated: Option<DateTime<Utc>>,
    ) -> String {
        let updated = last_updated
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "-".to_string());
        let depth = criteria
            .max_depth_km
            .map_or_else(|| "any".to_string(), |d| format!("{} km", d));

        let mut output = Vec::new();
        output.push(format!("Total: {}", total.to_string().bold()));
        output.push(format!("Last updated: {}", updated));
        output.push(format!("Min magnitude: {}   Max depth: {}", criteria.min_mag, depth));
        output.join("\n")
    }

    pub fn format_legend(&self) -> String {
        [
            DepthBand::Shallow,
            DepthBand::Intermediate,
            DepthBand::Deep,
            DepthBand::Unknown,
        ]
        .iter()
        .map(|band| format!("{} {}", self.swatch(*band), band.label()))
        .collect::<Vec<_>>()
        .join("\n")
    }

    pub fn format_event_table(&self, events: &[Event]) -> String {
        let mut table = Table::new();
        table.set_format(*format::consts::FORMAT_NO_BORDER_LINE_SEPARATOR);

        table.add_row(Row::new(
            ["Time", "Place", "Mag", "Depth"]
                .iter()
                .map(|h| Cell::new(h).style_spec("b"))
                .collect(),
        ));

        for ev in events {
            table.add_row(Row::new(vec![
                Cell::new(&self.format_time(&ev.time)),
                Cell::new(&ev.place),
                Cell::new(&self.format_magnitude(ev.mag)),
                Cell::new(&self.format_depth(ev.depth_km)),
            ]));
        }

        table.to_string()
    }

    pub fn format_cluster_summary(&self, markers: usize, clusters: usize) -> String {
        format!(
            "{} markers in {} clusters ({} deg cells)",
            markers, clusters, SUMMARY_CELL_DEG
        )
    }

    pub fn summary_cell_deg(&self) -> f64 {
        SUMMARY_CELL_DEG
    }

    /// ISO instants are shown in local time; anything unparseable is shown as-is.
    pub fn format_time(&self, iso: &str) -> String {
        DateTime::parse_from_rfc3339(iso)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|_| iso.to_string())
    }

    pub fn format_magnitude(&self, mag: Option<f64>) -> String {
        mag.map_or_else(|| "-".to_string(), |m| format!("M {:.1}", m))
    }

    pub fn format_depth(&self, depth_km: Option<f64>) -> String {
        let band = DepthBand::from_depth(depth_km);
        let text = depth_km.map_or_else(|| "-".to_string(), |d| format!("{:.1} km", d));
        format!("{} {}", self.swatch(band), text)
    }

    fn swatch(&self, band: DepthBand) -> String {
        let (r, g, b) = hex_rgb(band.color());
        "  ".on_truecolor(r, g, b).to_string()
    }
}

impl Default for DisplayFormatter {
    fn default() -> Self {
        Self::new()
    }
}

/// `#rgb` or `#rrggbb` to components; anything else is grey.
fn hex_rgb(hex: &str) -> (u8, u8, u8) {
    let digits = hex.trim_start_matches('#');
    let expanded: String = match digits.len() {
        3 => digits.chars().flat_map(|c| [c, c]).collect(),
        _ => digits.to_string(),
    };
    let channel = |i: usize| {
        expanded
            .get(i..i + 2)
            .and_then(|s| u8::from_str_radix(s, 16).ok())
            .unwrap_or(0x99)
    };
    (channel(0), channel(2), channel(4))
}
