//! Length and orientation descriptors for line and polygon layers.
//!
//! Both are advisory display text. Degenerate input yields [`NOT_AVAILABLE`]
//! instead of an error.

use geojson::Feature;

use crate::types::{Coord, GeometrySummary, HaversineDistance};

use super::{bounding_rect, summary_rings};

pub const NOT_AVAILABLE: &str = "N/A";

/// Sums the great-circle length of every line and ring in `features`.
///
/// Rings with fewer than two well-formed positions contribute nothing. When no
/// segment is found at all the result is `"N/A"`.
pub fn compute_boundary_length(features: &[Feature]) -> String {
    let mut total_meters = 0.0;
    let mut segments = 0usize;

    for ring in summary_rings(features) {
        let coords: Vec<Coord> = ring.iter().filter_map(|p| Coord::from_position(p)).collect();
        for pair in coords.windows(2) {
            total_meters += pair[0].distance_haversine(&pair[1]);
            segments += 1;
        }
    }

    if segments == 0 {
        return NOT_AVAILABLE.to_string();
    }
    format_length(total_meters)
}

/// `"{n} km"` up to a thousand kilometers, `"{x.x}k km"` above.
pub fn format_length(total_meters: f64) -> String {
    let km = total_meters / 1000.0;
    if km > 1000.0 {
        format!("{:.1}k km", km / 1000.0)
    } else {
        format!("{} km", km.round() as i64)
    }
}

/// Slope of the diagonal of the bounding box around every vertex, in whole
/// degrees. This only looks at the overall extent, it is not a principal axis.
pub fn compute_main_angle(features: &[Feature]) -> String {
    let coords: Vec<Coord> = summary_rings(features)
        .into_iter()
        .flat_map(|ring| ring.iter().filter_map(|p| Coord::from_position(p)))
        .collect();

    if coords.len() < 2 {
        return NOT_AVAILABLE.to_string();
    }

    match bounding_rect(&coords) {
        Some(rect) => {
            let angle = rect.height().atan2(rect.width()).to_degrees();
            format!("{}°", angle.round() as i64)
        }
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn summarize(features: &[Feature]) -> GeometrySummary {
    GeometrySummary {
        length_label: compute_boundary_length(features),
        angle_label: compute_main_angle(features),
    }
}
