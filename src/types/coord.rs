use serde::{Deserialize, Serialize};

/// Mean earth radius in meters used for great-circle distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// A geographic point. GeoJSON positions are `[longitude, latitude]`, so the
/// fields follow that order.
#[derive(Default, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coord {
    #[serde(rename = "lon")]
    pub long: f64,
    pub lat: f64,
}

impl Coord {
    pub const fn new(long: f64, lat: f64) -> Self {
        Self { long, lat }
    }

    /// Reads a GeoJSON position. Positions with fewer than two ordinates, or
    /// with non-finite values, are rejected.
    pub fn from_position(position: &[f64]) -> Option<Self> {
        match position {
            [long, lat, ..] if long.is_finite() && lat.is_finite() => Some(Self::new(*long, *lat)),
            _ => None,
        }
    }

    pub fn to_tuple(&self) -> (f64, f64) {
        (self.long, self.lat)
    }
}

impl From<Coord> for geo::Point<f64> {
    fn from(value: Coord) -> Self {
        geo::Point::new(value.long, value.lat)
    }
}

impl From<geo::Coord<f64>> for Coord {
    fn from(value: geo::Coord<f64>) -> Self {
        Coord::new(value.x, value.y)
    }
}

pub trait HaversineDistance {
    fn distance_haversine(&self, other: &Self) -> f64;
}

impl HaversineDistance for Coord {
    /// Great-circle distance in meters on a spherical earth.
    fn distance_haversine(&self, other: &Self) -> f64 {
        let lat1 = self.lat.to_radians();
        let lon1 = self.long.to_radians();
        let lat2 = other.lat.to_radians();
        let lon2 = other.long.to_radians();

        let dlat = lat2 - lat1;
        let dlon = lon2 - lon1;

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

        EARTH_RADIUS_M * c
    }
}

/// Static navigation fallback configured per layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anchor {
    #[serde(flatten)]
    pub center: Coord,
    pub zoom: u8,
}

impl Anchor {
    pub const fn new(center: Coord, zoom: u8) -> Self {
        Self { center, zoom }
    }
}

/// Where the map should fly to for a layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NavigationTarget {
    pub center: Coord,
    pub zoom: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_degree_of_latitude() {
        let d = Coord::new(0.0, 0.0).distance_haversine(&Coord::new(0.0, 1.0));
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn distance_is_symmetric() {
        let london = Coord::new(-0.1276, 51.5072);
        let paris = Coord::new(2.3522, 48.8566);
        let there = london.distance_haversine(&paris);
        let back = paris.distance_haversine(&london);
        assert!((there - back).abs() < 1e-6);
        assert!((there - 343_500.0).abs() < 2_000.0, "got {there}");
    }

    #[test]
    fn malformed_positions_are_rejected() {
        assert_eq!(Coord::from_position(&[]), None);
        assert_eq!(Coord::from_position(&[1.0]), None);
        assert_eq!(Coord::from_position(&[f64::NAN, 1.0]), None);
        assert_eq!(Coord::from_position(&[1.0, 2.0, 30.0]), Some(Coord::new(1.0, 2.0)));
    }

    #[test]
    fn anchor_reads_flat_json() {
        let anchor: Anchor =
            serde_json::from_str(r#"{"lon": 13.4, "lat": 52.5, "zoom": 11}"#).unwrap();
        assert_eq!(anchor, Anchor::new(Coord::new(13.4, 52.5), 11));
    }
}
