use geo::BoundingRect;
use geojson::{Feature, Position, Value};

use crate::types::Coord;

/// Collects every line and ring that takes part in the geometry summary.
/// Polygons and multipolygons are flattened to their rings; points are left out.
pub fn summary_rings(features: &[Feature]) -> Vec<&[Position]> {
    let mut rings = Vec::new();
    for feature in features {
        if let Some(geometry) = &feature.geometry {
            push_rings(&geometry.value, &mut rings);
        }
    }
    rings
}

fn push_rings<'a>(value: &'a Value, rings: &mut Vec<&'a [Position]>) {
    match value {
        Value::LineString(line) => rings.push(line.as_slice()),
        Value::MultiLineString(lines) => rings.extend(lines.iter().map(Vec::as_slice)),
        Value::Polygon(poly) => rings.extend(poly.iter().map(Vec::as_slice)),
        Value::MultiPolygon(multi_poly) => {
            for poly in multi_poly {
                rings.extend(poly.iter().map(Vec::as_slice));
            }
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                push_rings(&geometry.value, rings);
            }
        }
        Value::Point(_) | Value::MultiPoint(_) => {}
    }
}

/// Every well-formed vertex in the collection, points included.
pub fn all_coords(features: &[Feature]) -> Vec<Coord> {
    let mut coords = Vec::new();
    for feature in features {
        if let Some(geometry) = &feature.geometry {
            push_coords(&geometry.value, &mut coords);
        }
    }
    coords
}

fn push_coords(value: &Value, coords: &mut Vec<Coord>) {
    match value {
        Value::Point(position) => coords.extend(Coord::from_position(position)),
        Value::MultiPoint(positions) => {
            coords.extend(positions.iter().filter_map(|p| Coord::from_position(p)));
        }
        Value::GeometryCollection(geometries) => {
            for geometry in geometries {
                push_coords(&geometry.value, coords);
            }
        }
        _ => {
            let mut rings = Vec::new();
            push_rings(value, &mut rings);
            for ring in rings {
                coords.extend(ring.iter().filter_map(|p| Coord::from_position(p)));
            }
        }
    }
}

pub fn bounding_rect(coords: &[Coord]) -> Option<geo::Rect<f64>> {
    let points: geo::MultiPoint<f64> = coords.iter().copied().map(geo::Point::from).collect();
    points.bounding_rect()
}

/// Center of the bounding box of every vertex in the collection.
pub fn bounds_center(features: &[Feature]) -> Option<Coord> {
    bounding_rect(&all_coords(features)).map(|rect| rect.center().into())
}
