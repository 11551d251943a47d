//! GeoJSON geometry parsing.
//!
//! Accepts a bare geometry object with `type` and `coordinates`. Only
//! `Polygon` and `MultiPolygon` are supported, and only the first (outer)
//! ring of each polygon is used.

use serde_json::Value;
use tracing::debug;

use crate::error::GeometryError;
use crate::geometry::Geometry;

/// GeoJSON polygon coordinates: rings of positions.
type PolygonCoords = Vec<Vec<Vec<f64>>>;

/// Parse a GeoJSON geometry string into a [`Geometry`].
pub fn parse_geometry(text: &str) -> Result<Geometry, GeometryError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| GeometryError::Parse(e.to_string()))?;

    let kind = root.get("type").and_then(Value::as_str).unwrap_or_default();
    let coordinates = root.get("coordinates").unwrap_or(&Value::Null);

    let geometry = match kind {
        "Polygon" => parse_polygon(coordinates)?,
        "MultiPolygon" => parse_multi_polygon(coordinates)?,
        other => return Err(GeometryError::UnsupportedType(other.to_string())),
    };

    debug!(
        kind = geometry.kind(),
        polygons = geometry.polygons().len(),
        vertices = geometry.vertex_count(),
        "Parsed GeoJSON geometry"
    );
    Ok(geometry)
}

fn parse_polygon(coordinates: &Value) -> Result<Geometry, GeometryError> {
    let rings: PolygonCoords = decode(coordinates, "Polygon")?;
    let outer = outer_ring(rings, "Polygon")?;
    Geometry::polygon(outer)
}

fn parse_multi_polygon(coordinates: &Value) -> Result<Geometry, GeometryError> {
    let polygons: Vec<PolygonCoords> = decode(coordinates, "MultiPolygon")?;
    let outers = polygons
        .into_iter()
        .enumerate()
        .map(|(i, rings)| outer_ring(rings, &format!("MultiPolygon member {i}")))
        .collect::<Result<Vec<_>, _>>()?;
    Geometry::multi_polygon(outers)
}

fn decode<T: serde::de::DeserializeOwned>(value: &Value, what: &str) -> Result<T, GeometryError> {
    T::deserialize(value)
        .map_err(|e| GeometryError::InvalidCoordinates(format!("{what} coordinates: {e}")))
}

/// First ring of a polygon as (x, y) pairs; extra ordinates (z, m) are ignored.
fn outer_ring(rings: PolygonCoords, what: &str) -> Result<Vec<(f64, f64)>, GeometryError> {
    let ring = rings.into_iter().next().ok_or_else(|| {
        GeometryError::InvalidCoordinates(format!("{what} has no rings"))
    })?;
    ring.into_iter()
        .map(|position| match position.as_slice() {
            [x, y, ..] => Ok((*x, *y)),
            _ => Err(GeometryError::InvalidCoordinates(format!(
                "{what} has a position with {} ordinate(s)",
                position.len()
            ))),
        })
        .collect()
}
