//! Polygon and multipolygon regions with point containment.
//!
//! Only the outer ring of each polygon is kept; interior rings (holes) are
//! dropped when the geometry is built, so a point inside a hole still counts
//! as contained.

pub mod bbox;

use crate::error::GeometryError;
use bbox::BoundingBox;

/// A closed outer ring.
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    /// First and last points are always equal.
    exterior: Vec<(f64, f64)>,
    degenerate: bool,
}

impl Polygon {
    /// Build a polygon from an outer ring, closing it if the last point differs
    /// from the first.
    ///
    /// Rings with fewer than three distinct points are accepted but never
    /// contain anything.
    pub fn from_ring(mut ring: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        let first = *ring.first().ok_or_else(|| {
            GeometryError::InvalidCoordinates("ring has no coordinates".into())
        })?;
        if ring.last() != Some(&first) {
            ring.push(first);
        }
        let degenerate = count_distinct(&ring, 3) < 3;
        Ok(Self {
            exterior: ring,
            degenerate,
        })
    }

    pub fn exterior(&self) -> &[(f64, f64)] {
        &self.exterior
    }

    pub fn bounding_box(&self) -> BoundingBox {
        let (x0, y0) = self.exterior[0];
        self.exterior
            .iter()
            .fold(BoundingBox::new(x0, x0, y0, y0), |mut bbox, &(x, y)| {
                bbox.expand(x, y);
                bbox
            })
    }

    /// Even-odd ray casting against the closed ring.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        if self.degenerate {
            return false;
        }

        let ring = &self.exterior;
        let mut inside = false;
        let mut j = ring.len() - 1;

        for i in 0..ring.len() {
            let (xi, yi) = ring[i];
            let (xj, yj) = ring[j];

            if ((yi > y) != (yj > y)) && (x < (xj - xi) * (y - yi) / (yj - yi) + xi) {
                inside = !inside;
            }
            j = i;
        }

        inside
    }
}

/// Number of distinct points in `points`, counting no further than `limit`.
fn count_distinct(points: &[(f64, f64)], limit: usize) -> usize {
    let mut seen: Vec<(f64, f64)> = Vec::with_capacity(limit);
    for p in points {
        if !seen.contains(p) {
            seen.push(*p);
            if seen.len() == limit {
                break;
            }
        }
    }
    seen.len()
}

/// A region the population is summed over.
#[derive(Clone, Debug, PartialEq)]
pub enum Geometry {
    Polygon(Polygon),
    /// Members are treated as a union; overlapping members are not subtracted.
    MultiPolygon(Vec<Polygon>),
}

impl Geometry {
    pub fn polygon(ring: Vec<(f64, f64)>) -> Result<Self, GeometryError> {
        Polygon::from_ring(ring).map(Geometry::Polygon)
    }

    /// Build one polygon per outer ring, preserving order.
    pub fn multi_polygon(rings: Vec<Vec<(f64, f64)>>) -> Result<Self, GeometryError> {
        if rings.is_empty() {
            return Err(GeometryError::InvalidCoordinates(
                "MultiPolygon has no polygons".into(),
            ));
        }
        rings
            .into_iter()
            .map(Polygon::from_ring)
            .collect::<Result<Vec<_>, _>>()
            .map(Geometry::MultiPolygon)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Geometry::Polygon(_) => "Polygon",
            Geometry::MultiPolygon(_) => "MultiPolygon",
        }
    }

    pub fn polygons(&self) -> &[Polygon] {
        match self {
            Geometry::Polygon(p) => std::slice::from_ref(p),
            Geometry::MultiPolygon(ps) => ps,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.polygons().iter().map(|p| p.exterior().len()).sum()
    }

    /// Minimal box around every vertex of every ring.
    ///
    /// `None` only for a hand-built `MultiPolygon` with no members.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        self.polygons()
            .iter()
            .map(Polygon::bounding_box)
            .reduce(|acc, b| acc.merge(&b))
    }

    /// True if any member polygon contains the point.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        match self {
            Geometry::Polygon(p) => p.contains(x, y),
            Geometry::MultiPolygon(ps) => ps.iter().any(|p| p.contains(x, y)),
        }
    }
}
