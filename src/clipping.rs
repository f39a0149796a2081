use geo::{BoundingRect, Coord, Intersects, LineString, MultiPolygon, Point, Polygon, Rect};
use tracing::debug;

use crate::geometry::{dedup, is_valid_line};

/// Reference area (e.g. a state boundary) routes are clipped to.
/// Coordinates on the boundary itself are considered inside.
#[derive(Debug, Clone, PartialEq)]
pub struct Boundary {
    area: MultiPolygon,
    bbox: Option<Rect>,
}

impl Boundary {
    pub fn new(area: MultiPolygon) -> Self {
        let bbox = area.bounding_rect();
        Self { area, bbox }
    }

    pub const fn area(&self) -> &MultiPolygon {
        &self.area
    }

    pub fn contains(&self, coord: Coord) -> bool {
        let point = Point::from(coord);
        self.bbox.is_some_and(|bbox| bbox.intersects(&point)) && self.area.intersects(&point)
    }
}

impl From<Polygon> for Boundary {
    fn from(polygon: Polygon) -> Self {
        Self::new(MultiPolygon::new(vec![polygon]))
    }
}

impl From<MultiPolygon> for Boundary {
    fn from(area: MultiPolygon) -> Self {
        Self::new(area)
    }
}

/// Clips the dangling ends of the geometry that lie outside of the boundary.
///
/// Leading and trailing coordinates outside the boundary are removed, while any excursion outside
/// of the boundary between the first and the last coordinate inside is kept as it is.
/// Returns None if the geometry is fully outside, or if the clipped geometry has less than two
/// distinct coordinates. Clipping a clipped geometry returns the same geometry.
pub fn clip(geometry: &LineString, boundary: &Boundary) -> Option<LineString> {
    let first = geometry.0.iter().position(|&c| boundary.contains(c))?;
    let last = geometry.0.iter().rposition(|&c| boundary.contains(c))?;

    if first == 0 && last + 1 == geometry.0.len() {
        return is_valid_line(geometry).then(|| geometry.clone());
    }

    debug!(
        "Clipping {} leading and {} trailing coordinates outside of boundary",
        first,
        geometry.0.len() - last - 1
    );

    let clipped = dedup(&LineString::new(geometry.0[first..=last].to_vec()));
    is_valid_line(&clipped).then_some(clipped)
}
