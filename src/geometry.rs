//! Planar linear referencing primitives on `geo` line strings.
//!
//! Coordinates are expected in a metric projected reference system (e.g. UTM), therefore all
//! the distances are Euclidean and measured in meters.

use std::iter;

use geo::Length as _;
use geo::{
    Closest, ClosestPoint, Coord, Distance, Euclidean, InterpolatableLine, LineLocatePoint,
    LineString, Point,
};

use crate::Length;

/// Projection of a coordinate onto a line string.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Position of the projected coordinate along the line, in [0, 1].
    pub fraction: f64,
    /// Distance between the coordinate and its projection.
    pub distance: Length,
    /// The projected coordinate (closest coordinate on the line).
    pub coord: Coord,
}

pub fn distance(a: Coord, b: Coord) -> Length {
    Length::from_meters(Euclidean.distance(Point::from(a), Point::from(b)))
}

pub fn line_length(line: &LineString) -> Length {
    Length::from_meters(Euclidean.length(line))
}

/// Projects the coordinate onto the closest position of the line.
/// Returns None if the line has no coordinates.
pub fn project(line: &LineString, coord: Coord) -> Option<Projection> {
    let first = *line.0.first()?;
    let point = Point::from(coord);

    let projected = match line.closest_point(&point) {
        Closest::SinglePoint(p) | Closest::Intersection(p) => p.0,
        // line without length
        Closest::Indeterminate => first,
    };

    let fraction = line.line_locate_point(&point)?;

    Some(Projection {
        fraction: fraction.clamp(0.0, 1.0),
        distance: distance(projected, coord),
        coord: projected,
    })
}

/// Gets the coordinate at the given fraction of the line length.
pub fn point_at(line: &LineString, fraction: f64) -> Option<Coord> {
    line.point_at_ratio_from_start(&Euclidean, fraction.clamp(0.0, 1.0))
        .map(|point| point.0)
}

/// Extracts the part of the line between the two fractions, following the line direction.
/// The fractions are clamped into [0, 1] and swapped if `from > to`.
pub fn substring(line: &LineString, from: f64, to: f64) -> LineString {
    let (from, to) = if from <= to { (from, to) } else { (to, from) };
    let total_length = Euclidean.length(line);
    let [start, end] = [from, to].map(|fraction| total_length * fraction.clamp(0.0, 1.0));

    let (Some(first), Some(last)) = (
        line.point_at_distance_from_start(&Euclidean, start),
        line.point_at_distance_from_start(&Euclidean, end),
    ) else {
        return LineString::new(vec![]);
    };

    // vertices strictly between the two positions
    let mut walked = 0.0;
    let vertices = line.lines().filter_map(|segment| {
        walked += Euclidean.length(&segment);
        (walked > start && walked < end).then_some(segment.end)
    });

    let coords = iter::once(first.0)
        .chain(vertices)
        .chain(iter::once(last.0));

    dedup(&LineString::from_iter(coords))
}

/// Unit vector of the line direction at the given fraction.
/// Returns None if the line has no length.
pub fn direction_at(line: &LineString, fraction: f64) -> Option<Coord> {
    let target = Euclidean.length(line) * fraction.clamp(0.0, 1.0);

    let mut walked = 0.0;
    let mut direction = None;

    for segment in line.lines() {
        let segment_length = Euclidean.length(&segment);
        if segment_length <= 0.0 {
            continue;
        }

        direction = Some(segment.delta() / segment_length);
        walked += segment_length;

        if walked >= target {
            break;
        }
    }

    direction
}

/// Cosine of the angle between two unit vectors, 1 if they point into the same direction.
pub fn alignment(a: Coord, b: Coord) -> f64 {
    a.x * b.x + a.y * b.y
}

/// Returns a line string without consecutive duplicated coordinates.
pub fn dedup(line: &LineString) -> LineString {
    let mut coords = Vec::with_capacity(line.0.len());
    for &coord in &line.0 {
        push_distinct(&mut coords, coord);
    }
    LineString::new(coords)
}

/// Returns true if the line has at least two distinct coordinates.
pub fn is_valid_line(line: &LineString) -> bool {
    line.0
        .first()
        .is_some_and(|first| line.0.iter().any(|coord| coord != first))
}

fn push_distinct(coords: &mut Vec<Coord>, coord: Coord) {
    if coords.last() != Some(&coord) {
        coords.push(coord);
    }
}
