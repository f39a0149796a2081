//! Resolves the source ways reported by a matcher (or a router) into an ordered sequence of
//! bindings onto the reference network edges.
//!
//! 1. Look up the candidate edges of all the source ways.
//! 2. Snap the route endpoints onto the closest candidate nodes.
//! 3. Drop candidates that are not covered by the route geometry.
//! 4. Walk the candidates from the route start, following edge adjacency.
//! 5. Trim the first and last edges to the covered fraction.

use geo::{Coord, LineString};
use ordered_float::OrderedFloat;
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::geometry::{alignment, dedup, direction_at, distance, is_valid_line, project, substring};
use crate::graph::path::{connected_runs, path_geometry};
use crate::graph::{Edge, Network};
use crate::{
    Direction, EdgeBinding, EdgeId, Length, LinearReference, LinearReferenceError, NodeId,
    ResolveError, SourceWayId,
};

/// Offset (as fraction of a line) used to evaluate the direction right after a position.
const DIRECTION_OFFSET: f64 = 1e-6;

/// Alignments closer than this are considered equal.
const ALIGNMENT_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy)]
pub struct ResolverConfig {
    /// Maximum distance between the position the route leaves an edge and the position it
    /// enters the next one.
    pub endpoint_tolerance: Length,
    /// Maximum distance between the route geometry and the vertices of an edge for the edge to
    /// be considered covered by the route.
    pub containment_tolerance: Length,
    /// Maximum distance between a route endpoint and the node it snaps to.
    pub node_snap_distance: Length,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoint_tolerance: Length::from_meters(1.0),
            containment_tolerance: Length::from_meters(2.0),
            node_snap_distance: Length::from_meters(5.0),
        }
    }
}

/// Ordered and deduplicated bindings of a route onto the network.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPath {
    pub bindings: Vec<EdgeBinding>,
    /// Route start, every boundary between consecutive edges, and route end (Stützpunkte).
    pub support_points: Vec<Coord>,
}

impl ResolvedPath {
    pub fn start(&self) -> Option<Coord> {
        self.support_points.first().copied()
    }

    pub fn end(&self) -> Option<Coord> {
        self.support_points.last().copied()
    }

    /// Renders the bound parts of the edges in traversal order.
    pub fn geometry<N: Network>(&self, network: &N) -> Option<LineString> {
        path_geometry(network, &self.bindings)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coverage {
    /// All the edge vertices lie along the route.
    Full,
    /// Only the route start or end lies along the edge.
    Partial,
}

#[derive(Debug, Clone, Copy)]
struct Candidate<'a> {
    edge: &'a Edge,
    coverage: Coverage,
}

/// Traversal of a candidate edge from the current route position.
#[derive(Debug, Clone, Copy)]
struct Step<'a> {
    edge: &'a Edge,
    direction: Direction,
    entry: f64,
    exit: f64,
    /// The step leaves the edge at the route end.
    finishes: bool,
    alignment: f64,
}

impl Step<'_> {
    fn geometry(&self) -> LineString {
        let mut geometry = substring(&self.edge.geometry, self.entry, self.exit);
        if !self.direction.is_forward() {
            geometry.0.reverse();
        }
        geometry
    }
}

/// Resolves the source ways that the geometry follows into edge bindings, in the direction of
/// the geometry coordinates.
pub fn resolve_edges<N: Network>(
    config: &ResolverConfig,
    network: &N,
    way_ids: &[SourceWayId],
    geometry: &LineString,
) -> Result<ResolvedPath, ResolveError> {
    debug!(
        "Resolving {} source ways along {} coordinates",
        way_ids.len(),
        geometry.0.len()
    );

    let geometry = dedup(geometry);
    if !is_valid_line(&geometry) {
        return Err(ResolveError::InvalidGeometry);
    }

    let edges = network.edges_by_source_ids(way_ids);
    let route = snap_endpoints(config, network, &edges, geometry);
    let candidates = filter_candidates(config, &route, edges);

    if candidates.is_empty() {
        return Err(ResolveError::EdgesNotFound(way_ids.to_vec()));
    }

    let path = walk_candidates(config, &route, &candidates)?;

    if path.bindings.is_empty() {
        return Err(ResolveError::EdgesNotFound(way_ids.to_vec()));
    }

    check_adjacency(network, path, config.endpoint_tolerance)
}

/// Fails if consecutive bindings of the path are not connected within tolerance.
fn check_adjacency<N: Network>(
    network: &N,
    path: ResolvedPath,
    tolerance: Length,
) -> Result<ResolvedPath, ResolveError> {
    let runs = connected_runs(network, &path.bindings, tolerance);

    let [_, run, ..] = runs.as_slice() else {
        return Ok(path);
    };

    let position = run
        .first()
        .and_then(|b| network.edge(b.edge).and_then(|edge| edge.coord_at(b.entry())))
        .or(path.end())
        .unwrap_or_default();

    debug!("Resolved path is not connected at {position:?}");
    Err(ResolveError::UnresolvableAdjacency(position))
}

/// Moves the route endpoints onto the closest node of the candidate edges within snap distance.
/// Equally distant nodes are resolved by the lowest node ID.
fn snap_endpoints<N: Network>(
    config: &ResolverConfig,
    network: &N,
    edges: &[&Edge],
    route: LineString,
) -> LineString {
    let mut node_ids: Vec<NodeId> = edges.iter().flat_map(|edge| edge.nodes).collect();
    node_ids.sort();
    node_ids.dedup();

    let nodes: Vec<_> = node_ids
        .into_iter()
        .filter_map(|id| network.node(id))
        .collect();

    let snap = |coord: Coord| {
        nodes
            .iter()
            .map(|node| (distance(node.point, coord), node))
            .filter(|(d, _)| *d <= config.node_snap_distance)
            .min_by_key(|(d, node)| (OrderedFloat(d.meters()), node.id))
            .map_or(coord, |(_, node)| node.point)
    };

    let mut snapped = route.clone();
    if let Some(first) = snapped.0.first_mut() {
        *first = snap(*first);
    }
    if let Some(last) = snapped.0.last_mut() {
        *last = snap(*last);
    }

    let snapped = dedup(&snapped);
    if is_valid_line(&snapped) {
        snapped
    } else {
        debug!("Route endpoints snap to the same node");
        route
    }
}

fn filter_candidates<'a>(
    config: &ResolverConfig,
    route: &LineString,
    edges: Vec<&'a Edge>,
) -> Vec<Candidate<'a>> {
    let tolerance = config.containment_tolerance;
    let [start, end] = route_endpoints(route);

    let is_along_route =
        |coord: Coord| project(route, coord).is_some_and(|p| p.distance <= tolerance);
    let is_along_edge = |edge: &Edge, coord: Option<Coord>| {
        coord
            .and_then(|coord| project(&edge.geometry, coord))
            .is_some_and(|p| p.distance <= tolerance)
    };

    edges
        .into_iter()
        .filter_map(|edge| {
            let coverage = if edge.geometry.0.iter().all(|&c| is_along_route(c)) {
                Coverage::Full
            } else if is_along_edge(edge, start) || is_along_edge(edge, end) {
                Coverage::Partial
            } else {
                debug!("Edge {:?} is not covered by the route", edge.id);
                return None;
            };

            Some(Candidate { edge, coverage })
        })
        .collect()
}

fn walk_candidates(
    config: &ResolverConfig,
    route: &LineString,
    candidates: &[Candidate],
) -> Result<ResolvedPath, ResolveError> {
    let [Some(start), Some(end)] = route_endpoints(route) else {
        return Err(ResolveError::InvalidGeometry);
    };

    let mut used: FxHashSet<EdgeId> = FxHashSet::default();
    let mut bindings: Vec<EdgeBinding> = vec![];
    let mut support_points: Vec<Coord> = vec![];

    let mut position = start;
    // fraction of the route already walked
    let mut progress = 0.0;

    loop {
        let steps = next_steps(config, route, candidates, &used, &bindings, position, progress, end);

        let Some(step) = select_step(&steps)? else {
            if !bindings.is_empty() && distance(position, end) <= config.containment_tolerance {
                break;
            }

            debug!("No candidate continues the route at {position:?}");
            return Err(ResolveError::UnresolvableAdjacency(position));
        };

        used.insert(step.edge.id);

        let (from, to) = if step.entry <= step.exit {
            (step.entry, step.exit)
        } else {
            (step.exit, step.entry)
        };

        match LinearReference::new(from, to) {
            Ok(reference) => {
                if support_points.is_empty() {
                    support_points.extend(step.edge.coord_at(step.entry));
                }
                bindings.push(EdgeBinding::new(step.edge.id, reference, step.direction));
            }
            Err(LinearReferenceError::Degenerate(_)) => {
                debug!("Dropping zero length binding on {:?}", step.edge.id);
            }
            Err(error) => return Err(error.into()),
        }

        position = step.edge.coord_at(step.exit).unwrap_or(position);
        progress = advance(route, progress, position);

        if !support_points.is_empty() && support_points.last() != Some(&position) {
            support_points.push(position);
        }

        if step.finishes || distance(position, end) <= config.endpoint_tolerance {
            break;
        }
    }

    Ok(ResolvedPath {
        bindings,
        support_points,
    })
}

/// Gets all the possible traversals of the candidates from the current position.
/// Edges can be entered from their endpoints, the first edge also at any position along it.
/// An edge already traversed can only be entered again to finish the route on a part of the edge
/// that is not bound yet (closed routes starting and ending along the same edge).
#[allow(clippy::too_many_arguments)]
fn next_steps<'a>(
    config: &ResolverConfig,
    route: &LineString,
    candidates: &[Candidate<'a>],
    used: &FxHashSet<EdgeId>,
    bindings: &[EdgeBinding],
    position: Coord,
    progress: f64,
    end: Coord,
) -> Vec<Step<'a>> {
    let is_first = used.is_empty();
    let route_direction = direction_at(route, (progress + DIRECTION_OFFSET).min(1.0));

    let mut steps = vec![];

    for &Candidate { edge, coverage } in candidates {
        let is_used = used.contains(&edge.id);

        let mut entries: Vec<(Direction, f64)> = [Direction::Forward, Direction::Backward]
            .into_iter()
            .filter(|&direction| {
                edge.start_coord(direction)
                    .is_some_and(|c| distance(c, position) <= config.endpoint_tolerance)
            })
            .map(|direction| (direction, if direction.is_forward() { 0.0 } else { 1.0 }))
            .collect();

        if entries.is_empty() && is_first {
            if let Some(projection) = project(&edge.geometry, position)
                .filter(|p| p.distance <= config.containment_tolerance)
            {
                entries.push((Direction::Forward, projection.fraction));
                entries.push((Direction::Backward, projection.fraction));
            }
        }

        let end_fraction = match coverage {
            Coverage::Full if !is_used => None,
            _ => project(&edge.geometry, end)
                .filter(|p| p.distance <= config.containment_tolerance)
                .map(|p| p.fraction),
        };

        for (direction, entry) in entries {
            let (exit, finishes) = match end_fraction {
                Some(fraction) if is_ahead(direction, entry, fraction) => (fraction, true),
                _ if direction.is_forward() => (1.0, false),
                _ => (0.0, false),
            };

            if (exit - entry).abs() <= LinearReference::EPSILON
                || (is_used && (!finishes || is_bound(bindings, edge.id, entry, exit)))
            {
                continue;
            }

            let score = traversal_direction(edge, direction, entry)
                .zip(route_direction)
                .map_or(0.0, |(a, b)| alignment(a, b));

            steps.push(Step {
                edge,
                direction,
                entry,
                exit,
                finishes,
                alignment: score,
            });
        }
    }

    steps
}

/// Selects the step that best follows the route direction.
/// Steps over identical geometries are resolved by the lowest edge ID.
fn select_step<'a>(steps: &[Step<'a>]) -> Result<Option<Step<'a>>, ResolveError> {
    let Some(best) = steps.iter().map(|s| s.alignment).max_by(f64::total_cmp) else {
        return Ok(None);
    };

    let mut tied: Vec<&Step> = steps
        .iter()
        .filter(|s| best - s.alignment <= ALIGNMENT_EPSILON)
        .collect();
    tied.sort_by_key(|s| s.edge.id);

    let Some(&&selected) = tied.first() else {
        return Ok(None);
    };

    let geometry = selected.geometry();
    if tied.iter().skip(1).all(|s| s.geometry() == geometry) {
        return Ok(Some(selected));
    }

    let mut edges: Vec<EdgeId> = tied.iter().map(|s| s.edge.id).collect();
    edges.dedup();

    debug!("Candidates {edges:?} follow the route equally well");
    Err(ResolveError::AmbiguousEdgeSet(edges))
}

/// Returns true if the part of the edge between entry and exit overlaps a binding of the edge.
fn is_bound(bindings: &[EdgeBinding], edge: EdgeId, entry: f64, exit: f64) -> bool {
    let Ok(part) = LinearReference::new(entry.min(exit), entry.max(exit)) else {
        return false;
    };

    bindings
        .iter()
        .filter(|b| b.edge == edge)
        .any(|b| b.reference.intersection(&part).is_some())
}

fn is_ahead(direction: Direction, entry: f64, fraction: f64) -> bool {
    match direction {
        Direction::Forward => fraction > entry + LinearReference::EPSILON,
        Direction::Backward => fraction < entry - LinearReference::EPSILON,
    }
}

/// Unit vector of the edge when traversed in the given direction from the entry position.
fn traversal_direction(edge: &Edge, direction: Direction, entry: f64) -> Option<Coord> {
    match direction {
        Direction::Forward => direction_at(&edge.geometry, (entry + DIRECTION_OFFSET).min(1.0)),
        Direction::Backward => {
            direction_at(&edge.geometry, (entry - DIRECTION_OFFSET).max(0.0)).map(|d| -d)
        }
    }
}

/// Projects the position onto the part of the route not walked yet.
fn advance(route: &LineString, progress: f64, position: Coord) -> f64 {
    let remaining = substring(route, progress, 1.0);

    project(&remaining, position).map_or(progress, |projection| {
        progress + projection.fraction * (1.0 - progress)
    })
}

fn route_endpoints(route: &LineString) -> [Option<Coord>; 2] {
    [route.0.first().copied(), route.0.last().copied()]
}
