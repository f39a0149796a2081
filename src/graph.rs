use geo::{Coord, LineString};

use crate::geometry::{line_length, point_at};
use crate::{Direction, EdgeId, Length, LinearReference, NodeId, SourceWayId, WayType};

/// Node (Knoten) of the reference network.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Node {
    pub id: NodeId,
    pub point: Coord,
}

/// Edge (Kante) of the reference network.
/// The edge geometry goes from the first node (A) to the second node (B).
#[derive(Debug, Clone, PartialEq)]
pub struct Edge {
    pub id: EdgeId,
    /// Way of the external data source the edge was derived from.
    pub source_way: SourceWayId,
    /// Part of the source way geometry covered by this edge, in the source way direction.
    /// Edges that were split after the source data was produced only cover a fraction of it.
    pub source_reference: LinearReference,
    /// Start (A) and end (B) nodes.
    pub nodes: [NodeId; 2],
    pub geometry: LineString,
    pub way_type: WayType,
    /// Elevation gain in meters when traversing the edge from A to B.
    pub ascent: f64,
    /// Elevation loss in meters when traversing the edge from A to B.
    pub descent: f64,
}

impl Edge {
    pub fn new(
        id: EdgeId,
        source_way: SourceWayId,
        nodes: [NodeId; 2],
        geometry: LineString,
    ) -> Self {
        Self {
            id,
            source_way,
            source_reference: LinearReference::FULL,
            nodes,
            geometry,
            way_type: WayType::Unknown,
            ascent: 0.0,
            descent: 0.0,
        }
    }

    pub fn with_source_reference(mut self, source_reference: LinearReference) -> Self {
        self.source_reference = source_reference;
        self
    }

    pub fn with_way_type(mut self, way_type: WayType) -> Self {
        self.way_type = way_type;
        self
    }

    pub fn with_elevation(mut self, ascent: f64, descent: f64) -> Self {
        self.ascent = ascent;
        self.descent = descent;
        self
    }

    pub fn length(&self) -> Length {
        line_length(&self.geometry)
    }

    pub const fn start_node(&self, direction: Direction) -> NodeId {
        match direction {
            Direction::Forward => self.nodes[0],
            Direction::Backward => self.nodes[1],
        }
    }

    pub const fn end_node(&self, direction: Direction) -> NodeId {
        self.start_node(direction.reverse())
    }

    /// Gets the first coordinate of the edge when traversed in the given direction.
    pub fn start_coord(&self, direction: Direction) -> Option<Coord> {
        match direction {
            Direction::Forward => self.geometry.0.first().copied(),
            Direction::Backward => self.geometry.0.last().copied(),
        }
    }

    /// Gets the last coordinate of the edge when traversed in the given direction.
    pub fn end_coord(&self, direction: Direction) -> Option<Coord> {
        self.start_coord(direction.reverse())
    }

    /// Gets the coordinate at the given fraction of the edge (native direction).
    pub fn coord_at(&self, fraction: f64) -> Option<Coord> {
        point_at(&self.geometry, fraction)
    }

    /// Elevation gain and loss when traversing the edge in the given direction.
    pub const fn elevation(&self, direction: Direction) -> (f64, f64) {
        match direction {
            Direction::Forward => (self.ascent, self.descent),
            Direction::Backward => (self.descent, self.ascent),
        }
    }
}

/// Undirected reference network.
/// Exposes the lookups of the network the conflation engine runs on; it should be implemented
/// by the graph that is loaded once per batch and is passed by reference to the engine.
pub trait Network {
    /// Gets the edge with the given ID, None if the edge doesn't belong to the network.
    fn edge(&self, id: EdgeId) -> Option<&Edge>;

    /// Gets the node with the given ID, None if the node doesn't belong to the network.
    fn node(&self, id: NodeId) -> Option<&Node>;

    /// Gets all the edges that were derived from any of the given source ways.
    /// Edges are returned sorted by ID, the traversal order is not guaranteed.
    fn edges_by_source_ids(&self, ids: &[SourceWayId]) -> Vec<&Edge>;

    /// Gets an iterator over all the edges connected to the node (in either direction).
    /// Returns an empty iterator if the node doesn't belong to the network.
    fn node_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge>;

    /// Gets the node closest to the coordinate, if any is within max distance.
    /// Equally distant nodes are resolved by the lowest node ID.
    fn nearest_node_within_distance(
        &self,
        coord: Coord,
        max_distance: Length,
    ) -> Option<(NodeId, Length)>;

    /// Gets the edges with the given IDs, in the same order, skipping unknown IDs.
    fn edges_by_ids(&self, ids: &[EdgeId]) -> Vec<&Edge> {
        ids.iter().filter_map(|&id| self.edge(id)).collect()
    }
}

pub mod dijkstra;
pub mod network;
pub mod path;
