use geo::Coord;
use ordered_float::OrderedFloat;
use rstar::RTree;
use rstar::primitives::GeomWithData;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::geometry::is_valid_line;
use crate::graph::{Edge, Network, Node};
use crate::{EdgeId, Length, NetworkError, NodeId, SourceWayId};

type GeospatialNode = GeomWithData<[f64; 2], NodeId>;

/// In-memory reference network keyed by stable IDs.
#[derive(Default)]
pub struct RoadNetwork {
    nodes: FxHashMap<NodeId, Node>,
    edges: FxHashMap<EdgeId, Edge>,
    source_ways: FxHashMap<SourceWayId, Vec<EdgeId>>,
    node_edges: FxHashMap<NodeId, Vec<EdgeId>>,
    geospatial_nodes: RTree<GeospatialNode>,
}

impl RoadNetwork {
    /// Builds the network, failing on edges that are not consistent with the nodes.
    pub fn new(
        nodes: impl IntoIterator<Item = Node>,
        edges: impl IntoIterator<Item = Edge>,
    ) -> Result<Self, NetworkError> {
        let nodes: FxHashMap<NodeId, Node> = nodes.into_iter().map(|n| (n.id, n)).collect();

        let mut network = Self {
            geospatial_nodes: RTree::bulk_load(
                nodes
                    .values()
                    .map(|node| GeospatialNode::new([node.point.x, node.point.y], node.id))
                    .collect(),
            ),
            nodes,
            ..Default::default()
        };

        for edge in edges {
            network.insert_edge(edge)?;
        }

        for edges in network.source_ways.values_mut() {
            edges.sort();
        }

        for edges in network.node_edges.values_mut() {
            // edges returned in a deterministic order
            edges.sort();
            edges.dedup();
        }

        debug!(
            "Loaded network with {} nodes and {} edges",
            network.nodes.len(),
            network.edges.len()
        );

        Ok(network)
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    fn insert_edge(&mut self, edge: Edge) -> Result<(), NetworkError> {
        if self.edges.contains_key(&edge.id) {
            return Err(NetworkError::DuplicateEdge(edge.id));
        } else if !is_valid_line(&edge.geometry) {
            return Err(NetworkError::InvalidGeometry(edge.id));
        }

        if let Some(&node) = edge.nodes.iter().find(|n| !self.nodes.contains_key(n)) {
            return Err(NetworkError::UnknownNode(edge.id, node));
        }

        self.source_ways
            .entry(edge.source_way)
            .or_default()
            .push(edge.id);

        for node in edge.nodes {
            self.node_edges.entry(node).or_default().push(edge.id);
        }

        self.edges.insert(edge.id, edge);
        Ok(())
    }
}

impl Network for RoadNetwork {
    fn edge(&self, id: EdgeId) -> Option<&Edge> {
        self.edges.get(&id)
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn edges_by_source_ids(&self, ids: &[SourceWayId]) -> Vec<&Edge> {
        let mut edge_ids: Vec<EdgeId> = ids
            .iter()
            .filter_map(|id| self.source_ways.get(id))
            .flatten()
            .copied()
            .collect();

        edge_ids.sort();
        edge_ids.dedup();

        self.edges_by_ids(&edge_ids)
    }

    fn node_edges(&self, node: NodeId) -> impl Iterator<Item = &Edge> {
        self.node_edges
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(|id| self.edges.get(id))
    }

    fn nearest_node_within_distance(
        &self,
        coord: Coord,
        max_distance: Length,
    ) -> Option<(NodeId, Length)> {
        let max_distance_2 = max_distance.meters() * max_distance.meters();

        self.geospatial_nodes
            .nearest_neighbor_iter_with_distance_2(&[coord.x, coord.y])
            .take_while(|(_, distance_2)| *distance_2 <= max_distance_2)
            .min_by_key(|(node, distance_2)| (OrderedFloat(*distance_2), node.data))
            .map(|(node, distance_2)| (node.data, Length::from_meters(distance_2.sqrt())))
    }
}
