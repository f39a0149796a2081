use std::cmp::Reverse;

use radix_heap::RadixHeapMap;
use rustc_hash::FxHashMap;
use tracing::debug;

use crate::graph::path::Path;
use crate::graph::{Edge, Network};
use crate::{Direction, EdgeId, Length, NodeId};

/// Costs are accumulated in integer millimeters so the radix heap keys stay monotone.
const COST_RESOLUTION: f64 = 1000.0;

/// Computes the cheapest path between two nodes of the undirected network.
/// The cost function returns the cost of traversing an edge in the given direction, or None if
/// the edge cannot be traversed.
pub fn shortest_path<N, F>(
    network: &N,
    origin: NodeId,
    destination: NodeId,
    cost: F,
) -> Option<Path>
where
    N: Network,
    F: Fn(&Edge, Direction) -> Option<Length>,
{
    debug!("Computing shortest path {origin:?} -> {destination:?}");

    if origin == destination {
        return Some(Path::default());
    }

    // (current) cheapest cost from origin to this node
    let mut shortest_costs: FxHashMap<NodeId, u64> = FxHashMap::from_iter([(origin, 0)]);

    // edge (and its direction) entering the node on the cheapest known path from the origin
    let mut previous: FxHashMap<NodeId, (EdgeId, Direction, NodeId)> = FxHashMap::default();

    // priority queue of discovered nodes that may need to be visited
    let mut frontier = RadixHeapMap::new();
    frontier.push(Reverse(0u64), origin);

    while let Some((Reverse(node_cost), node)) = frontier.pop() {
        if node == destination {
            return Some(unpack_path(network, &previous, destination));
        }

        // check if we already know a cheaper way to get to this node from the origin
        if shortest_costs.get(&node).is_some_and(|&c| node_cost > c) {
            continue;
        }

        for edge in network.node_edges(node) {
            let direction = if edge.nodes[0] == node {
                Direction::Forward
            } else {
                Direction::Backward
            };

            let neighbor = edge.end_node(direction);
            if neighbor == node {
                continue;
            }

            let Some(edge_cost) = cost(edge, direction) else {
                continue;
            };

            let neighbor_cost = node_cost + to_cost_units(edge_cost);
            // check if we can follow the current path to reach the neighbor in a cheaper way
            if shortest_costs.get(&neighbor).is_none_or(|&c| neighbor_cost < c) {
                // Relax: we have now found a better way that we are going to explore
                shortest_costs.insert(neighbor, neighbor_cost);
                previous.insert(neighbor, (edge.id, direction, node));
                frontier.push(Reverse(neighbor_cost), neighbor);
            }
        }
    }

    None
}

fn to_cost_units(cost: Length) -> u64 {
    (cost.meters().max(0.0) * COST_RESOLUTION).round() as u64
}

/// Unpacks the path from destination back to origin.
fn unpack_path<N: Network>(
    network: &N,
    previous: &FxHashMap<NodeId, (EdgeId, Direction, NodeId)>,
    destination: NodeId,
) -> Path {
    let mut edges = vec![];
    let mut next = destination;

    while let Some(&(edge, direction, node)) = previous.get(&next) {
        edges.push((edge, direction));
        next = node;
    }

    edges.reverse();

    let length = edges
        .iter()
        .filter_map(|&(e, _)| network.edge(e))
        .map(Edge::length)
        .sum();

    Path { length, edges }
}

#[cfg(test)]
mod tests {
    use geo::{coord, line_string};
    use test_log::test;

    use super::*;
    use crate::graph::Node;
    use crate::graph::network::RoadNetwork;
    use crate::{SourceWayId, WayType};

    //  1 ---(1)--- 2 ---(2)--- 3
    //  |                       |
    // (3)---------- 4 --------(4)
    fn network() -> RoadNetwork {
        let nodes = [
            (1, 0.0, 0.0),
            (2, 10.0, 0.0),
            (3, 20.0, 0.0),
            (4, 10.0, -2.0),
        ]
        .map(|(id, x, y)| Node {
            id: NodeId(id),
            point: coord! { x: x, y: y },
        });

        let edges = [
            Edge::new(
                EdgeId(1),
                SourceWayId(1),
                [NodeId(1), NodeId(2)],
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            )
            .with_way_type(WayType::Road),
            Edge::new(
                EdgeId(2),
                SourceWayId(2),
                [NodeId(3), NodeId(2)],
                line_string![(x: 20.0, y: 0.0), (x: 10.0, y: 0.0)],
            )
            .with_way_type(WayType::Road),
            Edge::new(
                EdgeId(3),
                SourceWayId(3),
                [NodeId(1), NodeId(4)],
                line_string![(x: 0.0, y: 0.0), (x: 0.0, y: -2.0), (x: 10.0, y: -2.0)],
            )
            .with_way_type(WayType::Cycleway),
            Edge::new(
                EdgeId(4),
                SourceWayId(4),
                [NodeId(4), NodeId(3)],
                line_string![(x: 10.0, y: -2.0), (x: 20.0, y: -2.0), (x: 20.0, y: 0.0)],
            )
            .with_way_type(WayType::Cycleway),
        ];

        RoadNetwork::new(nodes, edges).unwrap()
    }

    #[test]
    fn shortest_path_001() {
        let network = network();
        let by_length = |edge: &Edge, _| Some(edge.length());

        assert_eq!(
            shortest_path(&network, NodeId(1), NodeId(1), by_length),
            Some(Path::default())
        );

        assert_eq!(
            shortest_path(&network, NodeId(1), NodeId(3), by_length),
            Some(Path {
                length: Length::from_meters(20.0),
                edges: vec![(EdgeId(1), Direction::Forward), (EdgeId(2), Direction::Backward)],
            })
        );

        assert_eq!(
            shortest_path(&network, NodeId(3), NodeId(1), by_length),
            Some(Path {
                length: Length::from_meters(20.0),
                edges: vec![(EdgeId(2), Direction::Forward), (EdgeId(1), Direction::Backward)],
            })
        );
    }

    #[test]
    fn shortest_path_002() {
        let network = network();

        let by_comfort = |edge: &Edge, _| Some(edge.length() * edge.way_type.comfort_factor());

        assert_eq!(
            shortest_path(&network, NodeId(1), NodeId(3), by_comfort),
            Some(Path {
                length: Length::from_meters(24.0),
                edges: vec![(EdgeId(3), Direction::Forward), (EdgeId(4), Direction::Forward)],
            })
        );
    }

    #[test]
    fn shortest_path_003() {
        let network = network();

        let no_roads = |edge: &Edge, _| (edge.way_type != WayType::Road).then(|| edge.length());

        assert_eq!(
            shortest_path(&network, NodeId(1), NodeId(2), no_roads),
            None
        );
    }
}
