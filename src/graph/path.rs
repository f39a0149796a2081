use geo::{Coord, LineString};
use tracing::debug;

use crate::geometry::{dedup, distance, substring};
use crate::graph::{Edge, Network};
use crate::{Direction, EdgeBinding, EdgeId, Length};

/// Sequence of whole edges traversed between two nodes.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub length: Length,
    pub edges: Vec<(EdgeId, Direction)>,
}

impl Default for Path {
    fn default() -> Self {
        Self {
            length: Length::ZERO,
            edges: vec![],
        }
    }
}

impl Path {
    /// Binds the whole path edges in traversal order.
    pub fn to_bindings(&self) -> Vec<EdgeBinding> {
        self.edges
            .iter()
            .map(|&(edge, direction)| EdgeBinding::full(edge, direction))
            .collect()
    }
}

/// Returns true only if all the bindings are sequentially connected: the position where the
/// route leaves a binding is the position where it enters the next one (within tolerance).
/// Bindings referencing edges that don't belong to the network are never connected.
pub fn is_path_connected<N: Network>(
    network: &N,
    bindings: &[EdgeBinding],
    tolerance: Length,
) -> bool {
    for window in bindings.windows(2) {
        let [b1, b2] = [window[0], window[1]];

        let exit = network.edge(b1.edge).and_then(|e| e.coord_at(b1.exit()));
        let entry = network.edge(b2.edge).and_then(|e| e.coord_at(b2.entry()));

        match exit.zip(entry) {
            Some((exit, entry)) if distance(exit, entry) <= tolerance => (),
            _ => {
                debug!("Path is not connected between {b1:?} and {b2:?}");
                return false;
            }
        }
    }

    true
}

/// Splits the bindings into maximal runs of sequentially connected bindings.
pub fn connected_runs<'a, N: Network>(
    network: &N,
    bindings: &'a [EdgeBinding],
    tolerance: Length,
) -> Vec<&'a [EdgeBinding]> {
    let mut runs = vec![];
    let mut start = 0;

    for end in 1..=bindings.len() {
        if end == bindings.len() || !is_path_connected(network, &bindings[end - 1..=end], tolerance)
        {
            runs.push(&bindings[start..end]);
            start = end;
        }
    }

    runs
}

/// Gets the total length of the route along the bound fractions of the edges.
pub fn path_length<N: Network>(network: &N, bindings: &[EdgeBinding]) -> Length {
    bindings
        .iter()
        .filter_map(|b| network.edge(b.edge).map(|e| binding_length(e, b)))
        .sum()
}

pub fn binding_length(edge: &Edge, binding: &EdgeBinding) -> Length {
    edge.length() * binding.reference.fraction()
}

/// Gets the geometry of the bound fraction of the edge, in traversal direction.
pub fn binding_geometry(edge: &Edge, binding: &EdgeBinding) -> LineString {
    let reference = binding.reference;
    let mut geometry = substring(&edge.geometry, reference.from(), reference.to());

    if !binding.direction.is_forward() {
        geometry.0.reverse();
    }

    geometry
}

/// Concatenates the geometries of all the bindings in traversal order.
/// Returns None if any of the edges doesn't belong to the network.
pub fn path_geometry<N: Network>(network: &N, bindings: &[EdgeBinding]) -> Option<LineString> {
    let mut coords: Vec<Coord> = vec![];

    for binding in bindings {
        let edge = network.edge(binding.edge)?;
        coords.extend(binding_geometry(edge, binding));
    }

    Some(dedup(&LineString::new(coords)))
}

#[cfg(test)]
mod tests {
    use geo::{coord, line_string};
    use test_log::test;

    use super::*;
    use crate::graph::Node;
    use crate::graph::network::RoadNetwork;
    use crate::{LinearReference, NodeId, SourceWayId};

    fn network() -> RoadNetwork {
        let nodes = [
            Node {
                id: NodeId(1),
                point: coord! { x: 0.0, y: 0.0 },
            },
            Node {
                id: NodeId(2),
                point: coord! { x: 10.0, y: 0.0 },
            },
            Node {
                id: NodeId(3),
                point: coord! { x: 10.0, y: 10.0 },
            },
        ];

        let edges = [
            Edge::new(
                EdgeId(1),
                SourceWayId(1),
                [NodeId(1), NodeId(2)],
                line_string![(x: 0.0, y: 0.0), (x: 10.0, y: 0.0)],
            ),
            // native direction from 3 to 2
            Edge::new(
                EdgeId(2),
                SourceWayId(2),
                [NodeId(3), NodeId(2)],
                line_string![(x: 10.0, y: 10.0), (x: 10.0, y: 0.0)],
            ),
        ];

        RoadNetwork::new(nodes, edges).unwrap()
    }

    #[test]
    fn path_connected_001() {
        let network = network();
        let tolerance = Length::from_meters(0.5);

        let bindings = [
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(2), Direction::Backward),
        ];
        assert!(is_path_connected(&network, &bindings, tolerance));

        let bindings = [
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(2), Direction::Forward),
        ];
        assert!(!is_path_connected(&network, &bindings, tolerance));

        let bindings = [
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(42), Direction::Forward),
        ];
        assert!(!is_path_connected(&network, &bindings, tolerance));
    }

    #[test]
    fn path_connected_002() {
        let network = network();

        let bindings = [
            EdgeBinding::new(
                EdgeId(1),
                LinearReference::new(0.0, 0.5).unwrap(),
                Direction::Forward,
            ),
            EdgeBinding::full(EdgeId(2), Direction::Backward),
        ];

        assert!(!is_path_connected(&network, &bindings, Length::from_meters(1.0)));
        assert!(is_path_connected(&network, &bindings, Length::from_meters(5.0)));
    }

    #[test]
    fn path_connected_runs() {
        let network = network();
        let tolerance = Length::from_meters(0.5);

        let bindings = [
            EdgeBinding::full(EdgeId(1), Direction::Forward),
            EdgeBinding::full(EdgeId(2), Direction::Backward),
            EdgeBinding::full(EdgeId(1), Direction::Forward),
        ];

        assert_eq!(
            connected_runs(&network, &bindings, tolerance),
            [&bindings[..2], &bindings[2..]]
        );
        assert!(connected_runs(&network, &[], tolerance).is_empty());
    }

    #[test]
    fn path_geometry_001() {
        let network = network();

        let bindings = [
            EdgeBinding::new(
                EdgeId(1),
                LinearReference::new(0.5, 1.0).unwrap(),
                Direction::Forward,
            ),
            EdgeBinding::new(
                EdgeId(2),
                LinearReference::new(0.5, 1.0).unwrap(),
                Direction::Backward,
            ),
        ];

        assert_eq!(
            path_geometry(&network, &bindings),
            Some(line_string![(x: 5.0, y: 0.0), (x: 10.0, y: 0.0), (x: 10.0, y: 5.0)])
        );
        assert_eq!(path_length(&network, &bindings), Length::from_meters(10.0));
    }
}
