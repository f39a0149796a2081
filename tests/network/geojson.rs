use std::str::FromStr;
use std::sync::LazyLock;

use geojson::{Feature, FeatureCollection, JsonObject, Value};
use netzbezug::{
    Edge, EdgeId, LinearReference, Network, Node, NodeId, RoadNetwork, SourceWayId, WayType,
};

//  1 ---(1)--- 2 ---(2)--- 3 ---(6)--- 6
//              |           |
//             (5)         (3)
//              |           |
//              5 ---(4)--- 4
//
//  edges 1 and 2 were split from source way 100
pub static GEOJSON_NETWORK: LazyLock<RoadNetwork> = LazyLock::new(|| {
    let geojson = include_str!("../data/network.geojson");
    parse_geojson(geojson)
});

fn parse_geojson(geojson: &str) -> RoadNetwork {
    let FeatureCollection { features, .. } = FeatureCollection::from_str(geojson).unwrap();

    let mut nodes = vec![];
    let mut edges = vec![];

    for Feature {
        geometry,
        properties,
        ..
    } in features
    {
        let geometry = geometry.unwrap();
        let properties = properties.unwrap();
        let id = properties.get("id").unwrap().as_u64().unwrap();

        match geometry.value {
            Value::Point(point) => nodes.push(Node {
                id: NodeId(id),
                point: geo::coord! { x: point[0], y: point[1] },
            }),
            Value::LineString(lines) => {
                let geometry = lines
                    .iter()
                    .map(|line| geo::coord! { x: line[0], y: line[1] })
                    .collect();

                let from = number(&properties, "sourceFrom");
                let to = number(&properties, "sourceTo");
                let reference = LinearReference::new(from, to).unwrap();

                let way_type = properties.get("wayType").unwrap().as_str().unwrap();

                edges.push(
                    Edge::new(
                        EdgeId(id),
                        SourceWayId(properties.get("wayId").unwrap().as_i64().unwrap()),
                        [
                            NodeId(properties.get("startId").unwrap().as_u64().unwrap()),
                            NodeId(properties.get("endId").unwrap().as_u64().unwrap()),
                        ],
                        geometry,
                    )
                    .with_source_reference(reference)
                    .with_way_type(WayType::from_str(way_type).unwrap())
                    .with_elevation(number(&properties, "ascent"), number(&properties, "descent")),
                );
            }
            _ => unreachable!(),
        }
    }

    RoadNetwork::new(nodes, edges).unwrap()
}

fn number(properties: &JsonObject, key: &str) -> f64 {
    properties.get(key).unwrap().as_f64().unwrap()
}

#[test]
fn geojson_network_edge_attributes() {
    let network = &GEOJSON_NETWORK;

    let edge = network.edge(EdgeId(2)).unwrap();
    assert_eq!(edge.source_way, SourceWayId(100));
    assert_eq!(edge.nodes, [NodeId(2), NodeId(3)]);
    assert_eq!(edge.source_reference, LinearReference::new(0.5, 1.0).unwrap());
    assert_eq!(edge.way_type, WayType::Cycleway);
    assert_eq!(edge.length().meters(), 100.0);

    let edge = network.edge(EdgeId(3)).unwrap();
    assert_eq!(edge.way_type, WayType::Road);
    assert_eq!(edge.ascent, 5.0);

    let edges = network.edges_by_source_ids(&[SourceWayId(100)]);
    let ids: Vec<_> = edges.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![EdgeId(1), EdgeId(2)]);
}

#[test]
fn geojson_network_node_edges() {
    let network = &GEOJSON_NETWORK;

    let ids: Vec<_> = network.node_edges(NodeId(3)).map(|e| e.id).collect();
    assert_eq!(ids, vec![EdgeId(2), EdgeId(3), EdgeId(6)]);

    let ids: Vec<_> = network.node_edges(NodeId(1)).map(|e| e.id).collect();
    assert_eq!(ids, vec![EdgeId(1)]);
}
