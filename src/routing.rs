use geo::{Coord, LineString};
use tracing::debug;

use crate::graph::dijkstra::shortest_path;
use crate::graph::path::{Path, path_geometry};
use crate::graph::{Edge, Network};
use crate::{
    Direction, FailureReason, Length, NoRouteFound, SourceWayId, TransportProfile, WayType,
};

/// Path computed by a router between a sequence of coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingResult {
    /// Source ways followed by the route, in traversal order.
    pub way_ids: Vec<SourceWayId>,
    pub geometry: LineString,
    /// Total elevation gain in meters.
    pub elevation_gain: f64,
    /// Total elevation loss in meters.
    pub elevation_loss: f64,
}

/// Computes routes through the network when a geometry cannot be map matched.
pub trait Router {
    /// Routes through all the given coordinates in order.
    /// If `prefer_short` is true the shortest route is preferred over the most comfortable one.
    fn route(
        &self,
        coordinates: &[Coord],
        profile: TransportProfile,
        prefer_short: bool,
    ) -> Result<RoutingResult, NoRouteFound>;
}

impl<R: Router + ?Sized> Router for &R {
    fn route(
        &self,
        coordinates: &[Coord],
        profile: TransportProfile,
        prefer_short: bool,
    ) -> Result<RoutingResult, NoRouteFound> {
        (**self).route(coordinates, profile, prefer_short)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RouterConfig {
    /// Maximum distance between a coordinate and the network node the route starts or ends at.
    pub max_snap_distance: Length,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            max_snap_distance: Length::from_meters(50.0),
        }
    }
}

/// Router running on the in-memory reference network.
#[derive(Debug)]
pub struct NetworkRouter<'a, N> {
    config: RouterConfig,
    network: &'a N,
}

impl<'a, N: Network> NetworkRouter<'a, N> {
    pub const fn new(config: RouterConfig, network: &'a N) -> Self {
        Self { config, network }
    }
}

impl<N: Network> Router for NetworkRouter<'_, N> {
    fn route(
        &self,
        coordinates: &[Coord],
        profile: TransportProfile,
        prefer_short: bool,
    ) -> Result<RoutingResult, NoRouteFound> {
        debug!("Routing through {} coordinates with {profile}", coordinates.len());

        if coordinates.len() < 2 {
            return Err(NoRouteFound::new(FailureReason::NotFound));
        }

        let nodes = coordinates
            .iter()
            .map(|&coord| {
                self.network
                    .nearest_node_within_distance(coord, self.config.max_snap_distance)
                    .map(|(node, _)| node)
                    .ok_or(NoRouteFound::new(FailureReason::OutsideNetwork))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let cost = |edge: &Edge, _: Direction| {
            if !is_accessible(edge.way_type, profile) {
                None
            } else if prefer_short {
                Some(edge.length())
            } else {
                Some(edge.length() * edge.way_type.comfort_factor())
            }
        };

        let mut path = Path::default();
        for window in nodes.windows(2) {
            let leg = shortest_path(self.network, window[0], window[1], cost)
                .ok_or(NoRouteFound::new(FailureReason::NotFound))?;
            path.length += leg.length;
            path.edges.extend(leg.edges);
        }

        if path.edges.is_empty() {
            debug!("Route between {nodes:?} is empty");
            return Err(NoRouteFound::new(FailureReason::NotFound));
        }

        let bindings = path.to_bindings();
        let geometry = path_geometry(self.network, &bindings)
            .ok_or(NoRouteFound::new(FailureReason::Unavailable))?;

        let mut way_ids: Vec<SourceWayId> = vec![];
        let mut elevation_gain = 0.0;
        let mut elevation_loss = 0.0;

        for &(edge, direction) in &path.edges {
            let Some(edge) = self.network.edge(edge) else {
                continue;
            };

            if way_ids.last() != Some(&edge.source_way) {
                way_ids.push(edge.source_way);
            }

            let (gain, loss) = edge.elevation(direction);
            elevation_gain += gain;
            elevation_loss += loss;
        }

        Ok(RoutingResult {
            way_ids,
            geometry,
            elevation_gain,
            elevation_loss,
        })
    }
}

const fn is_accessible(way_type: WayType, profile: TransportProfile) -> bool {
    match profile {
        TransportProfile::Bike | TransportProfile::Foot => true,
        TransportProfile::Car => !matches!(
            way_type,
            WayType::Cycleway | WayType::SharedFootAndCyclePath | WayType::Track
        ),
    }
}
