#![doc = include_str!("../README.md")]

mod batch;
mod clipping;
mod error;
mod geometry;
mod graph;
mod linear_reference;
mod matching;
mod model;
mod profile;
mod resolver;
mod route;
mod routing;
mod service;
mod statistics;
mod timeout;

pub use batch::{BatchMode, BatchResult, import_batch, update_profiles_batch};
pub use clipping::{Boundary, clip};
pub use error::{
    FailureReason, LinearReferenceError, NetworkError, NoMatchFound, NoRouteFound, ProfileError,
    ResolveError,
};
pub use geometry::{Projection, line_length, project, substring};
pub use graph::dijkstra::shortest_path;
pub use graph::network::RoadNetwork;
pub use graph::path::{
    Path, binding_geometry, binding_length, connected_runs, is_path_connected, path_geometry,
    path_length,
};
pub use graph::{Edge, Network, Node};
pub use linear_reference::{EdgeBinding, LinearReference};
pub use matching::{MapMatcher, MatchedGeometry, WayProperties};
pub use model::{
    Direction, EdgeId, Length, NodeId, ProfileProperties, SourceWayId, Surface, TransportProfile,
    WayType,
};
pub use profile::{ProfileResult, ProfileSegment, ProfileService, project_profile};
pub use resolver::{ResolvedPath, ResolverConfig, resolve_edges};
pub use route::{Route, RouteId, RouteRecord, Variant, VariantRecord, to_lines};
pub use routing::{NetworkRouter, Router, RouterConfig, RoutingResult};
pub use service::{
    IgnoreEvents, MatchingConfig, MatchingEventSink, MatchingService, NetzbezugResult,
    RouteMatched, RoutingInformation, deviating_segments,
};
pub use statistics::{MatchingStatistics, ProfileStatistics};
pub use timeout::Timeout;
