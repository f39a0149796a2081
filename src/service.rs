//! The matching service (FahrradroutenMatchingService) binds imported routes to the network.
//!
//! Every line of a route geometry is a fragment that is processed independently:
//!
//! 1. Clip the fragment to the boundary, skip it if it's fully outside.
//! 2. Match the original fragment, then the clipped one (if clipping changed it).
//! 3. If matching failed, route between the endpoints of the original fragment, then between the
//!    endpoints of the clipped one.
//! 4. Resolve the source ways of the first successful attempt into edge bindings.
//!
//! The bindings of all the fragments are concatenated in geometry order.

use geo::{LineString, MultiLineString};
use tracing::{debug, info, warn};

use crate::clipping::{Boundary, clip};
use crate::geometry::{dedup, is_valid_line, project};
use crate::graph::Network;
use crate::matching::MapMatcher;
use crate::resolver::{ResolvedPath, ResolverConfig, resolve_edges};
use crate::routing::Router;
use crate::{
    EdgeBinding, Length, MatchingStatistics, ResolveError, Route, RouteId, SourceWayId,
    TransportProfile,
};

#[derive(Debug, Clone, Copy)]
pub struct MatchingConfig {
    /// Transport profile the matcher and the router evaluate the network with.
    pub profile: TransportProfile,
    /// The routing fallback prefers the shortest route over the most comfortable one.
    pub prefer_short: bool,
    pub resolver: ResolverConfig,
    /// Maximum distance between the resolved path and the fragment before the path is reported
    /// as deviating from it.
    pub deviation_tolerance: Length,
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            profile: TransportProfile::Bike,
            prefer_short: false,
            resolver: ResolverConfig::default(),
            deviation_tolerance: Length::from_meters(10.0),
        }
    }
}

/// Bindings of a route to the network (Netzbezug).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NetzbezugResult {
    pub edge_bindings: Vec<EdgeBinding>,
    /// At least one fragment was resolved from the routing fallback.
    pub used_routing_fallback: bool,
    /// Parts of the resolved path that deviate from the route geometry.
    pub deviating_segments: Vec<LineString>,
}

/// Accumulates how the fragments of a route were bound to the network.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RoutingInformation {
    pub used_routing_fallback: bool,
    pub deviating_segments: Vec<LineString>,
    /// Fragments that could neither be matched nor routed, or were outside of the boundary.
    pub unmatched_fragments: Vec<LineString>,
    /// Elevation gain in meters along the routed fragments, as reported by the router.
    pub elevation_gain: f64,
    /// Elevation loss in meters along the routed fragments, as reported by the router.
    pub elevation_loss: f64,
}

impl RoutingInformation {
    pub fn merge(&mut self, other: Self) {
        self.used_routing_fallback |= other.used_routing_fallback;
        self.deviating_segments.extend(other.deviating_segments);
        self.unmatched_fragments.extend(other.unmatched_fragments);
        self.elevation_gain += other.elevation_gain;
        self.elevation_loss += other.elevation_loss;
    }
}

/// Emitted once a route and its variants were processed.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatched {
    pub route: RouteId,
    /// The route bindings were replaced.
    pub netzbezug_updated: bool,
    pub used_routing_fallback: bool,
    pub unmatched_fragments: usize,
}

/// Receives the events of the matching service.
pub trait MatchingEventSink {
    fn route_matched(&self, event: &RouteMatched);
}

impl<F: Fn(&RouteMatched)> MatchingEventSink for F {
    fn route_matched(&self, event: &RouteMatched) {
        self(event)
    }
}

/// Event sink that drops all the events.
#[derive(Debug, Clone, Copy, Default)]
pub struct IgnoreEvents;

impl MatchingEventSink for IgnoreEvents {
    fn route_matched(&self, _: &RouteMatched) {}
}

#[derive(Debug)]
pub struct MatchingService<'a, N, M, R, E = IgnoreEvents> {
    config: MatchingConfig,
    network: &'a N,
    matcher: M,
    router: R,
    boundary: Option<Boundary>,
    events: E,
}

impl<'a, N, M, R> MatchingService<'a, N, M, R> {
    pub const fn new(config: MatchingConfig, network: &'a N, matcher: M, router: R) -> Self {
        Self {
            config,
            network,
            matcher,
            router,
            boundary: None,
            events: IgnoreEvents,
        }
    }
}

impl<'a, N, M, R, E> MatchingService<'a, N, M, R, E> {
    /// Clips the fragments to the boundary before matching them.
    pub fn with_boundary(mut self, boundary: Boundary) -> Self {
        self.boundary = Some(boundary);
        self
    }

    pub fn with_event_sink<S>(self, events: S) -> MatchingService<'a, N, M, R, S> {
        MatchingService {
            config: self.config,
            network: self.network,
            matcher: self.matcher,
            router: self.router,
            boundary: self.boundary,
            events,
        }
    }

    pub const fn config(&self) -> &MatchingConfig {
        &self.config
    }
}

impl<N, M, R, E> MatchingService<'_, N, M, R, E>
where
    N: Network,
    M: MapMatcher,
    R: Router,
    E: MatchingEventSink,
{
    /// Matches the route and all its variants.
    ///
    /// The bindings are replaced as a whole when at least one fragment is resolved, otherwise
    /// the current bindings are left untouched. Routes and variants without geometry are skipped.
    pub fn match_route(
        &self,
        route: &mut Route,
        statistics: &mut MatchingStatistics,
    ) -> RoutingInformation {
        info!("Matching route {:?} '{}'", route.id, route.name);

        let mut information = RoutingInformation::default();

        let netzbezug_updated = self.match_course(
            route.geometry.as_ref(),
            &mut route.netzbezug,
            statistics,
            &mut information,
        );

        for variant in &mut route.variants {
            debug!("Matching variant '{}'", variant.name);
            self.match_course(
                variant.geometry.as_ref(),
                &mut variant.netzbezug,
                statistics,
                &mut information,
            );
        }

        self.events.route_matched(&RouteMatched {
            route: route.id,
            netzbezug_updated,
            used_routing_fallback: information.used_routing_fallback,
            unmatched_fragments: information.unmatched_fragments.len(),
        });

        information
    }

    /// Binds every line of the geometry to the network.
    ///
    /// Returns None if no fragment could be resolved. Fragments that cannot be matched, routed,
    /// or resolved are counted and recorded as unmatched; the error is returned only for failures
    /// that invalidate the whole route.
    pub fn match_geometry(
        &self,
        geometry: &MultiLineString,
        statistics: &mut MatchingStatistics,
        information: &mut RoutingInformation,
    ) -> Result<Option<NetzbezugResult>, ResolveError> {
        let mut current = RoutingInformation::default();
        let mut edge_bindings: Vec<EdgeBinding> = vec![];

        for fragment in geometry {
            match self.match_fragment(fragment, statistics, &mut current)? {
                Some(bindings) => {
                    for binding in bindings {
                        if edge_bindings.last() != Some(&binding) {
                            edge_bindings.push(binding);
                        }
                    }
                }
                None => current.unmatched_fragments.push(fragment.clone()),
            }
        }

        let result = (!edge_bindings.is_empty()).then(|| NetzbezugResult {
            edge_bindings,
            used_routing_fallback: current.used_routing_fallback,
            deviating_segments: current.deviating_segments.clone(),
        });

        information.merge(current);
        Ok(result)
    }

    fn match_course(
        &self,
        geometry: Option<&MultiLineString>,
        netzbezug: &mut Option<NetzbezugResult>,
        statistics: &mut MatchingStatistics,
        information: &mut RoutingInformation,
    ) -> bool {
        let Some(geometry) = geometry else {
            debug!("Skipping matching without geometry");
            statistics.routes_without_geometry += 1;
            return false;
        };

        match self.match_geometry(geometry, statistics, information) {
            Ok(Some(result)) => {
                *netzbezug = Some(result);
                statistics.routes_matched += 1;
                true
            }
            Ok(None) => {
                debug!("No fragment could be matched, keeping the current bindings");
                statistics.routes_unmatched += 1;
                false
            }
            Err(error) => {
                warn!("Matching failed: {error}");
                statistics.routes_failed += 1;
                false
            }
        }
    }

    fn match_fragment(
        &self,
        fragment: &LineString,
        statistics: &mut MatchingStatistics,
        information: &mut RoutingInformation,
    ) -> Result<Option<Vec<EdgeBinding>>, ResolveError> {
        statistics.fragments += 1;

        let fragment = dedup(fragment);
        if !is_valid_line(&fragment) {
            debug!("Skipping fragment without length");
            statistics.unmatched += 1;
            return Ok(None);
        }

        let clipped = match &self.boundary {
            Some(boundary) => {
                let Some(clipped) = clip(&fragment, boundary) else {
                    debug!("Fragment is fully outside of the boundary");
                    statistics.outside_boundary += 1;
                    return Ok(None);
                };
                clipped
            }
            None => fragment.clone(),
        };

        let attempts = if clipped == fragment {
            vec![&fragment]
        } else {
            debug!("Fragment was clipped to the boundary");
            statistics.clipped += 1;
            vec![&fragment, &clipped]
        };

        let profile = self.config.profile;

        for geometry in &attempts {
            match self.matcher.match_geometry(geometry, profile) {
                Ok(matched) => {
                    debug!("Fragment matched onto {} source ways", matched.way_ids.len());
                    let path = self.resolve(&matched.way_ids, &matched.geometry, statistics)?;

                    if let Some(path) = &path {
                        statistics.matched_by_map_matching += 1;
                        self.record_deviations(path, &fragment, information);
                    }

                    return Ok(path.map(|p| p.bindings));
                }
                Err(error) => debug!("{error}"),
            }
        }

        for geometry in &attempts {
            let (Some(&start), Some(&end)) = (geometry.0.first(), geometry.0.last()) else {
                continue;
            };

            match self
                .router
                .route(&[start, end], profile, self.config.prefer_short)
            {
                Ok(routed) => {
                    debug!("Fragment routed along {} source ways", routed.way_ids.len());
                    let path = self.resolve(&routed.way_ids, &routed.geometry, statistics)?;

                    if let Some(path) = &path {
                        statistics.matched_by_routing += 1;
                        information.used_routing_fallback = true;
                        information.elevation_gain += routed.elevation_gain;
                        information.elevation_loss += routed.elevation_loss;
                        self.record_deviations(path, &fragment, information);
                    }

                    return Ok(path.map(|p| p.bindings));
                }
                Err(error) => debug!("{error}"),
            }
        }

        debug!("Fragment can be neither matched nor routed");
        statistics.unmatched += 1;
        Ok(None)
    }

    /// Resolves the source ways, only fatal errors are returned.
    fn resolve(
        &self,
        way_ids: &[SourceWayId],
        geometry: &LineString,
        statistics: &mut MatchingStatistics,
    ) -> Result<Option<ResolvedPath>, ResolveError> {
        match resolve_edges(&self.config.resolver, self.network, way_ids, geometry) {
            Ok(path) => Ok(Some(path)),
            Err(error @ ResolveError::AmbiguousEdgeSet(_)) => {
                warn!("{error}");
                statistics.ambiguous_edge_set += 1;
                Ok(None)
            }
            Err(error @ ResolveError::UnresolvableAdjacency(_)) => {
                warn!("{error}");
                statistics.unresolvable_adjacency += 1;
                Ok(None)
            }
            Err(error @ (ResolveError::EdgesNotFound(_) | ResolveError::InvalidGeometry)) => {
                debug!("{error}");
                statistics.unmatched += 1;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    fn record_deviations(
        &self,
        path: &ResolvedPath,
        fragment: &LineString,
        information: &mut RoutingInformation,
    ) {
        let Some(geometry) = path.geometry(self.network) else {
            return;
        };

        let deviations = deviating_segments(&geometry, fragment, self.config.deviation_tolerance);
        if !deviations.is_empty() {
            debug!("Resolved path deviates from the fragment {} times", deviations.len());
        }

        information.deviating_segments.extend(deviations);
    }
}

/// Gets the maximal runs of vertices of the geometry that are farther than the tolerance from
/// the reference line. Every run is extended by the vertices where it leaves and rejoins the
/// reference line.
pub fn deviating_segments(
    geometry: &LineString,
    reference: &LineString,
    tolerance: Length,
) -> Vec<LineString> {
    let coords = &geometry.0;
    let is_deviating: Vec<bool> = coords
        .iter()
        .map(|&c| project(reference, c).is_none_or(|p| p.distance > tolerance))
        .collect();

    let mut segments = vec![];
    let mut index = 0;

    while index < coords.len() {
        if !is_deviating[index] {
            index += 1;
            continue;
        }

        let start = index.saturating_sub(1);
        while index < coords.len() && is_deviating[index] {
            index += 1;
        }
        let end = index.min(coords.len() - 1);

        let segment = LineString::new(coords[start..=end].to_vec());
        if is_valid_line(&segment) {
            segments.push(segment);
        }
    }

    segments
}
