use rayon::prelude::*;
use tracing::info;

use crate::graph::Network;
use crate::matching::MapMatcher;
use crate::profile::ProfileService;
use crate::routing::Router;
use crate::service::{MatchingEventSink, MatchingService};
use crate::{MatchingStatistics, ProfileStatistics, Route, RouteRecord};

/// How the routes of a batch are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BatchMode {
    /// Routes are processed on the rayon thread pool.
    #[default]
    Parallel,
    /// Routes are processed one after the other on the calling thread.
    Sequential,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    /// The imported routes, in the same order as the records.
    pub routes: Vec<Route>,
    pub statistics: MatchingStatistics,
}

/// Imports the records and binds every route (and its variants) to the network.
/// A route that fails never aborts the batch, the failure is counted in the statistics.
pub fn import_batch<N, M, R, E>(
    service: &MatchingService<N, M, R, E>,
    records: Vec<RouteRecord>,
    mode: BatchMode,
) -> BatchResult
where
    N: Network + Sync,
    M: MapMatcher + Sync,
    R: Router + Sync,
    E: MatchingEventSink + Sync,
{
    info!("Importing {} routes ({mode:?})", records.len());

    let import = |record: RouteRecord| {
        let mut route = Route::from(record);
        let mut statistics = MatchingStatistics::default();
        service.match_route(&mut route, &mut statistics);
        (route, statistics)
    };

    let (routes, statistics) = match mode {
        BatchMode::Sequential => records
            .into_iter()
            .map(import)
            .fold(Default::default(), collect_route),
        BatchMode::Parallel => records
            .into_par_iter()
            .map(import)
            .fold(Default::default, collect_route)
            .reduce(Default::default, |(mut routes, mut statistics), (other, s)| {
                routes.extend(other);
                statistics += s;
                (routes, statistics)
            }),
    };

    info!("Imported {} routes: {statistics}", routes.len());

    BatchResult { routes, statistics }
}

/// Updates the profiles of all the routes (and their variants).
pub fn update_profiles_batch<N, M>(
    service: &ProfileService<N, M>,
    routes: &mut [Route],
    mode: BatchMode,
) -> ProfileStatistics
where
    N: Network + Sync,
    M: MapMatcher + Sync,
{
    info!("Updating profiles of {} routes ({mode:?})", routes.len());

    let statistics: ProfileStatistics = match mode {
        BatchMode::Sequential => routes
            .iter_mut()
            .map(|route| service.update_profiles(route))
            .sum(),
        BatchMode::Parallel => routes
            .par_iter_mut()
            .map(|route| service.update_profiles(route))
            .reduce(ProfileStatistics::default, |mut a, b| {
                a += b;
                a
            }),
    };

    info!("Updated profiles: {statistics}");
    statistics
}

fn collect_route(
    (mut routes, mut statistics): (Vec<Route>, MatchingStatistics),
    (route, s): (Route, MatchingStatistics),
) -> (Vec<Route>, MatchingStatistics) {
    routes.push(route);
    statistics += s;
    (routes, statistics)
}
