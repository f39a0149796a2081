use std::fmt;
use std::iter::Sum;
use std::ops::AddAssign;

/// Counters of a matching run, accumulated per worker and merged at batch boundaries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MatchingStatistics {
    /// Number of route fragments (parts of multi line geometries) processed.
    pub fragments: usize,
    /// Fragments resolved from the map matcher result.
    pub matched_by_map_matching: usize,
    /// Fragments resolved from the routing fallback result.
    pub matched_by_routing: usize,
    /// Fragments that were partially outside of the boundary.
    pub clipped: usize,
    /// Fragments that were fully outside of the boundary.
    pub outside_boundary: usize,
    /// Fragments neither the matcher nor the router produced a resolvable path for.
    pub unmatched: usize,
    /// Fragments whose edges could not be disambiguated.
    pub ambiguous_edge_set: usize,
    /// Fragments whose edges could not be ordered into a connected path.
    pub unresolvable_adjacency: usize,
    /// Routes (and variants) with at least one resolved fragment.
    pub routes_matched: usize,
    /// Routes (and variants) without any resolved fragment.
    pub routes_unmatched: usize,
    /// Routes (and variants) that failed with a fatal error.
    pub routes_failed: usize,
    /// Routes (and variants) that were skipped because they have no geometry.
    pub routes_without_geometry: usize,
}

impl MatchingStatistics {
    /// Fragments that were resolved into edge bindings.
    pub const fn matched(&self) -> usize {
        self.matched_by_map_matching + self.matched_by_routing
    }

    /// Routes (and variants) processed, including the ones that were skipped.
    pub const fn routes(&self) -> usize {
        self.routes_matched
            + self.routes_unmatched
            + self.routes_failed
            + self.routes_without_geometry
    }
}

impl AddAssign for MatchingStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.fragments += rhs.fragments;
        self.matched_by_map_matching += rhs.matched_by_map_matching;
        self.matched_by_routing += rhs.matched_by_routing;
        self.clipped += rhs.clipped;
        self.outside_boundary += rhs.outside_boundary;
        self.unmatched += rhs.unmatched;
        self.ambiguous_edge_set += rhs.ambiguous_edge_set;
        self.unresolvable_adjacency += rhs.unresolvable_adjacency;
        self.routes_matched += rhs.routes_matched;
        self.routes_unmatched += rhs.routes_unmatched;
        self.routes_failed += rhs.routes_failed;
        self.routes_without_geometry += rhs.routes_without_geometry;
    }
}

impl Sum for MatchingStatistics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, statistics| {
            acc += statistics;
            acc
        })
    }
}

impl fmt::Display for MatchingStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} routes ({} matched, {} unmatched, {} failed, {} without geometry), \
             {} fragments ({} by map matching, {} by routing, {} unmatched, {} clipped, \
             {} outside boundary, {} ambiguous edge sets, {} unresolvable adjacencies)",
            self.routes(),
            self.routes_matched,
            self.routes_unmatched,
            self.routes_failed,
            self.routes_without_geometry,
            self.fragments,
            self.matched_by_map_matching,
            self.matched_by_routing,
            self.unmatched,
            self.clipped,
            self.outside_boundary,
            self.ambiguous_edge_set,
            self.unresolvable_adjacency
        )
    }
}

/// Counters of a profile projection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProfileStatistics {
    /// Routes (and variants) whose profile was updated.
    pub profiled: usize,
    /// Routes (and variants) skipped because they have no geometry.
    pub without_geometry: usize,
    /// Routes (and variants) without edge bindings, or the matcher reported no properties for.
    pub no_match: usize,
    /// Routes (and variants) whose bindings reference edges missing from the network.
    pub inconsistent: usize,
    /// Routes (and variants) that failed with a fatal error.
    pub failed: usize,
}

impl AddAssign for ProfileStatistics {
    fn add_assign(&mut self, rhs: Self) {
        self.profiled += rhs.profiled;
        self.without_geometry += rhs.without_geometry;
        self.no_match += rhs.no_match;
        self.inconsistent += rhs.inconsistent;
        self.failed += rhs.failed;
    }
}

impl Sum for ProfileStatistics {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), |mut acc, statistics| {
            acc += statistics;
            acc
        })
    }
}

impl fmt::Display for ProfileStatistics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} profiled, {} without geometry, {} not matched, {} inconsistent, {} failed",
            self.profiled, self.without_geometry, self.no_match, self.inconsistent, self.failed
        )
    }
}
