//! Projects the properties of the source ways onto the linear parameterization of a route.
//!
//! The route is parameterized in [0, 1] by the cumulative length of its bindings, in traversal
//! order. Every property entry reported for a source way is mapped onto the edges derived from
//! that way, intersected with the bound fractions of the edges and re-expressed along the route.
//! Overlapping entries are resolved by the largest projected length, gaps are filled with the
//! unknown properties.

use std::cmp::Ordering;

use geo::MultiLineString;
use tracing::{debug, warn};

use crate::graph::Network;
use crate::graph::path::{binding_length, connected_runs, path_geometry};
use crate::matching::{MapMatcher, WayProperties};
use crate::service::{MatchingConfig, NetzbezugResult};
use crate::{
    Direction, EdgeBinding, LinearReference, ProfileError, ProfileProperties, ProfileStatistics,
    Route,
};

/// Properties of a part of the route (German: linear referenzierte Profileigenschaften).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileSegment {
    /// Part of the whole route the properties apply to.
    pub reference: LinearReference,
    pub properties: ProfileProperties,
}

/// Gap-free profile of a route and its total elevation gain and loss (in meters).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProfileResult {
    pub segments: Vec<ProfileSegment>,
    pub ascent: f64,
    pub descent: f64,
}

/// Part of the route covered by a property entry.
#[derive(Debug, Clone, Copy)]
struct Piece {
    /// Index of the property entry.
    entry: usize,
    from: f64,
    to: f64,
}

/// Projects the way properties onto the route bound to the network by the given bindings.
///
/// The returned segments are ordered, cover [0, 1] without gaps, and adjacent segments never
/// share the same properties. Where several entries overlap, the entry with the largest projected
/// length wins, then the one starting first along the route, then the first one in input order.
pub fn project_profile<N: Network>(
    network: &N,
    way_properties: &[WayProperties],
    bindings: &[EdgeBinding],
) -> Result<ProfileResult, ProfileError> {
    if bindings.is_empty() {
        return Err(ProfileError::EmptyPath);
    } else if way_properties.is_empty() {
        return Err(ProfileError::EmptyPropertyList);
    }

    let edges = bindings
        .iter()
        .map(|b| network.edge(b.edge).ok_or(ProfileError::UnknownEdge(b.edge)))
        .collect::<Result<Vec<_>, _>>()?;

    let lengths: Vec<f64> = edges
        .iter()
        .zip(bindings)
        .map(|(edge, binding)| binding_length(edge, binding).meters())
        .collect();

    let total_length: f64 = lengths.iter().sum();
    if total_length <= 0.0 {
        return Err(ProfileError::EmptyPath);
    }

    let mut pieces: Vec<Piece> = vec![];
    let mut ascent = 0.0;
    let mut descent = 0.0;
    let mut offset = 0.0;

    for ((edge, binding), &length) in edges.iter().zip(bindings).zip(&lengths) {
        let entries = way_properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.way_id == edge.source_way);

        for (index, entry) in entries {
            let source = edge.source_reference;

            // part of the edge the entry applies to, intersected with the bound part
            let Some(part) = entry
                .reference
                .intersection(&source)
                .and_then(|overlap| {
                    let from = source.normalize(overlap.from());
                    let to = source.normalize(overlap.to());
                    LinearReference::new(from, to).ok()
                })
                .and_then(|part| part.intersection(&binding.reference))
            else {
                continue;
            };

            let reference = binding.reference;
            let (from, to) = match binding.direction {
                Direction::Forward => (
                    reference.normalize(part.from()),
                    reference.normalize(part.to()),
                ),
                Direction::Backward => (
                    1.0 - reference.normalize(part.to()),
                    1.0 - reference.normalize(part.from()),
                ),
            };

            pieces.push(Piece {
                entry: index,
                from: ((offset + from * length) / total_length).clamp(0.0, 1.0),
                to: ((offset + to * length) / total_length).clamp(0.0, 1.0),
            });

            // share of the entry interval (along the source way) covered by the piece
            let share = part.fraction() * source.fraction() / entry.reference.fraction();
            let (gain, loss) = match binding.direction {
                Direction::Forward => (entry.ascent, entry.descent),
                Direction::Backward => (entry.descent, entry.ascent),
            };

            ascent += gain * share;
            descent += loss * share;
        }

        offset += length;
    }

    debug!(
        "Projected {} property entries onto {} pieces of the route",
        way_properties.len(),
        pieces.len()
    );

    Ok(ProfileResult {
        segments: resolve_segments(way_properties, &pieces)?,
        ascent,
        descent,
    })
}

fn resolve_segments(
    way_properties: &[WayProperties],
    pieces: &[Piece],
) -> Result<Vec<ProfileSegment>, ProfileError> {
    const EPSILON: f64 = LinearReference::EPSILON;

    // projected length and start of every entry
    let mut projections = vec![(0.0, f64::INFINITY); way_properties.len()];
    for piece in pieces {
        let (length, start) = &mut projections[piece.entry];
        *length += piece.to - piece.from;
        *start = start.min(piece.from);
    }

    let rank = |a: usize, b: usize| -> Ordering {
        let [(length_a, start_a), (length_b, start_b)] = [projections[a], projections[b]];
        if (length_a - length_b).abs() > EPSILON {
            length_b.total_cmp(&length_a)
        } else {
            start_a.total_cmp(&start_b).then(a.cmp(&b))
        }
    };

    let mut breakpoints: Vec<f64> = [0.0, 1.0]
        .into_iter()
        .chain(pieces.iter().flat_map(|p| [p.from, p.to]))
        .collect();

    breakpoints.sort_by(f64::total_cmp);
    breakpoints.dedup_by(|next, previous| *next - *previous <= EPSILON);
    if let Some(last) = breakpoints.last_mut() {
        *last = 1.0;
    }

    let mut segments: Vec<ProfileSegment> = vec![];

    for window in breakpoints.windows(2) {
        let [from, to] = [window[0], window[1]];

        let properties = pieces
            .iter()
            .filter(|p| p.from <= from + EPSILON && p.to >= to - EPSILON)
            .map(|p| p.entry)
            .min_by(|&a, &b| rank(a, b))
            .map_or(ProfileProperties::UNKNOWN, |entry| {
                way_properties[entry].properties
            });

        match segments.last_mut() {
            Some(last) if last.properties == properties => {
                last.reference = LinearReference::new(last.reference.from(), to)?;
            }
            _ => segments.push(ProfileSegment {
                reference: LinearReference::new(from, to)?,
                properties,
            }),
        }
    }

    Ok(segments)
}

/// Updates the profiles of routes (and their variants) that are bound to the network.
///
/// The geometry of every connected run of bindings is matched again to get the properties of the
/// traversed ways, then the properties are projected onto the bindings.
#[derive(Debug)]
pub struct ProfileService<'a, N, M> {
    config: MatchingConfig,
    network: &'a N,
    matcher: M,
}

impl<'a, N: Network, M: MapMatcher> ProfileService<'a, N, M> {
    pub const fn new(config: MatchingConfig, network: &'a N, matcher: M) -> Self {
        Self {
            config,
            network,
            matcher,
        }
    }

    /// Updates the profile of the route and of all its variants.
    /// Routes and variants without geometry are skipped, a failed update leaves the current
    /// profile untouched.
    pub fn update_profiles(&self, route: &mut Route) -> ProfileStatistics {
        debug!("Updating profiles of route {:?}", route.id);

        let mut statistics = ProfileStatistics::default();

        self.update_profile(
            route.geometry.as_ref(),
            route.netzbezug.as_ref(),
            &mut route.profile,
            &mut statistics,
        );

        for variant in &mut route.variants {
            self.update_profile(
                variant.geometry.as_ref(),
                variant.netzbezug.as_ref(),
                &mut variant.profile,
                &mut statistics,
            );
        }

        statistics
    }

    fn update_profile(
        &self,
        geometry: Option<&MultiLineString>,
        netzbezug: Option<&NetzbezugResult>,
        profile: &mut Option<ProfileResult>,
        statistics: &mut ProfileStatistics,
    ) {
        if geometry.is_none() {
            debug!("Skipping profile without geometry");
            statistics.without_geometry += 1;
            return;
        }

        let Some(bindings) = netzbezug
            .map(|n| n.edge_bindings.as_slice())
            .filter(|b| !b.is_empty())
        else {
            debug!("Skipping profile without edge bindings");
            statistics.no_match += 1;
            return;
        };

        let way_properties = match self.way_properties(bindings) {
            Ok(Some(way_properties)) => way_properties,
            Ok(None) => {
                statistics.no_match += 1;
                return;
            }
            Err(error) => {
                warn!("Profile bindings are not consistent with the network: {error}");
                statistics.inconsistent += 1;
                return;
            }
        };

        match project_profile(self.network, &way_properties, bindings) {
            Ok(result) => {
                *profile = Some(result);
                statistics.profiled += 1;
            }
            Err(error @ ProfileError::UnknownEdge(_)) => {
                warn!("Profile bindings are not consistent with the network: {error}");
                statistics.inconsistent += 1;
            }
            Err(error) => {
                warn!("Profile projection failed: {error}");
                statistics.failed += 1;
            }
        }
    }

    /// Matches every connected run of bindings and collects the properties of the matched ways.
    /// Returns None if any run cannot be matched.
    fn way_properties(
        &self,
        bindings: &[EdgeBinding],
    ) -> Result<Option<Vec<WayProperties>>, ProfileError> {
        if let Some(binding) = bindings.iter().find(|b| self.network.edge(b.edge).is_none()) {
            return Err(ProfileError::UnknownEdge(binding.edge));
        }

        let tolerance = self.config.resolver.endpoint_tolerance;
        let mut way_properties = vec![];

        for run in connected_runs(self.network, bindings, tolerance) {
            let geometry = path_geometry(self.network, run).ok_or(ProfileError::EmptyPath)?;

            match self
                .matcher
                .match_with_properties(&geometry, self.config.profile)
            {
                Ok((_, properties)) => way_properties.extend(properties),
                Err(error) => {
                    debug!("Cannot match the bound geometry: {error}");
                    return Ok(None);
                }
            }
        }

        Ok(Some(way_properties))
    }
}
