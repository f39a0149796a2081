//! Map matching capability consumed by the conflation engine.
//!
//! The matching itself (snapping a trace onto the most plausible path of the network) is
//! implemented outside this crate, for example by a GraphHopper-like service; the engine only
//! relies on its explicit outcomes.

use geo::LineString;

use crate::{LinearReference, NoMatchFound, ProfileProperties, SourceWayId, TransportProfile};

/// Geometry snapped onto the network, and the source ways it follows in traversal order.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchedGeometry {
    pub geometry: LineString,
    pub way_ids: Vec<SourceWayId>,
}

/// Properties of a part of a single source way, as reported by the matcher.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WayProperties {
    pub way_id: SourceWayId,
    /// Part of the source way (in the way direction) the properties apply to.
    pub reference: LinearReference,
    pub properties: ProfileProperties,
    /// Elevation gain in meters along the referenced part, in the way direction.
    pub ascent: f64,
    /// Elevation loss in meters along the referenced part, in the way direction.
    pub descent: f64,
}

impl WayProperties {
    pub const fn new(
        way_id: SourceWayId,
        reference: LinearReference,
        properties: ProfileProperties,
    ) -> Self {
        Self {
            way_id,
            reference,
            properties,
            ascent: 0.0,
            descent: 0.0,
        }
    }

    pub const fn with_elevation(mut self, ascent: f64, descent: f64) -> Self {
        self.ascent = ascent;
        self.descent = descent;
        self
    }
}

/// Snaps geometries onto the network.
/// Implementations are blocking calls (network or process bound), see [`crate::Timeout`] to
/// bound their duration.
pub trait MapMatcher {
    /// Matches the geometry onto the network for the given transport profile.
    fn match_geometry(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<MatchedGeometry, NoMatchFound>;

    /// Matches the geometry onto the network and reports the properties of the matched ways.
    fn match_with_properties(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<(MatchedGeometry, Vec<WayProperties>), NoMatchFound>;
}

impl<M: MapMatcher + ?Sized> MapMatcher for &M {
    fn match_geometry(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<MatchedGeometry, NoMatchFound> {
        (**self).match_geometry(geometry, profile)
    }

    fn match_with_properties(
        &self,
        geometry: &LineString,
        profile: TransportProfile,
    ) -> Result<(MatchedGeometry, Vec<WayProperties>), NoMatchFound> {
        (**self).match_with_properties(geometry, profile)
    }
}
