use geo::Coord;
use thiserror::Error;

use crate::{EdgeId, NodeId, SourceWayId};

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum LinearReferenceError {
    #[error("Linear reference bounds are not valid, expected 0 <= from <= to <= 1: [{0}, {1}]")]
    Malformed(f64, f64),
    #[error("Linear reference has zero length: [{0}, {0}]")]
    Degenerate(f64),
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
pub enum NetworkError {
    #[error("Edge {0:?} already belongs to the network")]
    DuplicateEdge(EdgeId),
    #[error("Edge {0:?} references unknown node {1:?}")]
    UnknownNode(EdgeId, NodeId),
    #[error("Edge {0:?} geometry must consist of at least 2 distinct coordinates")]
    InvalidGeometry(EdgeId),
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ResolveError {
    #[error("Geometry must consist of at least 2 distinct coordinates")]
    InvalidGeometry,
    #[error("No network edge covers the geometry for source ways {0:?}")]
    EdgesNotFound(Vec<SourceWayId>),
    #[error("Edges {0:?} cannot be disambiguated along the geometry")]
    AmbiguousEdgeSet(Vec<EdgeId>),
    #[error("No edge continues the path at {0:?}")]
    UnresolvableAdjacency(Coord),
    #[error(transparent)]
    LinearReference(#[from] LinearReferenceError),
}

impl ResolveError {
    /// Returns true if the error is caused by source data that disagrees with the network,
    /// as opposed to a route that is simply not covered by the network.
    pub const fn is_data_inconsistency(&self) -> bool {
        matches!(
            self,
            Self::AmbiguousEdgeSet(_) | Self::UnresolvableAdjacency(_)
        )
    }
}

#[derive(Error, Debug, PartialEq, Clone)]
pub enum ProfileError {
    #[error("Cannot project properties on an empty path")]
    EmptyPath,
    #[error("Profile properties list is empty")]
    EmptyPropertyList,
    #[error("Edge {0:?} does not belong to the network")]
    UnknownEdge(EdgeId),
    #[error(transparent)]
    LinearReference(#[from] LinearReferenceError),
}

/// Reason a matcher or router could not produce a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureReason {
    /// The capability explicitly reported that no result exists.
    NotFound,
    /// The geometry or the coordinates could not be snapped onto the network.
    OutsideNetwork,
    /// The per-call timeout elapsed before the capability answered.
    Timeout,
    /// The capability failed for a reason it didn't specify.
    Unavailable,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
#[error("No map matching found: {reason:?}")]
pub struct NoMatchFound {
    pub reason: FailureReason,
}

#[derive(Error, Debug, PartialEq, Clone, Copy)]
#[error("No route found: {reason:?}")]
pub struct NoRouteFound {
    pub reason: FailureReason,
}

impl NoMatchFound {
    pub const fn new(reason: FailureReason) -> Self {
        Self { reason }
    }
}

impl NoRouteFound {
    pub const fn new(reason: FailureReason) -> Self {
        Self { reason }
    }
}
