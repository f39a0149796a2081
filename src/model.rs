use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

use approx::abs_diff_eq;
use strum::{Display, EnumIter, EnumString};

/// Uniquely identify an edge (Kante) of the reference network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub u64);

/// Uniquely identify a node (Knoten) of the reference network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

/// Identifier of the way in the external data source the network edges were derived from.
/// Several edges can share the same source way after the network was split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceWayId(pub i64);

/// Planar distance in meters.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
pub struct Length(f64);

impl Length {
    pub const ZERO: Self = Self(0.0);
    pub const MAX: Self = Self(f64::MAX);

    pub const fn from_meters(meters: f64) -> Self {
        Self(meters)
    }

    pub const fn meters(&self) -> f64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        abs_diff_eq!(self.0, 0.0, epsilon = Self::EPSILON)
    }

    /// Lengths closer than this are considered equal.
    const EPSILON: f64 = 1e-9;
}

impl Add for Length {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl AddAssign for Length {
    fn add_assign(&mut self, rhs: Self) {
        self.0 += rhs.0;
    }
}

impl Sub for Length {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl SubAssign for Length {
    fn sub_assign(&mut self, rhs: Self) {
        self.0 -= rhs.0;
    }
}

impl Mul<f64> for Length {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Sum for Length {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, |acc, length| acc + length)
    }
}

/// Traversal direction of an edge relative to its native geometry direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Direction {
    /// From the first to the last coordinate of the edge geometry (node A to node B).
    #[default]
    Forward,
    /// From the last to the first coordinate of the edge geometry (node B to node A).
    Backward,
}

impl Direction {
    pub const fn reverse(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }

    pub const fn is_forward(&self) -> bool {
        matches!(self, Self::Forward)
    }
}

/// Transport mode the map matcher and the router evaluate the network with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum TransportProfile {
    #[default]
    Bike,
    Foot,
    Car,
}

/// Surface (Belagart) of a way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum Surface {
    Asphalt,
    ConcretePlates,
    Paving,
    Cobblestone,
    WaterBoundGravel,
    Unpaved,
    #[default]
    Unknown,
}

/// Way type (Radverkehrsführung) describing how cyclists are routed along a way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum WayType {
    Cycleway,
    SharedFootAndCyclePath,
    CycleLane,
    ResidentialStreet,
    Road,
    Track,
    #[default]
    Unknown,
}

impl WayType {
    /// Weight applied to the length of a way when routing does not prefer the shortest path.
    pub const fn comfort_factor(&self) -> f64 {
        match self {
            Self::Cycleway => 1.0,
            Self::SharedFootAndCyclePath => 1.1,
            Self::CycleLane => 1.15,
            Self::ResidentialStreet => 1.2,
            Self::Track => 1.4,
            Self::Road => 1.6,
            Self::Unknown => 1.3,
        }
    }
}

/// Properties projected onto a route profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ProfileProperties {
    pub surface: Surface,
    pub way_type: WayType,
}

impl ProfileProperties {
    /// Sentinel used for the parts of a route no property data is known for.
    pub const UNKNOWN: Self = Self {
        surface: Surface::Unknown,
        way_type: WayType::Unknown,
    };

    pub const fn is_unknown(&self) -> bool {
        matches!(self.surface, Surface::Unknown) && matches!(self.way_type, WayType::Unknown)
    }
}
