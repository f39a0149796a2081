use approx::abs_diff_eq;

use crate::{Direction, EdgeId, LinearReferenceError};

/// Normalized interval `[from, to]` along the geometry of a single edge, oriented in the edge's
/// native direction (German: linear referenzierter Abschnitt).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearReference {
    from: f64,
    to: f64,
}

impl LinearReference {
    /// References the whole edge.
    pub const FULL: Self = Self { from: 0.0, to: 1.0 };

    /// Fractions closer than this are considered equal.
    pub const EPSILON: f64 = 1e-9;

    /// Creates a valid linear reference: `0 <= from < to <= 1`.
    /// Bounds that exceed [0, 1] by less than [`Self::EPSILON`] are clamped.
    pub fn new(from: f64, to: f64) -> Result<Self, LinearReferenceError> {
        if from.is_nan() || to.is_nan() {
            return Err(LinearReferenceError::Malformed(from, to));
        }

        let from = clamp_unit(from).ok_or(LinearReferenceError::Malformed(from, to))?;
        let to = clamp_unit(to).ok_or(LinearReferenceError::Malformed(from, to))?;

        if from > to + Self::EPSILON {
            return Err(LinearReferenceError::Malformed(from, to));
        } else if abs_diff_eq!(from, to, epsilon = Self::EPSILON) {
            return Err(LinearReferenceError::Degenerate(from));
        }

        Ok(Self { from, to })
    }

    pub const fn from(&self) -> f64 {
        self.from
    }

    pub const fn to(&self) -> f64 {
        self.to
    }

    /// Fraction of the edge covered by the reference.
    pub fn fraction(&self) -> f64 {
        self.to - self.from
    }

    pub fn is_full(&self) -> bool {
        abs_diff_eq!(self.from, 0.0, epsilon = Self::EPSILON)
            && abs_diff_eq!(self.to, 1.0, epsilon = Self::EPSILON)
    }

    /// Returns the overlapping part of both references, None if they don't overlap or only touch.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        Self::new(self.from.max(other.from), self.to.min(other.to)).ok()
    }

    /// Re-expresses a position given relative to this reference into the edge parameterization.
    pub fn denormalize(&self, position: f64) -> f64 {
        self.from + position * self.fraction()
    }

    /// Re-expresses a position of the edge relative to this reference (inverse of denormalize).
    pub fn normalize(&self, position: f64) -> f64 {
        ((position - self.from) / self.fraction()).clamp(0.0, 1.0)
    }
}

fn clamp_unit(value: f64) -> Option<f64> {
    if (-LinearReference::EPSILON..=1.0 + LinearReference::EPSILON).contains(&value) {
        Some(value.clamp(0.0, 1.0))
    } else {
        None
    }
}

/// Binds a route to a fraction of an edge (German: abschnittsweiser Kantenbezug).
/// The reference is always expressed in the edge native direction, the direction tells
/// whether the route traverses the edge along or against it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EdgeBinding {
    pub edge: EdgeId,
    pub reference: LinearReference,
    pub direction: Direction,
}

impl EdgeBinding {
    pub const fn new(edge: EdgeId, reference: LinearReference, direction: Direction) -> Self {
        Self {
            edge,
            reference,
            direction,
        }
    }

    /// Binds the route to the whole edge.
    pub const fn full(edge: EdgeId, direction: Direction) -> Self {
        Self::new(edge, LinearReference::FULL, direction)
    }

    /// Position on the edge (native parameterization) where the route enters the binding.
    pub fn entry(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.reference.from(),
            Direction::Backward => self.reference.to(),
        }
    }

    /// Position on the edge (native parameterization) where the route leaves the binding.
    pub fn exit(&self) -> f64 {
        match self.direction {
            Direction::Forward => self.reference.to(),
            Direction::Backward => self.reference.from(),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn linear_reference_bounds() {
        let reference = LinearReference::new(0.25, 0.75).unwrap();
        assert_eq!(reference.from(), 0.25);
        assert_eq!(reference.to(), 0.75);
        assert_eq!(reference.fraction(), 0.5);
        assert!(!reference.is_full());
        assert!(LinearReference::new(0.0, 1.0).unwrap().is_full());

        assert_eq!(
            LinearReference::new(0.8, 0.2),
            Err(LinearReferenceError::Malformed(0.8, 0.2))
        );
        assert_eq!(
            LinearReference::new(0.5, 0.5),
            Err(LinearReferenceError::Degenerate(0.5))
        );
        assert!(LinearReference::new(-0.5, 0.5).is_err());
        assert!(LinearReference::new(0.5, 1.5).is_err());
        assert!(LinearReference::new(f64::NAN, 0.5).is_err());
    }

    #[test]
    fn linear_reference_clamps_rounding_errors() {
        let reference = LinearReference::new(-1e-12, 1.0 + 1e-12).unwrap();
        assert_eq!(reference, LinearReference::FULL);
    }

    #[test]
    fn linear_reference_intersection() {
        let a = LinearReference::new(0.0, 0.6).unwrap();
        let b = LinearReference::new(0.4, 1.0).unwrap();
        let c = LinearReference::new(0.6, 1.0).unwrap();

        assert_eq!(a.intersection(&b), LinearReference::new(0.4, 0.6).ok());
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn linear_reference_normalization() {
        let reference = LinearReference::new(0.2, 0.6).unwrap();
        assert!((reference.denormalize(0.5) - 0.4).abs() < 1e-12);
        assert!((reference.normalize(0.4) - 0.5).abs() < 1e-12);
        assert_eq!(reference.normalize(0.9), 1.0);
    }

    #[test]
    fn edge_binding_entry_and_exit() {
        let reference = LinearReference::new(0.2, 0.6).unwrap();

        let forward = EdgeBinding::new(EdgeId(1), reference, Direction::Forward);
        assert_eq!((forward.entry(), forward.exit()), (0.2, 0.6));

        let backward = EdgeBinding::new(EdgeId(1), reference, Direction::Backward);
        assert_eq!((backward.entry(), backward.exit()), (0.6, 0.2));
    }
}
