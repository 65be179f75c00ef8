//! The collection size constraint domain.
//!
//! Tracks what is known about a collection's element count: an inclusive lower
//! bound and, when available, an inclusive upper bound. Emptiness is learned
//! from the *shape* of the constructor call (default constructor, populated
//! initializer, or construction from an unknown enumerable), and any mutating
//! method call invalidates the fact entirely.

use crate::cfg::CtorShape;

/// A size fact about a collection on a single path.
///
/// `min == 0, max == Some(0)` means provably empty; `min >= 1` means provably
/// non-empty; a missing `max` leaves the count unbounded above.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CollectionSize {
    /// Inclusive lower bound on the element count.
    pub min: u32,
    /// Inclusive upper bound, if one is known.
    pub max: Option<u32>,
}

impl CollectionSize {
    /// A provably empty collection.
    #[must_use]
    pub const fn empty() -> Self {
        Self {
            min: 0,
            max: Some(0),
        }
    }

    /// A collection with an exactly known element count.
    #[must_use]
    pub const fn exact(count: u32) -> Self {
        Self {
            min: count,
            max: Some(count),
        }
    }

    /// A collection known to hold at least `count` elements.
    #[must_use]
    pub const fn at_least(count: u32) -> Self {
        Self {
            min: count,
            max: None,
        }
    }

    /// The size fact a constructor shape yields, if any.
    ///
    /// Construction from an unknown enumerable teaches nothing; plain object
    /// construction is not a collection at all.
    #[must_use]
    pub const fn from_ctor(shape: CtorShape) -> Option<Self> {
        match shape {
            CtorShape::EmptyCollection => Some(Self::empty()),
            CtorShape::PopulatedCollection { count } => Some(Self::exact(count)),
            CtorShape::UnknownCollection | CtorShape::Object => None,
        }
    }

    /// Returns `true` if the collection is provably empty.
    #[must_use]
    pub fn is_known_empty(&self) -> bool {
        self.max == Some(0)
    }

    /// Returns `true` if the collection is provably non-empty.
    #[must_use]
    pub const fn is_not_empty(&self) -> bool {
        self.min >= 1
    }

    /// Joins two facts at a path merge: bounds widen to cover both.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: match (self.max, other.max) {
                (Some(a), Some(b)) => Some(a.max(b)),
                _ => None,
            },
        }
    }

    /// Intersects two facts on the same path; `None` marks the path infeasible.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = match (self.max, other.max) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (Some(a), None) | (None, Some(a)) => Some(a),
            (None, None) => None,
        };
        match max {
            Some(m) if m < min => None,
            _ => Some(Self { min, max }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ctor_shapes() {
        assert_eq!(
            CollectionSize::from_ctor(CtorShape::EmptyCollection),
            Some(CollectionSize::empty())
        );
        assert_eq!(
            CollectionSize::from_ctor(CtorShape::PopulatedCollection { count: 3 }),
            Some(CollectionSize::exact(3))
        );
        assert_eq!(CollectionSize::from_ctor(CtorShape::UnknownCollection), None);
        assert_eq!(CollectionSize::from_ctor(CtorShape::Object), None);
    }

    #[test]
    fn test_emptiness_predicates() {
        assert!(CollectionSize::empty().is_known_empty());
        assert!(!CollectionSize::empty().is_not_empty());
        assert!(CollectionSize::exact(2).is_not_empty());
        assert!(CollectionSize::at_least(1).is_not_empty());
        assert!(!CollectionSize::at_least(0).is_not_empty());
    }

    #[test]
    fn test_join_widens() {
        let empty = CollectionSize::empty();
        let three = CollectionSize::exact(3);
        let joined = empty.join(&three);
        assert_eq!(joined, CollectionSize { min: 0, max: Some(3) });
        // Unknown upper bound wins.
        assert_eq!(three.join(&CollectionSize::at_least(1)).max, None);
        // Idempotent.
        assert_eq!(three.join(&three), three);
    }

    #[test]
    fn test_intersect_contradiction() {
        // Empty and at-least-one cannot both hold.
        assert_eq!(
            CollectionSize::empty().intersect(&CollectionSize::at_least(1)),
            None
        );
        assert_eq!(
            CollectionSize::exact(2).intersect(&CollectionSize::at_least(1)),
            Some(CollectionSize::exact(2))
        );
    }
}
