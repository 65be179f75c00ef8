//! The nullability constraint domain.
//!
//! Tracks whether a reference (or nullable value type) is known to be null or
//! known to be non-null on the current path. Learned from comparisons against
//! the `null` literal, `is null` / `is not null` / `is T` patterns, `HasValue`,
//! null-coalescing lowerings, `string.IsNullOrEmpty`-style helpers, and
//! `[NotNullWhen]` postconditions supplied by the symbol oracle.

/// A nullability fact about a single value on a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nullability {
    /// The value is null on this path.
    Null,
    /// The value is not null on this path.
    NotNull,
}

impl Nullability {
    /// Returns the opposite fact. Nullability is a binary domain, so the
    /// opposite always exists; branch splitting uses it for the untaken side.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Null => Self::NotNull,
            Self::NotNull => Self::Null,
        }
    }

    /// Joins two facts at a path merge.
    ///
    /// Returns `None` when the facts disagree: after the merge the value is
    /// unconstrained, the conservative default.
    #[must_use]
    pub fn join(self, other: Self) -> Option<Self> {
        (self == other).then_some(self)
    }

    /// Intersects a new fact into an existing one on the same path.
    ///
    /// Returns `None` on contradiction, which marks the path infeasible.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        (self == other).then_some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negation_is_involutive() {
        assert_eq!(Nullability::Null.negated(), Nullability::NotNull);
        assert_eq!(Nullability::NotNull.negated().negated(), Nullability::NotNull);
    }

    #[test]
    fn test_join() {
        // Idempotent.
        assert_eq!(
            Nullability::Null.join(Nullability::Null),
            Some(Nullability::Null)
        );
        // Disagreement widens to unconstrained.
        assert_eq!(Nullability::Null.join(Nullability::NotNull), None);
        assert_eq!(Nullability::NotNull.join(Nullability::Null), None);
    }

    #[test]
    fn test_intersect_contradiction() {
        assert_eq!(
            Nullability::NotNull.intersect(Nullability::NotNull),
            Some(Nullability::NotNull)
        );
        // Null and NotNull on the same path: infeasible.
        assert_eq!(Nullability::Null.intersect(Nullability::NotNull), None);
    }
}
