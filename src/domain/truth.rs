//! The boolean truth constraint domain.
//!
//! Tracks the known truth of boolean-valued trackables: literal assignments,
//! materialized comparisons, and propagation through `!`, `&`, `|` and `^`.
//! Truth learned from equality between two boolean trackables flows through the
//! relation store, not through this domain directly.

/// A truth fact about a boolean value on a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Truth {
    /// The value is `true` on this path.
    True,
    /// The value is `false` on this path.
    False,
}

impl Truth {
    /// Converts from a literal.
    #[must_use]
    pub const fn from_bool(b: bool) -> Self {
        if b {
            Self::True
        } else {
            Self::False
        }
    }

    /// Converts to a plain `bool`.
    #[must_use]
    pub const fn as_bool(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns the opposite fact (`!`).
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::True => Self::False,
            Self::False => Self::True,
        }
    }

    /// Joins two facts at a path merge; `None` means unconstrained afterwards.
    #[must_use]
    pub fn join(self, other: Self) -> Option<Self> {
        (self == other).then_some(self)
    }

    /// Intersects a new fact into an existing one; `None` marks the path
    /// infeasible.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        (self == other).then_some(self)
    }

    /// Truth of `self & other` when both operands are known.
    #[must_use]
    pub const fn and(self, other: Self) -> Self {
        Self::from_bool(self.as_bool() & other.as_bool())
    }

    /// Truth of `self | other` when both operands are known.
    #[must_use]
    pub const fn or(self, other: Self) -> Self {
        Self::from_bool(self.as_bool() | other.as_bool())
    }

    /// Truth of `self ^ other` when both operands are known.
    #[must_use]
    pub const fn xor(self, other: Self) -> Self {
        Self::from_bool(self.as_bool() ^ other.as_bool())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        assert_eq!(Truth::from_bool(true), Truth::True);
        assert!(Truth::True.as_bool());
        assert!(!Truth::False.as_bool());
    }

    #[test]
    fn test_join_and_intersect() {
        assert_eq!(Truth::True.join(Truth::True), Some(Truth::True));
        assert_eq!(Truth::True.join(Truth::False), None);
        assert_eq!(Truth::False.intersect(Truth::False), Some(Truth::False));
        assert_eq!(Truth::False.intersect(Truth::True), None);
    }

    #[test]
    fn test_operator_propagation() {
        assert_eq!(Truth::True.and(Truth::False), Truth::False);
        assert_eq!(Truth::True.or(Truth::False), Truth::True);
        assert_eq!(Truth::True.xor(Truth::True), Truth::False);
        assert_eq!(Truth::True.negated(), Truth::False);
    }
}
