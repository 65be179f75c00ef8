//! The object disposal constraint domain.
//!
//! Tracks whether a disposable object has been disposed on the current path.
//! Disposal is learned from calls the symbol oracle classifies as dispose
//! semantics (interface implementation of `IDisposable.Dispose`, `Close`,
//! `DisposeAsync`), never from method-name matching inside the engine.

/// A disposal fact about a single object on a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectState {
    /// The object has been disposed on this path.
    Disposed,
    /// The object is known not to have been disposed on this path
    /// (e.g. freshly constructed).
    NotDisposed,
}

impl ObjectState {
    /// Returns the opposite fact.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Disposed => Self::NotDisposed,
            Self::NotDisposed => Self::Disposed,
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_and_intersect() {
        assert_eq!(
            ObjectState::Disposed.join(ObjectState::Disposed),
            Some(ObjectState::Disposed)
        );
        assert_eq!(ObjectState::Disposed.join(ObjectState::NotDisposed), None);
        assert_eq!(
            ObjectState::NotDisposed.intersect(ObjectState::Disposed),
            None
        );
    }
}
