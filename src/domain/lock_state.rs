//! The lock-held constraint domain.
//!
//! Tracks whether a lock keyed by a specific lock-object *value identity* is
//! held on the current path. Acquire/release pairs (`Monitor.Enter/Exit`,
//! `lock` statements, `ReaderWriterLockSlim.Enter*/Exit*`, `SpinLock`) are
//! recognized through the symbol oracle's call-effect classification.
//!
//! `Held` carries the acquire site so the end-of-method check can point its
//! finding at the acquiring operation rather than at the method's last line.

use crate::cfg::SourceSpan;

/// A lock fact about a single lock object on a single path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LockState {
    /// The lock is held; acquired at `site`.
    Held {
        /// The source span of the acquiring operation.
        site: SourceSpan,
    },
    /// The lock is known released on this path.
    NotHeld,
}

impl LockState {
    /// Returns the opposite fact, if it exists.
    ///
    /// `Held` negates to `NotHeld`. `NotHeld` has no negation: there is no
    /// acquire site to attribute a hypothetical `Held` to, so branch splitting
    /// cannot invent one.
    #[must_use]
    pub const fn negated(self) -> Option<Self> {
        match self {
            Self::Held { .. } => Some(Self::NotHeld),
            Self::NotHeld => None,
        }
    }

    /// Joins two facts at a path merge; `None` means unconstrained afterwards.
    ///
    /// Two `Held` facts with different acquire sites join to the earlier site,
    /// so a lock acquired on both arms of a branch still reports one location.
    #[must_use]
    pub fn join(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::NotHeld, Self::NotHeld) => Some(Self::NotHeld),
            (Self::Held { site: a }, Self::Held { site: b }) => Some(Self::Held {
                site: if a <= b { a } else { b },
            }),
            _ => None,
        }
    }

    /// Intersects a new fact into an existing one; `None` marks the path
    /// infeasible.
    #[must_use]
    pub fn intersect(self, other: Self) -> Option<Self> {
        match (self, other) {
            (Self::NotHeld, Self::NotHeld) => Some(Self::NotHeld),
            // Same lock held twice: keep the original acquire site.
            (Self::Held { site }, Self::Held { .. }) => Some(Self::Held { site }),
            _ => None,
        }
    }

    /// Returns `true` if the lock is held.
    #[must_use]
    pub const fn is_held(&self) -> bool {
        matches!(self, Self::Held { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_keeps_earlier_site() {
        let a = LockState::Held {
            site: SourceSpan::new(10, 20),
        };
        let b = LockState::Held {
            site: SourceSpan::new(30, 40),
        };
        assert_eq!(a.join(b), Some(a));
        assert_eq!(b.join(a), Some(a));
        assert_eq!(a.join(LockState::NotHeld), None);
    }

    #[test]
    fn test_negation_is_partial() {
        let held = LockState::Held {
            site: SourceSpan::new(0, 5),
        };
        assert_eq!(held.negated(), Some(LockState::NotHeld));
        assert_eq!(LockState::NotHeld.negated(), None);
    }

    #[test]
    fn test_intersect() {
        let held = LockState::Held {
            site: SourceSpan::new(0, 5),
        };
        assert!(held.intersect(LockState::NotHeld).is_none());
        assert_eq!(
            LockState::NotHeld.intersect(LockState::NotHeld),
            Some(LockState::NotHeld)
        );
    }
}
