//! Relational facts between pairs of trackable values.
//!
//! Constraint domains describe one value at a time; the relation store keeps
//! the facts that only make sense between two values (`a == b`, `a < b`).
//! Inference over the store is deliberately shallow: `Equal` chains are
//! followed transitively, everything else is checked pairwise. Deep relational
//! reasoning belongs to a real SMT solver, which this engine is not.
//!
//! Symmetric relations (`Equal`, `NotEqual`) are normalized so the smaller
//! [`ValueId`] comes first; ordering relations are stored directed, with the
//! false branch of `a < b` recorded as `b <= a`.

use std::collections::BTreeSet;

use crate::{cfg::CompareOp, domain::Contradiction, value::ValueId};

/// The kinds of pairwise relation the store can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RelationKind {
    /// The two values are equal.
    Equal,
    /// The two values are not equal.
    NotEqual,
    /// The left value is strictly less than the right.
    LessThan,
    /// The left value is less than or equal to the right.
    LessOrEqual,
}

impl RelationKind {
    /// Maps a comparison operator onto a storable relation, flipping operands
    /// where needed. Returns the relation and whether the operands must be
    /// swapped (`a > b` is stored as `b < a`).
    #[must_use]
    pub const fn from_compare(op: CompareOp) -> (Self, bool) {
        match op {
            CompareOp::Eq => (Self::Equal, false),
            CompareOp::Ne => (Self::NotEqual, false),
            CompareOp::Lt => (Self::LessThan, false),
            CompareOp::Le => (Self::LessOrEqual, false),
            CompareOp::Gt => (Self::LessThan, true),
            CompareOp::Ge => (Self::LessOrEqual, true),
        }
    }

    /// Returns `true` if the relation is symmetric in its operands.
    #[must_use]
    pub const fn is_symmetric(self) -> bool {
        matches!(self, Self::Equal | Self::NotEqual)
    }
}

/// The set of pairwise relations holding on one path.
///
/// Backed by an ordered set so that two stores with the same facts compare and
/// hash identically, which the exploded-graph deduplication relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct RelationStore {
    facts: BTreeSet<(ValueId, RelationKind, ValueId)>,
}

impl RelationStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the store holds no facts.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    fn normalize(kind: RelationKind, a: ValueId, b: ValueId) -> (ValueId, RelationKind, ValueId) {
        if kind.is_symmetric() && b < a {
            (b, kind, a)
        } else {
            (a, kind, b)
        }
    }

    /// Returns `true` if the relation is known to hold, following `Equal`
    /// chains transitively and substituting equals into the other relations.
    #[must_use]
    pub fn holds(&self, a: ValueId, kind: RelationKind, b: ValueId) -> bool {
        match kind {
            RelationKind::Equal => a == b || self.equal_class(a).contains(&b),
            RelationKind::NotEqual | RelationKind::LessThan | RelationKind::LessOrEqual => {
                let lhs = self.equal_class(a);
                let rhs = self.equal_class(b);
                lhs.iter().any(|&x| {
                    rhs.iter()
                        .any(|&y| self.facts.contains(&Self::normalize(kind, x, y)))
                })
            }
        }
    }

    /// Returns every value transitively `Equal` to `v`, including `v` itself.
    #[must_use]
    pub fn equal_class(&self, v: ValueId) -> Vec<ValueId> {
        let mut class = vec![v];
        let mut frontier = vec![v];
        while let Some(current) = frontier.pop() {
            for &(x, kind, y) in &self.facts {
                if kind != RelationKind::Equal {
                    continue;
                }
                let next = if x == current {
                    y
                } else if y == current {
                    x
                } else {
                    continue;
                };
                if !class.contains(&next) {
                    class.push(next);
                    frontier.push(next);
                }
            }
        }
        class
    }

    /// Records a relation, checking it against the facts already held.
    ///
    /// # Errors
    ///
    /// Returns [`Contradiction`] when the new relation cannot hold together
    /// with an existing fact (`a == b` against `a != b`, `a < b` against
    /// `b <= a`, any irreflexive relation on a value and itself).
    pub fn learn(
        &mut self,
        a: ValueId,
        kind: RelationKind,
        b: ValueId,
    ) -> Result<(), Contradiction> {
        if a == b {
            return match kind {
                // Trivially true, nothing to record.
                RelationKind::Equal | RelationKind::LessOrEqual => Ok(()),
                RelationKind::NotEqual | RelationKind::LessThan => Err(Contradiction),
            };
        }
        if self.contradicts(a, kind, b) {
            return Err(Contradiction);
        }
        self.facts.insert(Self::normalize(kind, a, b));
        Ok(())
    }

    fn contradicts(&self, a: ValueId, kind: RelationKind, b: ValueId) -> bool {
        match kind {
            RelationKind::Equal => {
                self.holds(a, RelationKind::NotEqual, b)
                    || self.holds(a, RelationKind::LessThan, b)
                    || self.holds(b, RelationKind::LessThan, a)
            }
            RelationKind::NotEqual => self.holds(a, RelationKind::Equal, b),
            RelationKind::LessThan => {
                self.holds(a, RelationKind::Equal, b)
                    || self.holds(b, RelationKind::LessThan, a)
                    || self.holds(b, RelationKind::LessOrEqual, a)
            }
            RelationKind::LessOrEqual => self.holds(b, RelationKind::LessThan, a),
        }
    }

    /// Removes every relation mentioning `v`. Called when `v` is reassigned or
    /// invalidated; stale relations must not survive the value they describe.
    pub fn invalidate(&mut self, v: ValueId) {
        self.facts.retain(|&(a, _, b)| a != v && b != v);
    }

    /// Intersects two stores at a path merge: only facts holding on both paths
    /// survive.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            facts: self.facts.intersection(&other.facts).copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(n: u32) -> ValueId {
        ValueId::new(n)
    }

    #[test]
    fn test_symmetric_normalization() {
        let mut store = RelationStore::new();
        store.learn(v(2), RelationKind::Equal, v(1)).unwrap();
        assert!(store.holds(v(1), RelationKind::Equal, v(2)));
        assert!(store.holds(v(2), RelationKind::Equal, v(1)));
    }

    #[test]
    fn test_equal_chain_transitivity() {
        let mut store = RelationStore::new();
        store.learn(v(0), RelationKind::Equal, v(1)).unwrap();
        store.learn(v(1), RelationKind::Equal, v(2)).unwrap();
        assert!(store.holds(v(0), RelationKind::Equal, v(2)));

        // v0 != v2 now contradicts through the chain.
        assert_eq!(
            store.learn(v(0), RelationKind::NotEqual, v(2)),
            Err(Contradiction)
        );
    }

    #[test]
    fn test_ordering_contradictions() {
        let mut store = RelationStore::new();
        store.learn(v(0), RelationKind::LessThan, v(1)).unwrap();
        assert_eq!(
            store.learn(v(1), RelationKind::LessThan, v(0)),
            Err(Contradiction)
        );
        assert_eq!(
            store.learn(v(1), RelationKind::LessOrEqual, v(0)),
            Err(Contradiction)
        );
        assert_eq!(
            store.learn(v(0), RelationKind::Equal, v(1)),
            Err(Contradiction)
        );
        // NotEqual is compatible with strict ordering.
        store.learn(v(0), RelationKind::NotEqual, v(1)).unwrap();
    }

    #[test]
    fn test_irreflexive_on_self() {
        let mut store = RelationStore::new();
        store.learn(v(3), RelationKind::Equal, v(3)).unwrap();
        store.learn(v(3), RelationKind::LessOrEqual, v(3)).unwrap();
        assert!(store.is_empty());
        assert_eq!(
            store.learn(v(3), RelationKind::LessThan, v(3)),
            Err(Contradiction)
        );
        assert_eq!(
            store.learn(v(3), RelationKind::NotEqual, v(3)),
            Err(Contradiction)
        );
    }

    #[test]
    fn test_substitution_through_equals() {
        let mut store = RelationStore::new();
        store.learn(v(0), RelationKind::Equal, v(1)).unwrap();
        store.learn(v(1), RelationKind::LessThan, v(2)).unwrap();
        // v0 < v2 follows by substituting v0 for v1.
        assert!(store.holds(v(0), RelationKind::LessThan, v(2)));
    }

    #[test]
    fn test_invalidate_removes_mentions() {
        let mut store = RelationStore::new();
        store.learn(v(0), RelationKind::Equal, v(1)).unwrap();
        store.learn(v(1), RelationKind::LessThan, v(2)).unwrap();
        store.invalidate(v(1));
        assert!(!store.holds(v(0), RelationKind::Equal, v(1)));
        assert!(!store.holds(v(1), RelationKind::LessThan, v(2)));
    }

    #[test]
    fn test_join_keeps_common_facts() {
        let mut a = RelationStore::new();
        a.learn(v(0), RelationKind::Equal, v(1)).unwrap();
        a.learn(v(1), RelationKind::LessThan, v(2)).unwrap();
        let mut b = RelationStore::new();
        b.learn(v(0), RelationKind::Equal, v(1)).unwrap();

        let joined = a.join(&b);
        assert!(joined.holds(v(0), RelationKind::Equal, v(1)));
        assert!(!joined.holds(v(1), RelationKind::LessThan, v(2)));
    }

    #[test]
    fn test_from_compare_flips() {
        assert_eq!(
            RelationKind::from_compare(CompareOp::Gt),
            (RelationKind::LessThan, true)
        );
        assert_eq!(
            RelationKind::from_compare(CompareOp::Le),
            (RelationKind::LessOrEqual, false)
        );
    }
}
