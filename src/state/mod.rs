//! Program states: the immutable per-path fact snapshots of the engine.
//!
//! A [`ProgramState`] is everything the engine knows on one execution path at
//! one program point: a constraint set per tracked value, the pairwise
//! [`relations`] between values, and the pending flow captures. States are
//! snapshots in the copy-on-transition sense: the engine clones the incoming
//! state, applies one operation's transfer, and enqueues the result, so two
//! paths never observe each other's writes.
//!
//! All three components are ordered collections, giving states the structural
//! equality and hashing the exploded-graph deduplication is built on.
//!
//! Equality between two tracked values mirrors their constraints *at the
//! moment the equality is learned*. Facts learned about either value
//! afterwards do not flow to the other. This directionality is a deliberate
//! precision/cost trade-off and is relied upon by the engine's tests; do not
//! "fix" it by re-mirroring on every learn.

mod relations;

pub use relations::{RelationKind, RelationStore};

use std::collections::BTreeMap;

use crate::{
    cfg::Operand,
    domain::{
        CollectionSize, Constraint, ConstraintSet, Contradiction, DomainKind, LockState,
        Nullability, NumericRange, ObjectState, Truth,
    },
    value::{CaptureId, IntType, ValueId, ValueTable},
};

/// The abstract state of one execution path at one program point.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ProgramState {
    constraints: BTreeMap<ValueId, ConstraintSet>,
    relations: RelationStore,
    captures: BTreeMap<CaptureId, Operand>,
}

impl ProgramState {
    /// Creates the unconstrained initial state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the constraint set of a value, if it holds any facts.
    #[must_use]
    pub fn get(&self, v: ValueId) -> Option<&ConstraintSet> {
        self.constraints.get(&v)
    }

    /// Returns the constraint a value holds in one domain, if any.
    #[must_use]
    pub fn constraint(&self, v: ValueId, domain: DomainKind) -> Option<Constraint> {
        self.constraints.get(&v).and_then(|set| set.get(domain))
    }

    /// Returns the nullability fact for a value, if any.
    #[must_use]
    pub fn nullability(&self, v: ValueId) -> Option<Nullability> {
        self.constraints.get(&v).and_then(|s| s.nullability)
    }

    /// Returns the truth fact for a value, if any.
    #[must_use]
    pub fn truth(&self, v: ValueId) -> Option<Truth> {
        self.constraints.get(&v).and_then(|s| s.truth)
    }

    /// Returns the range fact for a value, if any.
    #[must_use]
    pub fn range(&self, v: ValueId) -> Option<NumericRange> {
        self.constraints.get(&v).and_then(|s| s.range)
    }

    /// Returns the collection-size fact for a value, if any.
    #[must_use]
    pub fn size(&self, v: ValueId) -> Option<CollectionSize> {
        self.constraints.get(&v).and_then(|s| s.size)
    }

    /// Returns the disposal fact for a value, if any.
    #[must_use]
    pub fn object_state(&self, v: ValueId) -> Option<ObjectState> {
        self.constraints.get(&v).and_then(|s| s.object)
    }

    /// Returns the lock fact for a value, if any.
    #[must_use]
    pub fn lock_state(&self, v: ValueId) -> Option<LockState> {
        self.constraints.get(&v).and_then(|s| s.lock)
    }

    /// Returns the interval an operand is known to lie in, in an arithmetic
    /// context of type `ty`. An operand nothing is known about gets the full
    /// range of the type.
    #[must_use]
    pub fn operand_range(&self, operand: Operand, ty: IntType) -> NumericRange {
        match operand {
            Operand::Value(v) => self.range(v).unwrap_or_else(|| NumericRange::full(ty)),
            Operand::Int { value, .. } => {
                NumericRange::exact(ty, value).unwrap_or_else(|| NumericRange::full(ty))
            }
            _ => NumericRange::full(ty),
        }
    }

    /// Returns the truth an operand is known to have, if any.
    #[must_use]
    pub fn operand_truth(&self, operand: Operand) -> Option<Truth> {
        match operand {
            Operand::Value(v) => self.truth(v),
            Operand::Bool(b) => Some(Truth::from_bool(b)),
            _ => None,
        }
    }

    /// Returns the nullability an operand is known to have, if any.
    #[must_use]
    pub fn operand_nullability(&self, operand: Operand) -> Option<Nullability> {
        match operand {
            Operand::Value(v) => self.nullability(v),
            Operand::Null => Some(Nullability::Null),
            // Non-null literals cannot be null references.
            Operand::Bool(_) | Operand::Int { .. } => Some(Nullability::NotNull),
            _ => None,
        }
    }

    /// Returns the relational facts holding in this state.
    #[must_use]
    pub fn relations(&self) -> &RelationStore {
        &self.relations
    }

    /// Iterates over the values that hold at least one constraint.
    pub fn tracked_values(&self) -> impl Iterator<Item = (ValueId, &ConstraintSet)> {
        self.constraints.iter().map(|(&v, set)| (v, set))
    }

    /// Intersects a learned fact into a value's constraint set.
    ///
    /// # Errors
    ///
    /// Returns [`Contradiction`] when the fact cannot hold in this state; the
    /// engine prunes the path.
    pub fn learn(&mut self, v: ValueId, constraint: Constraint) -> Result<(), Contradiction> {
        self.constraints.entry(v).or_default().learn(constraint)
    }

    /// Overwrites a value's fact in one domain, discarding what was there.
    ///
    /// This is the assignment semantics: a write kills the old fact rather
    /// than refining it.
    pub fn replace(&mut self, v: ValueId, constraint: Constraint) {
        self.constraints.entry(v).or_default().replace(constraint);
    }

    /// Reassigns a value: drops all its facts and relations, then installs the
    /// given constraint set (if it holds anything).
    pub fn assign(&mut self, v: ValueId, set: ConstraintSet) {
        self.invalidate(v);
        if !set.is_empty() {
            self.constraints.insert(v, set);
        }
    }

    /// Records a pairwise relation, mirroring constraints on `Equal`.
    ///
    /// Mirroring happens here and only here: each side learns the other's
    /// current facts, so `a == b` makes the two constraint sets agree at this
    /// point. Later learns on either value stay one-sided.
    ///
    /// # Errors
    ///
    /// Returns [`Contradiction`] when the relation or the mirrored facts
    /// cannot hold.
    pub fn learn_relation(
        &mut self,
        a: ValueId,
        kind: RelationKind,
        b: ValueId,
    ) -> Result<(), Contradiction> {
        self.relations.learn(a, kind, b)?;
        if kind == RelationKind::Equal && a != b {
            let from_a: Vec<Constraint> = self.get(a).map(|s| s.iter().collect()).unwrap_or_default();
            let from_b: Vec<Constraint> = self.get(b).map(|s| s.iter().collect()).unwrap_or_default();
            for c in from_a {
                self.learn(b, c)?;
            }
            for c in from_b {
                self.learn(a, c)?;
            }
        }
        Ok(())
    }

    /// Drops every fact and relation about a value.
    pub fn invalidate(&mut self, v: ValueId) {
        self.constraints.remove(&v);
        self.relations.invalidate(v);
    }

    /// Drops one domain's fact for a value, keeping the others.
    pub fn forget(&mut self, v: ValueId, domain: DomainKind) {
        if let Some(set) = self.constraints.get_mut(&v) {
            set.clear(domain);
            if set.is_empty() {
                self.constraints.remove(&v);
            }
        }
    }

    /// Drops facts about every heap-reachable value.
    ///
    /// This is the opaque-call transfer: an unknown callee may mutate any
    /// field, static or array element (directly or from another thread), so
    /// their facts do not survive the call. Locals and parameters do.
    pub fn invalidate_heap(&mut self, values: &ValueTable) {
        let heap: Vec<ValueId> = self
            .constraints
            .keys()
            .copied()
            .filter(|&v| values.is_heap(v))
            .collect();
        for v in heap {
            self.invalidate(v);
        }
    }

    /// Stores an operand into a flow capture slot.
    pub fn write_capture(&mut self, capture: CaptureId, source: Operand) {
        self.captures.insert(capture, source);
    }

    /// Empties a flow capture slot, returning what it held.
    ///
    /// An unwritten capture reads as [`Operand::Unknown`]; this happens when
    /// the writing block was pruned as infeasible on this path.
    pub fn consume_capture(&mut self, capture: CaptureId) -> Operand {
        self.captures.remove(&capture).unwrap_or(Operand::Unknown)
    }

    /// Joins two states at a path merge.
    ///
    /// Per-value, domain-wise: a value keeps a fact only when both sides hold
    /// a joinable fact for it. Relations keep the intersection. A capture slot
    /// survives only when both sides wrote the same operand.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        let mut constraints = BTreeMap::new();
        for (&v, set) in &self.constraints {
            if let Some(other_set) = other.constraints.get(&v) {
                let joined = set.join(other_set);
                if !joined.is_empty() {
                    constraints.insert(v, joined);
                }
            }
        }

        let captures = self
            .captures
            .iter()
            .filter(|(c, op)| other.captures.get(c) == Some(op))
            .map(|(&c, &op)| (c, op))
            .collect();

        Self {
            constraints,
            relations: self.relations.join(&other.relations),
            captures,
        }
    }
}
