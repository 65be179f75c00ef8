//! Constraint domains: the independent fact lattices of the engine.
//!
//! Each domain is a small lattice over the facts the engine can hold about one
//! value: nullability, boolean truth, numeric range, collection size, disposal
//! state, and lock state. Domains share a common operation vocabulary:
//!
//! - **negate** — the binary opposite used for branch splitting, where one
//!   exists (`Option`: ranges have none);
//! - **join** — the merge at path confluences; `None` means the merged value
//!   is unconstrained afterwards, the conservative default;
//! - **intersect** — adding a learned fact on one path; `None` is a
//!   [`Contradiction`], the signal that the path is infeasible and must be
//!   pruned.
//!
//! Domains compose: a value holds at most one constraint per domain at a time
//! ([`ConstraintSet`] enforces this structurally, one slot per domain), and a
//! single operation may update several domains at once (`x == null` updates
//! nullability for `x` *and* may record a relation between two values).

mod collection;
mod lock_state;
mod nullability;
mod object_state;
mod range;
mod truth;

pub use collection::CollectionSize;
pub use lock_state::LockState;
pub use nullability::Nullability;
pub use object_state::ObjectState;
pub use range::{NumericRange, OverflowClass};
pub use truth::Truth;

use strum::{Display, EnumIter};

/// Marks a path infeasible: two facts in the same domain cannot both hold.
///
/// This is not an error. Contradiction is the engine's pruning mechanism; the
/// worklist silently drops the state that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Contradiction;

/// Identifies a constraint domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum DomainKind {
    /// Null / not-null facts.
    Nullability,
    /// Boolean truth facts.
    Truth,
    /// Numeric interval facts.
    Range,
    /// Collection element-count facts.
    CollectionSize,
    /// Disposal facts.
    ObjectState,
    /// Lock-held facts.
    LockState,
}

/// A single constraint, tagged with the domain it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constraint {
    /// A nullability fact.
    Nullability(Nullability),
    /// A truth fact.
    Truth(Truth),
    /// A range fact.
    Range(NumericRange),
    /// A collection-size fact.
    Size(CollectionSize),
    /// A disposal fact.
    Object(ObjectState),
    /// A lock fact.
    Lock(LockState),
}

impl Constraint {
    /// Returns the domain this constraint belongs to.
    #[must_use]
    pub const fn domain(&self) -> DomainKind {
        match self {
            Self::Nullability(_) => DomainKind::Nullability,
            Self::Truth(_) => DomainKind::Truth,
            Self::Range(_) => DomainKind::Range,
            Self::Size(_) => DomainKind::CollectionSize,
            Self::Object(_) => DomainKind::ObjectState,
            Self::Lock(_) => DomainKind::LockState,
        }
    }

    /// Returns the binary opposite of this constraint, if the domain has one.
    ///
    /// Ranges have no opposite (the complement of an interval is not an
    /// interval); a released lock has no opposite either (no acquire site to
    /// attribute). `None` here means branch splitting learns nothing on the
    /// other side.
    #[must_use]
    pub fn negated(&self) -> Option<Self> {
        match self {
            Self::Nullability(n) => Some(Self::Nullability(n.negated())),
            Self::Truth(t) => Some(Self::Truth(t.negated())),
            Self::Range(_) => None,
            Self::Size(_) => None,
            Self::Object(o) => Some(Self::Object(o.negated())),
            Self::Lock(l) => l.negated().map(Self::Lock),
        }
    }
}

/// The constraints a single value holds, at most one per domain.
///
/// An empty set means "unconstrained/unknown" — program states do not store
/// empty sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ConstraintSet {
    /// Nullability slot.
    pub nullability: Option<Nullability>,
    /// Truth slot.
    pub truth: Option<Truth>,
    /// Range slot.
    pub range: Option<NumericRange>,
    /// Collection-size slot.
    pub size: Option<CollectionSize>,
    /// Disposal slot.
    pub object: Option<ObjectState>,
    /// Lock slot.
    pub lock: Option<LockState>,
}

impl ConstraintSet {
    /// Creates an empty (unconstrained) set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a set holding exactly one constraint.
    #[must_use]
    pub fn singleton(constraint: Constraint) -> Self {
        let mut set = Self::default();
        set.replace(constraint);
        set
    }

    /// Returns `true` if no domain holds a fact.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.nullability.is_none()
            && self.truth.is_none()
            && self.range.is_none()
            && self.size.is_none()
            && self.object.is_none()
            && self.lock.is_none()
    }

    /// Returns the constraint held in the given domain, if any.
    #[must_use]
    pub fn get(&self, domain: DomainKind) -> Option<Constraint> {
        match domain {
            DomainKind::Nullability => self.nullability.map(Constraint::Nullability),
            DomainKind::Truth => self.truth.map(Constraint::Truth),
            DomainKind::Range => self.range.map(Constraint::Range),
            DomainKind::CollectionSize => self.size.map(Constraint::Size),
            DomainKind::ObjectState => self.object.map(Constraint::Object),
            DomainKind::LockState => self.lock.map(Constraint::Lock),
        }
    }

    /// Overwrites the slot for the constraint's domain, discarding any prior
    /// fact. Used for assignments, which kill old facts rather than refine
    /// them.
    pub fn replace(&mut self, constraint: Constraint) {
        match constraint {
            Constraint::Nullability(c) => self.nullability = Some(c),
            Constraint::Truth(c) => self.truth = Some(c),
            Constraint::Range(c) => self.range = Some(c),
            Constraint::Size(c) => self.size = Some(c),
            Constraint::Object(c) => self.object = Some(c),
            Constraint::Lock(c) => self.lock = Some(c),
        }
    }

    /// Clears the slot for a domain.
    pub fn clear(&mut self, domain: DomainKind) {
        match domain {
            DomainKind::Nullability => self.nullability = None,
            DomainKind::Truth => self.truth = None,
            DomainKind::Range => self.range = None,
            DomainKind::CollectionSize => self.size = None,
            DomainKind::ObjectState => self.object = None,
            DomainKind::LockState => self.lock = None,
        }
    }

    /// Intersects a learned fact into this set.
    ///
    /// # Errors
    ///
    /// Returns [`Contradiction`] when the new fact cannot hold together with
    /// the fact already present in its domain; the caller prunes the path.
    pub fn learn(&mut self, constraint: Constraint) -> Result<(), Contradiction> {
        match constraint {
            Constraint::Nullability(new) => {
                self.nullability = Some(match self.nullability {
                    Some(old) => old.intersect(new).ok_or(Contradiction)?,
                    None => new,
                });
            }
            Constraint::Truth(new) => {
                self.truth = Some(match self.truth {
                    Some(old) => old.intersect(new).ok_or(Contradiction)?,
                    None => new,
                });
            }
            Constraint::Range(new) => {
                self.range = Some(match self.range {
                    Some(old) => old.intersect(&new).ok_or(Contradiction)?,
                    None => new,
                });
            }
            Constraint::Size(new) => {
                self.size = Some(match self.size {
                    Some(old) => old.intersect(&new).ok_or(Contradiction)?,
                    None => new,
                });
            }
            Constraint::Object(new) => {
                self.object = Some(match self.object {
                    Some(old) => old.intersect(new).ok_or(Contradiction)?,
                    None => new,
                });
            }
            Constraint::Lock(new) => {
                self.lock = Some(match self.lock {
                    Some(old) => old.intersect(new).ok_or(Contradiction)?,
                    None => new,
                });
            }
        }
        Ok(())
    }

    /// Joins two sets at a path merge, domain by domain.
    ///
    /// A domain constrained on only one side, or constrained differently on
    /// the two sides (for the binary domains), is unconstrained in the result.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            nullability: match (self.nullability, other.nullability) {
                (Some(a), Some(b)) => a.join(b),
                _ => None,
            },
            truth: match (self.truth, other.truth) {
                (Some(a), Some(b)) => a.join(b),
                _ => None,
            },
            range: match (self.range, other.range) {
                (Some(a), Some(b)) => Some(a.join(&b)),
                _ => None,
            },
            size: match (self.size, other.size) {
                (Some(a), Some(b)) => Some(a.join(&b)),
                _ => None,
            },
            object: match (self.object, other.object) {
                (Some(a), Some(b)) => a.join(b),
                _ => None,
            },
            lock: match (self.lock, other.lock) {
                (Some(a), Some(b)) => a.join(b),
                _ => None,
            },
        }
    }

    /// Iterates over the constraints held in this set.
    pub fn iter(&self) -> impl Iterator<Item = Constraint> + '_ {
        self.nullability
            .map(Constraint::Nullability)
            .into_iter()
            .chain(self.truth.map(Constraint::Truth))
            .chain(self.range.map(Constraint::Range))
            .chain(self.size.map(Constraint::Size))
            .chain(self.object.map(Constraint::Object))
            .chain(self.lock.map(Constraint::Lock))
    }
}
