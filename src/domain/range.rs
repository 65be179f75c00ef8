//! The numeric range constraint domain.
//!
//! Tracks a closed interval `[min, max]` per integer-typed value, bounded by
//! the value's declared type. All interval arithmetic is carried out in `i128`,
//! which holds every representable value of every supported type with room for
//! the intermediate results of `+`, `-` and `*` between them.
//!
//! Every arithmetic transfer also classifies overflow: **guaranteed** when the
//! operand intervals put the entire result outside the type's bounds,
//! **possible** when only part of the result interval escapes. The two
//! severities feed two distinct findings downstream.
//!
//! Floating point is explicitly out of scope: ranges exist for [`IntType`]
//! values only, and no approximate float reasoning is attempted anywhere.

use crate::{cfg::CompareOp, value::IntType};

/// Whether an arithmetic operation overflows its result type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowClass {
    /// The operand ranges prove the result stays in bounds.
    Never,
    /// Part of the result interval escapes the type's bounds.
    Possible,
    /// The operand ranges prove every possible result is out of bounds.
    Guaranteed,
}

/// A closed integer interval `[min, max]` within the bounds of a declared type.
///
/// Invariant: `ty.min_value() <= min <= max <= ty.max_value()`. Constructors
/// clamp to the type bounds; an interval that would be empty after clamping or
/// intersection does not exist (the operations return `None` instead, marking
/// the path infeasible).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NumericRange {
    /// The declared integer type, fixing the representable bounds.
    pub ty: IntType,
    /// Inclusive lower bound.
    pub min: i128,
    /// Inclusive upper bound.
    pub max: i128,
}

impl NumericRange {
    /// Creates the full range of a type (no information beyond the type).
    #[must_use]
    pub const fn full(ty: IntType) -> Self {
        Self {
            ty,
            min: ty.min_value(),
            max: ty.max_value(),
        }
    }

    /// Creates an exact single-value range. Returns `None` if the value does
    /// not fit the type.
    #[must_use]
    pub fn exact(ty: IntType, value: i128) -> Option<Self> {
        ty.contains(value).then_some(Self {
            ty,
            min: value,
            max: value,
        })
    }

    /// Creates `[min, max]` clamped to the type's bounds. Returns `None` if
    /// the clamped interval is empty.
    #[must_use]
    pub fn bounded(ty: IntType, min: i128, max: i128) -> Option<Self> {
        let min = min.max(ty.min_value());
        let max = max.min(ty.max_value());
        (min <= max).then_some(Self { ty, min, max })
    }

    /// Returns the exact value if the interval is a single point.
    #[must_use]
    pub const fn as_exact(&self) -> Option<i128> {
        if self.min == self.max {
            Some(self.min)
        } else {
            None
        }
    }

    /// Returns `true` if the interval covers the whole type.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.min == self.ty.min_value() && self.max == self.ty.max_value()
    }

    /// Joins two intervals at a path merge: the convex hull.
    ///
    /// Unlike the binary domains, a range join always produces a range (the
    /// hull); precision, not existence, is what merging costs here.
    #[must_use]
    pub fn join(&self, other: &Self) -> Self {
        Self {
            ty: self.ty,
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    /// Intersects two intervals on the same path.
    ///
    /// Returns `None` when the intervals are disjoint, marking the path
    /// infeasible.
    #[must_use]
    pub fn intersect(&self, other: &Self) -> Option<Self> {
        let min = self.min.max(other.min);
        let max = self.max.min(other.max);
        (min <= max).then_some(Self {
            ty: self.ty,
            min,
            max,
        })
    }

    /// Narrows this interval by a comparison known to hold against `other`.
    ///
    /// This is the relational learn rule: after the true branch of
    /// `x < y`, `x`'s interval is capped below `y`'s maximum. Returns `None`
    /// when the comparison cannot hold anywhere in the interval (the branch is
    /// infeasible).
    #[must_use]
    pub fn narrowed(&self, op: CompareOp, other: &Self) -> Option<Self> {
        let (min, max) = match op {
            CompareOp::Eq => (self.min.max(other.min), self.max.min(other.max)),
            CompareOp::Ne => {
                // Only a point-vs-point disequality removes anything from a
                // closed interval; trimming interior holes is not expressible.
                if let (Some(a), Some(b)) = (self.as_exact(), other.as_exact()) {
                    if a == b {
                        return None;
                    }
                }
                if let Some(b) = other.as_exact() {
                    if self.min == b {
                        (self.min + 1, self.max)
                    } else if self.max == b {
                        (self.min, self.max - 1)
                    } else {
                        (self.min, self.max)
                    }
                } else {
                    (self.min, self.max)
                }
            }
            CompareOp::Lt => (self.min, self.max.min(other.max - 1)),
            CompareOp::Le => (self.min, self.max.min(other.max)),
            CompareOp::Gt => (self.min.max(other.min + 1), self.max),
            CompareOp::Ge => (self.min.max(other.min), self.max),
        };
        (min <= max).then_some(Self {
            ty: self.ty,
            min,
            max,
        })
    }

    /// Adds two intervals, classifying overflow against the result type.
    ///
    /// On any overflow the result range is the full type range: after a wrap
    /// the value can be anything representable, so no tighter fact survives.
    #[must_use]
    pub fn add(&self, other: &Self) -> (Self, OverflowClass) {
        self.classify(self.min + other.min, self.max + other.max)
    }

    /// Subtracts two intervals, classifying overflow against the result type.
    #[must_use]
    pub fn sub(&self, other: &Self) -> (Self, OverflowClass) {
        self.classify(self.min - other.max, self.max - other.min)
    }

    /// Multiplies two intervals, classifying overflow against the result type.
    #[must_use]
    pub fn mul(&self, other: &Self) -> (Self, OverflowClass) {
        let corners = [
            self.min * other.min,
            self.min * other.max,
            self.max * other.min,
            self.max * other.max,
        ];
        let raw_min = corners.iter().copied().min().unwrap_or(0);
        let raw_max = corners.iter().copied().max().unwrap_or(0);
        self.classify(raw_min, raw_max)
    }

    /// Classifies a raw result interval against the type bounds.
    fn classify(&self, raw_min: i128, raw_max: i128) -> (Self, OverflowClass) {
        let lo = self.ty.min_value();
        let hi = self.ty.max_value();

        if raw_min > hi || raw_max < lo {
            // Every possible result is out of bounds.
            (Self::full(self.ty), OverflowClass::Guaranteed)
        } else if raw_min < lo || raw_max > hi {
            (Self::full(self.ty), OverflowClass::Possible)
        } else {
            (
                Self {
                    ty: self.ty,
                    min: raw_min,
                    max: raw_max,
                },
                OverflowClass::Never,
            )
        }
    }
}
