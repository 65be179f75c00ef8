//! Branch splitting: turning a guard into constrained successor states.
//!
//! Given the state at a conditional branch, [`split`] produces the state for
//! the true successor and, independently, the state for the false successor.
//! Each side *assumes* the guard with the corresponding polarity: the guard's
//! learn rules intersect new facts into a clone of the incoming state, and a
//! [`Contradiction`] anywhere makes that side infeasible (`None`), pruning
//! the path.

use crate::{
    cfg::{CompareOp, Guard, Operand},
    domain::{Constraint, Contradiction, Nullability, NumericRange, Truth},
    state::{ProgramState, RelationKind},
    value::ValueId,
};

/// Splits a state on a guard into (true-successor, false-successor) states.
pub(crate) fn split(
    state: &ProgramState,
    guard: &Guard,
) -> (Option<ProgramState>, Option<ProgramState>) {
    (assume(state, guard, true), assume(state, guard, false))
}

/// Returns the state with the guard assumed to evaluate to `polarity`, or
/// `None` when the assumption contradicts the state.
pub(crate) fn assume(state: &ProgramState, guard: &Guard, polarity: bool) -> Option<ProgramState> {
    let mut next = state.clone();
    match apply(&mut next, guard, polarity) {
        Ok(()) => Some(next),
        Err(Contradiction) => None,
    }
}

fn apply(state: &mut ProgramState, guard: &Guard, polarity: bool) -> Result<(), Contradiction> {
    // Unwrap negation chains iteratively, flipping the polarity each level.
    let mut guard = guard;
    let mut polarity = polarity;
    while let Guard::Not(inner) = guard {
        guard = inner;
        polarity = !polarity;
    }

    match *guard {
        Guard::Truth(v) => state.learn(v, Constraint::Truth(Truth::from_bool(polarity))),
        Guard::Literal(b) => {
            if b == polarity {
                Ok(())
            } else {
                Err(Contradiction)
            }
        }
        // The true side of `x is T` implies a non-null `x`; the false side
        // teaches nothing (null and wrong-typed values both fail the test).
        Guard::IsType(v) => {
            if polarity {
                state.learn(v, Constraint::Nullability(Nullability::NotNull))
            } else {
                Ok(())
            }
        }
        Guard::HasValue(v) => {
            let fact = if polarity {
                Nullability::NotNull
            } else {
                Nullability::Null
            };
            state.learn(v, Constraint::Nullability(fact))
        }
        // The false side of IsNullOrEmpty proves non-null; the true side is
        // satisfied by either null or "", so it proves nothing.
        Guard::NullOrEmpty(v) => {
            if polarity {
                Ok(())
            } else {
                state.learn(v, Constraint::Nullability(Nullability::NotNull))
            }
        }
        Guard::NotNullWhen { arg, when } => {
            if polarity == when {
                state.learn(arg, Constraint::Nullability(Nullability::NotNull))
            } else {
                Ok(())
            }
        }
        Guard::Compare { op, lhs, rhs } => {
            let op = if polarity { op } else { op.negated() };
            apply_compare(state, op, lhs, rhs)
        }
        Guard::Not(_) => unreachable!("negations unwrapped above"),
    }
}

fn apply_compare(
    state: &mut ProgramState,
    op: CompareOp,
    lhs: Operand,
    rhs: Operand,
) -> Result<(), Contradiction> {
    match (lhs, rhs) {
        (Operand::Value(a), Operand::Value(b)) => {
            let (kind, swap) = RelationKind::from_compare(op);
            if swap {
                state.learn_relation(b, kind, a)?;
            } else {
                state.learn_relation(a, kind, b)?;
            }
            learn_value_vs_value(state, op, a, b)
        }
        (Operand::Value(v), other) => learn_value_vs_literal(state, op, v, other),
        (other, Operand::Value(v)) => learn_value_vs_literal(state, op.flipped(), v, other),
        // Two literals: decide statically; an impossible comparison prunes.
        (a, b) => match decide_literals(op, a, b) {
            Some(false) => Err(Contradiction),
            _ => Ok(()),
        },
    }
}

/// Learn rules for a comparison between two tracked values. The relation
/// itself is already recorded; this propagates the domain facts it implies.
fn learn_value_vs_value(
    state: &mut ProgramState,
    op: CompareOp,
    a: ValueId,
    b: ValueId,
) -> Result<(), Contradiction> {
    // Equality transports known facts across; `!=` against a known-null value
    // proves the other side non-null.
    if op == CompareOp::Eq {
        if let Some(n) = state.nullability(a) {
            state.learn(b, Constraint::Nullability(n))?;
        }
        if let Some(n) = state.nullability(b) {
            state.learn(a, Constraint::Nullability(n))?;
        }
        if let Some(t) = state.truth(a) {
            state.learn(b, Constraint::Truth(t))?;
        }
        if let Some(t) = state.truth(b) {
            state.learn(a, Constraint::Truth(t))?;
        }
    }
    if op == CompareOp::Ne {
        if state.nullability(a) == Some(Nullability::Null) {
            state.learn(b, Constraint::Nullability(Nullability::NotNull))?;
        }
        if state.nullability(b) == Some(Nullability::Null) {
            state.learn(a, Constraint::Nullability(Nullability::NotNull))?;
        }
    }

    // Relational narrowing when both sides carry intervals.
    if let (Some(ra), Some(rb)) = (state.range(a), state.range(b)) {
        let na = ra.narrowed(op, &rb).ok_or(Contradiction)?;
        let nb = rb.narrowed(op.flipped(), &ra).ok_or(Contradiction)?;
        state.learn(a, Constraint::Range(na))?;
        state.learn(b, Constraint::Range(nb))?;
    }
    Ok(())
}

fn learn_value_vs_literal(
    state: &mut ProgramState,
    op: CompareOp,
    v: ValueId,
    literal: Operand,
) -> Result<(), Contradiction> {
    match literal {
        Operand::Null => match op {
            CompareOp::Eq => state.learn(v, Constraint::Nullability(Nullability::Null)),
            CompareOp::Ne => state.learn(v, Constraint::Nullability(Nullability::NotNull)),
            _ => Ok(()),
        },
        Operand::Bool(b) => match op {
            CompareOp::Eq => state.learn(v, Constraint::Truth(Truth::from_bool(b))),
            CompareOp::Ne => state.learn(v, Constraint::Truth(Truth::from_bool(!b))),
            _ => Ok(()),
        },
        Operand::Int { value, ty } => {
            let literal_range = NumericRange::exact(ty, value).ok_or(Contradiction)?;
            let current = state.range(v).unwrap_or_else(|| NumericRange::full(ty));
            let narrowed = current.narrowed(op, &literal_range).ok_or(Contradiction)?;
            state.learn(v, Constraint::Range(narrowed))
        }
        // Comparisons against untracked expressions teach nothing.
        Operand::Value(_) | Operand::Capture(_) | Operand::Unknown => Ok(()),
    }
}

fn decide_literals(op: CompareOp, lhs: Operand, rhs: Operand) -> Option<bool> {
    match (lhs, rhs) {
        (Operand::Int { value: a, .. }, Operand::Int { value: b, .. }) => Some(match op {
            CompareOp::Eq => a == b,
            CompareOp::Ne => a != b,
            CompareOp::Lt => a < b,
            CompareOp::Le => a <= b,
            CompareOp::Gt => a > b,
            CompareOp::Ge => a >= b,
        }),
        (Operand::Bool(a), Operand::Bool(b)) => match op {
            CompareOp::Eq => Some(a == b),
            CompareOp::Ne => Some(a != b),
            _ => None,
        },
        (Operand::Null, Operand::Null) => match op {
            CompareOp::Eq => Some(true),
            CompareOp::Ne => Some(false),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::IntType;

    fn v(n: u32) -> ValueId {
        ValueId::new(n)
    }

    #[test]
    fn test_truth_guard_splits_both_sides() {
        let state = ProgramState::new();
        let guard = Guard::Truth(v(0));
        let (t, f) = split(&state, &guard);
        assert_eq!(t.unwrap().truth(v(0)), Some(Truth::True));
        assert_eq!(f.unwrap().truth(v(0)), Some(Truth::False));
    }

    #[test]
    fn test_known_truth_prunes_one_side() {
        let mut state = ProgramState::new();
        state.learn(v(0), Constraint::Truth(Truth::True)).unwrap();
        let (t, f) = split(&state, &Guard::Truth(v(0)));
        assert!(t.is_some());
        assert!(f.is_none());
    }

    #[test]
    fn test_null_comparison_learns_nullability() {
        let state = ProgramState::new();
        let guard = Guard::Compare {
            op: CompareOp::Eq,
            lhs: Operand::Value(v(0)),
            rhs: Operand::Null,
        };
        let (t, f) = split(&state, &guard);
        assert_eq!(t.unwrap().nullability(v(0)), Some(Nullability::Null));
        assert_eq!(f.unwrap().nullability(v(0)), Some(Nullability::NotNull));
    }

    #[test]
    fn test_not_guard_flips_polarity() {
        let state = ProgramState::new();
        let guard = Guard::Not(Box::new(Guard::Compare {
            op: CompareOp::Eq,
            lhs: Operand::Value(v(0)),
            rhs: Operand::Null,
        }));
        let (t, _) = split(&state, &guard);
        assert_eq!(t.unwrap().nullability(v(0)), Some(Nullability::NotNull));
    }

    #[test]
    fn test_int_comparison_narrows_range() {
        let state = ProgramState::new();
        let guard = Guard::Compare {
            op: CompareOp::Lt,
            lhs: Operand::Value(v(0)),
            rhs: Operand::Int {
                value: 10,
                ty: IntType::I32,
            },
        };
        let (t, f) = split(&state, &guard);
        assert_eq!(t.unwrap().range(v(0)).unwrap().max, 9);
        assert_eq!(f.unwrap().range(v(0)).unwrap().min, 10);
    }

    #[test]
    fn test_contradictory_range_prunes() {
        let mut state = ProgramState::new();
        state
            .learn(
                v(0),
                Constraint::Range(NumericRange::exact(IntType::I32, 5).unwrap()),
            )
            .unwrap();
        let guard = Guard::Compare {
            op: CompareOp::Gt,
            lhs: Operand::Value(v(0)),
            rhs: Operand::Int {
                value: 10,
                ty: IntType::I32,
            },
        };
        let (t, f) = split(&state, &guard);
        assert!(t.is_none());
        assert!(f.is_some());
    }

    #[test]
    fn test_value_comparison_records_relation_and_narrows() {
        let mut state = ProgramState::new();
        state
            .learn(
                v(0),
                Constraint::Range(NumericRange::bounded(IntType::I32, 0, 100).unwrap()),
            )
            .unwrap();
        state
            .learn(
                v(1),
                Constraint::Range(NumericRange::exact(IntType::I32, 50).unwrap()),
            )
            .unwrap();
        let guard = Guard::Compare {
            op: CompareOp::Lt,
            lhs: Operand::Value(v(0)),
            rhs: Operand::Value(v(1)),
        };
        let (t, f) = split(&state, &guard);
        let t = t.unwrap();
        assert!(t.relations().holds(v(0), RelationKind::LessThan, v(1)));
        assert_eq!(t.range(v(0)).unwrap().max, 49);
        assert_eq!(f.unwrap().range(v(0)).unwrap().min, 50);
    }

    #[test]
    fn test_equality_between_values_transports_facts() {
        let mut state = ProgramState::new();
        state
            .learn(v(0), Constraint::Nullability(Nullability::Null))
            .unwrap();
        let guard = Guard::Compare {
            op: CompareOp::Eq,
            lhs: Operand::Value(v(1)),
            rhs: Operand::Value(v(0)),
        };
        let (t, _) = split(&state, &guard);
        assert_eq!(t.unwrap().nullability(v(1)), Some(Nullability::Null));

        // And `!=` against known-null proves non-null.
        let guard = Guard::Compare {
            op: CompareOp::Ne,
            lhs: Operand::Value(v(1)),
            rhs: Operand::Value(v(0)),
        };
        let (t, _) = split(&state, &guard);
        assert_eq!(t.unwrap().nullability(v(1)), Some(Nullability::NotNull));
    }

    #[test]
    fn test_literal_guard_sides() {
        let state = ProgramState::new();
        let (t, f) = split(&state, &Guard::Literal(true));
        assert!(t.is_some());
        assert!(f.is_none());
    }

    #[test]
    fn test_helper_guards() {
        let state = ProgramState::new();

        let (t, f) = split(&state, &Guard::HasValue(v(0)));
        assert_eq!(t.unwrap().nullability(v(0)), Some(Nullability::NotNull));
        assert_eq!(f.unwrap().nullability(v(0)), Some(Nullability::Null));

        let (t, f) = split(&state, &Guard::IsType(v(0)));
        assert_eq!(t.unwrap().nullability(v(0)), Some(Nullability::NotNull));
        assert_eq!(f.unwrap().nullability(v(0)), None);

        let (t, f) = split(&state, &Guard::NullOrEmpty(v(0)));
        assert_eq!(t.unwrap().nullability(v(0)), None);
        assert_eq!(f.unwrap().nullability(v(0)), Some(Nullability::NotNull));

        let (t, f) = split(
            &state,
            &Guard::NotNullWhen {
                arg: v(0),
                when: true,
            },
        );
        assert_eq!(t.unwrap().nullability(v(0)), Some(Nullability::NotNull));
        assert_eq!(f.unwrap().nullability(v(0)), None);
    }

    #[test]
    fn test_static_literal_comparison() {
        let state = ProgramState::new();
        let guard = Guard::Compare {
            op: CompareOp::Lt,
            lhs: Operand::Int {
                value: 3,
                ty: IntType::I32,
            },
            rhs: Operand::Int {
                value: 1,
                ty: IntType::I32,
            },
        };
        let (t, f) = split(&state, &guard);
        assert!(t.is_none());
        assert!(f.is_some());
    }
}
