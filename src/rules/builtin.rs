//! The built-in defect checks.
//!
//! These cover the defect classes the engine's domains were built to expose:
//! null dereferences, integer overflow, constant conditions, empty-collection
//! access, double disposal and unreleased locks. Each is an ordinary
//! [`RuleHook`]; external checks plug in the same way.

use crate::{
    cfg::{MethodBody, Operation, OperationKind, SourceSpan},
    domain::OverflowClass,
    oracle::CallEffect,
    rules::{BranchEval, ExtensionPoints, Finding, FindingSink, RuleContext, RuleHook, RuleId},
    state::ProgramState,
    value::ValueId,
};

/// The rule set registered for one analysis run.
pub type RuleSet = Vec<Box<dyn RuleHook + Send + Sync>>;

/// Returns the full built-in rule set.
#[must_use]
pub fn builtin_rules() -> RuleSet {
    vec![
        Box::new(NullDereferenceRule),
        Box::new(OverflowRule),
        Box::new(ConstantConditionRule),
        Box::new(CollectionEmptyRule),
        Box::new(DisposeRule),
        Box::new(LockReleaseRule),
    ]
}

fn value_name(body: &MethodBody, v: ValueId) -> String {
    body.values
        .get(v)
        .and_then(|t| t.name())
        .map_or_else(|| v.to_string(), ToString::to_string)
}

/// Flags dereferences and `.Value` accesses on values known to be null.
///
/// Fires only on *provably* null receivers: a value with no nullability fact
/// may or may not be null, and reporting it would flag nearly every method.
pub struct NullDereferenceRule;

impl RuleHook for NullDereferenceRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::BEFORE_OPERATION
    }

    fn on_before_operation(
        &self,
        ctx: &RuleContext<'_>,
        op: &Operation,
        sink: &mut dyn FindingSink,
    ) {
        use crate::domain::Nullability;

        let (value, rule) = match op.kind {
            OperationKind::Dereference { value } => (value, RuleId::NullDereference),
            OperationKind::NullableValue { value, .. } => (value, RuleId::NullableValueAccess),
            OperationKind::Invoke {
                receiver: Some(receiver),
                ..
            } => (receiver, RuleId::NullDereference),
            _ => return,
        };
        if ctx.state.nullability(value) == Some(Nullability::Null) {
            sink.report(Finding::new(rule, op.span).with_param(value_name(ctx.body, value)));
        }
    }
}

/// Flags `+`, `-` and `*` whose operand ranges escape the result type.
///
/// Guaranteed overflow fires whenever the ranges prove every result is out of
/// bounds. Possible overflow additionally requires at least one operand to
/// carry a learned (non-full) range; two completely unknown operands can
/// always overflow in principle and reporting that would be noise. Methods
/// compiled in an unchecked context wrap by definition and are skipped
/// entirely.
pub struct OverflowRule;

impl RuleHook for OverflowRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::BEFORE_OPERATION
    }

    fn on_before_operation(
        &self,
        ctx: &RuleContext<'_>,
        op: &Operation,
        sink: &mut dyn FindingSink,
    ) {
        use crate::cfg::BinaryOp;

        if ctx.body.unchecked_context {
            return;
        }
        let OperationKind::Binary {
            op: binary,
            lhs,
            rhs,
            ty,
            ..
        } = op.kind
        else {
            return;
        };
        if !binary.can_overflow() {
            return;
        }

        let left = ctx.state.operand_range(lhs, ty);
        let right = ctx.state.operand_range(rhs, ty);
        let (_, class) = match binary {
            BinaryOp::Add => left.add(&right),
            BinaryOp::Sub => left.sub(&right),
            BinaryOp::Mul => left.mul(&right),
            _ => return,
        };

        match class {
            OverflowClass::Guaranteed => {
                sink.report(Finding::new(RuleId::GuaranteedOverflow, op.span));
            }
            OverflowClass::Possible if !(left.is_full() && right.is_full()) => {
                sink.report(Finding::new(RuleId::PossibleOverflow, op.span));
            }
            OverflowClass::Possible | OverflowClass::Never => {}
        }
    }
}

/// Flags branch conditions with exactly one feasible side.
///
/// Literal guards are exempt (`while (true)` is idiom, not defect), as are
/// branches no state ever reached.
pub struct ConstantConditionRule;

impl RuleHook for ConstantConditionRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::BRANCH
    }

    fn on_branch(&self, _body: &MethodBody, branch: &BranchEval<'_>, sink: &mut dyn FindingSink) {
        if branch.is_literal() || branch.true_feasible == branch.false_feasible {
            return;
        }
        let constant = if branch.true_feasible { "true" } else { "false" };
        sink.report(Finding::new(RuleId::ConstantCondition, branch.span).with_param(constant));
    }
}

/// Flags operations on collections known to be empty.
///
/// Fires for callees the oracle marks as requiring a non-empty receiver:
/// accessors that throw on empty (`First()`, `Single()`) and mutators that
/// are pointless on empty (`Clear()`, `Remove(..)`) alike.
pub struct CollectionEmptyRule;

impl RuleHook for CollectionEmptyRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::BEFORE_OPERATION
    }

    fn on_before_operation(
        &self,
        ctx: &RuleContext<'_>,
        op: &Operation,
        sink: &mut dyn FindingSink,
    ) {
        let OperationKind::Invoke {
            method,
            receiver: Some(receiver),
            ..
        } = op.kind
        else {
            return;
        };
        if !ctx.oracle.method_info(method).requires_non_empty {
            return;
        }
        if ctx.state.size(receiver).is_some_and(|s| s.is_known_empty()) {
            sink.report(
                Finding::new(RuleId::EmptyCollectionAccess, op.span)
                    .with_param(value_name(ctx.body, receiver)),
            );
        }
    }
}

/// Flags calls on objects already disposed on the current path.
///
/// Dispose-on-disposed reports as [`RuleId::DoubleDispose`]; any other call
/// through a disposed receiver reports as [`RuleId::UseAfterDispose`].
pub struct DisposeRule;

impl DisposeRule {
    fn dispose_target(receiver: Option<ValueId>, args: &[crate::cfg::Operand]) -> Option<ValueId> {
        receiver.or_else(|| args.iter().find_map(crate::cfg::Operand::as_value))
    }
}

impl RuleHook for DisposeRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::BEFORE_OPERATION
    }

    fn on_before_operation(
        &self,
        ctx: &RuleContext<'_>,
        op: &Operation,
        sink: &mut dyn FindingSink,
    ) {
        use crate::domain::ObjectState;

        let OperationKind::Invoke {
            method,
            receiver,
            ref args,
            ..
        } = op.kind
        else {
            return;
        };

        if ctx.oracle.method_info(method).effect == CallEffect::Dispose {
            if let Some(target) = Self::dispose_target(receiver, args) {
                if ctx.state.object_state(target) == Some(ObjectState::Disposed) {
                    sink.report(
                        Finding::new(RuleId::DoubleDispose, op.span)
                            .with_param(value_name(ctx.body, target)),
                    );
                }
            }
        } else if let Some(receiver) = receiver {
            if ctx.state.object_state(receiver) == Some(ObjectState::Disposed) {
                sink.report(
                    Finding::new(RuleId::UseAfterDispose, op.span)
                        .with_param(value_name(ctx.body, receiver)),
                );
            }
        }
    }
}

/// Flags locks still held when a path leaves the method.
///
/// The finding points at the acquire site carried in the lock fact, with the
/// exiting operation as a secondary location.
pub struct LockReleaseRule;

impl RuleHook for LockReleaseRule {
    fn extension_points(&self) -> ExtensionPoints {
        ExtensionPoints::END_OF_METHOD
    }

    fn on_end_of_method(
        &self,
        ctx: &RuleContext<'_>,
        exit: SourceSpan,
        sink: &mut dyn FindingSink,
    ) {
        use crate::domain::LockState;

        for (v, set) in ctx.state.tracked_values() {
            if let Some(LockState::Held { site }) = set.lock {
                sink.report(
                    Finding::new(RuleId::LockNotReleased, site)
                        .with_secondary(exit)
                        .with_param(value_name(ctx.body, v)),
                );
            }
        }
    }
}
