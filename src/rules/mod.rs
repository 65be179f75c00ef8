//! Rule hooks and findings: the pluggable checks riding on the engine.
//!
//! The engine knows how to explore states; it does not know what a defect is.
//! Checks are [`RuleHook`] values registered per analysis run (no global
//! registry: two concurrent runs can carry different rule sets), invoked at
//! the extension points they subscribed to via their [`ExtensionPoints`] mask.
//! Hooks are read-only observers: they inspect the state the engine hands
//! them and emit [`Finding`]s into a [`FindingSink`], never mutating the
//! state or steering the traversal.
//!
//! The engine deduplicates findings by `(rule, primary span)` across the many
//! exploded nodes that step over the same operation, so a hook can report
//! unconditionally whenever its condition holds.

mod builtin;

pub use builtin::{
    builtin_rules, CollectionEmptyRule, ConstantConditionRule, DisposeRule, LockReleaseRule,
    NullDereferenceRule, OverflowRule, RuleSet,
};

use std::sync::Arc;

use bitflags::bitflags;
use strum::{Display, EnumIter};

use crate::{
    cfg::{Guard, MethodBody, Operation, SourceSpan},
    oracle::SymbolOracle,
    state::ProgramState,
};

bitflags! {
    /// The extension points a rule hook can subscribe to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExtensionPoints: u8 {
        /// Before an operation's transfer is applied.
        const BEFORE_OPERATION = 1 << 0;
        /// After an operation's transfer has been applied.
        const AFTER_OPERATION = 1 << 1;
        /// Once per conditional branch, with aggregated feasibility.
        const BRANCH = 1 << 2;
        /// At every state that leaves the method normally.
        const END_OF_METHOD = 1 << 3;
    }
}

/// Identifies a defect check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RuleId {
    /// Dereference of a value known to be null.
    NullDereference,
    /// `.Value` access on a nullable known to be empty.
    NullableValueAccess,
    /// Arithmetic whose operand ranges prove an out-of-bounds result.
    GuaranteedOverflow,
    /// Arithmetic whose operand ranges admit an out-of-bounds result.
    PossibleOverflow,
    /// A branch condition with only one feasible side.
    ConstantCondition,
    /// An element access on a collection known to be empty.
    EmptyCollectionAccess,
    /// Dispose called on an already-disposed object.
    DoubleDispose,
    /// A member access on an already-disposed object.
    UseAfterDispose,
    /// A lock still held on some path leaving the method.
    LockNotReleased,
}

/// A defect report emitted by a rule hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// The check that fired.
    pub rule: RuleId,
    /// The primary source location of the defect.
    pub span: SourceSpan,
    /// Related locations (acquire site, disposal site).
    pub secondary: Vec<SourceSpan>,
    /// Message parameters, front-end rendered; typically the value's name.
    pub params: Vec<String>,
}

impl Finding {
    /// Creates a finding for a rule at a primary location.
    #[must_use]
    pub fn new(rule: RuleId, span: SourceSpan) -> Self {
        Self {
            rule,
            span,
            secondary: Vec::new(),
            params: Vec::new(),
        }
    }

    /// Attaches a related location; returns `self` for chaining.
    #[must_use]
    pub fn with_secondary(mut self, span: SourceSpan) -> Self {
        self.secondary.push(span);
        self
    }

    /// Attaches a message parameter; returns `self` for chaining.
    #[must_use]
    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.params.push(param.into());
        self
    }
}

/// Receives findings from rule hooks.
pub trait FindingSink {
    /// Records one finding.
    fn report(&mut self, finding: Finding);
}

/// A per-method sink collecting findings into a plain vector.
#[derive(Debug, Default)]
pub struct VecSink {
    findings: Vec<Finding>,
}

impl VecSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the collected findings.
    #[must_use]
    pub fn findings(&self) -> &[Finding] {
        &self.findings
    }

    /// Consumes the sink, returning the collected findings.
    #[must_use]
    pub fn into_findings(self) -> Vec<Finding> {
        self.findings
    }
}

impl FindingSink for VecSink {
    fn report(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

/// A sink shared by concurrently running method analyses.
///
/// Backed by a lock-free append-only vector: parallel engines push through
/// cheap clones of the same handle without coordination, and the driver reads
/// the combined result when the run finishes.
#[derive(Debug, Clone, Default)]
pub struct SharedSink {
    findings: Arc<boxcar::Vec<Finding>>,
}

impl SharedSink {
    /// Creates an empty shared sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of findings collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.findings.count()
    }

    /// Returns `true` if no findings have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.findings.count() == 0
    }

    /// Snapshots the findings collected so far.
    #[must_use]
    pub fn findings(&self) -> Vec<Finding> {
        self.findings.iter().map(|(_, f)| f.clone()).collect()
    }
}

impl FindingSink for SharedSink {
    fn report(&mut self, finding: Finding) {
        self.findings.push(finding);
    }
}

/// Read-only context handed to rule hooks.
pub struct RuleContext<'a> {
    /// The method under analysis.
    pub body: &'a MethodBody,
    /// The program state at the hook's program point.
    pub state: &'a ProgramState,
    /// The symbol oracle for callee lookups.
    pub oracle: &'a dyn SymbolOracle,
}

/// A conditional branch with its feasibility, aggregated over every state
/// that reached it.
///
/// `true_feasible`/`false_feasible` say whether *any* explored state could
/// take that side. A side that was never feasible in any state makes the
/// condition constant.
pub struct BranchEval<'a> {
    /// The controlling guard.
    pub guard: &'a Guard,
    /// The guard's source location.
    pub span: SourceSpan,
    /// Whether some state could take the true side.
    pub true_feasible: bool,
    /// Whether some state could take the false side.
    pub false_feasible: bool,
}

impl BranchEval<'_> {
    /// Returns `true` if the guard is a compile-time boolean literal (possibly
    /// under negations). Literal guards are constant by construction and not
    /// worth reporting.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        let mut guard = self.guard;
        loop {
            match guard {
                Guard::Literal(_) => return true,
                Guard::Not(inner) => guard = inner,
                _ => return false,
            }
        }
    }
}

/// A defect check invoked by the engine at its subscribed extension points.
///
/// Hooks are stateless values: the same hook instance observes every path of
/// a method and may be shared across parallel method analyses, so anything it
/// needs beyond its configuration must come from the context it is handed.
pub trait RuleHook: Sync {
    /// The extension points this hook wants to be called at.
    fn extension_points(&self) -> ExtensionPoints;

    /// Called before an operation's transfer, with the state it executes in.
    fn on_before_operation(
        &self,
        _ctx: &RuleContext<'_>,
        _op: &Operation,
        _sink: &mut dyn FindingSink,
    ) {
    }

    /// Called after an operation's transfer, with the resulting state.
    fn on_after_operation(
        &self,
        _ctx: &RuleContext<'_>,
        _op: &Operation,
        _sink: &mut dyn FindingSink,
    ) {
    }

    /// Called once per conditional branch after traversal finishes, with
    /// feasibility aggregated over all states that reached the branch.
    fn on_branch(&self, _body: &MethodBody, _branch: &BranchEval<'_>, _sink: &mut dyn FindingSink) {
    }

    /// Called for each state that leaves the method normally, with the span of
    /// the exiting operation.
    fn on_end_of_method(
        &self,
        _ctx: &RuleContext<'_>,
        _exit: SourceSpan,
        _sink: &mut dyn FindingSink,
    ) {
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueId;

    #[test]
    fn test_finding_builders() {
        let f = Finding::new(RuleId::NullDereference, SourceSpan::new(3, 8))
            .with_secondary(SourceSpan::new(0, 2))
            .with_param("x");
        assert_eq!(f.rule, RuleId::NullDereference);
        assert_eq!(f.secondary, vec![SourceSpan::new(0, 2)]);
        assert_eq!(f.params, vec!["x".to_string()]);
    }

    #[test]
    fn test_vec_sink_collects() {
        let mut sink = VecSink::new();
        sink.report(Finding::new(RuleId::ConstantCondition, SourceSpan::new(0, 1)));
        sink.report(Finding::new(RuleId::DoubleDispose, SourceSpan::new(2, 3)));
        assert_eq!(sink.findings().len(), 2);
        assert_eq!(sink.into_findings().len(), 2);
    }

    #[test]
    fn test_shared_sink_clone_shares_storage() {
        let sink = SharedSink::new();
        let mut handle = sink.clone();
        handle.report(Finding::new(RuleId::LockNotReleased, SourceSpan::new(0, 4)));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.findings()[0].rule, RuleId::LockNotReleased);
    }

    #[test]
    fn test_branch_literal_detection() {
        let lit = Guard::Not(Box::new(Guard::Literal(true)));
        let eval = BranchEval {
            guard: &lit,
            span: SourceSpan::default(),
            true_feasible: false,
            false_feasible: true,
        };
        assert!(eval.is_literal());

        let truth = Guard::Truth(ValueId::new(0));
        let eval = BranchEval {
            guard: &truth,
            span: SourceSpan::default(),
            true_feasible: true,
            false_feasible: true,
        };
        assert!(!eval.is_literal());
    }
}
