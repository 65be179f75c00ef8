//! The symbolic execution engine: exploded-graph traversal of one method.
//!
//! The engine walks the *exploded graph* of a method: nodes are `(block,
//! state)` pairs, and stepping a node applies each operation's transfer
//! function to a clone of the state, then propagates the result along the
//! block's edges. Branches split the state through the guard's learn rules
//! (see [`learn`]); merges happen implicitly, by several states coexisting at
//! one block. The traversal is a plain worklist over a [`VecDeque`], never
//! recursive, and deduplicates by structural state equality per block.
//!
//! Three bounds keep exploration finite and proportionate
//! ([`AnalysisLimits`]): a visit cap per loop header (exceeded visits widen
//! the state by dropping facts about loop-written values), a per-block path
//! split budget (excess states are joined instead of kept apart), and a
//! per-method node budget (exhaustion abandons the method, keeping the
//! findings emitted so far).
//!
//! Rule hooks observe the traversal read-only. The engine deduplicates their
//! findings by `(rule, span)`, aggregates branch feasibility across all
//! states for the constant-condition extension point, and suppresses (but
//! logs) findings from unreachable blocks.

mod learn;
mod limits;

pub use limits::AnalysisLimits;

use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::atomic::{AtomicBool, Ordering},
};

use log::{debug, warn};

use crate::{
    cfg::{
        BasicBlock, BlockId, EdgeKind, Guard, MethodBody, Operand, Operation, OperationKind,
        SourceSpan,
    },
    domain::{
        CollectionSize, Constraint, ConstraintSet, DomainKind, LockState, Nullability, ObjectState,
        OverflowClass, Truth,
    },
    oracle::{CallEffect, SymbolOracle},
    rules::{
        BranchEval, ExtensionPoints, Finding, FindingSink, RuleContext, RuleHook, RuleId, VecSink,
    },
    state::{ProgramState, RelationKind},
    value::ValueId,
    Error, Result,
};

/// Statistics from one method's traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisSummary {
    /// Number of exploded-graph nodes stepped.
    pub nodes_explored: usize,
}

/// How control leaves an operation's transfer.
enum Flow {
    /// Fall through to the next operation.
    Continue,
    /// The operation returns from the method.
    Return,
    /// The operation always throws; normal flow ends here.
    Throw,
    /// The operation's success is contradictory in this state (e.g. a
    /// dereference of a proven-null value); the normal path is infeasible.
    Infeasible,
}

/// Deduplicates findings by `(rule, primary span)` before forwarding.
struct DedupSink<'s> {
    inner: &'s mut dyn FindingSink,
    seen: HashSet<(RuleId, SourceSpan)>,
}

impl FindingSink for DedupSink<'_> {
    fn report(&mut self, finding: Finding) {
        if self.seen.insert((finding.rule, finding.span)) {
            self.inner.report(finding);
        }
    }
}

/// Symbolic execution of a single method body.
///
/// The engine borrows everything it works on: the body, the oracle, and the
/// rule set all outlive the run, so parallel analyses share them freely.
pub struct SymbolicEngine<'a> {
    body: &'a MethodBody,
    oracle: &'a dyn SymbolOracle,
    rules: &'a [Box<dyn RuleHook + Send + Sync>],
    limits: AnalysisLimits,
    cancel: Option<&'a AtomicBool>,
}

impl<'a> SymbolicEngine<'a> {
    /// Creates an engine over a method body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOperation`] when a guard references a flow
    /// capture; the provider contract requires captures to be consumed into
    /// locals before they control a branch.
    pub fn new(
        body: &'a MethodBody,
        oracle: &'a dyn SymbolOracle,
        rules: &'a [Box<dyn RuleHook + Send + Sync>],
        limits: AnalysisLimits,
    ) -> Result<Self> {
        for id in body.cfg.block_ids() {
            if let Some(guard) = body.cfg.block(id).and_then(|b| b.guard.as_ref()) {
                if guard_mentions_capture(guard) {
                    return Err(Error::UnsupportedOperation(format!(
                        "guard of block {id} references a flow capture"
                    )));
                }
            }
        }
        Ok(Self {
            body,
            oracle,
            rules,
            limits,
            cancel: None,
        })
    }

    /// Attaches a cooperative cancellation flag, checked at block boundaries.
    #[must_use]
    pub fn with_cancellation(mut self, cancel: &'a AtomicBool) -> Self {
        self.cancel = Some(cancel);
        self
    }

    /// Runs the traversal, streaming findings into `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::BudgetExceeded`] when the node budget runs out,
    /// [`Error::Cancelled`] on cooperative cancellation, and
    /// [`Error::GraphError`] if the CFG arena is inconsistent. In every case
    /// the findings already in the sink remain valid.
    pub fn run(&self, sink: &mut dyn FindingSink) -> Result<AnalysisSummary> {
        let cfg = &self.body.cfg;
        let block_count = cfg.block_count();

        let mut sink = DedupSink {
            inner: sink,
            seen: HashSet::new(),
        };
        let mut worklist: VecDeque<(BlockId, ProgramState)> = VecDeque::new();
        let mut visited: Vec<HashSet<ProgramState>> = vec![HashSet::new(); block_count];
        // Join accumulator per block once the path split budget is hit.
        let mut overflow: HashMap<BlockId, ProgramState> = HashMap::new();
        let mut header_visits: HashMap<BlockId, u32> = HashMap::new();
        let mut loop_writes: HashMap<BlockId, Vec<ValueId>> = HashMap::new();
        // Aggregated (true-feasible, false-feasible) per conditional block.
        let mut branch_outcomes: Vec<Option<(bool, bool)>> = vec![None; block_count];
        let mut nodes = 0_usize;

        self.admit(
            cfg.entry(),
            ProgramState::new(),
            &mut worklist,
            &mut visited,
            &mut overflow,
            &mut header_visits,
            &mut loop_writes,
        );

        while let Some((block_id, mut state)) = worklist.pop_front() {
            if let Some(cancel) = self.cancel {
                if cancel.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled);
                }
            }
            nodes += 1;
            if nodes > self.limits.node_budget {
                warn!(
                    "abandoning {}: node budget of {} exhausted",
                    self.body.name, self.limits.node_budget
                );
                return Err(Error::BudgetExceeded {
                    explored: nodes,
                    budget: self.limits.node_budget,
                });
            }

            let block = cfg
                .block(block_id)
                .ok_or_else(|| Error::GraphError(format!("no block {block_id} in arena")))?;

            let mut exited = false;
            for op in &block.operations {
                self.hooks_before(&state, op, &mut sink);

                // A throwing operation hands its pre-state to every handler:
                // only operations strictly before the throw have taken effect.
                if self.can_throw(op) {
                    for edge in block.handler_edges() {
                        self.admit(
                            edge.target,
                            state.clone(),
                            &mut worklist,
                            &mut visited,
                            &mut overflow,
                            &mut header_visits,
                            &mut loop_writes,
                        );
                    }
                }

                match self.transfer(&mut state, op) {
                    Flow::Continue => self.hooks_after(&state, op, &mut sink),
                    Flow::Return => {
                        self.hooks_end(&state, op.span, &mut sink);
                        exited = true;
                        break;
                    }
                    Flow::Throw | Flow::Infeasible => {
                        exited = true;
                        break;
                    }
                }
            }
            if exited {
                continue;
            }

            if let Some(guard) = &block.guard {
                let (mut true_state, mut false_state) = learn::split(&state, guard);
                // A guard testing the boolean result of a call with a
                // `[NotNullWhen]` postcondition also constrains the argument
                // the postcondition names.
                if let Some((arg, when)) = self.call_postcondition(block, guard) {
                    let post = Guard::NotNullWhen { arg, when };
                    true_state = true_state.and_then(|s| learn::assume(&s, &post, true));
                    false_state = false_state.and_then(|s| learn::assume(&s, &post, false));
                }
                let outcome = branch_outcomes[block_id.index()].get_or_insert((false, false));
                outcome.0 |= true_state.is_some();
                outcome.1 |= false_state.is_some();

                for edge in &block.edges {
                    let next = match edge.kind {
                        EdgeKind::ConditionalTrue => true_state.clone(),
                        EdgeKind::ConditionalFalse => false_state.clone(),
                        EdgeKind::FinallyEntry => Some(state.clone()),
                        EdgeKind::Unconditional | EdgeKind::LoopBack => Some(state.clone()),
                        EdgeKind::Exception => None,
                    };
                    if let Some(next) = next {
                        self.admit(
                            edge.target,
                            next,
                            &mut worklist,
                            &mut visited,
                            &mut overflow,
                            &mut header_visits,
                            &mut loop_writes,
                        );
                    }
                }
            } else if block.is_terminal() {
                // Implicit return: the method falls off the end of the block.
                let exit = block
                    .operations
                    .last()
                    .map_or(SourceSpan::default(), |op| op.span);
                self.hooks_end(&state, exit, &mut sink);
            } else {
                for edge in &block.edges {
                    if edge.kind == EdgeKind::Exception {
                        continue;
                    }
                    self.admit(
                        edge.target,
                        state.clone(),
                        &mut worklist,
                        &mut visited,
                        &mut overflow,
                        &mut header_visits,
                        &mut loop_writes,
                    );
                }
            }
        }

        self.report_branches(&branch_outcomes, &mut sink);
        self.sweep_dead_blocks();

        Ok(AnalysisSummary {
            nodes_explored: nodes,
        })
    }

    /// Admits a state at a block, applying dedup, loop widening and the path
    /// split budget.
    #[allow(clippy::too_many_arguments)]
    fn admit(
        &self,
        block: BlockId,
        state: ProgramState,
        worklist: &mut VecDeque<(BlockId, ProgramState)>,
        visited: &mut [HashSet<ProgramState>],
        overflow: &mut HashMap<BlockId, ProgramState>,
        header_visits: &mut HashMap<BlockId, u32>,
        loop_writes: &mut HashMap<BlockId, Vec<ValueId>>,
    ) -> bool {
        let mut state = state;
        if visited[block.index()].contains(&state) {
            return false;
        }

        let is_header = self.body.cfg.loops().iter().any(|l| l.header == block);
        if is_header {
            let visits = header_visits.entry(block).or_insert(0);
            *visits += 1;
            if *visits > self.limits.loop_visit_cap {
                // Widen: facts about values the loop writes are dropped, not
                // kept stale, so the header state stabilizes.
                let writes = loop_writes
                    .entry(block)
                    .or_insert_with(|| self.collect_loop_writes(block));
                for &v in writes.iter() {
                    state.invalidate(v);
                }
                debug!(
                    "{}: widened loop header {block} after {visits} visits",
                    self.body.name
                );
                if visited[block.index()].contains(&state) {
                    return false;
                }
            }
        }

        if visited[block.index()].len() >= self.limits.path_split_budget {
            // Too many distinct paths meet here; fold the newcomer into the
            // running join instead of keeping it separate.
            let joined = match overflow.get(&block) {
                Some(acc) => acc.join(&state),
                None => state,
            };
            if visited[block.index()].contains(&joined) {
                overflow.insert(block, joined);
                return false;
            }
            overflow.insert(block, joined.clone());
            state = joined;
        }

        visited[block.index()].insert(state.clone());
        worklist.push_back((block, state));
        true
    }

    /// Collects every value written anywhere in the loops headed at `header`.
    fn collect_loop_writes(&self, header: BlockId) -> Vec<ValueId> {
        let mut writes = Vec::new();
        for l in self.body.cfg.loops().iter().filter(|l| l.header == header) {
            for &block in &l.body {
                let Some(block) = self.body.cfg.block(block) else {
                    continue;
                };
                for op in &block.operations {
                    collect_writes(&op.kind, &mut writes);
                }
            }
        }
        writes.sort_unstable();
        writes.dedup();
        writes
    }

    /// Applies one operation's transfer function to the state.
    fn transfer(&self, state: &mut ProgramState, op: &Operation) -> Flow {
        match op.kind {
            OperationKind::Assign { target, source } => {
                let source = resolve_operand(state, source);
                self.assign_operand(state, target, source)
            }
            OperationKind::Dereference { value } => {
                // Surviving the dereference proves the value non-null; a
                // proven-null value makes the normal continuation infeasible.
                match state.learn(value, Constraint::Nullability(Nullability::NotNull)) {
                    Ok(()) => Flow::Continue,
                    Err(_) => Flow::Infeasible,
                }
            }
            OperationKind::NullableValue { value, result } => {
                if let Some(result) = result {
                    state.invalidate(result);
                }
                match state.learn(value, Constraint::Nullability(Nullability::NotNull)) {
                    Ok(()) => Flow::Continue,
                    Err(_) => Flow::Infeasible,
                }
            }
            OperationKind::Binary {
                op: binary,
                lhs,
                rhs,
                result,
                ty,
            } => self.transfer_binary(state, binary, lhs, rhs, result, ty),
            OperationKind::Compare {
                op: compare,
                lhs,
                rhs,
                result,
            } => {
                let decided = decide_compare(state, compare, lhs, rhs);
                let set = decided.map_or_else(ConstraintSet::default, |b| {
                    ConstraintSet::singleton(Constraint::Truth(Truth::from_bool(b)))
                });
                state.assign(result, set);
                Flow::Continue
            }
            OperationKind::Not { source, result } => {
                let set = state.truth(source).map_or_else(ConstraintSet::default, |t| {
                    ConstraintSet::singleton(Constraint::Truth(t.negated()))
                });
                state.assign(result, set);
                Flow::Continue
            }
            OperationKind::New { result, shape } => {
                let mut set = ConstraintSet::singleton(Constraint::Nullability(Nullability::NotNull));
                set.replace(Constraint::Object(ObjectState::NotDisposed));
                if let Some(size) = CollectionSize::from_ctor(shape) {
                    set.replace(Constraint::Size(size));
                }
                state.assign(result, set);
                Flow::Continue
            }
            OperationKind::Invoke {
                method,
                receiver,
                ref args,
                ref by_ref_args,
                result,
            } => self.transfer_invoke(state, op.span, method, receiver, args, by_ref_args, result),
            OperationKind::WriteCapture { capture, source } => {
                let source = resolve_operand(state, source);
                state.write_capture(capture, source);
                Flow::Continue
            }
            OperationKind::ConsumeCapture { capture, target } => {
                let source = state.consume_capture(capture);
                self.assign_operand(state, target, source)
            }
            OperationKind::Return { .. } => Flow::Return,
            OperationKind::Throw => Flow::Throw,
        }
    }

    fn assign_operand(&self, state: &mut ProgramState, target: ValueId, source: Operand) -> Flow {
        let set = match source {
            Operand::Value(v) => state.get(v).copied().unwrap_or_default(),
            Operand::Null => ConstraintSet::singleton(Constraint::Nullability(Nullability::Null)),
            Operand::Bool(b) => ConstraintSet::singleton(Constraint::Truth(Truth::from_bool(b))),
            Operand::Int { value, ty } => crate::domain::NumericRange::exact(ty, value)
                .map_or_else(ConstraintSet::default, |r| {
                    ConstraintSet::singleton(Constraint::Range(r))
                }),
            Operand::Capture(_) | Operand::Unknown => ConstraintSet::default(),
        };
        state.assign(target, set);
        if let Operand::Value(v) = source {
            // The sets already agree, so the equality cannot contradict.
            if state.learn_relation(target, RelationKind::Equal, v).is_err() {
                return Flow::Infeasible;
            }
        }
        Flow::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_binary(
        &self,
        state: &mut ProgramState,
        binary: crate::cfg::BinaryOp,
        lhs: Operand,
        rhs: Operand,
        result: ValueId,
        ty: crate::value::IntType,
    ) -> Flow {
        use crate::cfg::BinaryOp;

        let set = match binary {
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul => {
                let left = state.operand_range(lhs, ty);
                let right = state.operand_range(rhs, ty);
                let (range, class) = match binary {
                    BinaryOp::Add => left.add(&right),
                    BinaryOp::Sub => left.sub(&right),
                    _ => left.mul(&right),
                };
                if class == OverflowClass::Never {
                    ConstraintSet::singleton(Constraint::Range(range))
                } else {
                    // A wrapped result can be anything representable.
                    ConstraintSet::default()
                }
            }
            BinaryOp::Div | BinaryOp::Rem => {
                // Division by a provably-zero divisor always throws.
                if state.operand_range(rhs, ty).as_exact() == Some(0) {
                    return Flow::Infeasible;
                }
                ConstraintSet::default()
            }
            BinaryOp::And | BinaryOp::Or | BinaryOp::Xor => {
                let combined = match (state.operand_truth(lhs), state.operand_truth(rhs)) {
                    (Some(a), Some(b)) => Some(match binary {
                        BinaryOp::And => a.and(b),
                        BinaryOp::Or => a.or(b),
                        _ => a.xor(b),
                    }),
                    _ => None,
                };
                combined.map_or_else(ConstraintSet::default, |t| {
                    ConstraintSet::singleton(Constraint::Truth(t))
                })
            }
        };
        state.assign(result, set);
        Flow::Continue
    }

    #[allow(clippy::too_many_arguments)]
    fn transfer_invoke(
        &self,
        state: &mut ProgramState,
        span: SourceSpan,
        method: crate::cfg::MethodRef,
        receiver: Option<ValueId>,
        args: &[Operand],
        by_ref_args: &[ValueId],
        result: Option<ValueId>,
    ) -> Flow {
        let info = self.oracle.method_info(method);

        // An instance call dereferences its receiver before anything else.
        if let Some(receiver) = receiver {
            if state
                .learn(receiver, Constraint::Nullability(Nullability::NotNull))
                .is_err()
            {
                return Flow::Infeasible;
            }
        }

        let effect_target = receiver.or_else(|| args.iter().find_map(Operand::as_value));
        match info.effect {
            CallEffect::Pure => {}
            CallEffect::Opaque => state.invalidate_heap(&self.body.values),
            CallEffect::Dispose => {
                if let Some(target) = effect_target {
                    state.replace(target, Constraint::Object(ObjectState::Disposed));
                }
            }
            CallEffect::LockAcquire => {
                if let Some(target) = effect_target {
                    state.replace(target, Constraint::Lock(LockState::Held { site: span }));
                }
            }
            CallEffect::LockRelease => {
                if let Some(target) = effect_target {
                    state.replace(target, Constraint::Lock(LockState::NotHeld));
                }
            }
            CallEffect::CollectionMutator => {
                if let Some(receiver) = receiver {
                    state.forget(receiver, DomainKind::CollectionSize);
                }
            }
        }

        for &arg in by_ref_args {
            state.invalidate(arg);
        }
        if let Some(result) = result {
            state.invalidate(result);
            if info.returns_not_null {
                // Fresh binding, cannot contradict.
                let _unused = state.learn(result, Constraint::Nullability(Nullability::NotNull));
            }
        }
        Flow::Continue
    }

    /// When the guard tests the boolean result of a call in this block whose
    /// callee carries a `[NotNullWhen]` postcondition, returns the constrained
    /// argument and the result polarity it is non-null for.
    ///
    /// The argument index resolves against the call's `ref`/`out` arguments
    /// first (the usual `TryGet`-style out parameter), then its by-value
    /// arguments. Only the last write to the tested value counts.
    fn call_postcondition(&self, block: &BasicBlock, guard: &Guard) -> Option<(ValueId, bool)> {
        let &Guard::Truth(tested) = guard else {
            return None;
        };
        let mut found = None;
        for op in &block.operations {
            let mut writes = Vec::new();
            collect_writes(&op.kind, &mut writes);
            if !writes.contains(&tested) {
                continue;
            }
            found = None;
            if let OperationKind::Invoke {
                method,
                ref args,
                ref by_ref_args,
                result: Some(result),
                ..
            } = op.kind
            {
                if result == tested {
                    if let Some(post) = self.oracle.method_info(method).not_null_when {
                        let arg = by_ref_args
                            .get(post.arg_index)
                            .copied()
                            .or_else(|| args.get(post.arg_index).and_then(Operand::as_value));
                        if let Some(arg) = arg {
                            found = Some((arg, post.when));
                        }
                    }
                }
            }
        }
        found
    }

    /// Whether an operation can reach this block's handlers, refining
    /// [`OperationKind::can_throw`] with the oracle's throw classification.
    fn can_throw(&self, op: &Operation) -> bool {
        match op.kind {
            OperationKind::Invoke { method, .. } => self.oracle.method_info(method).can_throw,
            _ => op.kind.can_throw(),
        }
    }

    fn hooks_before(&self, state: &ProgramState, op: &Operation, sink: &mut dyn FindingSink) {
        let ctx = RuleContext {
            body: self.body,
            state,
            oracle: self.oracle,
        };
        for rule in self.rules {
            if rule
                .extension_points()
                .contains(ExtensionPoints::BEFORE_OPERATION)
            {
                rule.on_before_operation(&ctx, op, sink);
            }
        }
    }

    fn hooks_after(&self, state: &ProgramState, op: &Operation, sink: &mut dyn FindingSink) {
        let ctx = RuleContext {
            body: self.body,
            state,
            oracle: self.oracle,
        };
        for rule in self.rules {
            if rule
                .extension_points()
                .contains(ExtensionPoints::AFTER_OPERATION)
            {
                rule.on_after_operation(&ctx, op, sink);
            }
        }
    }

    fn hooks_end(&self, state: &ProgramState, exit: SourceSpan, sink: &mut dyn FindingSink) {
        let ctx = RuleContext {
            body: self.body,
            state,
            oracle: self.oracle,
        };
        for rule in self.rules {
            if rule
                .extension_points()
                .contains(ExtensionPoints::END_OF_METHOD)
            {
                rule.on_end_of_method(&ctx, exit, sink);
            }
        }
    }

    /// Reports aggregated branch feasibility, once per conditional block.
    fn report_branches(&self, outcomes: &[Option<(bool, bool)>], sink: &mut dyn FindingSink) {
        for (index, outcome) in outcomes.iter().enumerate() {
            let Some((true_feasible, false_feasible)) = *outcome else {
                continue;
            };
            let block_id = BlockId::new(index as u32);
            let Some(block) = self.body.cfg.block(block_id) else {
                continue;
            };
            let Some(guard) = &block.guard else {
                continue;
            };
            let eval = BranchEval {
                guard,
                span: block.guard_span,
                true_feasible,
                false_feasible,
            };
            for rule in self.rules {
                if rule.extension_points().contains(ExtensionPoints::BRANCH) {
                    rule.on_branch(self.body, &eval, sink);
                }
            }
        }
    }

    /// Visits unreachable blocks once with an unconstrained state, running
    /// the hooks but discarding their findings.
    fn sweep_dead_blocks(&self) {
        for block_id in self.body.cfg.block_ids() {
            if self.body.cfg.is_reachable(block_id) {
                continue;
            }
            let Some(block) = self.body.cfg.block(block_id) else {
                continue;
            };
            let mut suppressed = VecSink::new();
            let mut state = ProgramState::new();
            for op in &block.operations {
                self.hooks_before(&state, op, &mut suppressed);
                match self.transfer(&mut state, op) {
                    Flow::Continue => self.hooks_after(&state, op, &mut suppressed),
                    Flow::Return | Flow::Throw | Flow::Infeasible => break,
                }
            }
            if !suppressed.findings().is_empty() {
                debug!(
                    "{}: suppressed {} findings from unreachable block {block_id}",
                    self.body.name,
                    suppressed.findings().len()
                );
            }
        }
    }
}

/// Resolves a capture operand to what was captured; other operands pass
/// through.
fn resolve_operand(state: &mut ProgramState, operand: Operand) -> Operand {
    match operand {
        Operand::Capture(c) => state.consume_capture(c),
        other => other,
    }
}

/// Statically decides a materialized comparison, when the state can.
fn decide_compare(
    state: &ProgramState,
    op: crate::cfg::CompareOp,
    lhs: Operand,
    rhs: Operand,
) -> Option<bool> {
    use crate::cfg::CompareOp;

    // Nullability decides (in)equality against null.
    if rhs == Operand::Null || lhs == Operand::Null {
        let value = if rhs == Operand::Null { lhs } else { rhs };
        let known = state.operand_nullability(value)?;
        return match op {
            CompareOp::Eq => Some(known == Nullability::Null),
            CompareOp::Ne => Some(known == Nullability::NotNull),
            _ => None,
        };
    }

    // Recorded relations decide value-vs-value comparisons.
    if let (Operand::Value(a), Operand::Value(b)) = (lhs, rhs) {
        let (kind, swap) = RelationKind::from_compare(op);
        let (x, y) = if swap { (b, a) } else { (a, b) };
        if state.relations().holds(x, kind, y) {
            return Some(true);
        }
        let (neg_kind, neg_swap) = RelationKind::from_compare(op.negated());
        let (x, y) = if neg_swap { (b, a) } else { (a, b) };
        if state.relations().holds(x, neg_kind, y) {
            return Some(false);
        }
    }

    // Boolean operands decide equality.
    if let (Some(a), Some(b)) = (state.operand_truth(lhs), state.operand_truth(rhs)) {
        return match op {
            CompareOp::Eq => Some(a == b),
            CompareOp::Ne => Some(a != b),
            _ => None,
        };
    }

    // Interval bounds decide ordering when the intervals do not overlap the
    // undecided region.
    let (ra, rb) = match (lhs, rhs) {
        (Operand::Value(a), _) => {
            let ra = state.range(a)?;
            (ra, state.operand_range(rhs, ra.ty))
        }
        (_, Operand::Value(b)) => {
            let rb = state.range(b)?;
            (state.operand_range(lhs, rb.ty), rb)
        }
        _ => return None,
    };
    match op {
        CompareOp::Eq => {
            if ra.intersect(&rb).is_none() {
                Some(false)
            } else if ra.as_exact().is_some() && ra.as_exact() == rb.as_exact() {
                Some(true)
            } else {
                None
            }
        }
        CompareOp::Ne => {
            if ra.intersect(&rb).is_none() {
                Some(true)
            } else if ra.as_exact().is_some() && ra.as_exact() == rb.as_exact() {
                Some(false)
            } else {
                None
            }
        }
        CompareOp::Lt => decide_order(ra.max < rb.min, ra.min >= rb.max),
        CompareOp::Le => decide_order(ra.max <= rb.min, ra.min > rb.max),
        CompareOp::Gt => decide_order(ra.min > rb.max, ra.max <= rb.min),
        CompareOp::Ge => decide_order(ra.min >= rb.max, ra.max < rb.min),
    }
}

const fn decide_order(always: bool, never: bool) -> Option<bool> {
    if always {
        Some(true)
    } else if never {
        Some(false)
    } else {
        None
    }
}

/// Appends the values an operation writes to.
fn collect_writes(kind: &OperationKind, writes: &mut Vec<ValueId>) {
    match kind {
        OperationKind::Assign { target, .. } | OperationKind::ConsumeCapture { target, .. } => {
            writes.push(*target);
        }
        OperationKind::NullableValue { result, .. } => {
            if let Some(r) = result {
                writes.push(*r);
            }
        }
        OperationKind::Binary { result, .. }
        | OperationKind::Compare { result, .. }
        | OperationKind::Not { result, .. }
        | OperationKind::New { result, .. } => writes.push(*result),
        OperationKind::Invoke {
            by_ref_args,
            result,
            ..
        } => {
            writes.extend(by_ref_args.iter().copied());
            if let Some(r) = result {
                writes.push(*r);
            }
        }
        OperationKind::Dereference { .. }
        | OperationKind::WriteCapture { .. }
        | OperationKind::Return { .. }
        | OperationKind::Throw => {}
    }
}

fn guard_mentions_capture(guard: &Guard) -> bool {
    let mut guard = guard;
    loop {
        match guard {
            Guard::Not(inner) => guard = inner,
            Guard::Compare { lhs, rhs, .. } => {
                return matches!(lhs, Operand::Capture(_)) || matches!(rhs, Operand::Capture(_));
            }
            _ => return false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::{BasicBlock, CompareOp, ControlFlowGraph, Edge},
        oracle::TableOracle,
        value::{CaptureId, IntType, ValueTable},
    };

    fn linear_body(blocks: Vec<BasicBlock>, values: ValueTable) -> MethodBody {
        MethodBody::new("test", ControlFlowGraph::from_blocks(blocks).unwrap(), values)
    }

    #[test]
    fn test_rejects_capture_guard() {
        let mut values = ValueTable::new();
        let _x = values.local("x");
        let blocks = vec![
            BasicBlock::new()
                .with_guard(
                    Guard::Compare {
                        op: CompareOp::Eq,
                        lhs: Operand::Capture(CaptureId::new(0)),
                        rhs: Operand::Null,
                    },
                    SourceSpan::new(0, 1),
                )
                .with_edge(Edge::conditional_true(BlockId::new(1)))
                .with_edge(Edge::conditional_false(BlockId::new(1))),
            BasicBlock::new(),
        ];
        let body = linear_body(blocks, values);
        let oracle = TableOracle::new();
        let rules = crate::rules::builtin_rules();
        assert!(matches!(
            SymbolicEngine::new(&body, &oracle, &rules, AnalysisLimits::default()),
            Err(Error::UnsupportedOperation(_))
        ));
    }

    #[test]
    fn test_budget_exhaustion_is_reported() {
        // A two-block loop that keeps producing fresh states would stop via
        // widening; a tiny budget trips first.
        let mut values = ValueTable::new();
        let i = values.local("i");
        let blocks = vec![
            BasicBlock::new()
                .with_op(
                    OperationKind::Assign {
                        target: i,
                        source: Operand::Int {
                            value: 0,
                            ty: IntType::I32,
                        },
                    },
                    SourceSpan::new(0, 1),
                )
                .with_edge(Edge::unconditional(BlockId::new(1))),
            BasicBlock::new()
                .with_op(
                    OperationKind::Binary {
                        op: crate::cfg::BinaryOp::Add,
                        lhs: Operand::Value(i),
                        rhs: Operand::Int {
                            value: 1,
                            ty: IntType::I32,
                        },
                        result: i,
                        ty: IntType::I32,
                    },
                    SourceSpan::new(1, 2),
                )
                .with_guard(
                    Guard::Compare {
                        op: CompareOp::Lt,
                        lhs: Operand::Value(i),
                        rhs: Operand::Int {
                            value: 1000,
                            ty: IntType::I32,
                        },
                    },
                    SourceSpan::new(2, 3),
                )
                .with_edge(Edge::conditional_true(BlockId::new(1)))
                .with_edge(Edge::conditional_false(BlockId::new(2))),
            BasicBlock::new().with_op(OperationKind::Return { value: None }, SourceSpan::new(3, 4)),
        ];
        let body = linear_body(blocks, values);
        let oracle = TableOracle::new();
        let rules = crate::rules::builtin_rules();
        let engine = SymbolicEngine::new(
            &body,
            &oracle,
            &rules,
            AnalysisLimits::default()
                .with_node_budget(2)
                .with_loop_visit_cap(1000),
        )
        .unwrap();
        let mut sink = VecSink::new();
        assert!(matches!(
            engine.run(&mut sink),
            Err(Error::BudgetExceeded { budget: 2, .. })
        ));
    }

    #[test]
    fn test_tagged_back_edge_loop_is_widened() {
        // 0 -> {1, 2}, 1 -> 2, 2 -> {3, 4}, 3 -> 1 (tagged back edge).
        // Block 1 does not dominate block 3, so only the tag makes it a loop
        // header; widening there must stabilize the counter states long
        // before a tight node budget runs out.
        let mut values = ValueTable::new();
        let i = values.local("i");
        let flag = values.parameter("flag");
        let blocks = vec![
            BasicBlock::new()
                .with_op(
                    OperationKind::Assign {
                        target: i,
                        source: Operand::Int {
                            value: 0,
                            ty: IntType::I32,
                        },
                    },
                    SourceSpan::new(0, 1),
                )
                .with_guard(Guard::Truth(flag), SourceSpan::new(1, 2))
                .with_edge(Edge::conditional_true(BlockId::new(1)))
                .with_edge(Edge::conditional_false(BlockId::new(2))),
            BasicBlock::new().with_edge(Edge::unconditional(BlockId::new(2))),
            BasicBlock::new()
                .with_op(
                    OperationKind::Binary {
                        op: crate::cfg::BinaryOp::Add,
                        lhs: Operand::Value(i),
                        rhs: Operand::Int {
                            value: 1,
                            ty: IntType::I32,
                        },
                        result: i,
                        ty: IntType::I32,
                    },
                    SourceSpan::new(2, 3),
                )
                .with_guard(
                    Guard::Compare {
                        op: CompareOp::Lt,
                        lhs: Operand::Value(i),
                        rhs: Operand::Int {
                            value: 1000,
                            ty: IntType::I32,
                        },
                    },
                    SourceSpan::new(3, 4),
                )
                .with_edge(Edge::conditional_true(BlockId::new(3)))
                .with_edge(Edge::conditional_false(BlockId::new(4))),
            BasicBlock::new().with_edge(Edge::loop_back(BlockId::new(1))),
            BasicBlock::new().with_op(OperationKind::Return { value: None }, SourceSpan::new(4, 5)),
        ];
        let body = linear_body(blocks, values);
        let oracle = TableOracle::new();
        let rules = crate::rules::builtin_rules();
        let engine = SymbolicEngine::new(
            &body,
            &oracle,
            &rules,
            AnalysisLimits::default().with_node_budget(200),
        )
        .unwrap();
        let mut sink = VecSink::new();
        assert!(engine.run(&mut sink).is_ok());
    }

    #[test]
    fn test_cancellation_stops_traversal() {
        let values = ValueTable::new();
        let blocks = vec![BasicBlock::new()];
        let body = linear_body(blocks, values);
        let oracle = TableOracle::new();
        let rules = crate::rules::builtin_rules();
        let cancel = AtomicBool::new(true);
        let engine = SymbolicEngine::new(&body, &oracle, &rules, AnalysisLimits::default())
            .unwrap()
            .with_cancellation(&cancel);
        let mut sink = VecSink::new();
        assert!(matches!(engine.run(&mut sink), Err(Error::Cancelled)));
    }
}
