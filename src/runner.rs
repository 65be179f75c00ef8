//! The cross-method driver.
//!
//! Method analyses are independent by construction (no cross-method fact
//! sharing), so the driver is an embarrassingly-parallel map: one engine and
//! worklist per method, findings appended to a shared lock-free sink. A
//! failed or abandoned method is logged and swallowed; its findings emitted
//! before the failure stand, and no other method is affected.

use std::sync::atomic::AtomicBool;

use log::{debug, warn};
use rayon::prelude::*;

use crate::{
    cfg::MethodBody,
    engine::{AnalysisLimits, SymbolicEngine},
    oracle::SymbolOracle,
    rules::{Finding, FindingSink, RuleSet, SharedSink},
    Error,
};

/// Analyzes a batch of method bodies in parallel, returning all findings.
///
/// Findings arrive in nondeterministic order across methods; callers that
/// need a stable order sort by span. An optional cancellation flag stops all
/// in-flight analyses cooperatively at their next block boundary.
#[must_use]
pub fn analyze_methods(
    bodies: &[MethodBody],
    oracle: &dyn SymbolOracle,
    rules: &RuleSet,
    limits: AnalysisLimits,
    cancel: Option<&AtomicBool>,
) -> Vec<Finding> {
    let sink = SharedSink::new();

    bodies.par_iter().for_each(|body| {
        let mut handle = sink.clone();
        analyze_one(body, oracle, rules, limits, cancel, &mut handle);
    });

    sink.findings()
}

fn analyze_one(
    body: &MethodBody,
    oracle: &dyn SymbolOracle,
    rules: &RuleSet,
    limits: AnalysisLimits,
    cancel: Option<&AtomicBool>,
    sink: &mut dyn FindingSink,
) {
    let engine = match SymbolicEngine::new(body, oracle, rules, limits) {
        Ok(engine) => engine,
        Err(e) => {
            warn!("skipping {}: {e}", body.name);
            return;
        }
    };
    let engine = match cancel {
        Some(flag) => engine.with_cancellation(flag),
        None => engine,
    };
    match engine.run(sink) {
        Ok(summary) => {
            debug!("{}: explored {} nodes", body.name, summary.nodes_explored);
        }
        Err(Error::Cancelled) => {
            debug!("{}: cancelled", body.name);
        }
        Err(e) => {
            // Findings emitted before the failure stand.
            warn!("{}: analysis abandoned: {e}", body.name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cfg::{
            BasicBlock, BlockId, ControlFlowGraph, Edge, Guard, Operand, OperationKind, SourceSpan,
        },
        oracle::TableOracle,
        rules::{builtin_rules, RuleId},
        value::ValueTable,
    };

    fn null_deref_body(name: &str) -> MethodBody {
        let mut values = ValueTable::new();
        let x = values.local("x");
        let blocks = vec![BasicBlock::new()
            .with_op(
                OperationKind::Assign {
                    target: x,
                    source: Operand::Null,
                },
                SourceSpan::new(0, 1),
            )
            .with_op(OperationKind::Dereference { value: x }, SourceSpan::new(2, 3))
            .with_op(OperationKind::Return { value: None }, SourceSpan::new(4, 5))];
        MethodBody::new(name, ControlFlowGraph::from_blocks(blocks).unwrap(), values)
    }

    #[test]
    fn test_parallel_batch_collects_all_methods() {
        let bodies: Vec<MethodBody> = (0..8)
            .map(|i| null_deref_body(&format!("m{i}")))
            .collect();
        let oracle = TableOracle::new();
        let rules = builtin_rules();

        let findings = analyze_methods(&bodies, &oracle, &rules, AnalysisLimits::default(), None);
        assert_eq!(findings.len(), 8);
        assert!(findings.iter().all(|f| f.rule == RuleId::NullDereference));
    }

    #[test]
    fn test_bad_method_does_not_abort_batch() {
        // One method with a guard on a capture is rejected at construction;
        // the other still analyzes.
        use crate::{cfg::CompareOp, value::CaptureId};

        let mut values = ValueTable::new();
        let _x = values.local("x");
        let bad_blocks = vec![
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
        let bad = MethodBody::new(
            "bad",
            ControlFlowGraph::from_blocks(bad_blocks).unwrap(),
            values,
        );
        let bodies = vec![bad, null_deref_body("good")];

        let oracle = TableOracle::new();
        let rules = builtin_rules();
        let findings = analyze_methods(&bodies, &oracle, &rules, AnalysisLimits::default(), None);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].rule, RuleId::NullDereference);
    }

    #[test]
    fn test_pre_cancelled_run_emits_nothing() {
        let bodies = vec![null_deref_body("m")];
        let oracle = TableOracle::new();
        let rules = builtin_rules();
        let cancel = AtomicBool::new(true);

        let findings = analyze_methods(
            &bodies,
            &oracle,
            &rules,
            AnalysisLimits::default(),
            Some(&cancel),
        );
        assert!(findings.is_empty());
    }
}
