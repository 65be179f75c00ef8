//! Control flow graph model.
//!
//! This module is the engine's input boundary: an external CFG provider lowers
//! a method body into [`BasicBlock`]s of tagged-union [`Operation`]s connected
//! by typed [`Edge`]s, and the engine consumes the result read-only.
//!
//! The provider contract, in brief:
//!
//! - Block 0 is the method entry.
//! - Short-circuit `&&`/`||`, ternaries, `??` and pattern matches are lowered
//!   into explicit blocks, conditional edges and flow captures.
//! - Every instruction inside a `try` region gets an [`EdgeKind::Exception`]
//!   edge from its block to the handler, and a [`EdgeKind::FinallyEntry`] edge
//!   where a `finally` exists; `goto` into protected regions must still produce
//!   correct predecessor lists.
//! - Loops appear as back edges, optionally tagged [`EdgeKind::LoopBack`].

mod block;
mod dominators;
mod edge;
mod graph;

pub use block::{
    BasicBlock, BinaryOp, CompareOp, CtorShape, Guard, MethodRef, Operand, Operation,
    OperationKind, SourceSpan,
};
pub use dominators::DominatorTree;
pub use edge::{Edge, EdgeKind};
pub use graph::{BlockId, ControlFlowGraph, NaturalLoop};

use crate::value::ValueTable;

/// A method body as handed to the engine: the CFG, the value table, and the
/// method-level context the analysis needs.
#[derive(Debug)]
pub struct MethodBody {
    /// Diagnostic name of the method.
    pub name: String,
    /// The control flow graph.
    pub cfg: ControlFlowGraph,
    /// Trackable-value descriptors for this body.
    pub values: ValueTable,
    /// `true` when the whole method is compiled in an `unchecked` context.
    ///
    /// Overflow findings are suppressed for the entire method in that case.
    pub unchecked_context: bool,
}

impl MethodBody {
    /// Creates a method body with default (checked) context.
    #[must_use]
    pub fn new(name: &str, cfg: ControlFlowGraph, values: ValueTable) -> Self {
        Self {
            name: name.to_string(),
            cfg,
            values,
            unchecked_context: false,
        }
    }
}
