//! Basic blocks and the operations they contain.
//!
//! Operations are a closed tagged union ([`OperationKind`]) rather than an open
//! visitor hierarchy: the engine's step function matches on them exhaustively, so
//! adding a new operation kind is a compile-time event for every consumer.
//!
//! The block-terminating condition is not an operation. Blocks with conditional
//! successor edges carry a [`Guard`], a small condition language the engine's
//! learn rules interpret to produce independently-constrained true/false
//! successor states. Short-circuit `&&`/`||`, ternaries and `??` do not appear
//! here: the front end lowers them into additional blocks and edges.

use std::fmt;

use crate::{
    cfg::Edge,
    value::{CaptureId, IntType, ValueId},
};

/// A half-open span of source text, used as the location unit for findings.
///
/// The engine never interprets spans; it only threads them from operations to
/// findings. Mapping spans back to files, lines and columns is the reporter's
/// concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SourceSpan {
    /// Inclusive start offset.
    pub start: u32,
    /// Exclusive end offset.
    pub end: u32,
}

impl SourceSpan {
    /// Creates a span covering `[start, end)`.
    #[must_use]
    pub const fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }
}

impl fmt::Display for SourceSpan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}..{})", self.start, self.end)
    }
}

/// An opaque reference to a callee, resolved through the symbol oracle.
///
/// The engine never inspects method names. Everything it needs to know about a
/// callee (purity, dispose/lock semantics, nullability postconditions) comes
/// from [`MethodInfo`](crate::oracle::MethodInfo) looked up by this reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MethodRef(u32);

impl MethodRef {
    /// Creates a method reference from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this reference.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for MethodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// An operand of an operation or guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operand {
    /// A trackable value.
    Value(ValueId),
    /// The `null` literal.
    Null,
    /// A boolean literal.
    Bool(bool),
    /// A typed integer literal.
    Int {
        /// The literal value, widened to `i128`.
        value: i128,
        /// The literal's declared type.
        ty: IntType,
    },
    /// A pending flow capture.
    Capture(CaptureId),
    /// An untracked expression; contributes no constraints.
    Unknown,
}

impl Operand {
    /// Returns the trackable value if this operand is one.
    #[must_use]
    pub const fn as_value(&self) -> Option<ValueId> {
        match self {
            Self::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns `true` if this operand is a compile-time literal.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Null | Self::Bool(_) | Self::Int { .. })
    }
}

/// Binary arithmetic and bitwise operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    /// Addition.
    Add,
    /// Subtraction.
    Sub,
    /// Multiplication.
    Mul,
    /// Division.
    Div,
    /// Remainder.
    Rem,
    /// Bitwise/logical and.
    And,
    /// Bitwise/logical or.
    Or,
    /// Bitwise/logical exclusive or.
    Xor,
}

impl BinaryOp {
    /// Returns `true` if this operator participates in overflow analysis.
    #[must_use]
    pub const fn can_overflow(&self) -> bool {
        matches!(self, Self::Add | Self::Sub | Self::Mul)
    }
}

/// Comparison operators usable in guards and materialized comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
    /// Equality.
    Eq,
    /// Inequality.
    Ne,
    /// Less than.
    Lt,
    /// Less than or equal.
    Le,
    /// Greater than.
    Gt,
    /// Greater than or equal.
    Ge,
}

impl CompareOp {
    /// Returns the comparison that holds exactly when this one does not.
    #[must_use]
    pub const fn negated(self) -> Self {
        match self {
            Self::Eq => Self::Ne,
            Self::Ne => Self::Eq,
            Self::Lt => Self::Ge,
            Self::Le => Self::Gt,
            Self::Gt => Self::Le,
            Self::Ge => Self::Lt,
        }
    }

    /// Returns the comparison with its operands swapped (`a < b` ⇒ `b > a`).
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Eq => Self::Eq,
            Self::Ne => Self::Ne,
            Self::Lt => Self::Gt,
            Self::Le => Self::Ge,
            Self::Gt => Self::Lt,
            Self::Ge => Self::Le,
        }
    }
}

/// The shape of a constructor call, as far as emptiness reasoning cares.
///
/// Collection emptiness is learned from how the object was constructed, not
/// from its type: a default constructor yields a provably-empty collection, a
/// collection initializer yields an exact element count, and construction from
/// an arbitrary enumerable yields nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CtorShape {
    /// A non-collection object; learns `NotNull` and `NotDisposed` only.
    Object,
    /// Default collection constructor: the collection is exactly empty.
    EmptyCollection,
    /// Collection initializer with a known element count.
    PopulatedCollection {
        /// Number of elements in the initializer.
        count: u32,
    },
    /// Collection constructed from an enumerable of unknown size.
    UnknownCollection,
}

/// The controlling condition of a conditional branch.
///
/// Each variant corresponds to a learn-rule trigger: given the program state at
/// the branch, the engine derives a constrained state for the true successor
/// and an independently constrained state for the false successor, and declares
/// a side infeasible when its constraints contradict the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// `if (flag)` — the truth of a tracked boolean value.
    Truth(ValueId),
    /// `if (lhs <op> rhs)` — comparison between two operands.
    ///
    /// Comparison against the `null` literal doubles as the nullability learn
    /// trigger; comparison between two tracked values also records a relation.
    Compare {
        /// The comparison operator.
        op: CompareOp,
        /// Left operand.
        lhs: Operand,
        /// Right operand.
        rhs: Operand,
    },
    /// `x is T` — a type pattern; its true branch implies `x` is not null.
    IsType(ValueId),
    /// `x.HasValue` on a nullable value type.
    HasValue(ValueId),
    /// `string.IsNullOrEmpty(x)` / `IsNullOrWhiteSpace(x)`.
    ///
    /// Both branches constrain: the false branch learns `NotNull` (and
    /// non-emptiness), the true branch learns nothing about nullability since
    /// either `null` or `""` satisfies it.
    NullOrEmpty(ValueId),
    /// A call whose boolean result carries a `[NotNullWhen(when)]` contract
    /// for `arg`, as reported by the symbol oracle.
    NotNullWhen {
        /// The argument constrained by the postcondition.
        arg: ValueId,
        /// The result value for which the argument is known non-null.
        when: bool,
    },
    /// A compile-time boolean literal. One successor is trivially infeasible,
    /// but no constant-condition finding fires for literals.
    Literal(bool),
    /// Logical negation of another guard.
    Not(Box<Guard>),
}

/// The closed set of operation kinds the engine can step over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationKind {
    /// `target = source`.
    Assign {
        /// The storage location written.
        target: ValueId,
        /// The value read.
        source: Operand,
    },
    /// A member access that dereferences a reference (`x.M`, `x.ToString()`
    /// receivers, field loads through `x`). Throws on a null receiver.
    Dereference {
        /// The dereferenced value.
        value: ValueId,
    },
    /// `.Value` access on a nullable value type. Throws when the nullable is
    /// empty.
    NullableValue {
        /// The nullable value accessed.
        value: ValueId,
        /// Where the unwrapped value is stored, if anywhere.
        result: Option<ValueId>,
    },
    /// `result = lhs <op> rhs` arithmetic.
    Binary {
        /// The operator.
        op: BinaryOp,
        /// Left operand.
        lhs: Operand,
        /// Right operand.
        rhs: Operand,
        /// The storage location written.
        result: ValueId,
        /// The integer type the arithmetic is performed in.
        ty: IntType,
    },
    /// `result = lhs <op> rhs` materialized into a boolean value.
    Compare {
        /// The comparison operator.
        op: CompareOp,
        /// Left operand.
        lhs: Operand,
        /// Right operand.
        rhs: Operand,
        /// The storage location written.
        result: ValueId,
    },
    /// `result = !source` on a tracked boolean.
    Not {
        /// The negated value.
        source: ValueId,
        /// The storage location written.
        result: ValueId,
    },
    /// Object or collection construction.
    New {
        /// The storage location receiving the fresh object.
        result: ValueId,
        /// Constructor shape for emptiness learning.
        shape: CtorShape,
    },
    /// Method invocation.
    Invoke {
        /// The callee, resolved through the symbol oracle.
        method: MethodRef,
        /// The receiver for instance calls; dereferenced before the call.
        receiver: Option<ValueId>,
        /// By-value arguments.
        args: Vec<Operand>,
        /// Arguments passed by `ref`/`out`; conservatively invalidated.
        by_ref_args: Vec<ValueId>,
        /// The storage location receiving the result, if used.
        result: Option<ValueId>,
    },
    /// Writes a sub-expression into a flow capture slot.
    WriteCapture {
        /// The capture slot.
        capture: CaptureId,
        /// The captured operand.
        source: Operand,
    },
    /// Consumes a flow capture into a storage location.
    ConsumeCapture {
        /// The capture slot, emptied by this operation.
        capture: CaptureId,
        /// The storage location written.
        target: ValueId,
    },
    /// Returns from the method.
    Return {
        /// The returned operand, if any.
        value: Option<Operand>,
    },
    /// Explicitly throws. Control leaves along exception edges only.
    Throw,
}

impl OperationKind {
    /// Returns `true` if this operation can transfer control to an exception
    /// handler.
    ///
    /// Invocations may throw anything; dereferences and nullable accesses throw
    /// on null; division and remainder throw on a zero divisor; `Throw` always
    /// throws.
    #[must_use]
    pub fn can_throw(&self) -> bool {
        match self {
            Self::Invoke { .. }
            | Self::Dereference { .. }
            | Self::NullableValue { .. }
            | Self::Throw => true,
            Self::Binary { op, .. } => matches!(op, BinaryOp::Div | BinaryOp::Rem),
            _ => false,
        }
    }
}

/// An operation together with its source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operation {
    /// What the operation does.
    pub kind: OperationKind,
    /// Where it is in the source.
    pub span: SourceSpan,
}

impl Operation {
    /// Creates an operation at the given span.
    #[must_use]
    pub const fn new(kind: OperationKind, span: SourceSpan) -> Self {
        Self { kind, span }
    }
}

/// A basic block: an ordered operation sequence, an optional branch guard, and
/// outgoing edges.
///
/// Blocks are stored in an index-addressed arena owned by the
/// [`ControlFlowGraph`](crate::cfg::ControlFlowGraph); a block's
/// [`BlockId`](crate::cfg::BlockId) is its position in that arena. The block
/// holds no back-references, so a single CFG arena can be shared read-only by
/// arbitrarily many exploded-graph nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicBlock {
    /// The operations executed sequentially when control enters the block.
    pub operations: Vec<Operation>,
    /// The controlling condition, present iff the block has conditional edges.
    pub guard: Option<Guard>,
    /// The source span of the controlling condition.
    pub guard_span: SourceSpan,
    /// Outgoing edges, in front-end order.
    pub edges: Vec<Edge>,
}

impl BasicBlock {
    /// Creates an empty block with no successors.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation; returns `self` for chaining in builders and tests.
    #[must_use]
    pub fn with_op(mut self, kind: OperationKind, span: SourceSpan) -> Self {
        self.operations.push(Operation::new(kind, span));
        self
    }

    /// Sets the branch guard; returns `self` for chaining.
    #[must_use]
    pub fn with_guard(mut self, guard: Guard, span: SourceSpan) -> Self {
        self.guard = Some(guard);
        self.guard_span = span;
        self
    }

    /// Appends an outgoing edge; returns `self` for chaining.
    #[must_use]
    pub fn with_edge(mut self, edge: Edge) -> Self {
        self.edges.push(edge);
        self
    }

    /// Returns `true` if the block ends the method (no normal successors).
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !self.edges.iter().any(|e| e.kind.is_normal())
    }

    /// Returns the exception/finally successors of this block.
    pub fn handler_edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.iter().filter(|e| e.kind.is_exceptional())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::BlockId;

    #[test]
    fn test_compare_op_negation() {
        assert_eq!(CompareOp::Eq.negated(), CompareOp::Ne);
        assert_eq!(CompareOp::Lt.negated(), CompareOp::Ge);
        assert_eq!(CompareOp::Ge.negated(), CompareOp::Lt);
        for op in [
            CompareOp::Eq,
            CompareOp::Ne,
            CompareOp::Lt,
            CompareOp::Le,
            CompareOp::Gt,
            CompareOp::Ge,
        ] {
            assert_eq!(op.negated().negated(), op);
            assert_eq!(op.flipped().flipped(), op);
        }
    }

    #[test]
    fn test_operation_can_throw() {
        let v = ValueId::new(0);
        assert!(OperationKind::Dereference { value: v }.can_throw());
        assert!(OperationKind::Throw.can_throw());
        assert!(OperationKind::Binary {
            op: BinaryOp::Div,
            lhs: Operand::Value(v),
            rhs: Operand::Int {
                value: 2,
                ty: IntType::I32
            },
            result: v,
            ty: IntType::I32,
        }
        .can_throw());
        assert!(!OperationKind::Assign {
            target: v,
            source: Operand::Null
        }
        .can_throw());
        assert!(!OperationKind::Binary {
            op: BinaryOp::Add,
            lhs: Operand::Value(v),
            rhs: Operand::Value(v),
            result: v,
            ty: IntType::I32,
        }
        .can_throw());
    }

    #[test]
    fn test_block_terminal_classification() {
        let terminal = BasicBlock::new().with_op(
            OperationKind::Return { value: None },
            SourceSpan::new(0, 1),
        );
        assert!(terminal.is_terminal());

        let branching = BasicBlock::new()
            .with_edge(Edge::conditional_true(BlockId::new(1)))
            .with_edge(Edge::conditional_false(BlockId::new(2)));
        assert!(!branching.is_terminal());

        // A block whose only successor is a handler is still terminal for
        // normal flow.
        let throwing = BasicBlock::new().with_edge(Edge::exception(BlockId::new(3)));
        assert!(throwing.is_terminal());
        assert_eq!(throwing.handler_edges().count(), 1);
    }

    #[test]
    fn test_operand_helpers() {
        assert!(Operand::Null.is_literal());
        assert!(Operand::Bool(true).is_literal());
        assert!(!Operand::Unknown.is_literal());
        assert_eq!(
            Operand::Value(ValueId::new(2)).as_value(),
            Some(ValueId::new(2))
        );
        assert_eq!(Operand::Null.as_value(), None);
    }
}
