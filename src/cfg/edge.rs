//! Control flow edge types for the CFG.
//!
//! This module defines the edge representations used in the control flow graph,
//! providing semantic information about how control flows between basic blocks.

use crate::cfg::BlockId;

/// The kind of control flow represented by an edge.
///
/// This enum classifies edges by their control flow semantics, which is what
/// branch splitting, loop counting, and exception propagation key on.
///
/// # Examples
///
/// ```rust
/// use flowscope::cfg::EdgeKind;
///
/// let edge_kind = EdgeKind::ConditionalTrue;
/// assert!(edge_kind.is_conditional());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    /// Unconditional control flow (direct jump or fall-through).
    Unconditional,

    /// The "true" branch of a conditional.
    ///
    /// Taken when the block's guard evaluates to true. Short-circuit operators,
    /// ternaries and null-coalescing are lowered by the front end into extra
    /// blocks connected with these edges.
    ConditionalTrue,

    /// The "false" branch of a conditional (fall-through).
    ConditionalFalse,

    /// Edge to an exception handler.
    ///
    /// Any throwing operation in the source block may transfer control along
    /// this edge with a state where only operations strictly before the throw
    /// point have taken effect.
    Exception,

    /// Edge into a `finally` region.
    ///
    /// Like [`Exception`](Self::Exception) edges, these are live for every
    /// throwing operation in the source block, and additionally for its normal
    /// exit.
    FinallyEntry,

    /// A back edge closing a loop.
    ///
    /// Front ends that know their loop structure tag back edges explicitly;
    /// the graph additionally detects back edges itself via dominance, so the
    /// tag is informative rather than load-bearing.
    LoopBack,
}

impl EdgeKind {
    /// Returns `true` if this is a conditional branch edge.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flowscope::cfg::EdgeKind;
    ///
    /// assert!(EdgeKind::ConditionalTrue.is_conditional());
    /// assert!(EdgeKind::ConditionalFalse.is_conditional());
    /// assert!(!EdgeKind::Unconditional.is_conditional());
    /// ```
    #[must_use]
    pub const fn is_conditional(&self) -> bool {
        matches!(self, Self::ConditionalTrue | Self::ConditionalFalse)
    }

    /// Returns `true` if this is an exception-related edge.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use flowscope::cfg::EdgeKind;
    ///
    /// assert!(EdgeKind::Exception.is_exceptional());
    /// assert!(EdgeKind::FinallyEntry.is_exceptional());
    /// assert!(!EdgeKind::Unconditional.is_exceptional());
    /// ```
    #[must_use]
    pub const fn is_exceptional(&self) -> bool {
        matches!(self, Self::Exception | Self::FinallyEntry)
    }

    /// Returns `true` if normal (non-exceptional) control flow can take this edge.
    #[must_use]
    pub const fn is_normal(&self) -> bool {
        !matches!(self, Self::Exception)
    }
}

/// An edge in the control flow graph.
///
/// Each edge connects a source block to a target block and carries semantic
/// information about the type of control flow.
///
/// # Examples
///
/// ```rust
/// use flowscope::cfg::{BlockId, Edge, EdgeKind};
///
/// let edge = Edge::unconditional(BlockId::new(1));
/// assert_eq!(edge.target, BlockId::new(1));
/// assert!(!edge.kind.is_conditional());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    /// The target block of this edge.
    pub target: BlockId,
    /// The kind of control flow this edge represents.
    pub kind: EdgeKind,
}

impl Edge {
    /// Creates a new CFG edge.
    #[must_use]
    pub const fn new(target: BlockId, kind: EdgeKind) -> Self {
        Self { target, kind }
    }

    /// Creates an unconditional edge to the target block.
    #[must_use]
    pub const fn unconditional(target: BlockId) -> Self {
        Self::new(target, EdgeKind::Unconditional)
    }

    /// Creates a conditional true edge to the target block.
    #[must_use]
    pub const fn conditional_true(target: BlockId) -> Self {
        Self::new(target, EdgeKind::ConditionalTrue)
    }

    /// Creates a conditional false edge to the target block.
    #[must_use]
    pub const fn conditional_false(target: BlockId) -> Self {
        Self::new(target, EdgeKind::ConditionalFalse)
    }

    /// Creates an exception handler edge to the target block.
    #[must_use]
    pub const fn exception(target: BlockId) -> Self {
        Self::new(target, EdgeKind::Exception)
    }

    /// Creates a finally-entry edge to the target block.
    #[must_use]
    pub const fn finally_entry(target: BlockId) -> Self {
        Self::new(target, EdgeKind::FinallyEntry)
    }

    /// Creates an explicitly-tagged loop back edge to the target block.
    #[must_use]
    pub const fn loop_back(target: BlockId) -> Self {
        Self::new(target, EdgeKind::LoopBack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edge_kind_is_conditional() {
        assert!(!EdgeKind::Unconditional.is_conditional());
        assert!(EdgeKind::ConditionalTrue.is_conditional());
        assert!(EdgeKind::ConditionalFalse.is_conditional());
        assert!(!EdgeKind::Exception.is_conditional());
        assert!(!EdgeKind::FinallyEntry.is_conditional());
        assert!(!EdgeKind::LoopBack.is_conditional());
    }

    #[test]
    fn test_edge_kind_is_exceptional() {
        assert!(EdgeKind::Exception.is_exceptional());
        assert!(EdgeKind::FinallyEntry.is_exceptional());
        assert!(!EdgeKind::Unconditional.is_exceptional());
        assert!(!EdgeKind::ConditionalTrue.is_exceptional());
        assert!(!EdgeKind::LoopBack.is_exceptional());
    }

    #[test]
    fn test_edge_kind_is_normal() {
        assert!(EdgeKind::Unconditional.is_normal());
        assert!(EdgeKind::FinallyEntry.is_normal());
        assert!(!EdgeKind::Exception.is_normal());
    }

    #[test]
    fn test_edge_factory_methods() {
        let t = BlockId::new(4);
        assert_eq!(Edge::unconditional(t).kind, EdgeKind::Unconditional);
        assert_eq!(Edge::conditional_true(t).kind, EdgeKind::ConditionalTrue);
        assert_eq!(Edge::conditional_false(t).kind, EdgeKind::ConditionalFalse);
        assert_eq!(Edge::exception(t).kind, EdgeKind::Exception);
        assert_eq!(Edge::finally_entry(t).kind, EdgeKind::FinallyEntry);
        assert_eq!(Edge::loop_back(t).kind, EdgeKind::LoopBack);
        assert_eq!(Edge::loop_back(t).target, t);
    }
}
