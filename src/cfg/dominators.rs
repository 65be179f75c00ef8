//! Dominator tree computation.
//!
//! A node `d` **dominates** a node `n` if every path from the entry node to `n`
//! must pass through `d`. The **immediate dominator** of `n` is the unique node
//! that strictly dominates `n` but does not strictly dominate any other
//! dominator of `n`.
//!
//! Loop detection keys on dominance: an edge `n -> h` is a back edge exactly
//! when `h` dominates `n`.
//!
//! # Algorithm
//!
//! This implementation uses the iterative Cooper-Harvey-Kennedy algorithm over
//! reverse postorder. It is O(V·E) in the worst case but converges in one or
//! two passes on the reducible graphs method bodies produce, and its constant
//! factor beats Lengauer-Tarjan at CFG sizes.

use crate::cfg::{BlockId, ControlFlowGraph};

/// Result of dominator tree computation.
///
/// Each reachable node except the entry has exactly one immediate dominator.
/// Unreachable nodes have none and dominate only themselves.
#[derive(Debug, Clone)]
pub struct DominatorTree {
    /// The entry (root) node.
    entry: BlockId,
    /// Immediate dominator per node. The entry maps to itself; unreachable
    /// nodes map to `None`.
    idom: Vec<Option<BlockId>>,
}

impl DominatorTree {
    /// Computes the dominator tree of a control flow graph.
    #[must_use]
    pub fn compute(cfg: &ControlFlowGraph) -> Self {
        let entry = cfg.entry();
        let rpo = cfg.reverse_postorder();

        // Position of each node in reverse postorder, for the intersect walk.
        let mut rpo_index = vec![usize::MAX; cfg.block_count()];
        for (i, &block) in rpo.iter().enumerate() {
            rpo_index[block.index()] = i;
        }

        let mut idom: Vec<Option<BlockId>> = vec![None; cfg.block_count()];
        idom[entry.index()] = Some(entry);

        let mut changed = true;
        while changed {
            changed = false;
            for &block in rpo.iter().skip(1) {
                // First processed predecessor seeds the intersection.
                let mut new_idom: Option<BlockId> = None;
                for pred in cfg.predecessors(block) {
                    if idom[pred.index()].is_none() {
                        continue;
                    }
                    new_idom = Some(match new_idom {
                        None => pred,
                        Some(current) => Self::intersect(&idom, &rpo_index, pred, current),
                    });
                }
                if let Some(new_idom) = new_idom {
                    if idom[block.index()] != Some(new_idom) {
                        idom[block.index()] = Some(new_idom);
                        changed = true;
                    }
                }
            }
        }

        Self { entry, idom }
    }

    /// Walks two dominator chains upward until they meet.
    fn intersect(
        idom: &[Option<BlockId>],
        rpo_index: &[usize],
        mut a: BlockId,
        mut b: BlockId,
    ) -> BlockId {
        while a != b {
            while rpo_index[a.index()] > rpo_index[b.index()] {
                a = idom[a.index()].unwrap_or(a);
            }
            while rpo_index[b.index()] > rpo_index[a.index()] {
                b = idom[b.index()].unwrap_or(b);
            }
        }
        a
    }

    /// Returns the entry (root) node of the dominator tree.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        self.entry
    }

    /// Returns the immediate dominator of a node.
    ///
    /// Returns `None` for the entry node and for unreachable nodes.
    #[must_use]
    pub fn immediate_dominator(&self, node: BlockId) -> Option<BlockId> {
        if node == self.entry {
            None
        } else {
            self.idom.get(node.index()).copied().flatten()
        }
    }

    /// Checks if node `a` dominates node `b`.
    ///
    /// A node dominates itself. The entry node dominates all reachable nodes.
    /// Nothing dominates an unreachable node except the node itself.
    #[must_use]
    pub fn dominates(&self, a: BlockId, b: BlockId) -> bool {
        if a == b {
            return true;
        }
        let mut current = b;
        while current != self.entry {
            match self.idom.get(current.index()).copied().flatten() {
                Some(idom) if idom == a => return true,
                Some(idom) => current = idom,
                None => return false,
            }
        }
        a == self.entry
    }

    /// Checks if node `a` strictly dominates node `b` (dominates and `a != b`).
    #[must_use]
    pub fn strictly_dominates(&self, a: BlockId, b: BlockId) -> bool {
        a != b && self.dominates(a, b)
    }
}

#[cfg(test)]
mod tests {
    use crate::cfg::{BasicBlock, BlockId, ControlFlowGraph, Edge, Guard};

    fn block_to(successors: &[Edge]) -> BasicBlock {
        let mut b = BasicBlock::new();
        b.edges = successors.to_vec();
        // Conditional edges require a guard to pass construction validation.
        if successors.iter().any(|e| e.kind.is_conditional()) {
            b.guard = Some(Guard::Literal(true));
        }
        b
    }

    fn diamond() -> ControlFlowGraph {
        // 0 -> {1, 2} -> 3
        ControlFlowGraph::from_blocks(vec![
            block_to(&[
                Edge::conditional_true(BlockId::new(1)),
                Edge::conditional_false(BlockId::new(2)),
            ]),
            block_to(&[Edge::unconditional(BlockId::new(3))]),
            block_to(&[Edge::unconditional(BlockId::new(3))]),
            block_to(&[]),
        ])
        .unwrap()
    }

    #[test]
    fn test_diamond_dominators() {
        let cfg = diamond();
        let dom = cfg.dominators();
        let b = BlockId::new;

        assert_eq!(dom.immediate_dominator(b(0)), None);
        assert_eq!(dom.immediate_dominator(b(1)), Some(b(0)));
        assert_eq!(dom.immediate_dominator(b(2)), Some(b(0)));
        // Neither arm dominates the join point.
        assert_eq!(dom.immediate_dominator(b(3)), Some(b(0)));
        assert!(dom.dominates(b(0), b(3)));
        assert!(!dom.dominates(b(1), b(3)));
        assert!(!dom.dominates(b(2), b(3)));
        assert!(dom.strictly_dominates(b(0), b(1)));
        assert!(!dom.strictly_dominates(b(1), b(1)));
    }

    #[test]
    fn test_loop_header_dominates_body() {
        // 0 -> 1 -> 2 -> 1 (back edge), 2 -> 3
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[Edge::unconditional(BlockId::new(2))]),
            block_to(&[
                Edge::conditional_true(BlockId::new(1)),
                Edge::conditional_false(BlockId::new(3)),
            ]),
            block_to(&[]),
        ])
        .unwrap();

        let dom = cfg.dominators();
        assert!(dom.dominates(BlockId::new(1), BlockId::new(2)));
        assert!(!dom.dominates(BlockId::new(2), BlockId::new(1)));
    }

    #[test]
    fn test_unreachable_node() {
        // Block 2 has no predecessors.
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[]),
            block_to(&[Edge::unconditional(BlockId::new(1))]),
        ])
        .unwrap();

        let dom = cfg.dominators();
        assert_eq!(dom.immediate_dominator(BlockId::new(2)), None);
        assert!(!dom.dominates(BlockId::new(0), BlockId::new(2)));
        assert!(dom.dominates(BlockId::new(2), BlockId::new(2)));
    }
}
