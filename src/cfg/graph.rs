//! Control Flow Graph implementation.
//!
//! This module provides the main [`ControlFlowGraph`] structure: an immutable,
//! index-addressed arena of basic blocks with predecessor/successor queries,
//! traversal orders, dominator trees and natural-loop detection.
//!
//! The arena representation is deliberate: during symbolic execution, many
//! exploded-graph nodes reference the same CFG concurrently. Blocks are
//! referenced by [`BlockId`] (their arena index), never by pointer, so sharing
//! the graph read-only across states and threads costs nothing.

use std::{
    collections::{HashSet, VecDeque},
    fmt,
    sync::OnceLock,
};

use crate::{
    cfg::{BasicBlock, DominatorTree, EdgeKind},
    Error::GraphError,
    Result,
};

/// Identifies a basic block by its index in the CFG arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(u32);

impl BlockId {
    /// Creates a block id from a raw index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index of this id.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "B{}", self.0)
    }
}

/// Information about a natural loop in the control flow graph.
///
/// A natural loop is a strongly connected region with a single entry point (the
/// header). Back edges are edges from within the loop to the header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NaturalLoop {
    /// The header block of the loop (single entry point).
    pub header: BlockId,
    /// All blocks that are part of the loop body (including the header).
    pub body: HashSet<BlockId>,
    /// Back edge sources (nodes within the loop that jump to the header).
    pub back_edges: Vec<BlockId>,
    /// Depth of this loop in the loop nest (0 = outermost).
    pub depth: usize,
}

impl NaturalLoop {
    fn new(header: BlockId) -> Self {
        let mut body = HashSet::new();
        body.insert(header);
        Self {
            header,
            body,
            back_edges: Vec::new(),
            depth: 0,
        }
    }

    /// Returns `true` if this loop contains the given block.
    #[must_use]
    pub fn contains(&self, block: BlockId) -> bool {
        self.body.contains(&block)
    }

    /// Returns the number of blocks in the loop body, including the header.
    #[must_use]
    pub fn size(&self) -> usize {
        self.body.len()
    }
}

/// A control flow graph over an arena of basic blocks.
///
/// # Construction
///
/// Build a CFG from the blocks the front end produced with
/// [`from_blocks`](Self::from_blocks). Block 0 is always the method entry.
/// Construction validates that the block list is non-empty and every edge
/// target is in range; a CFG provider violating either has broken its contract
/// and gets [`Error::GraphError`](crate::Error::GraphError).
///
/// # Lazy Computation
///
/// Dominators, loops and reachability are computed lazily on first access and
/// cached with [`OnceLock`], so the graph is [`Send`] and [`Sync`] and cheap to
/// share across parallel method analyses.
#[derive(Debug)]
pub struct ControlFlowGraph {
    /// The block arena; a block's id is its index here.
    blocks: Vec<BasicBlock>,
    /// Predecessors per block, derived from edges at construction.
    predecessors: Vec<Vec<BlockId>>,
    /// Lazily computed dominator tree.
    dominators: OnceLock<DominatorTree>,
    /// Lazily computed loop information.
    loops: OnceLock<Vec<NaturalLoop>>,
    /// Lazily computed reachability from the entry block.
    reachable: OnceLock<Vec<bool>>,
}

impl ControlFlowGraph {
    /// Creates a control flow graph from a vector of basic blocks.
    ///
    /// Block 0 becomes the entry block.
    ///
    /// # Errors
    ///
    /// Returns [`Error::GraphError`](crate::Error::GraphError) if the block
    /// list is empty, an edge target index is out of range, or a block carries
    /// conditional edges without a guard (or a guard without conditional
    /// edges).
    pub fn from_blocks(blocks: Vec<BasicBlock>) -> Result<Self> {
        if blocks.is_empty() {
            return Err(GraphError(
                "cannot create CFG from empty block list".to_string(),
            ));
        }

        let block_count = blocks.len();
        let mut predecessors: Vec<Vec<BlockId>> = vec![Vec::new(); block_count];

        for (block_idx, block) in blocks.iter().enumerate() {
            let has_conditional = block.edges.iter().any(|e| e.kind.is_conditional());
            if has_conditional && block.guard.is_none() {
                return Err(GraphError(format!(
                    "block {block_idx} has conditional edges but no guard"
                )));
            }
            if !has_conditional && block.guard.is_some() {
                return Err(GraphError(format!(
                    "block {block_idx} has a guard but no conditional edges"
                )));
            }

            for edge in &block.edges {
                if edge.target.index() >= block_count {
                    return Err(GraphError(format!(
                        "block {block_idx} has edge target {} which exceeds block count {block_count}",
                        edge.target
                    )));
                }
                predecessors[edge.target.index()].push(BlockId::new(block_idx as u32));
            }
        }

        Ok(Self {
            blocks,
            predecessors,
            dominators: OnceLock::new(),
            loops: OnceLock::new(),
            reachable: OnceLock::new(),
        })
    }

    /// Returns the entry block id. The method entry is always block 0.
    #[must_use]
    pub const fn entry(&self) -> BlockId {
        BlockId::new(0)
    }

    /// Returns the number of blocks in the CFG.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Returns a reference to the basic block at the given id.
    #[must_use]
    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(id.index())
    }

    /// Returns an iterator over all block ids in arena order.
    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        (0..self.blocks.len()).map(|i| BlockId::new(i as u32))
    }

    /// Returns the successor block ids of a block, in edge order.
    pub fn successors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks
            .get(id.index())
            .into_iter()
            .flat_map(|b| b.edges.iter().map(|e| e.target))
    }

    /// Returns the predecessor block ids of a block.
    pub fn predecessors(&self, id: BlockId) -> impl Iterator<Item = BlockId> + '_ {
        self.predecessors
            .get(id.index())
            .into_iter()
            .flatten()
            .copied()
    }

    /// Returns the terminal blocks (no normal successors).
    pub fn exits(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks
            .iter()
            .enumerate()
            .filter(|(_, b)| b.is_terminal())
            .map(|(i, _)| BlockId::new(i as u32))
    }

    /// Returns blocks in reverse postorder.
    ///
    /// Reverse postorder visits predecessors before successors on acyclic
    /// regions, which is the order the worklist seeds itself in. Unreachable
    /// blocks are absent from the result.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<BlockId> {
        let mut postorder = Vec::with_capacity(self.blocks.len());
        let mut visited = vec![false; self.blocks.len()];
        // Iterative DFS with an explicit "children done" marker; the CFG can be
        // arbitrarily deep, so no structural recursion anywhere in this crate.
        let mut stack = vec![(self.entry(), false)];
        while let Some((block, children_done)) = stack.pop() {
            if children_done {
                postorder.push(block);
                continue;
            }
            if visited[block.index()] {
                continue;
            }
            visited[block.index()] = true;
            stack.push((block, true));
            for succ in self.successors(block) {
                if !visited[succ.index()] {
                    stack.push((succ, false));
                }
            }
        }
        postorder.reverse();
        postorder
    }

    /// Returns the dominator tree for this CFG, computed lazily and cached.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators.get_or_init(|| DominatorTree::compute(self))
    }

    /// Returns `true` if `from -> to` is a loop back edge.
    ///
    /// An edge is a back edge when its target dominates its source. Front-end
    /// [`EdgeKind::LoopBack`] tags are honored as well, so explicitly tagged
    /// back edges in irreducible regions still bound loop re-entry.
    #[must_use]
    pub fn is_back_edge(&self, from: BlockId, to: BlockId) -> bool {
        if let Some(block) = self.block(from) {
            if block
                .edges
                .iter()
                .any(|e| e.target == to && e.kind == EdgeKind::LoopBack)
            {
                return true;
            }
        }
        self.dominators().dominates(to, from)
    }

    /// Returns the natural loops detected in this CFG, sorted by header id.
    ///
    /// Loops are identified by back edges: edges whose target dominates their
    /// source, plus edges explicitly tagged [`EdgeKind::LoopBack`]. The body of
    /// each loop is everything that reaches the back edge source without
    /// passing through the header.
    #[must_use]
    pub fn loops(&self) -> &[NaturalLoop] {
        self.loops.get_or_init(|| self.detect_loops())
    }

    /// Returns `true` if this CFG contains any loops.
    #[must_use]
    pub fn has_loops(&self) -> bool {
        !self.loops().is_empty()
    }

    /// Returns the innermost loop containing the given block, if any.
    #[must_use]
    pub fn innermost_loop(&self, block: BlockId) -> Option<&NaturalLoop> {
        self.loops()
            .iter()
            .filter(|l| l.body.contains(&block))
            .max_by_key(|l| l.depth)
    }

    /// Returns `true` if the block is reachable from the entry block along any
    /// edge kind.
    ///
    /// Unreachable blocks are explicitly-dead code: the engine still visits
    /// them once for completeness, but suppresses their findings.
    #[must_use]
    pub fn is_reachable(&self, block: BlockId) -> bool {
        let reachable = self.reachable.get_or_init(|| {
            let mut seen = vec![false; self.blocks.len()];
            let mut queue = VecDeque::from([self.entry()]);
            seen[self.entry().index()] = true;
            while let Some(current) = queue.pop_front() {
                for succ in self.successors(current) {
                    if !seen[succ.index()] {
                        seen[succ.index()] = true;
                        queue.push_back(succ);
                    }
                }
            }
            seen
        });
        reachable.get(block.index()).copied().unwrap_or(false)
    }

    /// Detects natural loops using back edge analysis.
    ///
    /// Dominance finds the back edges of reducible flow; the [`EdgeKind::LoopBack`]
    /// tag additionally admits back edges in irreducible regions, where the target
    /// does not dominate the source. Either way the target becomes a loop header,
    /// so the engine's per-header visit cap bounds re-entry through it.
    fn detect_loops(&self) -> Vec<NaturalLoop> {
        let mut loops: Vec<NaturalLoop> = Vec::new();

        for node in self.block_ids() {
            let Some(block) = self.block(node) else {
                continue;
            };
            for edge in &block.edges {
                let header = edge.target;
                if edge.kind != EdgeKind::LoopBack && !self.dominators().dominates(header, node) {
                    continue;
                }
                if let Some(existing) = loops.iter_mut().find(|l| l.header == header) {
                    existing.back_edges.push(node);
                    self.expand_loop_body(existing, node);
                } else {
                    let mut natural_loop = NaturalLoop::new(header);
                    natural_loop.back_edges.push(node);
                    self.expand_loop_body(&mut natural_loop, node);
                    loops.push(natural_loop);
                }
            }
        }

        Self::compute_loop_depths(&mut loops);
        loops.sort_by_key(|l| l.header.index());
        loops
    }

    /// Expands the loop body to all nodes reaching the back edge source without
    /// passing through the header, via an explicit worklist.
    fn expand_loop_body(&self, natural_loop: &mut NaturalLoop, back_edge_source: BlockId) {
        if natural_loop.body.contains(&back_edge_source) {
            return;
        }
        let mut worklist = vec![back_edge_source];
        while let Some(node) = worklist.pop() {
            if natural_loop.body.insert(node) {
                for pred in self.predecessors(node) {
                    if pred != natural_loop.header && !natural_loop.body.contains(&pred) {
                        worklist.push(pred);
                    }
                }
            }
        }
    }

    /// Computes the nesting depth for each loop: the number of other loops
    /// whose body contains this loop's header. Headers are unique per loop.
    fn compute_loop_depths(loops: &mut [NaturalLoop]) {
        let depths: Vec<usize> = loops
            .iter()
            .map(|l| {
                loops
                    .iter()
                    .filter(|other| other.header != l.header && other.body.contains(&l.header))
                    .count()
            })
            .collect();
        for (l, depth) in loops.iter_mut().zip(depths) {
            l.depth = depth;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfg::{Edge, Guard};

    fn block_to(successors: &[Edge]) -> BasicBlock {
        let mut b = BasicBlock::new();
        b.edges = successors.to_vec();
        if successors.iter().any(|e| e.kind.is_conditional()) {
            b.guard = Some(Guard::Literal(true));
        }
        b
    }

    #[test]
    fn test_cfg_from_empty_blocks() {
        assert!(ControlFlowGraph::from_blocks(vec![]).is_err());
    }

    #[test]
    fn test_cfg_invalid_edge_target() {
        let result =
            ControlFlowGraph::from_blocks(vec![block_to(&[Edge::unconditional(BlockId::new(5))])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cfg_guard_edge_mismatch() {
        // Conditional edges require a guard.
        let mut b = BasicBlock::new();
        b.edges = vec![
            Edge::conditional_true(BlockId::new(0)),
            Edge::conditional_false(BlockId::new(0)),
        ];
        assert!(ControlFlowGraph::from_blocks(vec![b]).is_err());

        // And a guard requires conditional edges.
        let mut b = BasicBlock::new();
        b.guard = Some(Guard::Literal(false));
        assert!(ControlFlowGraph::from_blocks(vec![b]).is_err());
    }

    #[test]
    fn test_cfg_linear() {
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[Edge::unconditional(BlockId::new(2))]),
            block_to(&[]),
        ])
        .unwrap();

        assert_eq!(cfg.block_count(), 3);
        assert_eq!(cfg.entry(), BlockId::new(0));
        let succ: Vec<_> = cfg.successors(BlockId::new(0)).collect();
        assert_eq!(succ, vec![BlockId::new(1)]);
        let preds: Vec<_> = cfg.predecessors(BlockId::new(2)).collect();
        assert_eq!(preds, vec![BlockId::new(1)]);
        let exits: Vec<_> = cfg.exits().collect();
        assert_eq!(exits, vec![BlockId::new(2)]);
        assert!(!cfg.has_loops());
    }

    #[test]
    fn test_cfg_reverse_postorder() {
        // Diamond: 0 -> {1, 2} -> 3
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[
                Edge::conditional_true(BlockId::new(1)),
                Edge::conditional_false(BlockId::new(2)),
            ]),
            block_to(&[Edge::unconditional(BlockId::new(3))]),
            block_to(&[Edge::unconditional(BlockId::new(3))]),
            block_to(&[]),
        ])
        .unwrap();

        let rpo = cfg.reverse_postorder();
        assert_eq!(rpo.len(), 4);
        assert_eq!(rpo[0], BlockId::new(0));
        assert_eq!(rpo[3], BlockId::new(3));
    }

    #[test]
    fn test_cfg_loop_detection() {
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

        assert!(cfg.has_loops());
        let loops = cfg.loops();
        assert_eq!(loops.len(), 1);
        let l = &loops[0];
        assert_eq!(l.header, BlockId::new(1));
        assert!(l.contains(BlockId::new(2)));
        assert!(!l.contains(BlockId::new(0)));
        assert!(!l.contains(BlockId::new(3)));
        assert_eq!(l.back_edges, vec![BlockId::new(2)]);
        assert_eq!(l.depth, 0);

        assert!(cfg.is_back_edge(BlockId::new(2), BlockId::new(1)));
        assert!(!cfg.is_back_edge(BlockId::new(1), BlockId::new(2)));
    }

    #[test]
    fn test_cfg_nested_loops() {
        // 0 -> 1 (outer header) -> 2 (inner header) -> 3,
        // 3 -> 2 (inner back), 3 -> 1 (outer back), 3 -> 4 (exit)
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[Edge::unconditional(BlockId::new(2))]),
            block_to(&[Edge::unconditional(BlockId::new(3))]),
            block_to(&[
                Edge::loop_back(BlockId::new(2)),
                Edge::loop_back(BlockId::new(1)),
                Edge::unconditional(BlockId::new(4)),
            ]),
            block_to(&[]),
        ])
        .unwrap();

        let loops = cfg.loops();
        assert_eq!(loops.len(), 2);
        let outer = loops.iter().find(|l| l.header == BlockId::new(1)).unwrap();
        let inner = loops.iter().find(|l| l.header == BlockId::new(2)).unwrap();
        assert!(inner.depth > outer.depth);
        for node in &inner.body {
            assert!(outer.body.contains(node));
        }
        assert_eq!(
            cfg.innermost_loop(BlockId::new(3)).unwrap().header,
            BlockId::new(2)
        );
        assert!(cfg.innermost_loop(BlockId::new(4)).is_none());
    }

    #[test]
    fn test_cfg_self_loop() {
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[
                Edge::conditional_true(BlockId::new(1)),
                Edge::conditional_false(BlockId::new(2)),
            ]),
            block_to(&[]),
        ])
        .unwrap();

        let loops = cfg.loops();
        assert_eq!(loops.len(), 1);
        assert_eq!(loops[0].header, BlockId::new(1));
        assert_eq!(loops[0].size(), 1);
        assert_eq!(loops[0].back_edges, vec![BlockId::new(1)]);
    }

    #[test]
    fn test_cfg_tagged_back_edge_without_dominance() {
        // 0 -> {1, 2}, 1 -> 2, 2 -> 1 (tagged), 2 -> 3. Block 1 does not
        // dominate block 2, so only the tag identifies the loop at header 1.
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[
                Edge::conditional_true(BlockId::new(1)),
                Edge::conditional_false(BlockId::new(2)),
            ]),
            block_to(&[Edge::unconditional(BlockId::new(2))]),
            block_to(&[
                Edge::loop_back(BlockId::new(1)),
                Edge::unconditional(BlockId::new(3)),
            ]),
            block_to(&[]),
        ])
        .unwrap();

        assert!(!cfg.dominators().dominates(BlockId::new(1), BlockId::new(2)));
        assert!(cfg.is_back_edge(BlockId::new(2), BlockId::new(1)));
        let loops = cfg.loops();
        assert!(loops
            .iter()
            .any(|l| l.header == BlockId::new(1) && l.contains(BlockId::new(2))));
    }

    #[test]
    fn test_cfg_reachability() {
        // Block 2 is dead code.
        let cfg = ControlFlowGraph::from_blocks(vec![
            block_to(&[Edge::unconditional(BlockId::new(1))]),
            block_to(&[]),
            block_to(&[Edge::unconditional(BlockId::new(1))]),
        ])
        .unwrap();

        assert!(cfg.is_reachable(BlockId::new(0)));
        assert!(cfg.is_reachable(BlockId::new(1)));
        assert!(!cfg.is_reachable(BlockId::new(2)));
    }
}
