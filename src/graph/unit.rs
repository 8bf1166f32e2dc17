//! The finished graph of one compilation unit.

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use crate::{
    graph::{BasicBlock, BlockId, NodeId, NodeStore},
    types::ExecutableElement,
    Error, Result,
};

/// The program graph of one executable element.
///
/// The graph owns its blocks and the list of node ids it uses, in first-use order.
/// Interned values may be shared with the graphs of other units; the nodes themselves
/// live in the session's [`NodeStore`].
#[derive(Debug, Clone)]
pub struct Graph {
    element: Arc<ExecutableElement>,
    blocks: Vec<BasicBlock>,
    nodes: Vec<NodeId>,
}

impl Graph {
    pub(crate) fn new(
        element: Arc<ExecutableElement>,
        blocks: Vec<BasicBlock>,
        nodes: Vec<NodeId>,
    ) -> Self {
        Self {
            element,
            blocks,
            nodes,
        }
    }

    /// The element this graph was built for.
    #[must_use]
    pub fn element(&self) -> &Arc<ExecutableElement> {
        &self.element
    }

    /// All sealed blocks, indexed by [`BlockId`].
    #[must_use]
    pub fn blocks(&self) -> &[BasicBlock] {
        &self.blocks
    }

    /// Returns the block with the given id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfBounds`] if the id is not a block of this graph.
    pub fn block(&self, id: BlockId) -> Result<&BasicBlock> {
        self.blocks.get(id.index()).ok_or(Error::IndexOutOfBounds {
            index: id.index(),
            count: self.blocks.len(),
        })
    }

    /// Node ids used by this graph, in first-use order.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Returns `true` if the node is used by this graph.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains(&id)
    }

    /// Successor blocks of `block`, in terminator successor order.
    ///
    /// # Errors
    ///
    /// Returns an error if the block or its terminator is missing, or if a successor
    /// label was never resolved.
    pub fn successors(&self, store: &NodeStore, block: BlockId) -> Result<Vec<BlockId>> {
        let terminator = self.block(block)?.terminator();
        let node = store.get(terminator)?;
        let terminator = node
            .as_terminator()
            .ok_or_else(|| malformed_error!("Block {} does not end in a terminator", block))?;
        terminator.successors().map(|label| label.target()).collect()
    }

    /// Blocks reachable from the entry block, in breadth-first order.
    ///
    /// # Errors
    ///
    /// Same as [`Graph::successors`].
    pub fn reachable_blocks(&self, store: &NodeStore) -> Result<Vec<BlockId>> {
        let mut order = Vec::new();
        if self.blocks.is_empty() {
            return Ok(order);
        }
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([BlockId::ENTRY]);
        seen.insert(BlockId::ENTRY);
        while let Some(block) = queue.pop_front() {
            order.push(block);
            for succ in self.successors(store, block)? {
                if seen.insert(succ) {
                    queue.push_back(succ);
                }
            }
        }
        Ok(order)
    }

    /// Nodes reachable from the block entries and terminators through ordering and value
    /// dependencies.
    ///
    /// A side-effecting node stays live through its block's ordering chain even when no
    /// node consumes it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidNode`] if a dependency refers to a node missing from `store`.
    pub fn live_nodes(&self, store: &NodeStore) -> Result<HashSet<NodeId>> {
        let mut live = HashSet::new();
        let mut stack: Vec<NodeId> = self
            .blocks
            .iter()
            .flat_map(|block| [block.entry(), block.terminator()])
            .collect();
        while let Some(id) = stack.pop() {
            if !live.insert(id) {
                continue;
            }
            let node = store.get(id)?;
            if let Ok(dependency) = node.ordering_dependency(0) {
                stack.push(dependency);
            }
            stack.extend(node.value_dependencies());
        }
        Ok(live)
    }

    /// Removes nodes that are unreachable through both edge kinds from this graph's node
    /// list and returns how many were removed.
    ///
    /// # Errors
    ///
    /// Same as [`Graph::live_nodes`].
    pub fn eliminate_dead_code(&mut self, store: &NodeStore) -> Result<usize> {
        let live = self.live_nodes(store)?;
        let before = self.nodes.len();
        self.nodes.retain(|id| live.contains(id));
        Ok(before - self.nodes.len())
    }
}
