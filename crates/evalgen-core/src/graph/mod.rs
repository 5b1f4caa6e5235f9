//! The computation-graph arena.
//!
//! Nodes live in a slot vector indexed by [`NodeId`]; removal marks the slot
//! dead, so ids stay stable across the transform passes and lookup stays
//! O(1). Edges are implicit in each node's `inputs`; a consumers index is
//! kept in sync by every mutating operation.

pub mod node;

use thiserror::Error;

use self::node::{Node, NodeId, OpKind};

/// Errors raised by graph mutation or ordering.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("node {0} is still referenced and cannot be removed")]
    StillReferenced(NodeId),

    #[error("cycle detected involving node {0}")]
    CycleDetected(NodeId),
}

/// The full node/edge set, owned by one pipeline invocation.
#[derive(Debug, Clone, Default)]
pub struct Graph {
    /// Arena slots; `None` marks a removed node.
    slots: Vec<Option<Node>>,
    /// Index: node -> consuming nodes, one entry per input occurrence.
    consumers: Vec<Vec<NodeId>>,
    /// Declared outputs, in declaration order. Transform passes may
    /// redirect entries or append synthetic state outputs.
    outputs: Vec<NodeId>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a graph from pre-resolved nodes whose ids are dense and in
    /// slot order. Used by the builder, which resolves forward references
    /// (recurrences) before the arena exists.
    pub(crate) fn from_nodes(nodes: Vec<Node>, outputs: Vec<NodeId>) -> Self {
        let mut consumers: Vec<Vec<NodeId>> = vec![Vec::new(); nodes.len()];
        for node in &nodes {
            for &input in &node.inputs {
                consumers[input.index()].push(node.id);
            }
        }
        Self {
            slots: nodes.into_iter().map(Some).collect(),
            consumers,
            outputs,
        }
    }

    /// Append a node, assigning the next dense id. Every input reference
    /// must already exist.
    pub fn add_node(
        &mut self,
        name: impl Into<String>,
        kind: OpKind,
        inputs: Vec<NodeId>,
        shape: Vec<usize>,
    ) -> Result<NodeId, GraphError> {
        for &input in &inputs {
            if self.node(input).is_none() {
                return Err(GraphError::NodeNotFound(input));
            }
        }
        let id = NodeId(self.slots.len() as u32);
        for &input in &inputs {
            self.consumers[input.index()].push(id);
        }
        self.slots.push(Some(Node {
            id,
            name: name.into(),
            kind,
            inputs,
            shape,
        }));
        self.consumers.push(Vec::new());
        Ok(id)
    }

    /// Look up a live node by id.
    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.slots.get(id.index()).and_then(|slot| slot.as_ref())
    }

    /// Iterate live nodes in ascending id order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.slots.iter().filter_map(|slot| slot.as_ref())
    }

    /// Number of live nodes.
    pub fn node_count(&self) -> usize {
        self.nodes().count()
    }

    /// Nodes consuming `id`, deduplicated, ascending.
    pub fn consumers(&self, id: NodeId) -> Vec<NodeId> {
        let mut list = self
            .consumers
            .get(id.index())
            .cloned()
            .unwrap_or_default();
        list.sort_unstable();
        list.dedup();
        list
    }

    /// Declared outputs, in declaration order.
    pub fn outputs(&self) -> &[NodeId] {
        &self.outputs
    }

    /// Whether `id` is a declared output.
    pub fn is_output(&self, id: NodeId) -> bool {
        self.outputs.contains(&id)
    }

    /// Append a declared output. No-op if already declared.
    pub fn declare_output(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.node(id).is_none() {
            return Err(GraphError::NodeNotFound(id));
        }
        if !self.outputs.contains(&id) {
            self.outputs.push(id);
        }
        Ok(())
    }

    /// Redirect every declared-output entry naming `from` to `to`.
    pub fn redirect_output(&mut self, from: NodeId, to: NodeId) -> Result<(), GraphError> {
        if self.node(to).is_none() {
            return Err(GraphError::NodeNotFound(to));
        }
        for out in &mut self.outputs {
            if *out == from {
                *out = to;
            }
        }
        let mut seen = Vec::with_capacity(self.outputs.len());
        self.outputs.retain(|&out| {
            if seen.contains(&out) {
                false
            } else {
                seen.push(out);
                true
            }
        });
        Ok(())
    }

    /// Replace every use of `from` in `of`'s inputs with `to`. Returns the
    /// number of operand slots rewired.
    pub fn replace_input(
        &mut self,
        of: NodeId,
        from: NodeId,
        to: NodeId,
    ) -> Result<usize, GraphError> {
        if self.node(to).is_none() {
            return Err(GraphError::NodeNotFound(to));
        }
        let replaced = {
            let node = self
                .slots
                .get_mut(of.index())
                .and_then(|slot| slot.as_mut())
                .ok_or(GraphError::NodeNotFound(of))?;
            let mut replaced = 0;
            for input in &mut node.inputs {
                if *input == from {
                    *input = to;
                    replaced += 1;
                }
            }
            replaced
        };
        if replaced > 0 {
            let mut remaining = replaced;
            self.consumers[from.index()].retain(|&consumer| {
                if consumer == of && remaining > 0 {
                    remaining -= 1;
                    false
                } else {
                    true
                }
            });
            for _ in 0..replaced {
                self.consumers[to.index()].push(of);
            }
        }
        Ok(replaced)
    }

    /// Replace a node's kind and inputs in place, keeping its id (and thus
    /// all consumer references to it).
    pub fn rewrite_node(
        &mut self,
        id: NodeId,
        kind: OpKind,
        inputs: Vec<NodeId>,
    ) -> Result<(), GraphError> {
        for &input in &inputs {
            if self.node(input).is_none() {
                return Err(GraphError::NodeNotFound(input));
            }
        }
        let old_inputs = {
            let node = self
                .slots
                .get_mut(id.index())
                .and_then(|slot| slot.as_mut())
                .ok_or(GraphError::NodeNotFound(id))?;
            std::mem::take(&mut node.inputs)
        };
        for &input in &old_inputs {
            if let Some(pos) = self.consumers[input.index()]
                .iter()
                .position(|&consumer| consumer == id)
            {
                self.consumers[input.index()].remove(pos);
            }
        }
        for &input in &inputs {
            self.consumers[input.index()].push(id);
        }
        let node = self
            .slots
            .get_mut(id.index())
            .and_then(|slot| slot.as_mut())
            .ok_or(GraphError::NodeNotFound(id))?;
        node.kind = kind;
        node.inputs = inputs;
        Ok(())
    }

    /// Mark a node dead. The node must have no remaining consumers and must
    /// not be a declared output.
    pub fn remove_node(&mut self, id: NodeId) -> Result<(), GraphError> {
        if self.node(id).is_none() {
            return Err(GraphError::NodeNotFound(id));
        }
        if !self.consumers[id.index()].is_empty() || self.outputs.contains(&id) {
            return Err(GraphError::StillReferenced(id));
        }
        let Some(node) = self.slots[id.index()].take() else {
            return Err(GraphError::NodeNotFound(id));
        };
        for &input in &node.inputs {
            if let Some(pos) = self.consumers[input.index()]
                .iter()
                .position(|&consumer| consumer == id)
            {
                self.consumers[input.index()].remove(pos);
            }
        }
        Ok(())
    }

    /// Compute a topological ordering over the live nodes.
    ///
    /// Kahn's algorithm; ties among ready nodes break by ascending id, so
    /// the same graph always yields the same order.
    pub fn topological_sort(&self) -> Result<Vec<NodeId>, GraphError> {
        let mut in_degree = vec![0usize; self.slots.len()];
        let mut live = 0;
        for node in self.nodes() {
            live += 1;
            in_degree[node.id.index()] = node.inputs.len();
        }

        let mut ready: Vec<NodeId> = self
            .nodes()
            .filter(|node| node.inputs.is_empty())
            .map(|node| node.id)
            .collect();
        // Descending, so pop() yields the smallest id first.
        ready.sort_unstable_by(|a, b| b.cmp(a));

        let mut order = Vec::with_capacity(live);
        while let Some(id) = ready.pop() {
            order.push(id);
            for &consumer in &self.consumers[id.index()] {
                let degree = &mut in_degree[consumer.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(consumer);
                }
            }
            ready.sort_unstable_by(|a, b| b.cmp(a));
        }

        if order.len() != live {
            let stuck = self
                .cyclic_residue()
                .into_iter()
                .next()
                .ok_or_else(|| GraphError::CycleDetected(NodeId(0)))?;
            return Err(GraphError::CycleDetected(stuck));
        }
        Ok(order)
    }

    /// Live nodes whose in-degree never drains under Kahn's algorithm:
    /// members of cycles plus anything downstream of one. Empty for a DAG.
    pub fn cyclic_residue(&self) -> Vec<NodeId> {
        let mut in_degree = vec![0usize; self.slots.len()];
        for node in self.nodes() {
            in_degree[node.id.index()] = node.inputs.len();
        }
        let mut ready: Vec<NodeId> = self
            .nodes()
            .filter(|node| node.inputs.is_empty())
            .map(|node| node.id)
            .collect();
        while let Some(id) = ready.pop() {
            for &consumer in &self.consumers[id.index()] {
                let degree = &mut in_degree[consumer.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(consumer);
                }
            }
            in_degree[id.index()] = usize::MAX; // drained marker
        }
        let mut residue: Vec<NodeId> = self
            .nodes()
            .filter(|node| {
                let d = in_degree[node.id.index()];
                d != usize::MAX && d > 0
            })
            .map(|node| node.id)
            .collect();
        residue.sort_unstable();
        residue
    }
}
