//! Validation and evaluation ordering of the transformed graph.

use std::collections::HashSet;

use evalgen_core::{Graph, GraphError, NodeId};

use crate::error::CompileError;

/// A linear evaluation order: every node appears after all nodes it
/// depends on. Computed once from the final graph, never mutated.
#[derive(Debug, Clone)]
pub struct EvaluationOrder {
    pub nodes: Vec<NodeId>,
}

/// Validate the transformed graph and compute its evaluation order.
///
/// The graph handed in here must be the one the transform passes actually
/// mutated — validating an earlier copy would let a cyclic or disconnected
/// result through. Checks: acyclic, and every live node reachable from at
/// least one declared output. Ties among independent nodes break by
/// ascending node id, so the same graph always yields the same order.
pub fn plan(graph: &Graph) -> Result<EvaluationOrder, CompileError> {
    let reachable = reachable_from_outputs(graph);
    for node in graph.nodes() {
        if !reachable.contains(&node.id) {
            return Err(CompileError::InvalidGraph {
                message: format!(
                    "node {} ({}) is not reachable from any declared output",
                    node.name, node.id
                ),
            });
        }
    }

    let nodes = graph.topological_sort().map_err(|err| match err {
        GraphError::CycleDetected(id) => {
            let name = graph
                .node(id)
                .map(|n| n.name.clone())
                .unwrap_or_else(|| id.to_string());
            CompileError::InvalidGraph {
                message: format!("graph is cyclic at node {name} ({id})"),
            }
        }
        other => CompileError::InvalidGraph {
            message: other.to_string(),
        },
    })?;

    Ok(EvaluationOrder { nodes })
}

/// Walk input edges backwards from the declared outputs.
fn reachable_from_outputs(graph: &Graph) -> HashSet<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::new();
    let mut stack: Vec<NodeId> = graph.outputs().to_vec();
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        if let Some(node) = graph.node(id) {
            stack.extend(node.inputs.iter().copied());
        }
    }
    seen
}
