//! Graph normalization passes run before scheduling.
//!
//! Two passes, in this order: output-marker removal, then past-value
//! splitting. Both mutate the graph in place and touch only connectivity
//! and tagging, never attached data.

use evalgen_core::{Graph, NodeId, OpKind};

use crate::error::CompileError;

/// Counts of mutations applied by one pass.
#[derive(Debug, Clone, Default)]
pub struct TransformStats {
    pub nodes_removed: usize,
    pub nodes_added: usize,
    pub edges_rewired: usize,
}

/// Elide output-marker nodes.
///
/// A marker is a pure pass-through of its single input. Eliding it rewires
/// all its consumers to the producer and redirects any declared-output
/// entry naming the marker to the producer, so an exposed value never
/// loses its exposure. Chains of markers collapse to the underlying
/// producer because a marker's consumers are rewired before the marker
/// itself is visited.
pub fn strip_output_markers(graph: &mut Graph) -> Result<TransformStats, CompileError> {
    let mut stats = TransformStats::default();

    let markers: Vec<NodeId> = graph
        .nodes()
        .filter(|node| matches!(node.kind, OpKind::OutputMarker))
        .map(|node| node.id)
        .collect();

    for id in markers {
        let node = graph.node(id).ok_or_else(|| CompileError::InvalidGraph {
            message: format!("output marker {id} vanished during the pass"),
        })?;
        let name = node.name.clone();
        let producer = node
            .inputs
            .first()
            .copied()
            .ok_or_else(|| CompileError::UnsupportedGraph {
                node: name.clone(),
                message: "output marker has no producer".to_string(),
            })?;

        for consumer in graph.consumers(id) {
            stats.edges_rewired += graph.replace_input(consumer, id, producer)?;
        }
        graph.redirect_output(id, producer)?;
        graph.remove_node(id)?;
        stats.nodes_removed += 1;
    }

    Ok(stats)
}

/// Split delayed-value nodes into explicit state pairs.
///
/// Each past-value node is rewritten in place into a `StateInput` source
/// (keeping its id, so consumer references stay valid), and a matching
/// `StateOutput` consuming the original operand is appended and declared as
/// an output. The pair shares the past-value node's name as its state key.
///
/// If a cycle survives the splits and touches one of the synthetic state
/// nodes, the recurrence could not be made acyclic and the pass fails;
/// cycles not involving past values are left for the scheduler to reject.
pub fn split_past_values(graph: &mut Graph) -> Result<TransformStats, CompileError> {
    let mut stats = TransformStats::default();

    let past: Vec<NodeId> = graph
        .nodes()
        .filter(|node| matches!(node.kind, OpKind::PastValue { .. }))
        .map(|node| node.id)
        .collect();

    for id in &past {
        let node = graph.node(*id).ok_or_else(|| CompileError::InvalidGraph {
            message: format!("past-value node {id} vanished during the pass"),
        })?;
        let initial = match node.kind {
            OpKind::PastValue { initial } => initial,
            _ => 0.0,
        };
        let state = node.name.clone();
        let shape = node.shape.clone();
        let operand = node
            .inputs
            .first()
            .copied()
            .ok_or_else(|| CompileError::UnsupportedGraph {
                node: state.clone(),
                message: "past value has no operand".to_string(),
            })?;

        graph.rewrite_node(
            *id,
            OpKind::StateInput {
                state: state.clone(),
                initial,
            },
            vec![],
        )?;
        stats.edges_rewired += 1;

        let next = graph.add_node(
            format!("{state}.next"),
            OpKind::StateOutput { state },
            vec![operand],
            shape,
        )?;
        graph.declare_output(next)?;
        stats.nodes_added += 1;
    }

    // A residual cycle touching a state node means the split failed to
    // acyclicize that recurrence.
    if !past.is_empty() {
        for id in graph.cyclic_residue() {
            if let Some(node) = graph.node(id) {
                if matches!(
                    node.kind,
                    OpKind::StateInput { .. } | OpKind::StateOutput { .. }
                ) {
                    return Err(CompileError::UnsupportedGraph {
                        node: node.name.clone(),
                        message: "recurrence remains cyclic after splitting".to_string(),
                    });
                }
            }
        }
    }

    Ok(stats)
}
