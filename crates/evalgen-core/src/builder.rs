//! Conversion of a parsed model description into a computation graph.
//!
//! The builder resolves name references (including forward references, which
//! recurrences rely on), validates operator arity and constant payloads, and
//! records the declared outputs. All load-scoped state lives in an explicit
//! [`BuildContext`] owned by one pipeline invocation.

use std::collections::HashMap;

use crate::graph::node::{Node, NodeId, OpKind};
use crate::graph::Graph;
use crate::model::{LoadError, ModelDescription, ModelNode};
use crate::tensor::TensorValue;

/// Numeric precision of the generated evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Precision {
    #[default]
    F32,
    F64,
}

impl Precision {
    /// The C++ element type spelled into the listing.
    pub fn cpp_type(self) -> &'static str {
        match self {
            Precision::F32 => "float",
            Precision::F64 => "double",
        }
    }
}

/// Per-invocation build state.
///
/// Everything the builder and emitter need to know about the invocation
/// travels here; there is no process-wide default context.
#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    /// Element type of the generated evaluator.
    pub precision: Precision,
    /// Model display name, recorded during conversion.
    pub model_name: String,
}

/// Builds a [`Graph`] from a [`ModelDescription`].
pub struct GraphBuilder;

impl GraphBuilder {
    /// Convert a model description into a graph.
    ///
    /// Validates unique names, resolvable references, per-operator arity,
    /// constant payload consistency, and the declared outputs list.
    pub fn convert(ctx: &mut BuildContext, model: &ModelDescription) -> Result<Graph, LoadError> {
        ctx.model_name = if model.name.is_empty() {
            "model".to_string()
        } else {
            model.name.clone()
        };

        // First pass: assign dense ids so later declarations can be
        // referenced before they appear (recurrence).
        let mut ids: HashMap<&str, NodeId> = HashMap::new();
        for (index, decl) in model.nodes.iter().enumerate() {
            if ids.insert(decl.name.as_str(), NodeId(index as u32)).is_some() {
                return Err(LoadError::DuplicateNode {
                    name: decl.name.clone(),
                });
            }
        }

        // Second pass: resolve references and validate each declaration.
        let mut nodes = Vec::with_capacity(model.nodes.len());
        for (index, decl) in model.nodes.iter().enumerate() {
            let mut inputs = Vec::with_capacity(decl.inputs.len());
            for input in &decl.inputs {
                let id = ids
                    .get(input.as_str())
                    .copied()
                    .ok_or_else(|| LoadError::DanglingReference {
                        node: decl.name.clone(),
                        input: input.clone(),
                    })?;
                inputs.push(id);
            }
            let kind = op_kind(decl)?;
            check_arity(decl, &kind)?;
            nodes.push(Node {
                id: NodeId(index as u32),
                name: decl.name.clone(),
                kind,
                inputs,
                shape: decl.shape.clone(),
            });
        }

        if model.outputs.is_empty() {
            return Err(LoadError::NoOutputs);
        }
        let mut outputs = Vec::with_capacity(model.outputs.len());
        for name in &model.outputs {
            let id = ids
                .get(name.as_str())
                .copied()
                .ok_or_else(|| LoadError::DanglingOutput { name: name.clone() })?;
            if !outputs.contains(&id) {
                outputs.push(id);
            }
        }

        Ok(Graph::from_nodes(nodes, outputs))
    }
}

/// Map an operator tag to its kind, pulling in attached data.
fn op_kind(decl: &ModelNode) -> Result<OpKind, LoadError> {
    let kind = match decl.op.to_ascii_lowercase().as_str() {
        "input" => OpKind::Input,
        "constant" | "parameter" => {
            let values = decl
                .values
                .clone()
                .ok_or_else(|| LoadError::MissingValues {
                    node: decl.name.clone(),
                })?;
            let tensor = TensorValue::new(decl.shape.clone(), values);
            if !tensor.is_consistent() {
                return Err(LoadError::ShapeMismatch {
                    node: decl.name.clone(),
                    expected: tensor.expected_len(),
                    actual: tensor.values.len(),
                });
            }
            OpKind::Constant(tensor)
        }
        "plus" => OpKind::Plus,
        "minus" => OpKind::Minus,
        "element_times" => OpKind::ElementTimes,
        "times" => OpKind::Times,
        "sigmoid" => OpKind::Sigmoid,
        "tanh" => OpKind::Tanh,
        "relu" => OpKind::Relu,
        "exp" => OpKind::Exp,
        "log" => OpKind::Log,
        "softmax" => OpKind::Softmax,
        "past_value" => OpKind::PastValue {
            initial: decl.initial.unwrap_or(0.0),
        },
        "output" => OpKind::OutputMarker,
        _ => OpKind::Unsupported(decl.op.clone()),
    };
    Ok(kind)
}

/// Validate the declared operand count for a kind. Unknown operators are
/// left alone; they fail at emission instead.
fn check_arity(decl: &ModelNode, kind: &OpKind) -> Result<(), LoadError> {
    let expected = match kind {
        OpKind::Input | OpKind::Constant(_) => 0,
        OpKind::Sigmoid
        | OpKind::Tanh
        | OpKind::Relu
        | OpKind::Exp
        | OpKind::Log
        | OpKind::Softmax
        | OpKind::PastValue { .. }
        | OpKind::OutputMarker => 1,
        OpKind::Plus | OpKind::Minus | OpKind::ElementTimes | OpKind::Times => 2,
        OpKind::StateInput { .. } | OpKind::StateOutput { .. } | OpKind::Unsupported(_) => {
            return Ok(())
        }
    };
    if decl.inputs.len() != expected {
        return Err(LoadError::BadArity {
            node: decl.name.clone(),
            op: decl.op.clone(),
            expected,
            found: decl.inputs.len(),
        });
    }
    Ok(())
}
