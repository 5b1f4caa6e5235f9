//! Extraction and serialization of the model's numeric constants.

use std::collections::BTreeMap;

use evalgen_core::{Graph, NodeId, OpKind, TensorValue};
use serde::Serialize;

use crate::naming::unique_idents;

/// Stable member/weight key per constant node, in id order. The listing
/// emitter uses the same keys for the generated class members, so the
/// weights file and the generated code agree by construction.
pub fn constant_keys(graph: &Graph) -> BTreeMap<NodeId, String> {
    unique_idents(
        graph
            .nodes()
            .filter(|node| matches!(node.kind, OpKind::Constant(_)))
            .map(|node| (node.id, node.name.as_str())),
    )
}

/// The externally persisted constants, keyed by stable mangled name.
/// Built once from the final graph; read-only afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct WeightTable {
    entries: BTreeMap<String, TensorValue>,
}

impl WeightTable {
    /// Collect every constant node's payload.
    pub fn collect(graph: &Graph) -> Self {
        let keys = constant_keys(graph);
        let mut entries = BTreeMap::new();
        for node in graph.nodes() {
            if let OpKind::Constant(tensor) = &node.kind {
                if let Some(key) = keys.get(&node.id) {
                    entries.insert(key.clone(), tensor.clone());
                }
            }
        }
        Self { entries }
    }

    /// Number of stored constants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no constants.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pretty JSON rendering. Sorted keys make the bytes deterministic for
    /// a given graph.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut text = serde_json::to_string_pretty(self)?;
        text.push('\n');
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalgen_core::{BuildContext, GraphBuilder, ModelDescription, ModelNode};

    fn constant(name: &str, shape: Vec<usize>, values: Vec<f64>) -> ModelNode {
        ModelNode {
            name: name.to_string(),
            op: "parameter".to_string(),
            inputs: vec![],
            shape,
            values: Some(values),
            initial: None,
        }
    }

    fn decl(name: &str, op: &str, inputs: &[&str]) -> ModelNode {
        ModelNode {
            name: name.to_string(),
            op: op.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            shape: vec![],
            values: None,
            initial: None,
        }
    }

    fn build(nodes: Vec<ModelNode>, outputs: &[&str]) -> Graph {
        let model = ModelDescription {
            name: "test".to_string(),
            outputs: outputs.iter().map(|s| s.to_string()).collect(),
            nodes,
        };
        GraphBuilder::convert(&mut BuildContext::default(), &model).unwrap()
    }

    #[test]
    fn collects_only_constants() {
        let g = build(
            vec![
                decl("x", "input", &[]),
                constant("w", vec![2], vec![0.5, -0.5]),
                decl("y", "times", &["w", "x"]),
            ],
            &["y"],
        );
        let table = WeightTable::collect(&g);
        assert_eq!(table.len(), 1);
        let json = table.to_json().unwrap();
        assert!(json.contains("\"w\""));
        assert!(json.contains("-0.5"));
    }

    #[test]
    fn colliding_names_stay_distinct() {
        let g = build(
            vec![
                constant("w.0", vec![1], vec![1.0]),
                constant("w_0", vec![1], vec![2.0]),
            ],
            &["w.0", "w_0"],
        );
        let table = WeightTable::collect(&g);
        assert_eq!(table.len(), 2);
        let json = table.to_json().unwrap();
        assert!(json.contains("\"w_0\""));
        assert!(json.contains("\"w_0_1\""));
    }

    #[test]
    fn rendering_is_deterministic() {
        let make = || {
            build(
                vec![
                    constant("b", vec![1], vec![3.0]),
                    constant("a", vec![1], vec![4.0]),
                ],
                &["a", "b"],
            )
        };
        let first = WeightTable::collect(&make()).to_json().unwrap();
        let second = WeightTable::collect(&make()).to_json().unwrap();
        assert_eq!(first, second);
        // BTreeMap ordering: "a" serializes before "b".
        assert!(first.find("\"a\"").unwrap() < first.find("\"b\"").unwrap());
    }
}
