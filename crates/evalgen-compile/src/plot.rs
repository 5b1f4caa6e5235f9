//! Graphviz DOT rendering of the transformed graph.
//!
//! Diagnostic only: the pipeline reports a failed plot as a warning and
//! carries on, since the listing and weights are the artifacts that matter.

use std::path::Path;

use evalgen_core::{Graph, OpKind};

/// Render the graph as DOT text.
pub fn render_dot(graph: &Graph) -> String {
    let mut dot = String::new();
    dot.push_str("digraph evalgen {\n");
    dot.push_str("  rankdir=TB;\n");
    dot.push_str("  node [shape=box, style=\"rounded,filled\"];\n");

    for node in graph.nodes() {
        let color = match node.kind {
            OpKind::Input => "lightblue",
            OpKind::Constant(_) => "lightgray",
            OpKind::Plus | OpKind::Minus | OpKind::ElementTimes => "lightyellow",
            OpKind::Times => "lightgreen",
            OpKind::StateInput { .. } | OpKind::StateOutput { .. } => "lightpink",
            _ => "white",
        };
        let peripheries = if graph.is_output(node.id) { 2 } else { 1 };
        dot.push_str(&format!(
            "  {} [label=\"{}\\n{}\", fillcolor={color}, peripheries={peripheries}];\n",
            node.id,
            escape(&node.name),
            node.kind,
        ));
    }

    for node in graph.nodes() {
        for &input in &node.inputs {
            dot.push_str(&format!("  {} -> {};\n", input, node.id));
        }
    }

    dot.push_str("}\n");
    dot
}

/// Write the DOT rendering to disk. Callers treat failure as a warning.
pub fn write_dot(graph: &Graph, path: &Path) -> std::io::Result<()> {
    std::fs::write(path, render_dot(graph))
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use evalgen_core::{BuildContext, GraphBuilder, ModelDescription, ModelNode};

    fn build() -> Graph {
        let model = ModelDescription {
            name: "plot-test".to_string(),
            outputs: vec!["y".to_string()],
            nodes: vec![
                ModelNode {
                    name: "x".to_string(),
                    op: "input".to_string(),
                    inputs: vec![],
                    shape: vec![2],
                    values: None,
                    initial: None,
                },
                ModelNode {
                    name: "y".to_string(),
                    op: "relu".to_string(),
                    inputs: vec!["x".to_string()],
                    shape: vec![2],
                    values: None,
                    initial: None,
                },
            ],
        };
        GraphBuilder::convert(&mut BuildContext::default(), &model).unwrap()
    }

    #[test]
    fn dot_lists_nodes_and_edges() {
        let dot = render_dot(&build());
        assert!(dot.starts_with("digraph evalgen {"));
        assert!(dot.contains("n0 [label=\"x\\nInput\""));
        assert!(dot.contains("n0 -> n1;"));
        // Declared outputs get a double border.
        assert!(dot.contains("n1 [label=\"y\\nRelu\", fillcolor=white, peripheries=2]"));
    }

    #[test]
    fn write_dot_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.dot");
        write_dot(&build(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.ends_with("}\n"));
    }
}
