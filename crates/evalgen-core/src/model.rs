//! The serialized model description and its loader.
//!
//! A model file is a JSON document listing named operator declarations plus
//! the terminal outputs the generated evaluator must return. Structural
//! validation beyond parsing (reference resolution, arity, payload shapes)
//! happens in the graph builder.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading or structurally validating a model.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read model file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse model file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("duplicate node name: {name}")]
    DuplicateNode { name: String },

    #[error("node {node} references unknown input: {input}")]
    DanglingReference { node: String, input: String },

    #[error("declared output references unknown node: {name}")]
    DanglingOutput { name: String },

    #[error("model declares no outputs")]
    NoOutputs,

    #[error("node {node} ({op}) expects {expected} input(s), found {found}")]
    BadArity {
        node: String,
        op: String,
        expected: usize,
        found: usize,
    },

    #[error("constant {node} carries no values")]
    MissingValues { node: String },

    #[error("constant {node} carries {actual} value(s) but its shape implies {expected}")]
    ShapeMismatch {
        node: String,
        expected: usize,
        actual: usize,
    },
}

/// One operator declaration in a model description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelNode {
    /// Unique node name; also the basis for generated identifiers.
    pub name: String,
    /// Operator tag, matched case-insensitively (e.g. `times`, `past_value`).
    pub op: String,
    /// Names of the nodes this operator consumes, in operand order.
    #[serde(default)]
    pub inputs: Vec<String>,
    /// Output shape, outermost dimension first.
    #[serde(default)]
    pub shape: Vec<usize>,
    /// Constant payload, flattened row-major. Required for constants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    /// Initial state for past-value nodes. Defaults to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub initial: Option<f64>,
}

/// A complete serialized model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelDescription {
    /// Display name, used in generated-file comments.
    #[serde(default)]
    pub name: String,
    /// Names of the terminal output nodes.
    pub outputs: Vec<String>,
    /// Operator declarations. Forward references are allowed; past-value
    /// nodes rely on them to express recurrence.
    pub nodes: Vec<ModelNode>,
}

impl ModelDescription {
    /// Read and parse a model description from disk.
    pub fn from_file(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| LoadError::Parse {
            path: path.display().to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal_model() {
        let text = r#"{
            "name": "tiny",
            "outputs": ["y"],
            "nodes": [
                {"name": "x", "op": "input", "shape": [2]},
                {"name": "y", "op": "relu", "inputs": ["x"]}
            ]
        }"#;
        let model: ModelDescription = serde_json::from_str(text).unwrap();
        assert_eq!(model.name, "tiny");
        assert_eq!(model.outputs, vec!["y"]);
        assert_eq!(model.nodes.len(), 2);
        assert_eq!(model.nodes[1].inputs, vec!["x"]);
        assert!(model.nodes[0].values.is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = ModelDescription::from_file(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(matches!(err, LoadError::Io { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{not json").unwrap();
        let err = ModelDescription::from_file(&path).unwrap_err();
        assert!(matches!(err, LoadError::Parse { .. }));
    }
}
