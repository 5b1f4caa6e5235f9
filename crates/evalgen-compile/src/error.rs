//! Compilation pipeline errors.

use evalgen_core::{GraphError, LoadError};
use thiserror::Error;

/// Errors that abort the compilation pipeline. There is no local recovery:
/// every variant is fatal and surfaces immediately.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("invalid graph: {message}")]
    InvalidGraph { message: String },

    #[error("unsupported graph shape at node {node}: {message}")]
    UnsupportedGraph { node: String, message: String },

    #[error("unsupported operator {op} at node {node}")]
    UnsupportedOperator { node: String, op: String },

    #[error("cannot serialize weights: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("cannot write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
