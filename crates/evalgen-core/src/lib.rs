//! Model description format and computation graph for the evalgen code
//! generator.
//!
//! A serialized model is parsed into a [`ModelDescription`], then converted
//! by the [`GraphBuilder`] into a [`Graph`]: an arena of computation nodes
//! whose edges are implicit in each node's input references. The compile
//! crate normalizes that graph, orders it, and turns it into source text.

pub mod builder;
pub mod graph;
pub mod model;
pub mod tensor;

pub use builder::{BuildContext, GraphBuilder, Precision};
pub use graph::node::{Node, NodeId, OpKind};
pub use graph::{Graph, GraphError};
pub use model::{LoadError, ModelDescription, ModelNode};
pub use tensor::TensorValue;
