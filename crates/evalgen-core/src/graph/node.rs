//! Node identifiers, operator kinds, and the node struct.

use std::fmt;

use crate::tensor::TensorValue;

/// Stable arena index of a node.
///
/// Ids are allocated densely in model declaration order; their ordering is
/// the deterministic tie-break wherever independent nodes must be ranked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Arena slot index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// The closed set of operator kinds the emitter knows how to render.
///
/// `Unsupported` captures operator tags that parse but have no emission
/// template; emitting one fails naming the offending node instead of
/// falling through silently.
#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    /// External input of the evaluator.
    Input,
    /// Learned weight or fixed constant with attached data.
    Constant(TensorValue),
    /// Elementwise addition.
    Plus,
    /// Elementwise subtraction.
    Minus,
    /// Elementwise (Hadamard) product.
    ElementTimes,
    /// Matrix-vector product.
    Times,
    Sigmoid,
    Tanh,
    Relu,
    Exp,
    Log,
    Softmax,
    /// Reference to the previous time-step of its operand.
    PastValue { initial: f64 },
    /// Marker exposing an internal value as an output; pure pass-through.
    OutputMarker,
    /// Synthetic source carrying the previous step's state. Produced by the
    /// past-value split; never present in a freshly built graph.
    StateInput { state: String, initial: f64 },
    /// Synthetic sink producing the next step's state. Produced by the
    /// past-value split; never present in a freshly built graph.
    StateOutput { state: String },
    /// Parsed but unknown operator tag.
    Unsupported(String),
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpKind::Input => write!(f, "Input"),
            OpKind::Constant(_) => write!(f, "Constant"),
            OpKind::Plus => write!(f, "Plus"),
            OpKind::Minus => write!(f, "Minus"),
            OpKind::ElementTimes => write!(f, "ElementTimes"),
            OpKind::Times => write!(f, "Times"),
            OpKind::Sigmoid => write!(f, "Sigmoid"),
            OpKind::Tanh => write!(f, "Tanh"),
            OpKind::Relu => write!(f, "Relu"),
            OpKind::Exp => write!(f, "Exp"),
            OpKind::Log => write!(f, "Log"),
            OpKind::Softmax => write!(f, "Softmax"),
            OpKind::PastValue { .. } => write!(f, "PastValue"),
            OpKind::OutputMarker => write!(f, "OutputMarker"),
            OpKind::StateInput { .. } => write!(f, "StateInput"),
            OpKind::StateOutput { .. } => write!(f, "StateOutput"),
            OpKind::Unsupported(tag) => write!(f, "Unsupported({tag})"),
        }
    }
}

/// A computation node.
///
/// Edges are implicit: `inputs` lists the producers this node consumes, in
/// operand order. Nodes are created by the builder, mutated only by the
/// transform passes, and immutable thereafter.
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    /// Model-level name; basis for generated identifiers.
    pub name: String,
    pub kind: OpKind,
    pub inputs: Vec<NodeId>,
    /// Output shape, outermost dimension first. Empty when unknown or scalar.
    pub shape: Vec<usize>,
}
