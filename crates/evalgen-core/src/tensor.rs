//! Dense numeric constant payloads attached to graph nodes.

use serde::{Deserialize, Serialize};

/// A dense tensor of `f64` values in row-major order.
///
/// A scalar is an empty shape with a single value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TensorValue {
    /// Dimension sizes, outermost first. Empty for scalars.
    pub shape: Vec<usize>,
    /// Flattened values, row-major.
    pub values: Vec<f64>,
}

impl TensorValue {
    /// Create a tensor from a shape and its flattened values.
    pub fn new(shape: Vec<usize>, values: Vec<f64>) -> Self {
        Self { shape, values }
    }

    /// Create a scalar tensor.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            values: vec![value],
        }
    }

    /// Number of elements implied by the shape.
    pub fn expected_len(&self) -> usize {
        self.shape.iter().product()
    }

    /// Whether the payload length matches the shape.
    pub fn is_consistent(&self) -> bool {
        self.values.len() == self.expected_len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scalar_is_consistent() {
        let t = TensorValue::scalar(1.5);
        assert_eq!(t.expected_len(), 1);
        assert!(t.is_consistent());
    }

    #[test]
    fn matrix_shape_product() {
        let t = TensorValue::new(vec![2, 3], vec![0.0; 6]);
        assert_eq!(t.expected_len(), 6);
        assert!(t.is_consistent());
    }

    #[test]
    fn inconsistent_payload_detected() {
        let t = TensorValue::new(vec![2, 2], vec![1.0, 2.0, 3.0]);
        assert!(!t.is_consistent());
    }
}
