//! Compilation pipeline for the evalgen code generator.
//!
//! Turns a built computation graph into a standalone evaluator through four
//! stages run strictly in sequence: normalization (output-marker removal and
//! past-value splitting), validation and topological ordering, C++ listing
//! emission, and weight extraction. The [`pipeline`] module drives one full
//! invocation from model file to output artifacts.

pub mod emit;
pub mod error;
pub mod naming;
pub mod pipeline;
pub mod plot;
pub mod schedule;
pub mod transform;
pub mod weights;

pub use emit::ListingGenerator;
pub use error::CompileError;
pub use pipeline::{compile, CompileReport, PipelineConfig};
pub use schedule::{plan, EvaluationOrder};
pub use transform::{split_past_values, strip_output_markers, TransformStats};
pub use weights::WeightTable;
