//! Pipeline orchestrator: load, transform, order, emit.
//!
//! One invocation owns one graph and runs the stages strictly in sequence.
//! Both artifacts are generated fully in memory before either file is
//! written, so a fatal error anywhere leaves no partial output behind.

use std::path::{Path, PathBuf};
use std::time::Instant;

use evalgen_core::{BuildContext, GraphBuilder, ModelDescription, Precision};

use crate::emit::ListingGenerator;
use crate::error::CompileError;
use crate::plot;
use crate::schedule;
use crate::transform;
use crate::weights::WeightTable;

/// Configuration for one compilation run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Name of the generated evaluator class.
    pub class_name: String,
    /// Path for the generated listing.
    pub listing_path: PathBuf,
    /// Path for the serialized weights.
    pub weights_path: PathBuf,
    /// Optional path for the DOT diagnostic rendering.
    pub plot_path: Option<PathBuf>,
    /// Element type of the generated evaluator.
    pub precision: Precision,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            class_name: "Evaluator".to_string(),
            listing_path: PathBuf::from("Evaluator.h"),
            weights_path: PathBuf::from("weights.json"),
            plot_path: None,
            precision: Precision::F32,
        }
    }
}

/// Statistics from a completed run.
#[derive(Debug, Clone)]
pub struct CompileReport {
    pub model_name: String,
    pub nodes_loaded: usize,
    pub nodes_final: usize,
    pub markers_removed: usize,
    pub past_values_split: usize,
    pub constants: usize,
    pub listing_bytes: usize,
    pub weights_bytes: usize,
    pub duration_ms: u64,
    /// Set when the diagnostic plot could not be written.
    pub plot_warning: Option<String>,
}

/// Run the full pipeline for one model file.
pub fn compile(model_path: &Path, config: &PipelineConfig) -> Result<CompileReport, CompileError> {
    let start = Instant::now();

    let model = ModelDescription::from_file(model_path)?;
    let mut ctx = BuildContext {
        precision: config.precision,
        ..Default::default()
    };
    let mut graph = GraphBuilder::convert(&mut ctx, &model)?;
    let nodes_loaded = graph.node_count();

    let marker_stats = transform::strip_output_markers(&mut graph)?;
    let split_stats = transform::split_past_values(&mut graph)?;

    // Diagnostic only; never aborts the run.
    let plot_warning = config.plot_path.as_ref().and_then(|path| {
        plot::write_dot(&graph, path)
            .err()
            .map(|err| format!("plot not written to {}: {err}", path.display()))
    });

    let order = schedule::plan(&graph)?;

    let listing = ListingGenerator::new(&graph, &ctx).generate(&order, &config.class_name)?;
    let table = WeightTable::collect(&graph);
    let weights = table.to_json()?;

    write_file(&config.listing_path, &listing)?;
    write_file(&config.weights_path, &weights)?;

    Ok(CompileReport {
        model_name: ctx.model_name,
        nodes_loaded,
        nodes_final: graph.node_count(),
        markers_removed: marker_stats.nodes_removed,
        past_values_split: split_stats.nodes_added,
        constants: table.len(),
        listing_bytes: listing.len(),
        weights_bytes: weights.len(),
        duration_ms: start.elapsed().as_millis() as u64,
        plot_warning,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), CompileError> {
    std::fs::write(path, contents).map_err(|source| CompileError::Io {
        path: path.display().to_string(),
        source,
    })
}
