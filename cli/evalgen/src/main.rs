//! evalgen — generate a standalone C++ evaluator from a serialized model.

use std::path::PathBuf;
use std::process;

use clap::Parser;

use evalgen_compile::pipeline::{compile, CompileReport, PipelineConfig};
use evalgen_core::Precision;

#[derive(Parser)]
#[command(
    name = "evalgen",
    version,
    about = "Generate a standalone evaluator from a trained model description"
)]
struct Cli {
    /// Path to the serialized model file
    #[arg(short, long)]
    model: PathBuf,

    /// Write a Graphviz DOT rendering of the transformed graph
    #[arg(short, long)]
    plot: Option<PathBuf>,

    /// Name of the generated evaluator class
    #[arg(short, long, default_value = "Evaluator")]
    classname: String,

    /// Path for the generated listing
    #[arg(short, long, default_value = "Evaluator.h")]
    output: PathBuf,

    /// Path for the serialized weights/constants
    #[arg(short, long, default_value = "weights.json")]
    weights: PathBuf,
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = PipelineConfig {
        class_name: cli.classname,
        listing_path: cli.output,
        weights_path: cli.weights,
        plot_path: cli.plot,
        precision: Precision::F32,
    };

    let report = compile(&cli.model, &config)?;
    print_report(&config, &report);
    Ok(())
}

fn print_report(config: &PipelineConfig, report: &CompileReport) {
    if let Some(warning) = &report.plot_warning {
        eprintln!("warning: {warning}");
    }
    println!("Model: {}", report.model_name);
    println!(
        "Nodes: {} loaded, {} after transforms ({} output markers removed, {} past values split)",
        report.nodes_loaded, report.nodes_final, report.markers_removed, report.past_values_split
    );
    println!(
        "Wrote {} ({} bytes) and {} ({} constants, {} bytes) in {} ms",
        config.listing_path.display(),
        report.listing_bytes,
        config.weights_path.display(),
        report.constants,
        report.weights_bytes,
        report.duration_ms
    );
}
