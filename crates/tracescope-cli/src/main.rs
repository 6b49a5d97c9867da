#![doc = include_str!("../README.md")]

mod cli;
mod launch_file;

use std::fs;
use std::path::Path;

use clap::Parser;
use miette::{Context, IntoDiagnostic};
use tracing_subscriber::EnvFilter;

use tracescope_engine::{CancellationToken, PipelineController, PipelineError};
use tracescope_ir::LaunchSpec;

use crate::cli::{Cli, Commands};
use crate::launch_file::LaunchFile;

fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Synth { launch, reserved } => run_synth(&launch, reserved),
    }
}

fn run_synth(path: &Path, reserved: Vec<String>) -> miette::Result<()> {
    let text = fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("could not read launch file {}", path.display()))?;
    let file: LaunchFile = serde_json::from_str(&text)
        .into_diagnostic()
        .wrap_err_with(|| format!("launch file {} is not valid JSON", path.display()))?;

    let spec = LaunchSpec::from_attributes(&file.into_attributes())
        .map_err(PipelineError::from)?;
    let mut controller = PipelineController::new(spec, reserved, CancellationToken::new());
    controller.build()?;

    println!("speculative module: {}", controller.paths().module().display());
    println!("companion config:   {}", controller.paths().config().display());
    if !controller.expressions().is_empty() {
        println!("registered expressions:");
        for expr in controller.expressions() {
            println!("  {}  ==  {}", expr.variable(), expr.source());
        }
    }
    println!("run the analyzer over the module to continue the pipeline");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_synth_writes_the_speculative_module() {
        let tmp = TempDir::new().unwrap();
        let model_dir = tmp.path().join("model");
        let launch = tmp.path().join("launch.json");
        let body = serde_json::json!({
            "spec-module": "Base",
            "model-location": model_dir.to_string_lossy(),
            "trace": [
                { "x": "0", "y": "0" },
                { "x": "1", "y": "0" }
            ],
            "expressions": ["x + y"],
            "final-state": "x = 1 /\\ y = 0"
        });
        fs::write(&launch, body.to_string()).unwrap();

        run_synth(&launch, vec![]).unwrap();

        let module = fs::read_to_string(model_dir.join("Explore.tla")).unwrap();
        assert!(module.contains("---- MODULE Explore ----"));
        assert!(module.contains("EXTENDS Base, TLC"));
        assert!(module.contains(" == x + y"));
    }

    #[test]
    fn test_synth_rejects_an_empty_trace() {
        let tmp = TempDir::new().unwrap();
        let launch = tmp.path().join("launch.json");
        let body = serde_json::json!({
            "spec-module": "Base",
            "model-location": tmp.path().join("model").to_string_lossy(),
            "trace": [],
            "expressions": [],
            "final-state": "TRUE"
        });
        fs::write(&launch, body.to_string()).unwrap();

        let err = run_synth(&launch, vec![]).unwrap_err();
        assert!(err.to_string().contains("trace-init"));
    }
}
