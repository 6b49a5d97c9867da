//! CLI argument definitions.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracescope")]
#[command(about = "Synthesize trace-exploration modules from recorded counterexample traces")]
#[command(version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run speculative synthesis from a JSON launch file
    Synth {
        /// Path to the launch file
        launch: PathBuf,

        /// Names visible in the base specification that generated names
        /// must avoid (repeatable)
        #[arg(long = "reserved")]
        reserved: Vec<String>,
    },
}
