// src/cli.rs - Command definitions

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    version,
    about = "tabsim - multi-agent blockchain consensus simulator",
    long_about = None
)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(long, global = true, default_value = "tabsim.toml")]
    pub config: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulation and print per-miner summaries.
    Run {
        /// Override the configured consensus algorithm
        /// (total-difficulty | score-weighted-difficulty |
        /// score-weighted-difficulty-stepped).
        #[arg(long)]
        algorithm: Option<String>,

        /// Override the configured RNG seed.
        #[arg(long)]
        seed: Option<u64>,

        /// Print summaries as JSON lines instead of text.
        #[arg(long)]
        json: bool,

        /// Write head-change events as JSON lines to this file.
        #[arg(long)]
        events: Option<String>,

        /// Dump the full block tree of the miner at this index after the
        /// run.
        #[arg(long)]
        dump_tree: Option<usize>,
    },
}
