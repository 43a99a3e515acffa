use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "dcfsim")]
#[command(about = "Monte Carlo valuation of a discounted-cash-flow model")]
pub struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,

    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Sample the registry, value every draw and report the output distribution
    Run(RunArgs),
    /// Validate a registry and report on its correlation matrix
    Check(CheckArgs),
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Registry YAML file
    #[arg(short, long)]
    pub registry: PathBuf,

    #[arg(short = 'n', long, default_value_t = 10_000)]
    pub iterations: usize,

    #[arg(short, long, default_value_t = 42)]
    pub seed: u64,

    /// Worker threads; 1 runs sequentially, 0 uses every core
    #[arg(short, long, default_value_t = 1)]
    pub workers: usize,

    /// Output metric to summarize (repeatable; default: share_price, `all` for every output)
    #[arg(short, long = "metric")]
    pub metrics: Vec<String>,

    /// Report P(metric < threshold) (repeatable)
    #[arg(short, long = "threshold", allow_negative_numbers = true)]
    pub thresholds: Vec<f64>,

    /// Failure fraction above which the run is flagged
    #[arg(long, default_value_t = 0.01)]
    pub failure_threshold: f64,

    /// Write the per-iteration table and summaries to this JSON file
    #[arg(long)]
    pub export_json: Option<PathBuf>,

    /// Also evaluate the model once at every variable's base value
    #[arg(long)]
    pub base_case: bool,
}

#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Registry YAML file
    #[arg(short, long)]
    pub registry: PathBuf,
}
