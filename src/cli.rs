//! Command Line Interface (CLI) arguments.

use std::path::PathBuf;

use clap::Parser;

/// Binning command line interface
#[derive(Clone, Debug, Parser)]
pub struct CommandLineArgs {
    /// Path to the JSON job configuration
    #[arg(long, env = "BINNING_CONFIG")]
    pub config: PathBuf,
    /// Input partitions, one JSON lines file of observations each
    #[arg(required = true)]
    pub inputs: Vec<String>,
    /// Directory to which region products are written
    #[arg(long, default_value = "binning-output", env = "BINNING_OUTPUT_DIR")]
    pub output_dir: PathBuf,
    /// Number of threads used for binning. Defaults to the number of CPUs.
    #[arg(long, env = "BINNING_THREADS")]
    pub threads: Option<usize>,
    /// Optional directory to which encoded spatial bins are spilled between stages, instead of
    /// memory
    #[arg(long, env = "BINNING_SPILL_DIR")]
    pub spill_dir: Option<PathBuf>,
    /// Enable debug logging when `RUST_LOG` is not set
    #[arg(long, default_value_t = false, env = "BINNING_VERBOSE")]
    pub verbose: bool,
}

impl CommandLineArgs {
    /// Number of binning threads.
    pub fn num_threads(&self) -> usize {
        self.threads.unwrap_or_else(num_cpus::get).max(1)
    }
}

/// Returns parsed command line arguments.
pub fn parse() -> CommandLineArgs {
    CommandLineArgs::parse()
}
