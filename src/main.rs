//! This file defines the binning binary entry point.

use std::process::ExitCode;

use binning::cli;
use binning::error::{log_error_chain, BinningError};
use binning::metrics;
use binning::models::JobConfig;
use binning::pipeline::{Job, JobSummary};
use binning::source::JsonLinesSource;
use binning::tracing;
use binning::writer::JsonLinesWriter;

fn run(args: &cli::CommandLineArgs) -> Result<JobSummary, BinningError> {
    let text = std::fs::read_to_string(&args.config)?;
    let config = JobConfig::from_json(&text)?;
    let mut job = Job::new(config)?;
    if let Some(spill_dir) = &args.spill_dir {
        std::fs::create_dir_all(spill_dir)?;
        job = job.with_spill_dir(spill_dir);
    }
    let mut writer = JsonLinesWriter::new(&args.output_dir)?;
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.num_threads())
        .thread_name(|index| format!("binning-{}", index))
        .build()
        .map_err(|error| std::io::Error::other(error.to_string()))?;
    pool.install(|| job.run(&JsonLinesSource, &args.inputs, &mut writer))
}

/// Application entry point
fn main() -> ExitCode {
    let args = cli::parse();
    tracing::init_tracing(&args);
    metrics::register_metrics();
    let result = run(&args);
    ::tracing::debug!("metrics:\n{}", metrics::render());
    match result {
        Ok(summary) => {
            ::tracing::info!(
                regions = summary.regions,
                region_bins = summary.region_bins,
                "wrote region products to {}",
                args.output_dir.display()
            );
            ExitCode::SUCCESS
        }
        Err(error) => {
            log_error_chain(&error);
            if error.is_configuration_error() {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
