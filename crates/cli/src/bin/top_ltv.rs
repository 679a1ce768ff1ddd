use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use ltv_cli::run_batch;
use ltv_runtime::init_tracing;
use ltv_views::TopKConfig;

/// Rank customers by simple lifetime value from a JSON-lines event log.
#[derive(Parser, Debug)]
#[command(name = "top_ltv")]
struct Args {
    /// Event log, one JSON object per line.
    input: PathBuf,

    /// CSV file to write the ranking to.
    #[arg(long, default_value = "output/output.txt")]
    output: PathBuf,

    /// Number of customers to emit.
    #[arg(long, default_value_t = TopKConfig::default().k)]
    top: usize,

    /// Diagnostics log, appended to on every run.
    #[arg(long, default_value = "event_processing.log")]
    log_file: PathBuf,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(Some(&args.log_file))?;
    info!(
        input = %args.input.display(),
        output = %args.output.display(),
        top = args.top,
        "top_ltv starting"
    );

    run(&args).inspect_err(|err| error!(error = %format!("{err:#}"), "batch failed"))?;
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let input = File::open(&args.input)
        .with_context(|| format!("opening input {}", args.input.display()))?;

    if let Some(dir) = args.output.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    }
    let output = File::create(&args.output)
        .with_context(|| format!("creating output {}", args.output.display()))?;

    let report = run_batch(
        BufReader::new(input),
        BufWriter::new(output),
        TopKConfig { k: args.top },
    )?;
    info!(
        accepted = report.ingest.accepted,
        rejected = report.ingest.rejected(),
        customers = report.customers,
        rows = report.rows_written,
        "top_ltv finished"
    );
    Ok(())
}
