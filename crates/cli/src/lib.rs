//! Batch entry point: ingest a JSON-lines event log, summarize customers,
//! and emit the top N by lifetime value.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use tracing::info;

use ltv_core::EventStore;
use ltv_predictors::SimpleLtv;
use ltv_runtime::{ingest_reader, BatchTimer, IngestMetrics, IngestSnapshot};
use ltv_views::{build_summaries, write_top_customers, TopKConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReport {
    pub ingest: IngestSnapshot,
    pub customers: usize,
    pub rows_written: usize,
}

/// Runs one batch end to end.
///
/// Bad records are logged and skipped. Failing to read `input`, to
/// aggregate, or to write `output` aborts the batch.
pub fn run_batch<R: BufRead, W: Write>(
    input: R,
    output: W,
    top: TopKConfig,
) -> Result<BatchReport> {
    let timer = BatchTimer::start();
    let metrics = IngestMetrics::default();
    let mut store = EventStore::new();

    ingest_reader(input, &mut store, &metrics).context("reading input")?;
    let ingest = metrics.snapshot();
    info!(
        snapshot = %ingest.to_json_line("ingest", Some(timer.elapsed())),
        "ingestion complete"
    );

    let table =
        build_summaries(&store, &SimpleLtv::default()).context("building customer summaries")?;
    let rows_written =
        write_top_customers(&table, top.k, output).context("writing top customers")?;

    info!(
        customers = table.len(),
        rows_written,
        elapsed_ms = timer.elapsed().as_millis() as u64,
        "batch complete"
    );
    Ok(BatchReport {
        ingest,
        customers: table.len(),
        rows_written,
    })
}
