//! Runtime bootstrap and the event ingestion pipeline.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

pub mod dedup;
pub mod ingest;
pub mod metrics;

pub use dedup::is_duplicate;
pub use ingest::{ingest_line, ingest_reader, IngestOutcome};
pub use metrics::{BatchTimer, IngestMetrics, IngestSnapshot};

/// Installs the global subscriber: stderr, plus an append-only log file when given.
///
/// `RUST_LOG` overrides the default `info` filter. Calling this twice is a no-op.
pub fn init_tracing(log_file: Option<&Path>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .is_ok();

    if installed {
        if let Some(path) = log_file {
            info!(log_file = %path.display(), "diagnostics also written to log file");
        }
    }
    Ok(())
}
