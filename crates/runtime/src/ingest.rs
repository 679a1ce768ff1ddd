//! Per-line ingestion. Nothing in here aborts a batch except failing to read input.

use std::io::BufRead;

use anyhow::{Context, Result};
use tracing::{debug, debug_span, error, warn};

use ltv_core::lifecycle::parse_event;
use ltv_core::{CoreError, EventStore};

use crate::dedup::is_duplicate;
use crate::metrics::IngestMetrics;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestOutcome {
    Accepted,
    Duplicate,
    Malformed,
    UnknownType,
    Blank,
}

/// Decodes one record and stages it unless it is malformed, of an unknown
/// type, or a duplicate. The store is untouched in every non-accepted case.
pub fn ingest_line(line: &str, store: &mut EventStore, metrics: &IngestMetrics) -> IngestOutcome {
    let record = line.trim();
    let outcome = if record.is_empty() {
        debug!("skipping blank line");
        IngestOutcome::Blank
    } else {
        match stage(record, store) {
            Ok(()) => IngestOutcome::Accepted,
            Err(err @ CoreError::UnknownEventType(_)) => {
                warn!(record, error = %err, "undefined event type");
                IngestOutcome::UnknownType
            }
            Err(err @ CoreError::Duplicate { .. }) => {
                warn!(record, error = %err, "duplicate event");
                IngestOutcome::Duplicate
            }
            Err(err) => {
                error!(record, error = %err, "invalid event format");
                IngestOutcome::Malformed
            }
        }
    };
    metrics.record(outcome);
    outcome
}

fn stage(record: &str, store: &mut EventStore) -> Result<(), CoreError> {
    let event = parse_event(record)?;
    if is_duplicate(&event, store) {
        return Err(CoreError::Duplicate {
            event_type: event.event_type(),
            key: event.meta.key,
        });
    }
    store.append(event);
    Ok(())
}

/// Feeds every newline-delimited record of `reader` through [`ingest_line`].
///
/// Lines that are not valid UTF-8 count as malformed. Only an I/O failure
/// on the reader itself is returned.
pub fn ingest_reader<R: BufRead>(
    reader: R,
    store: &mut EventStore,
    metrics: &IngestMetrics,
) -> Result<()> {
    for (idx, chunk) in reader.split(b'\n').enumerate() {
        let line_no = idx + 1;
        let bytes = chunk.with_context(|| format!("reading input line {line_no}"))?;
        let _span = debug_span!("ingest", line = line_no).entered();
        match std::str::from_utf8(&bytes) {
            Ok(line) => {
                ingest_line(line, store, metrics);
            }
            Err(err) => {
                error!(
                    record = %String::from_utf8_lossy(&bytes),
                    error = %err,
                    "invalid event format"
                );
                metrics.record(IngestOutcome::Malformed);
            }
        }
    }
    Ok(())
}
