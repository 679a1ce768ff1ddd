use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::ingest::IngestOutcome;

#[derive(Clone, Default)]
pub struct IngestMetrics {
    inner: Arc<MetricsInner>,
}

#[derive(Default)]
struct MetricsInner {
    lines: AtomicU64,
    accepted: AtomicU64,
    duplicates: AtomicU64,
    malformed: AtomicU64,
    unknown_types: AtomicU64,
    blank: AtomicU64,
}

impl IngestMetrics {
    /// Counts one input line and what became of it.
    pub fn record(&self, outcome: IngestOutcome) {
        self.inner.lines.fetch_add(1, Ordering::Relaxed);
        let counter = match outcome {
            IngestOutcome::Accepted => &self.inner.accepted,
            IngestOutcome::Duplicate => &self.inner.duplicates,
            IngestOutcome::Malformed => &self.inner.malformed,
            IngestOutcome::UnknownType => &self.inner.unknown_types,
            IngestOutcome::Blank => &self.inner.blank,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> IngestSnapshot {
        IngestSnapshot {
            lines: self.inner.lines.load(Ordering::Relaxed),
            accepted: self.inner.accepted.load(Ordering::Relaxed),
            duplicates: self.inner.duplicates.load(Ordering::Relaxed),
            malformed: self.inner.malformed.load(Ordering::Relaxed),
            unknown_types: self.inner.unknown_types.load(Ordering::Relaxed),
            blank: self.inner.blank.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct IngestSnapshot {
    pub lines: u64,
    pub accepted: u64,
    pub duplicates: u64,
    pub malformed: u64,
    pub unknown_types: u64,
    pub blank: u64,
}

impl IngestSnapshot {
    pub fn rejected(&self) -> u64 {
        self.duplicates + self.malformed + self.unknown_types
    }

    pub fn to_json_line(&self, label: &str, elapsed: Option<Duration>) -> String {
        #[derive(Serialize)]
        struct Snapshot<'a> {
            label: &'a str,
            #[serde(flatten)]
            counts: &'a IngestSnapshot,
            elapsed_ms: Option<u128>,
        }

        let payload = Snapshot {
            label,
            counts: self,
            elapsed_ms: elapsed.map(|d| d.as_millis()),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| String::from("{}"))
    }
}

pub struct BatchTimer {
    start: Instant,
}

impl BatchTimer {
    pub fn start() -> Self {
        Self { start: Instant::now() }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}
