//! Views over a fully staged event store: per-customer summaries and the top-K LTV ranking.

pub mod output;
pub mod ranking;
pub mod summary;

pub use output::{write_top_customers, OutputError, LTV_HEADER};
pub use ranking::top_by_ltv;
pub use summary::{
    build_summaries, AggregationError, CustomerSummary, OrderEntry, SummaryTable, Timeframe,
};

pub struct TopKConfig {
    pub k: usize,
}

impl Default for TopKConfig {
    fn default() -> Self {
        Self { k: 10 }
    }
}
