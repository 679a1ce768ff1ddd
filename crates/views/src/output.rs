use std::io::Write;

use tracing::{error, info};

use crate::ranking::top_by_ltv;
use crate::summary::SummaryTable;

pub const LTV_HEADER: [&str; 3] = ["Customer_ID", "Last_Name", "LTV"];

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("csv write failed: {0}")]
    Csv(#[from] csv::Error),
    #[error("flushing output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Writes the header and the top `n` customers by LTV as CSV rows.
///
/// Customers never seen in a CUSTOMER event get an empty last name.
///
/// # Errors
///
/// Any [`OutputError`] is fatal for the batch; it is logged here before
/// being returned.
pub fn write_top_customers<W: Write>(
    table: &SummaryTable,
    n: usize,
    writer: W,
) -> Result<usize, OutputError> {
    write_rows(table, n, writer).inspect_err(|err| error!(error = %err, "error writing output"))
}

fn write_rows<W: Write>(table: &SummaryTable, n: usize, writer: W) -> Result<usize, OutputError> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(LTV_HEADER)?;

    let ranked = top_by_ltv(table, n);
    for summary in &ranked {
        let ltv = format!("{:.2}", summary.ltv);
        out.write_record([
            summary.customer_id.as_str(),
            summary.last_name.as_deref().unwrap_or_default(),
            ltv.as_str(),
        ])?;
    }
    out.flush()?;

    info!(rows = ranked.len(), requested = n, "wrote top customers by LTV");
    Ok(ranked.len())
}
