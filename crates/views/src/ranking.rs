use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::summary::{CustomerSummary, SummaryTable};

/// Heap entry ordered so that "greater" means "ranks higher":
/// larger LTV first, then smaller customer id.
struct Ranked<'a>(&'a CustomerSummary);

impl Ord for Ranked<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0
            .ltv
            .total_cmp(&other.0.ltv)
            .then_with(|| other.0.customer_id.cmp(&self.0.customer_id))
    }
}

impl PartialOrd for Ranked<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Ranked<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Ranked<'_> {}

/// The `n` customers with the highest LTV, best first. Ties go to the
/// lower customer id. Keeps at most `n` candidates in memory.
pub fn top_by_ltv(table: &SummaryTable, n: usize) -> Vec<&CustomerSummary> {
    if n == 0 {
        return Vec::new();
    }
    let mut heap: BinaryHeap<Reverse<Ranked<'_>>> = BinaryHeap::with_capacity(n + 1);
    for summary in table.values() {
        heap.push(Reverse(Ranked(summary)));
        if heap.len() > n {
            heap.pop();
        }
    }
    // ascending by Reverse is descending by rank
    heap.into_sorted_vec()
        .into_iter()
        .map(|Reverse(Ranked(summary))| summary)
        .collect()
}
