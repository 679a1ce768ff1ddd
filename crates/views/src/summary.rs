//! Per-customer summaries folded from a fully staged [`EventStore`].
//!
//! Aggregation runs in two passes. The first folds every event into a
//! private [`CustomerBuilder`] and tracks the dataset-wide [`Timeframe`];
//! the second derives visit rates and LTV. Visits per week are measured
//! against the global end of the timeframe, so the second pass cannot start
//! until the first has seen every event.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::{debug, error};

use ltv_core::lifecycle::LifecycleEvent;
use ltv_core::time::weekly_occurrences;
use ltv_core::{CustomerId, Event, EventKey, EventStore, Timestamp, Verb};
use ltv_predictors::LtvPredictor;

static DECIMAL_AMOUNT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+").expect("decimal amount pattern is valid"));

#[derive(Debug, thiserror::Error)]
pub enum AggregationError {
    #[error("order {order_key} of customer {customer_id} has no decimal amount in {raw:?}")]
    InvalidAmount {
        customer_id: CustomerId,
        order_key: EventKey,
        raw: String,
    },
    #[error("customer {customer_id} has a non-finite {metric}")]
    NonFinite {
        customer_id: CustomerId,
        metric: &'static str,
    },
}

/// Earliest and latest `event_time` across the whole dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Timeframe {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl Timeframe {
    fn widen(slot: &mut Option<Timeframe>, at: Timestamp) {
        match slot {
            Some(tf) => {
                tf.start = tf.start.min(at);
                tf.end = tf.end.max(at);
            }
            None => *slot = Some(Timeframe { start: at, end: at }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderEntry {
    pub order_value: f64,
    pub last_updated_time: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomerSummary {
    pub customer_id: CustomerId,
    /// Present once a CUSTOMER event for this id has been seen.
    pub last_name: Option<String>,
    pub registration_time: Option<Timestamp>,
    pub total_visits: u64,
    pub orders: BTreeMap<EventKey, OrderEntry>,
    pub total_order_value: f64,
    pub first_seen: Timestamp,
    pub last_seen: Timestamp,
    pub weeks_observed: u64,
    pub revenue_per_visit: f64,
    pub visits_per_week: f64,
    pub ltv: f64,
}

#[derive(Debug, Default)]
pub struct SummaryTable {
    /// `None` only when the store was empty.
    pub timeframe: Option<Timeframe>,
    pub customers: BTreeMap<CustomerId, CustomerSummary>,
}

impl SummaryTable {
    pub fn get(&self, customer_id: &str) -> Option<&CustomerSummary> {
        self.customers.get(customer_id)
    }

    pub fn values(&self) -> impl Iterator<Item = &CustomerSummary> {
        self.customers.values()
    }

    pub fn len(&self) -> usize {
        self.customers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.customers.is_empty()
    }
}

/// Pass-one state for one customer. Never escapes this module.
struct CustomerBuilder {
    customer_id: CustomerId,
    last_name: Option<String>,
    registration_time: Option<Timestamp>,
    total_visits: u64,
    orders: BTreeMap<EventKey, OrderEntry>,
    first_seen: Timestamp,
    last_seen: Timestamp,
}

impl CustomerBuilder {
    fn new(customer_id: CustomerId, seen_at: Timestamp) -> Self {
        Self {
            customer_id,
            last_name: None,
            registration_time: None,
            total_visits: 0,
            orders: BTreeMap::new(),
            first_seen: seen_at,
            last_seen: seen_at,
        }
    }

    fn fold(&mut self, event: &Event) -> Result<(), AggregationError> {
        let at = event.meta.event_time;
        match &event.payload {
            LifecycleEvent::Customer(details) => {
                self.last_name = Some(details.last_name_text());
                if event.meta.verb == Verb::New {
                    self.registration_time = Some(at);
                }
            }
            LifecycleEvent::SiteVisit(_) => self.total_visits += 1,
            LifecycleEvent::Image(_) => {}
            LifecycleEvent::Order(order) => {
                let amount = order.total_amount.as_str().and_then(extract_amount);
                let order_value = amount.ok_or_else(|| {
                    AggregationError::InvalidAmount {
                        customer_id: self.customer_id.clone(),
                        order_key: event.meta.key.clone(),
                        raw: order.total_amount.to_string(),
                    }
                })?;
                self.upsert_order(&event.meta.key, order_value, at);
            }
        }
        self.first_seen = self.first_seen.min(at);
        self.last_seen = self.last_seen.max(at);
        Ok(())
    }

    /// Last write wins by `event_time`, not by arrival.
    fn upsert_order(&mut self, key: &str, order_value: f64, at: Timestamp) {
        match self.orders.entry(key.to_string()) {
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if at > entry.last_updated_time {
                    entry.order_value = order_value;
                    entry.last_updated_time = at;
                }
            }
            Entry::Vacant(slot) => {
                slot.insert(OrderEntry {
                    order_value,
                    last_updated_time: at,
                });
            }
        }
    }

    fn finish<P: LtvPredictor>(
        self,
        timeframe_end: Timestamp,
        model: &P,
    ) -> Result<CustomerSummary, AggregationError> {
        // An empty f64 sum is -0.0, which would print as "-0.00".
        let total_order_value = self.orders.values().fold(0.0, |acc, o| acc + o.order_value);
        let revenue_per_visit = if self.total_visits > 0 {
            total_order_value / self.total_visits as f64
        } else {
            0.0
        };
        // A customer first seen at the very end of the window still spans one week.
        let weeks_observed = weekly_occurrences(self.first_seen, timeframe_end).max(1);
        let visits_per_week = self.total_visits as f64 / weeks_observed as f64;
        let ltv = model.predict(revenue_per_visit, visits_per_week);

        for (metric, value) in [
            ("total_order_value", total_order_value),
            ("revenue_per_visit", revenue_per_visit),
            ("ltv", ltv),
        ] {
            if !value.is_finite() {
                return Err(AggregationError::NonFinite {
                    customer_id: self.customer_id,
                    metric,
                });
            }
        }

        debug!(
            customer_id = %self.customer_id,
            total_visits = self.total_visits,
            total_order_value,
            weeks_observed,
            ltv,
            "customer summary finalized"
        );

        Ok(CustomerSummary {
            customer_id: self.customer_id,
            last_name: self.last_name,
            registration_time: self.registration_time,
            total_visits: self.total_visits,
            orders: self.orders,
            total_order_value,
            first_seen: self.first_seen,
            last_seen: self.last_seen,
            weeks_observed,
            revenue_per_visit,
            visits_per_week,
            ltv,
        })
    }
}

/// First `digits.digits` run in a currency string.
pub fn extract_amount(total_amount: &str) -> Option<f64> {
    DECIMAL_AMOUNT
        .find(total_amount)
        .and_then(|m| m.as_str().parse().ok())
}

/// Builds one finalized summary per customer referenced anywhere in `store`.
///
/// # Errors
///
/// Any [`AggregationError`] is fatal for the batch; it is logged here before
/// being returned.
pub fn build_summaries<P: LtvPredictor>(
    store: &EventStore,
    model: &P,
) -> Result<SummaryTable, AggregationError> {
    aggregate(store, model).inspect_err(|err| error!(error = %err, "error calculating LTV"))
}

fn aggregate<P: LtvPredictor>(
    store: &EventStore,
    model: &P,
) -> Result<SummaryTable, AggregationError> {
    let mut timeframe = None;
    let mut builders: BTreeMap<CustomerId, CustomerBuilder> = BTreeMap::new();

    for event in store.iter() {
        let at = event.meta.event_time;
        Timeframe::widen(&mut timeframe, at);
        builders
            .entry(event.meta.customer_id.clone())
            .or_insert_with(|| CustomerBuilder::new(event.meta.customer_id.clone(), at))
            .fold(event)?;
    }

    let Some(tf) = timeframe else {
        return Ok(SummaryTable::default());
    };

    let customers = builders
        .into_iter()
        .map(|(id, builder)| builder.finish(tf.end, model).map(|summary| (id, summary)))
        .collect::<Result<BTreeMap<_, _>, _>>()?;

    Ok(SummaryTable {
        timeframe: Some(tf),
        customers,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltv_core::lifecycle::parse_event;
    use ltv_predictors::SimpleLtv;

    fn store(lines: &[String]) -> EventStore {
        let mut store = EventStore::new();
        for line in lines {
            store.append(parse_event(line).unwrap());
        }
        store
    }

    fn customer(key: &str, verb: &str, name: &str, at: &str) -> String {
        format!(
            r#"{{"type":"CUSTOMER","verb":"{verb}","key":"{key}","event_time":"{at}","last_name":"{name}","adr_city":"Austin","adr_state":"TX"}}"#
        )
    }

    fn visit(key: &str, customer_id: &str, at: &str) -> String {
        format!(
            r#"{{"type":"SITE_VISIT","verb":"NEW","key":"{key}","event_time":"{at}","customer_id":"{customer_id}","tags":[]}}"#
        )
    }

    fn order(key: &str, verb: &str, customer_id: &str, amount: &str, at: &str) -> String {
        format!(
            r#"{{"type":"ORDER","verb":"{verb}","key":"{key}","event_time":"{at}","customer_id":"{customer_id}","total_amount":"{amount}"}}"#
        )
    }

    #[test]
    fn empty_store_yields_empty_table() {
        let table = build_summaries(&EventStore::new(), &SimpleLtv::default()).unwrap();
        assert!(table.is_empty());
        assert!(table.timeframe.is_none());
    }

    #[test]
    fn order_updates_are_last_write_wins_by_event_time() {
        let store = store(&[
            order("o1", "NEW", "c1", "10.00 USD", "2017-01-03T00:00:00.000000Z"),
            order("o1", "UPDATE", "c1", "30.00 USD", "2017-01-05T00:00:00.000000Z"),
            // arrives last but happened earlier
            order("o1", "UPDATE", "c1", "99.00 USD", "2017-01-04T00:00:00.000000Z"),
            order("o2", "NEW", "c1", "$5.50", "2017-01-04T00:00:00.000000Z"),
        ]);
        let table = build_summaries(&store, &SimpleLtv::default()).unwrap();
        let c1 = table.get("c1").unwrap();

        assert_eq!(c1.orders["o1"].order_value, 30.0);
        assert_eq!(c1.orders.len(), 2);
        assert_eq!(c1.total_order_value, 35.5);
        assert_eq!(c1.total_visits, 0);
        assert_eq!(c1.revenue_per_visit, 0.0);
        assert_eq!(c1.ltv, 0.0);
        assert!(c1.last_name.is_none());
    }

    #[test]
    fn derives_rates_against_global_window() {
        let store = store(&[
            customer("c1", "NEW", "Smith", "2017-01-01T00:00:00.000000Z"),
            customer("c1", "UPDATE", "Smyth", "2017-01-02T00:00:00.000000Z"),
            visit("v1", "c1", "2017-01-02T00:00:00.000000Z"),
            visit("v2", "c1", "2017-01-03T00:00:00.000000Z"),
            order("o1", "NEW", "c1", "25.00 USD", "2017-01-03T00:00:00.000000Z"),
            // another customer stretches the window to three weekly occurrences
            visit("v3", "c2", "2017-01-15T00:00:00.000000Z"),
        ]);
        let table = build_summaries(&store, &SimpleLtv::default()).unwrap();

        let tf = table.timeframe.unwrap();
        assert_eq!(tf.end.to_rfc3339(), "2017-01-15T00:00:00+00:00");

        let c1 = table.get("c1").unwrap();
        assert_eq!(c1.last_name.as_deref(), Some("Smyth"));
        assert_eq!(
            c1.registration_time.map(|t| t.to_rfc3339()).as_deref(),
            Some("2017-01-01T00:00:00+00:00")
        );
        assert_eq!(c1.weeks_observed, 3);
        assert_eq!(c1.revenue_per_visit, 12.5);
        assert_eq!(c1.visits_per_week, 2.0 / 3.0);
        assert_eq!(c1.ltv, ltv_predictors::round_cents(52.0 * 12.5 * (2.0 / 3.0) * 10.0));

        let c2 = table.get("c2").unwrap();
        assert_eq!(c2.weeks_observed, 1);
        assert_eq!(c2.visits_per_week, 1.0);

        for summary in table.values() {
            assert!(summary.first_seen <= summary.last_seen);
        }
    }

    #[test]
    fn visits_without_orders_have_positive_zero_ltv() {
        let store = store(&[
            customer("c2", "NEW", "Jones", "2017-01-01T00:00:00.000000Z"),
            visit("v1", "c2", "2017-01-02T00:00:00.000000Z"),
        ]);
        let table = build_summaries(&store, &SimpleLtv::default()).unwrap();
        let c2 = table.get("c2").unwrap();

        assert_eq!(c2.total_visits, 1);
        assert!(c2.total_order_value.is_sign_positive());
        assert!(c2.revenue_per_visit.is_sign_positive());
        assert!(c2.ltv.is_sign_positive());
        assert_eq!(format!("{:.2}", c2.ltv), "0.00");
    }

    #[test]
    fn null_last_name_and_non_string_tags_still_count() {
        let store = store(&[
            r#"{"type":"CUSTOMER","verb":"NEW","key":"c1","event_time":"2017-01-01T00:00:00.000000Z","last_name":"Smith","adr_city":null,"adr_state":"AK"}"#.to_string(),
            r#"{"type":"SITE_VISIT","verb":"NEW","key":"v1","event_time":"2017-01-01T01:00:00.000000Z","customer_id":"c1","tags":[{"some key":"some value"}]}"#.to_string(),
            order("o1", "NEW", "c1", "12.34 USD", "2017-01-01T02:00:00.000000Z"),
        ]);
        let table = build_summaries(&store, &SimpleLtv::default()).unwrap();
        let c1 = table.get("c1").unwrap();

        assert_eq!(c1.last_name.as_deref(), Some("Smith"));
        assert_eq!(c1.total_visits, 1);
        assert_eq!(c1.ltv, 6416.8);
    }

    #[test]
    fn non_string_amount_is_fatal() {
        let store = store(&[
            r#"{"type":"ORDER","verb":"NEW","key":"o1","event_time":"2017-01-03T00:00:00.000000Z","customer_id":"c1","total_amount":12.5}"#.to_string(),
        ]);
        let err = build_summaries(&store, &SimpleLtv::default()).unwrap_err();
        assert!(matches!(err, AggregationError::InvalidAmount { ref raw, .. } if raw == "12.5"));
    }

    #[test]
    fn order_without_decimal_amount_is_fatal() {
        let store = store(&[order("o1", "NEW", "c1", "12 USD", "2017-01-03T00:00:00.000000Z")]);
        let err = build_summaries(&store, &SimpleLtv::default()).unwrap_err();
        assert!(matches!(
            err,
            AggregationError::InvalidAmount { ref order_key, .. } if order_key == "o1"
        ));
    }

    #[test]
    fn extracts_first_decimal_run() {
        assert_eq!(extract_amount("$123.45"), Some(123.45));
        assert_eq!(extract_amount("12.34 USD"), Some(12.34));
        assert_eq!(extract_amount("USD 7"), None);
    }
}
