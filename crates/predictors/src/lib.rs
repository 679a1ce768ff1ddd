//! Lifetime-value models.

use serde::{Deserialize, Serialize};

/// Projects a customer's lifetime value from observed spend and visit rate.
pub trait LtvPredictor {
    fn predict(&self, revenue_per_visit: f64, visits_per_week: f64) -> f64;
}

/// `weeks_per_year * revenue_per_visit * visits_per_week * lifespan_years`,
/// rounded to cents.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct SimpleLtv {
    pub weeks_per_year: f64,
    pub lifespan_years: f64,
}

impl Default for SimpleLtv {
    fn default() -> Self {
        Self {
            weeks_per_year: 52.0,
            lifespan_years: 10.0,
        }
    }
}

impl LtvPredictor for SimpleLtv {
    fn predict(&self, revenue_per_visit: f64, visits_per_week: f64) -> f64 {
        round_cents(self.weeks_per_year * revenue_per_visit * visits_per_week * self.lifespan_years)
    }
}

/// Rounds to two places from the exact binary value, like a correctly
/// rounded decimal conversion. Scaling by 100 first would push near-ties
/// such as 2147.915 (stored just below) up to 2147.92.
pub fn round_cents(value: f64) -> f64 {
    format!("{value:.2}").parse().unwrap_or(value)
}
