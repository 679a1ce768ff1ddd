use chrono::{NaiveDateTime, SubsecRound, TimeDelta};

use crate::{CoreError, Timestamp};

/// Wire format of `event_time`, e.g. `2017-01-06T12:46:46.384Z`.
pub const EVENT_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.fZ";

pub fn parse_event_time(raw: &str) -> Result<Timestamp, CoreError> {
    NaiveDateTime::parse_from_str(raw, EVENT_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|source| CoreError::InvalidTimestamp {
            value: raw.to_string(),
            source,
        })
}

/// Number of weekly occurrences starting at `start` that fall on or before `until`.
///
/// Occurrences are anchored at `start` truncated to whole seconds, and that
/// anchor itself counts, so any non-negative window yields at least 1.
/// Returns 0 when `until` precedes the anchor.
pub fn weekly_occurrences(start: Timestamp, until: Timestamp) -> u64 {
    let start = start.trunc_subsecs(0);
    if until < start {
        return 0;
    }
    let week = TimeDelta::weeks(1).num_seconds();
    let elapsed = (until - start).num_seconds();
    (elapsed / week) as u64 + 1
}
