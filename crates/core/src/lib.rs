//! Core types for the customer lifetime-value batch.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type CustomerId = String;
pub type EventKey = String;
pub type Timestamp = DateTime<Utc>;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Customer,
    SiteVisit,
    Image,
    Order,
}

impl EventType {
    pub const ALL: [EventType; 4] = [
        EventType::Customer,
        EventType::SiteVisit,
        EventType::Image,
        EventType::Order,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::Customer => "CUSTOMER",
            EventType::SiteVisit => "SITE_VISIT",
            EventType::Image => "IMAGE",
            EventType::Order => "ORDER",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == tag)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action qualifier on an event. Verbs other than `NEW`/`UPDATE` are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Verb {
    New,
    Update,
    Other(String),
}

impl From<String> for Verb {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "NEW" => Verb::New,
            "UPDATE" => Verb::Update,
            _ => Verb::Other(raw),
        }
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verb::New => f.write_str("NEW"),
            Verb::Update => f.write_str("UPDATE"),
            Verb::Other(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventMeta {
    pub verb: Verb,
    pub customer_id: CustomerId,
    pub event_time: Timestamp,
    pub key: EventKey,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope<T> {
    pub meta: EventMeta,
    pub payload: T,
}

/// Per-record failures. None of these abort a batch.
#[derive(thiserror::Error, Debug)]
pub enum CoreError {
    #[error("undefined event type: {0}")]
    UnknownEventType(String),
    #[error("malformed event: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("invalid event_time {value:?}: {source}")]
    InvalidTimestamp {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    #[error("duplicate {event_type} event with key {key}")]
    Duplicate { event_type: EventType, key: EventKey },
}

pub mod lifecycle;
pub mod store;
pub mod time;

pub use lifecycle::{Event, LifecycleEvent};
pub use store::EventStore;
