//! Customer lifecycle events and their decoding from one JSON record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::time::parse_event_time;
use crate::{CoreError, EventEnvelope, EventMeta, EventType, Verb};

// Type-specific fields are only required to be present; their values are
// kept as received.

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CustomerDetails {
    pub last_name: Value,
    pub adr_city: Value,
    pub adr_state: Value,
}

impl CustomerDetails {
    /// Last name as output text: `null` renders empty, non-strings as JSON.
    pub fn last_name_text(&self) -> String {
        match &self.last_name {
            Value::String(name) => name.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SiteVisit {
    pub tags: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ImageUpload {
    pub camera_make: Value,
    pub camera_model: Value,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderPlaced {
    /// Currency text as received, e.g. `"12.34 USD"` or `"$123.45"`.
    pub total_amount: Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleEvent {
    Customer(CustomerDetails),
    SiteVisit(SiteVisit),
    Image(ImageUpload),
    Order(OrderPlaced),
}

impl LifecycleEvent {
    pub fn event_type(&self) -> EventType {
        match self {
            LifecycleEvent::Customer(_) => EventType::Customer,
            LifecycleEvent::SiteVisit(_) => EventType::SiteVisit,
            LifecycleEvent::Image(_) => EventType::Image,
            LifecycleEvent::Order(_) => EventType::Order,
        }
    }
}

pub type Event = EventEnvelope<LifecycleEvent>;

impl Event {
    pub fn event_type(&self) -> EventType {
        self.payload.event_type()
    }
}

#[derive(Deserialize)]
struct TypeTag {
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Deserialize)]
struct CommonFields {
    verb: String,
    event_time: String,
    key: String,
    // CUSTOMER records identify the customer by their own key.
    customer_id: Option<String>,
}

/// Decodes one raw line into a typed event.
pub fn parse_event(raw: &str) -> Result<Event, CoreError> {
    let value: Value = serde_json::from_str(raw)?;
    decode_event(value)
}

pub fn decode_event(value: Value) -> Result<Event, CoreError> {
    let TypeTag { kind } = TypeTag::deserialize(&value)?;
    let event_type = EventType::from_tag(&kind).ok_or(CoreError::UnknownEventType(kind))?;

    let common = CommonFields::deserialize(&value)?;
    let customer_id = match (event_type, common.customer_id) {
        (EventType::Customer, _) => common.key.clone(),
        (_, Some(id)) => id,
        (_, None) => return Err(missing_field("customer_id")),
    };

    let payload = match event_type {
        EventType::Customer => LifecycleEvent::Customer(CustomerDetails {
            last_name: required(&value, "last_name")?,
            adr_city: required(&value, "adr_city")?,
            adr_state: required(&value, "adr_state")?,
        }),
        EventType::SiteVisit => LifecycleEvent::SiteVisit(SiteVisit {
            tags: required(&value, "tags")?,
        }),
        EventType::Image => LifecycleEvent::Image(ImageUpload {
            camera_make: required(&value, "camera_make")?,
            camera_model: required(&value, "camera_model")?,
        }),
        EventType::Order => LifecycleEvent::Order(OrderPlaced {
            total_amount: required(&value, "total_amount")?,
        }),
    };

    Ok(EventEnvelope {
        meta: EventMeta {
            verb: Verb::from(common.verb),
            customer_id,
            event_time: parse_event_time(&common.event_time)?,
            key: common.key,
        },
        payload,
    })
}

fn required(value: &Value, field: &'static str) -> Result<Value, CoreError> {
    value.get(field).cloned().ok_or_else(|| missing_field(field))
}

fn missing_field(field: &'static str) -> CoreError {
    CoreError::Malformed(<serde_json::Error as serde::de::Error>::missing_field(field))
}
