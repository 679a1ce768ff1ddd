use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{Event, EventKey, EventType};

/// Append-only staging area for accepted events, bucketed by type in arrival order.
#[derive(Debug, Default)]
pub struct EventStore {
    buckets: BTreeMap<EventType, Vec<Event>>,
    keys: HashMap<EventType, HashSet<EventKey>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, event: Event) {
        let event_type = event.event_type();
        self.keys
            .entry(event_type)
            .or_default()
            .insert(event.meta.key.clone());
        self.buckets.entry(event_type).or_default().push(event);
    }

    /// Whether an event of `event_type` with this key has already been staged.
    pub fn contains_key(&self, event_type: EventType, key: &str) -> bool {
        self.keys
            .get(&event_type)
            .is_some_and(|keys| keys.contains(key))
    }

    pub fn events_of(&self, event_type: EventType) -> &[Event] {
        self.buckets.get(&event_type).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every staged event, bucket by bucket.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
