use ltv_core::{Event, EventStore, EventType, Verb};

/// Whether `event` must be discarded as a repeat of something already staged.
///
/// CUSTOMER and ORDER events reuse their key to mutate state, so only a
/// repeated `NEW` is a duplicate there. For every other type a repeated key
/// is always a duplicate.
pub fn is_duplicate(event: &Event, store: &EventStore) -> bool {
    let event_type = event.event_type();
    if !store.contains_key(event_type, &event.meta.key) {
        return false;
    }
    match event_type {
        EventType::Customer | EventType::Order => event.meta.verb == Verb::New,
        EventType::SiteVisit | EventType::Image => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ltv_core::lifecycle::parse_event;

    fn event(kind: &str, verb: &str, key: &str) -> Event {
        let extra = match kind {
            "CUSTOMER" => r#""last_name":"Smith","adr_city":"Austin","adr_state":"TX""#,
            "SITE_VISIT" => r#""customer_id":"c1","tags":[]"#,
            "IMAGE" => r#""customer_id":"c1","camera_make":"Canon","camera_model":"EOS""#,
            _ => r#""customer_id":"c1","total_amount":"10.00 USD""#,
        };
        parse_event(&format!(
            r#"{{"type":"{kind}","verb":"{verb}","key":"{key}","event_time":"2017-01-06T12:00:00.000000Z",{extra}}}"#
        ))
        .unwrap()
    }

    fn store_with(first: Event) -> EventStore {
        let mut store = EventStore::new();
        store.append(first);
        store
    }

    #[test]
    fn first_occurrence_is_never_a_duplicate() {
        let store = EventStore::new();
        for kind in ["CUSTOMER", "SITE_VISIT", "IMAGE", "ORDER"] {
            assert!(!is_duplicate(&event(kind, "NEW", "k1"), &store));
        }
    }

    #[test]
    fn repeated_new_is_dropped_but_update_is_admitted() {
        for kind in ["CUSTOMER", "ORDER"] {
            let store = store_with(event(kind, "NEW", "k1"));
            assert!(is_duplicate(&event(kind, "NEW", "k1"), &store), "{kind} NEW/NEW");
            assert!(!is_duplicate(&event(kind, "UPDATE", "k1"), &store), "{kind} NEW/UPDATE");
        }
    }

    #[test]
    fn visits_and_images_drop_any_repeated_key() {
        for kind in ["SITE_VISIT", "IMAGE"] {
            let store = store_with(event(kind, "NEW", "k1"));
            assert!(is_duplicate(&event(kind, "NEW", "k1"), &store));
            assert!(is_duplicate(&event(kind, "UPDATE", "k1"), &store));
            assert!(!is_duplicate(&event(kind, "NEW", "k2"), &store));
        }
    }

    #[test]
    fn keys_do_not_collide_across_types() {
        let store = store_with(event("SITE_VISIT", "NEW", "shared"));
        assert!(!is_duplicate(&event("ORDER", "NEW", "shared"), &store));
    }
}
