//! Authoritative marker store. Diffs incoming reports against current state
//! and notifies subscribers exactly once per logical change.

use bevy::prelude::*;
use std::collections::HashMap;

use crate::markers::{marker_key, MarkerCategory, MarkerRecord, VisualAssetRef};

#[derive(Clone, Debug)]
pub enum MarkerEvent {
    Added(MarkerRecord),
    Updated(MarkerRecord),
    Removed(String),
}

impl MarkerEvent {
    pub fn id(&self) -> &str {
        match self {
            MarkerEvent::Added(record) | MarkerEvent::Updated(record) => &record.id,
            MarkerEvent::Removed(id) => id,
        }
    }
}

/// Error surfaced by a subscriber callback. Dispatch logs it and moves on;
/// display-layer code is less trusted than the registry itself.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct SubscriberError(pub String);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct SubscriberId(u64);

pub type Subscriber = Box<dyn FnMut(&MarkerEvent) -> Result<(), SubscriberError> + Send + Sync>;

/// Key to record store for every trackable entity. All mutation happens on
/// the frame-loop thread; dispatch holds `&mut self`, so a subscriber cannot
/// re-enter the registry. Consumers that react by mutating queue the event
/// and apply it from their own systems.
#[derive(Resource, Default)]
pub struct MarkerRegistry {
    records: HashMap<String, MarkerRecord>,
    subscribers: Vec<(SubscriberId, Subscriber)>,
    next_subscriber: u64,
}

impl MarkerRegistry {
    /// Inserts the record by id, or replaces the stored record wholesale.
    /// Emits exactly one `Added` or one `Updated`, never both. Callers own
    /// id uniqueness; a colliding id silently replaces by contract, but a
    /// category change on replacement is flagged in debug builds because
    /// categories are immutable for the life of a record.
    pub fn add_or_update(&mut self, record: MarkerRecord) {
        let event = match self.records.insert(record.id.clone(), record.clone()) {
            None => MarkerEvent::Added(record),
            Some(previous) => {
                if cfg!(debug_assertions) && previous.category != record.category {
                    warn!(
                        "marker {} changed category {:?} -> {:?}; re-categorizing requires remove + add",
                        record.id, previous.category, record.category
                    );
                }
                MarkerEvent::Updated(record)
            }
        };
        self.dispatch(&event);
    }

    /// Deletes the record if present and emits `Removed`. Removing an
    /// unknown id is a silent no-op.
    pub fn remove(&mut self, id: &str) {
        if self.records.remove(id).is_some() {
            self.dispatch(&MarkerEvent::Removed(id.to_string()));
        }
    }

    /// Removes every record whose id starts with the prefix, one `Removed`
    /// per record so subscribers stay consistent incrementally.
    pub fn remove_by_prefix(&mut self, prefix: &str) {
        let matching: Vec<String> = self
            .records
            .keys()
            .filter(|id| id.starts_with(prefix))
            .cloned()
            .collect();

        for id in matching {
            self.remove(&id);
        }
    }

    pub fn get(&self, id: &str) -> Option<&MarkerRecord> {
        self.records.get(id)
    }

    /// Snapshot iteration; order is unspecified.
    pub fn records(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a subscriber; dispatch runs in subscription order.
    pub fn subscribe(&mut self, subscriber: Subscriber) -> SubscriberId {
        let id = SubscriberId(self.next_subscriber);
        self.next_subscriber += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriberId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(existing, _)| *existing != id);
        self.subscribers.len() != before
    }

    fn dispatch(&mut self, event: &MarkerEvent) {
        for (id, subscriber) in self.subscribers.iter_mut() {
            if let Err(error) = subscriber(event) {
                warn!(
                    "marker subscriber {:?} failed on event for {}: {}",
                    id,
                    event.id(),
                    error
                );
            }
        }
    }
}

/// Provider entry point: a tracked report becomes an add-or-update, an
/// untracked one a removal. The per-category key strategy is applied here,
/// once, at registration time.
pub fn report_entity(
    registry: &mut MarkerRegistry,
    category: MarkerCategory,
    source_id: &str,
    world_position: Vec3,
    asset: VisualAssetRef,
    offset: Vec2,
    tracking_enabled: bool,
) {
    if tracking_enabled {
        let mut record = MarkerRecord::new(category, source_id, world_position).with_asset(asset);
        record.offset = offset;
        registry.add_or_update(record);
    } else {
        registry.remove(&marker_key(category, source_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::MarkerCategory;
    use std::sync::{Arc, Mutex};

    fn record(category: MarkerCategory, source: &str, x: f32) -> MarkerRecord {
        MarkerRecord::new(category, source, Vec3::new(x, 0.0, 0.0))
    }

    fn collecting_subscriber(log: Arc<Mutex<Vec<String>>>, tag: &str) -> Subscriber {
        let tag = tag.to_string();
        Box::new(move |event| {
            let kind = match event {
                MarkerEvent::Added(_) => "added",
                MarkerEvent::Updated(_) => "updated",
                MarkerEvent::Removed(_) => "removed",
            };
            log.lock()
                .unwrap()
                .push(format!("{tag}:{kind}:{}", event.id()));
            Ok(())
        })
    }

    #[test]
    fn add_emits_exactly_one_added() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));

        registry.add_or_update(record(MarkerCategory::Contract, "A", 1.0));

        assert_eq!(*log.lock().unwrap(), vec!["s:added:Contract_Marker_A"]);
    }

    #[test]
    fn update_emits_exactly_one_updated_and_keeps_one_record() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));

        registry.add_or_update(record(MarkerCategory::Contract, "A", 1.0));
        registry.add_or_update(record(MarkerCategory::Contract, "A", 9.0));

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("Contract_Marker_A").unwrap().world_position.x,
            9.0
        );
        assert_eq!(
            *log.lock().unwrap(),
            vec!["s:added:Contract_Marker_A", "s:updated:Contract_Marker_A"]
        );
    }

    #[test]
    fn update_is_full_replacement_not_a_patch() {
        let mut registry = MarkerRegistry::default();

        registry.add_or_update(record(MarkerCategory::Contract, "A", 1.0));
        let replacement =
            record(MarkerCategory::Contract, "A", 2.0).with_visibility(false, false);
        registry.add_or_update(replacement);

        let stored = registry.get("Contract_Marker_A").unwrap();
        assert!(!stored.visible_on_minimap);
        assert!(!stored.visible_on_compass);
    }

    #[test]
    fn remove_emits_removed_once() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.add_or_update(record(MarkerCategory::Vehicle, "V1", 0.0));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));
        registry.remove("Vehicle_Marker_V1");

        assert!(registry.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["s:removed:Vehicle_Marker_V1"]);
    }

    #[test]
    fn remove_of_unknown_id_emits_nothing() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));

        registry.remove("Contract_Marker_ghost");

        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn remove_by_prefix_removes_matches_only() {
        let mut registry = MarkerRegistry::default();

        registry.add_or_update(record(MarkerCategory::Contract, "A", 0.0));
        registry.add_or_update(record(MarkerCategory::Contract, "B", 0.0));
        registry.add_or_update(record(MarkerCategory::Property, "P", 0.0));

        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));
        registry.remove_by_prefix("Contract_Marker");

        assert_eq!(registry.len(), 1);
        assert!(registry.get("Property_Marker_P").is_some());

        let mut events = log.lock().unwrap().clone();
        events.sort();
        assert_eq!(
            events,
            vec![
                "s:removed:Contract_Marker_A",
                "s:removed:Contract_Marker_B"
            ]
        );
    }

    #[test]
    fn subscribers_receive_events_in_subscription_order() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "first"));
        registry.subscribe(collecting_subscriber(log.clone(), "second"));

        registry.add_or_update(record(MarkerCategory::Supplier, "S", 0.0));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["first:added:Supplier_Marker_S", "second:added:Supplier_Marker_S"]
        );
    }

    #[test]
    fn failing_subscriber_does_not_block_later_subscribers() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));

        registry.subscribe(Box::new(|_| Err(SubscriberError("boom".to_string()))));
        registry.subscribe(collecting_subscriber(log.clone(), "late"));

        registry.add_or_update(record(MarkerCategory::DeadDrop, "D", 0.0));

        assert_eq!(*log.lock().unwrap(), vec!["late:added:DeadDrop_Marker_D"]);
        // Registry state survived the failure.
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let id = registry.subscribe(collecting_subscriber(log.clone(), "s"));

        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));

        registry.add_or_update(record(MarkerCategory::Other, "X", 0.0));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn report_entity_tracks_and_untracks() {
        let mut registry = MarkerRegistry::default();
        let asset = crate::markers::VisualAssetRef::new("dot/contract");

        report_entity(
            &mut registry,
            MarkerCategory::Contract,
            "A",
            Vec3::new(10.0, 0.0, 0.0),
            asset.clone(),
            Vec2::new(2.0, 2.0),
            true,
        );
        let stored = registry.get("Contract_Marker_A").unwrap();
        assert_eq!(stored.offset, Vec2::new(2.0, 2.0));

        report_entity(
            &mut registry,
            MarkerCategory::Contract,
            "A",
            Vec3::new(10.0, 0.0, 0.0),
            asset,
            Vec2::ZERO,
            false,
        );
        assert!(registry.get("Contract_Marker_A").is_none());
    }

    #[test]
    fn per_id_event_order_matches_mutation_order() {
        let mut registry = MarkerRegistry::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        registry.subscribe(collecting_subscriber(log.clone(), "s"));

        registry.add_or_update(record(MarkerCategory::Contract, "A", 0.0));
        registry.add_or_update(record(MarkerCategory::Contract, "A", 1.0));
        registry.remove("Contract_Marker_A");

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "s:added:Contract_Marker_A",
                "s:updated:Contract_Marker_A",
                "s:removed:Contract_Marker_A"
            ]
        );
    }
}
