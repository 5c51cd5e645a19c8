//! Event source contract and an in-memory implementation.

use super::types::{EventInput, SubscriptionEvent};
use crate::error::{Result, TimelineError};
use crate::types::{EventId, SubscriptionId, TotalOrdering};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Supplies the persisted events of a subscription.
///
/// Implementations must return events sorted by `total_ordering`; the
/// transition builder does not re-sort.
pub trait EventSource {
    fn fetch_events(&self, subscription_id: SubscriptionId) -> Result<Vec<SubscriptionEvent>>;
}

/// In-memory event log keyed by subscription.
///
/// Total ordering is assigned from a single counter shared by all
/// subscriptions, so it is strictly increasing within each log.
pub struct MemoryEventSource {
    /// Events per subscription, in append order.
    logs: RwLock<HashMap<SubscriptionId, Vec<SubscriptionEvent>>>,

    /// Next ordering value to assign.
    next_ordering: AtomicU64,
}

impl MemoryEventSource {
    pub fn new() -> Self {
        Self {
            logs: RwLock::new(HashMap::new()),
            next_ordering: AtomicU64::new(1),
        }
    }

    /// Append an event to a subscription's log.
    ///
    /// Returns the stored event with its assigned ordering.
    pub fn append(
        &self,
        subscription_id: SubscriptionId,
        input: EventInput,
        active_version: u64,
    ) -> SubscriptionEvent {
        let mut logs = self.logs.write();

        // Taken under the logs lock so each log stays ordered.
        let ordering = TotalOrdering(self.next_ordering.fetch_add(1, Ordering::SeqCst));

        let event = input.into_event(subscription_id, ordering, active_version);
        logs.entry(subscription_id).or_default().push(event.clone());
        event
    }

    /// Mark an event inactive so replays skip it.
    pub fn deactivate(&self, subscription_id: SubscriptionId, event_id: EventId) -> Result<()> {
        let mut logs = self.logs.write();
        let event = logs
            .get_mut(&subscription_id)
            .and_then(|log| log.iter_mut().find(|e| e.id == event_id))
            .ok_or_else(|| {
                TimelineError::EventSource(format!(
                    "event {} not found for subscription {}",
                    event_id, subscription_id
                ))
            })?;
        event.is_active = false;
        Ok(())
    }

    /// Number of events stored for a subscription (active or not).
    pub fn event_count(&self, subscription_id: SubscriptionId) -> usize {
        self.logs
            .read()
            .get(&subscription_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

impl Default for MemoryEventSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSource for MemoryEventSource {
    fn fetch_events(&self, subscription_id: SubscriptionId) -> Result<Vec<SubscriptionEvent>> {
        Ok(self
            .logs
            .read()
            .get(&subscription_id)
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_append_assigns_increasing_ordering() {
        let source = MemoryEventSource::new();
        let a = SubscriptionId::new();
        let b = SubscriptionId::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let first = source.append(a, EventInput::create(at, "gold-monthly", "gold-trial", "DEFAULT"), 0);
        let other = source.append(b, EventInput::create(at, "gold-monthly", "gold-trial", "DEFAULT"), 0);
        let second = source.append(a, EventInput::cancel(at), 0);

        assert!(first.total_ordering < other.total_ordering);
        assert!(other.total_ordering < second.total_ordering);

        let events = source.fetch_events(a).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].id, first.id);
        assert_eq!(events[1].id, second.id);
    }

    #[test]
    fn test_fetch_unknown_subscription_is_empty() {
        let source = MemoryEventSource::new();
        assert!(source.fetch_events(SubscriptionId::new()).unwrap().is_empty());
    }

    #[test]
    fn test_deactivate() {
        let source = MemoryEventSource::new();
        let id = SubscriptionId::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let event = source.append(id, EventInput::cancel(at), 0);

        source.deactivate(id, event.id).unwrap();
        assert!(!source.fetch_events(id).unwrap()[0].is_active);

        let result = source.deactivate(id, EventId::new());
        assert!(matches!(result, Err(TimelineError::EventSource(_))));
    }

    #[test]
    fn test_concurrent_appends_keep_log_ordered() {
        let source = MemoryEventSource::new();
        let id = SubscriptionId::new();
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        std::thread::scope(|s| {
            for _ in 0..4 {
                s.spawn(|| {
                    for _ in 0..50 {
                        source.append(id, EventInput::phase(at, "gold-evergreen"), 0);
                    }
                });
            }
        });

        let events = source.fetch_events(id).unwrap();
        assert_eq!(events.len(), 200);
        assert!(events.windows(2).all(|w| w[0].total_ordering < w[1].total_ordering));
        assert_eq!(events.last().unwrap().total_ordering, TotalOrdering(200));
    }
}
