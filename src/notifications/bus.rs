//! Broadcasts transitions to listeners.

use crate::events::SubscriptionEvent;
use crate::subscription::Subscription;
use crate::transitions::Transition;
use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::warn;

use super::types::{BusConfig, DropReason, ListenerHandle, ListenerId, TransitionNotice};

/// Internal listener state.
struct Listener {
    config: BusConfig,
    sender: Sender<TransitionNotice>,
}

impl Listener {
    /// Try to send a transition notice. Returns false if the buffer is full
    /// or the receiver is gone.
    ///
    /// The channel holds one slot beyond `buffer_size`, kept free for the
    /// final `Dropped` notice.
    fn try_send(&self, notice: TransitionNotice) -> bool {
        if self.sender.len() >= self.config.buffer_size {
            return false;
        }
        self.sender.try_send(notice).is_ok()
    }

    /// Send the final notice into the reserved slot.
    fn send_dropped(&self, reason: DropReason) {
        let _ = self.sender.try_send(TransitionNotice::Dropped { reason });
    }
}

/// Fans transitions out to listeners.
pub struct TransitionBus {
    listeners: RwLock<HashMap<ListenerId, Listener>>,
    next_id: AtomicU64,
}

impl TransitionBus {
    pub fn new() -> Self {
        Self {
            listeners: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a listener.
    pub fn subscribe(&self, config: BusConfig) -> ListenerHandle {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size + 1);

        self.listeners.write().insert(id, Listener { config, sender });

        ListenerHandle { id, receiver }
    }

    /// Remove a listener and tell it so.
    pub fn unsubscribe(&self, id: ListenerId) {
        if let Some(listener) = self.listeners.write().remove(&id) {
            listener.send_dropped(DropReason::Unsubscribed);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    /// Publish the transition produced by `event`.
    ///
    /// Returns the published transition, or `None` if the event has no
    /// transition on `subscription`.
    pub fn publish(
        &self,
        subscription: &Subscription,
        event: &SubscriptionEvent,
        sequence_id: u32,
    ) -> Option<Transition> {
        let transition = subscription.transition_from_event(event, sequence_id)?;
        self.publish_transition(&transition);
        Some(transition)
    }

    /// Broadcast a transition to matching listeners. Drops listeners that
    /// fail to receive.
    pub fn publish_transition(&self, transition: &Transition) {
        let mut to_remove = Vec::new();

        {
            let listeners = self.listeners.read();
            for (id, listener) in listeners.iter() {
                if !listener.config.filter.matches(transition) {
                    continue;
                }
                let notice = TransitionNotice::Transition {
                    transition: Box::new(transition.clone()),
                };
                if !listener.try_send(notice) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut listeners = self.listeners.write();
            for id in to_remove {
                if let Some(listener) = listeners.remove(&id) {
                    warn!(listener = id.0, "Dropping slow transition listener");
                    listener.send_dropped(DropReason::BufferOverflow);
                }
            }
        }
    }
}

impl Default for TransitionBus {
    fn default() -> Self {
        Self::new()
    }
}
