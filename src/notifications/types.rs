//! Listener types for transition notifications.

use crate::transitions::{Transition, TransitionType};
use crate::types::SubscriptionId;
use serde::{Deserialize, Serialize};

/// Configuration for a listener.
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Max buffered notices before dropping the listener.
    /// Default: 1000
    pub buffer_size: usize,

    /// Filter criteria.
    pub filter: NoticeFilter,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1000,
            filter: NoticeFilter::default(),
        }
    }
}

/// Filter criteria for listeners. `None` matches everything.
#[derive(Clone, Debug, Default)]
pub struct NoticeFilter {
    pub subscriptions: Option<Vec<SubscriptionId>>,
    pub transition_types: Option<Vec<TransitionType>>,
}

impl NoticeFilter {
    /// Listen to specific subscriptions.
    pub fn subscriptions(ids: Vec<SubscriptionId>) -> Self {
        Self {
            subscriptions: Some(ids),
            ..Default::default()
        }
    }

    /// Listen to specific transition types.
    pub fn transition_types(types: Vec<TransitionType>) -> Self {
        Self {
            transition_types: Some(types),
            ..Default::default()
        }
    }

    pub fn matches(&self, transition: &Transition) -> bool {
        if let Some(ref ids) = self.subscriptions {
            if !ids.contains(&transition.subscription_id) {
                return false;
            }
        }

        if let Some(ref types) = self.transition_types {
            if !types.contains(&transition.transition_type()) {
                return false;
            }
        }

        true
    }
}

/// Notices delivered to listeners.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransitionNotice {
    /// A transition took place.
    Transition { transition: Box<Transition> },

    /// The listener was dropped.
    Dropped { reason: DropReason },
}

/// Why a listener was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Handle to receive notices.
pub struct ListenerHandle {
    pub id: ListenerId,
    pub receiver: crossbeam_channel::Receiver<TransitionNotice>,
}

impl ListenerHandle {
    /// Receive the next notice (blocking).
    pub fn recv(&self) -> Result<TransitionNotice, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a notice (non-blocking).
    pub fn try_recv(&self) -> Result<TransitionNotice, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<TransitionNotice, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}
