//! Error types for transition replay and queries.

use crate::catalog::CatalogError;
use crate::events::ApiEventType;
use crate::types::{BillingActionPolicy, EventId, SubscriptionId};
use thiserror::Error;

/// Main error type for replay and query operations.
#[derive(Debug, Error)]
pub enum TimelineError {
    #[error("Unexpected user event type {event_type:?} in event {event} for subscription {subscription}")]
    UnexpectedUserEvent {
        subscription: SubscriptionId,
        event: EventId,
        event_type: ApiEventType,
    },

    #[error("Catalog resolution failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("No transitions for subscription {0}")]
    NoTransitions(SubscriptionId),

    #[error("Failed to find {what} for subscription {subscription}")]
    TransitionNotFound {
        subscription: SubscriptionId,
        what: &'static str,
    },

    #[error("Unexpected policy type {0}")]
    UnexpectedPolicy(BillingActionPolicy),

    #[error("Event source error: {0}")]
    EventSource(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for TimelineError {
    fn from(e: serde_json::Error) -> Self {
        TimelineError::Serialization(e.to_string())
    }
}

/// Result type for replay and query operations.
pub type Result<T> = std::result::Result<T, TimelineError>;
