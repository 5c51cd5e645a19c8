//! Persisted lifecycle events.

use crate::types::{EventId, SubscriptionId, TotalOrdering};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a persisted event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    ApiUser,
    Phase,
}

/// User-initiated action recorded by an `API_USER` event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiEventType {
    Create,
    ReCreate,
    Change,
    Cancel,
    Uncancel,
    Transfer,
    MigrateBilling,
    MigrateEntitlement,
}

impl ApiEventType {
    /// Whether this event starts a fresh history, discarding the previous side.
    pub fn starts_history(self) -> bool {
        matches!(
            self,
            ApiEventType::Create
                | ApiEventType::ReCreate
                | ApiEventType::Transfer
                | ApiEventType::MigrateBilling
                | ApiEventType::MigrateEntitlement
        )
    }
}

/// Payload of an `API_USER` event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApiUserEvent {
    pub event_type: ApiEventType,
    pub plan_name: Option<String>,
    pub phase_name: Option<String>,
    pub price_list_name: Option<String>,
    /// False for speculative events that were never persisted.
    pub from_disk: bool,
    pub user_token: Option<Uuid>,
}

/// Event payload, keyed by category.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
    ApiUser(ApiUserEvent),
    Phase { phase_name: String },
}

/// A persisted fact driving a subscription state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionEvent {
    pub id: EventId,
    pub subscription_id: SubscriptionId,
    pub requested_date: DateTime<Utc>,
    pub effective_date: DateTime<Utc>,
    pub created_date: DateTime<Utc>,
    pub total_ordering: TotalOrdering,
    pub active_version: u64,
    pub is_active: bool,
    pub kind: EventKind,
}

impl SubscriptionEvent {
    pub fn event_type(&self) -> EventType {
        match self.kind {
            EventKind::ApiUser(_) => EventType::ApiUser,
            EventKind::Phase { .. } => EventType::Phase,
        }
    }

    pub fn api_event_type(&self) -> Option<ApiEventType> {
        match &self.kind {
            EventKind::ApiUser(user) => Some(user.event_type),
            EventKind::Phase { .. } => None,
        }
    }

    pub fn is_from_disk(&self) -> bool {
        match &self.kind {
            EventKind::ApiUser(user) => user.from_disk,
            EventKind::Phase { .. } => true,
        }
    }

    /// Whether this event is replayed for a subscription at `active_version`.
    pub fn is_replayable(&self, active_version: u64) -> bool {
        self.is_active && self.active_version >= active_version
    }
}

/// Input for a new event (before ordering and version are assigned).
#[derive(Clone, Debug)]
pub struct EventInput {
    pub id: EventId,
    pub requested_date: DateTime<Utc>,
    pub effective_date: DateTime<Utc>,
    pub created_date: DateTime<Utc>,
    pub kind: EventKind,
}

impl EventInput {
    /// A user event with plan, phase and price list names.
    pub fn api_user(
        event_type: ApiEventType,
        effective_date: DateTime<Utc>,
        plan_name: Option<&str>,
        phase_name: Option<&str>,
        price_list_name: Option<&str>,
    ) -> Self {
        Self {
            id: EventId::new(),
            requested_date: effective_date,
            effective_date,
            created_date: effective_date,
            kind: EventKind::ApiUser(ApiUserEvent {
                event_type,
                plan_name: plan_name.map(str::to_string),
                phase_name: phase_name.map(str::to_string),
                price_list_name: price_list_name.map(str::to_string),
                from_disk: true,
                user_token: None,
            }),
        }
    }

    pub fn create(at: DateTime<Utc>, plan: &str, phase: &str, price_list: &str) -> Self {
        Self::api_user(ApiEventType::Create, at, Some(plan), Some(phase), Some(price_list))
    }

    pub fn change(at: DateTime<Utc>, plan: &str, phase: &str, price_list: &str) -> Self {
        Self::api_user(ApiEventType::Change, at, Some(plan), Some(phase), Some(price_list))
    }

    pub fn cancel(at: DateTime<Utc>) -> Self {
        Self::api_user(ApiEventType::Cancel, at, None, None, None)
    }

    pub fn uncancel(at: DateTime<Utc>) -> Self {
        Self::api_user(ApiEventType::Uncancel, at, None, None, None)
    }

    pub fn phase(at: DateTime<Utc>, phase: &str) -> Self {
        Self {
            id: EventId::new(),
            requested_date: at,
            effective_date: at,
            created_date: at,
            kind: EventKind::Phase {
                phase_name: phase.to_string(),
            },
        }
    }

    /// Override the requested date (defaults to the effective date).
    pub fn with_requested_date(mut self, requested_date: DateTime<Utc>) -> Self {
        self.requested_date = requested_date;
        self
    }

    /// Override the created date (defaults to the effective date).
    pub fn with_created_date(mut self, created_date: DateTime<Utc>) -> Self {
        self.created_date = created_date;
        self
    }

    /// Attach the token of the user request that produced this event.
    pub fn with_user_token(mut self, token: Uuid) -> Self {
        if let EventKind::ApiUser(ref mut user) = self.kind {
            user.user_token = Some(token);
        }
        self
    }

    /// Mark a user event as speculative (never persisted).
    ///
    /// No effect on phase events, which are always persisted.
    pub fn speculative(mut self) -> Self {
        if let EventKind::ApiUser(ref mut user) = self.kind {
            user.from_disk = false;
        }
        self
    }

    /// Finish the event with its log position and version.
    pub fn into_event(
        self,
        subscription_id: SubscriptionId,
        total_ordering: TotalOrdering,
        active_version: u64,
    ) -> SubscriptionEvent {
        SubscriptionEvent {
            id: self.id,
            subscription_id,
            requested_date: self.requested_date,
            effective_date: self.effective_date,
            created_date: self.created_date,
            total_ordering,
            active_version,
            is_active: true,
            kind: self.kind,
        }
    }
}
