//! Transition records produced by replay.

use crate::catalog::{Plan, PlanPhase, PriceList};
use crate::events::{ApiEventType, EventType};
use crate::types::{BundleId, EventId, SubscriptionId, SubscriptionState, TotalOrdering};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Kind of state change a transition records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransitionType {
    MigrateEntitlement,
    MigrateBilling,
    Transfer,
    Create,
    ReCreate,
    Change,
    Cancel,
    Uncancel,
    Phase,
}

impl From<ApiEventType> for TransitionType {
    fn from(api: ApiEventType) -> Self {
        match api {
            ApiEventType::MigrateEntitlement => TransitionType::MigrateEntitlement,
            ApiEventType::MigrateBilling => TransitionType::MigrateBilling,
            ApiEventType::Transfer => TransitionType::Transfer,
            ApiEventType::Create => TransitionType::Create,
            ApiEventType::ReCreate => TransitionType::ReCreate,
            ApiEventType::Change => TransitionType::Change,
            ApiEventType::Cancel => TransitionType::Cancel,
            ApiEventType::Uncancel => TransitionType::Uncancel,
        }
    }
}

/// One side (before or after) of a transition.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TransitionSide {
    pub event_id: Option<EventId>,
    pub created_date: Option<DateTime<Utc>>,
    pub state: Option<SubscriptionState>,
    pub plan: Option<Arc<Plan>>,
    pub phase: Option<Arc<PlanPhase>>,
    pub price_list: Option<Arc<PriceList>>,
}

impl TransitionSide {
    /// True for the previous side of a transition that starts a history.
    pub fn is_empty(&self) -> bool {
        self.event_id.is_none()
            && self.created_date.is_none()
            && self.state.is_none()
            && self.plan.is_none()
            && self.phase.is_none()
            && self.price_list.is_none()
    }
}

/// A before/after record of one replayed event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    /// Id of the event this transition was projected from.
    pub id: EventId,
    pub subscription_id: SubscriptionId,
    pub bundle_id: BundleId,
    pub event_type: EventType,
    pub api_event_type: Option<ApiEventType>,
    pub requested_date: DateTime<Utc>,
    pub effective_date: DateTime<Utc>,
    pub previous: TransitionSide,
    pub next: TransitionSide,
    pub total_ordering: TotalOrdering,
    pub user_token: Option<Uuid>,
    pub is_from_disk: bool,
    /// Position within a batch of notifications, stamped on copies.
    pub sequence_id: Option<u32>,
}

impl Transition {
    /// Phase transitions carry no api type; user transitions always do.
    pub fn transition_type(&self) -> TransitionType {
        self.api_event_type
            .map(TransitionType::from)
            .unwrap_or(TransitionType::Phase)
    }

    pub fn effective_transition_time(&self) -> DateTime<Utc> {
        self.effective_date
    }

    pub fn next_state(&self) -> Option<SubscriptionState> {
        self.next.state
    }

    pub fn next_plan(&self) -> Option<&Arc<Plan>> {
        self.next.plan.as_ref()
    }

    pub fn next_phase(&self) -> Option<&Arc<PlanPhase>> {
        self.next.phase.as_ref()
    }

    pub fn next_price_list(&self) -> Option<&Arc<PriceList>> {
        self.next.price_list.as_ref()
    }

    pub fn previous_state(&self) -> Option<SubscriptionState> {
        self.previous.state
    }

    pub fn previous_plan(&self) -> Option<&Arc<Plan>> {
        self.previous.plan.as_ref()
    }

    pub fn previous_phase(&self) -> Option<&Arc<PlanPhase>> {
        self.previous.phase.as_ref()
    }

    pub fn previous_price_list(&self) -> Option<&Arc<PriceList>> {
        self.previous.price_list.as_ref()
    }

    /// Copy of this transition stamped with a sequence id.
    pub fn with_sequence_id(&self, sequence_id: u32) -> Self {
        Self {
            sequence_id: Some(sequence_id),
            ..self.clone()
        }
    }

    /// Copy of this transition retagged as another user action.
    pub fn retagged(&self, api_event_type: ApiEventType, sequence_id: u32) -> Self {
        Self {
            event_type: EventType::ApiUser,
            api_event_type: Some(api_event_type),
            sequence_id: Some(sequence_id),
            ..self.clone()
        }
    }
}
