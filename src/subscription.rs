//! Subscription entity and its derived queries.

use crate::catalog::{BillingPeriod, Catalog, Plan, PlanPhase, PriceList, ProductCategory};
use crate::clock::Clock;
use crate::config::ReplayConfig;
use crate::error::{Result, TimelineError};
use crate::events::{ApiEventType, EventSource, SubscriptionEvent};
use crate::transitions::{
    Kind, Order, TimeLimit, Transition, TransitionBuilder, TransitionFilter, TransitionSide,
    TransitionType, TransitionView, Visibility,
};
use crate::types::{
    BillingActionPolicy, BundleId, SourceType, SubscriptionId, SubscriptionState, TotalOrdering,
};
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;

/// Latest persisted transition that already took effect.
const PREVIOUS: TransitionFilter = TransitionFilter::new(
    Order::DescFromFuture,
    Kind::Subscription,
    Visibility::FromDiskOnly,
    TimeLimit::PastOrPresentOnly,
);

/// Upcoming transitions, including speculative ones.
const PENDING: TransitionFilter = TransitionFilter::new(
    Order::AscFromPast,
    Kind::Subscription,
    Visibility::All,
    TimeLimit::FutureOnly,
);

/// Past transitions newest first, including speculative ones.
const PAST_DESC: TransitionFilter = TransitionFilter::new(
    Order::DescFromFuture,
    Kind::Subscription,
    Visibility::All,
    TimeLimit::PastOrPresentOnly,
);

const BILLING: TransitionFilter =
    TransitionFilter::new(Order::AscFromPast, Kind::Billing, Visibility::All, TimeLimit::All);

const PERSISTED_DESC: TransitionFilter = TransitionFilter::new(
    Order::DescFromFuture,
    Kind::Subscription,
    Visibility::FromDiskOnly,
    TimeLimit::All,
);

/// Identity and immutable attributes of a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionBuilder {
    pub id: SubscriptionId,
    pub bundle_id: BundleId,
    pub created_date: DateTime<Utc>,
    pub updated_date: DateTime<Utc>,
    pub align_start_date: DateTime<Utc>,
    pub bundle_start_date: DateTime<Utc>,
    pub category: ProductCategory,
    pub active_version: u64,
    pub charged_through_date: Option<DateTime<Utc>>,
    pub paid_through_date: Option<DateTime<Utc>>,
    pub config: ReplayConfig,
}

impl SubscriptionBuilder {
    /// A base subscription starting (and aligned) at `start_date`.
    pub fn new(bundle_id: BundleId, start_date: DateTime<Utc>) -> Self {
        Self {
            id: SubscriptionId::new(),
            bundle_id,
            created_date: start_date,
            updated_date: start_date,
            align_start_date: start_date,
            bundle_start_date: start_date,
            category: ProductCategory::Base,
            active_version: 0,
            charged_through_date: None,
            paid_through_date: None,
            config: ReplayConfig::default(),
        }
    }

    pub fn with_id(mut self, id: SubscriptionId) -> Self {
        self.id = id;
        self
    }

    pub fn with_align_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.align_start_date = date;
        self
    }

    pub fn with_bundle_start_date(mut self, date: DateTime<Utc>) -> Self {
        self.bundle_start_date = date;
        self
    }

    pub fn with_category(mut self, category: ProductCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_active_version(mut self, active_version: u64) -> Self {
        self.active_version = active_version;
        self
    }

    pub fn with_charged_through_date(mut self, date: DateTime<Utc>) -> Self {
        self.charged_through_date = Some(date);
        self
    }

    pub fn with_paid_through_date(mut self, date: DateTime<Utc>) -> Self {
        self.paid_through_date = Some(date);
        self
    }

    pub fn with_config(mut self, config: ReplayConfig) -> Self {
        self.config = config;
        self
    }

    /// Create the entity with an empty history.
    pub fn build(self, clock: Arc<dyn Clock>) -> Subscription {
        Subscription {
            id: self.id,
            bundle_id: self.bundle_id,
            created_date: self.created_date,
            updated_date: self.updated_date,
            align_start_date: self.align_start_date,
            bundle_start_date: self.bundle_start_date,
            category: self.category,
            active_version: self.active_version,
            charged_through_date: self.charged_through_date,
            paid_through_date: self.paid_through_date,
            config: self.config,
            clock,
            transitions: Vec::new(),
            events: Vec::new(),
        }
    }
}

/// A subscription and the transitions rebuilt from its event log.
///
/// All queries read the transition list through a [`TransitionView`]; only
/// [`Subscription::rebuild_transitions`] looks at raw events. The entity
/// does no locking: callers serialize rebuilds against readers.
#[derive(Clone)]
pub struct Subscription {
    id: SubscriptionId,
    bundle_id: BundleId,
    created_date: DateTime<Utc>,
    updated_date: DateTime<Utc>,
    align_start_date: DateTime<Utc>,
    bundle_start_date: DateTime<Utc>,
    category: ProductCategory,
    active_version: u64,
    charged_through_date: Option<DateTime<Utc>>,
    paid_through_date: Option<DateTime<Utc>>,
    config: ReplayConfig,
    clock: Arc<dyn Clock>,
    transitions: Vec<Transition>,
    events: Vec<SubscriptionEvent>,
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("bundle_id", &self.bundle_id)
            .field("category", &self.category)
            .field("active_version", &self.active_version)
            .field("transitions", &self.transitions.len())
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl Subscription {
    // --- Identity ---

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn bundle_id(&self) -> BundleId {
        self.bundle_id
    }

    pub fn created_date(&self) -> DateTime<Utc> {
        self.created_date
    }

    pub fn updated_date(&self) -> DateTime<Utc> {
        self.updated_date
    }

    pub fn align_start_date(&self) -> DateTime<Utc> {
        self.align_start_date
    }

    pub fn bundle_start_date(&self) -> DateTime<Utc> {
        self.bundle_start_date
    }

    pub fn category(&self) -> ProductCategory {
        self.category
    }

    pub fn active_version(&self) -> u64 {
        self.active_version
    }

    pub fn charged_through_date(&self) -> Option<DateTime<Utc>> {
        self.charged_through_date
    }

    pub fn paid_through_date(&self) -> Option<DateTime<Utc>> {
        self.paid_through_date
    }

    /// Raw events from the last successful rebuild.
    pub fn events(&self) -> &[SubscriptionEvent] {
        &self.events
    }

    // --- Rebuild ---

    /// Replace the transition list with a replay of `events`.
    ///
    /// On error the previous transitions and events are kept.
    pub fn rebuild_transitions<C: Catalog + ?Sized>(
        &mut self,
        events: Vec<SubscriptionEvent>,
        catalog: &C,
    ) -> Result<()> {
        let transitions = TransitionBuilder::new(self.id, self.bundle_id, self.align_start_date)
            .with_active_version(self.active_version)
            .with_config(&self.config)
            .build(&events, catalog)?;

        self.transitions = transitions;
        self.events = events;
        Ok(())
    }

    /// Fetch the event log from `source` and rebuild.
    pub fn reload<S, C>(&mut self, source: &S, catalog: &C) -> Result<()>
    where
        S: EventSource + ?Sized,
        C: Catalog + ?Sized,
    {
        let events = source.fetch_events(self.id)?;
        self.rebuild_transitions(events, catalog)
    }

    // --- Traversal ---

    /// Filtered view evaluated at the clock's current time.
    pub fn transitions(&self, filter: TransitionFilter) -> TransitionView<'_> {
        self.transitions_at(filter, self.clock.now())
    }

    /// Filtered view evaluated as if now were `at`.
    pub fn transitions_at(&self, filter: TransitionFilter, at: DateTime<Utc>) -> TransitionView<'_> {
        TransitionView::new(&self.transitions, filter, at)
    }

    // --- Current state ---

    /// Latest persisted transition that is already effective.
    pub fn previous_transition(&self) -> Option<&Transition> {
        self.transitions(PREVIOUS).first()
    }

    pub fn state(&self) -> Option<SubscriptionState> {
        self.previous_transition().and_then(Transition::next_state)
    }

    pub fn current_plan(&self) -> Option<&Arc<Plan>> {
        self.previous_transition().and_then(Transition::next_plan)
    }

    pub fn current_phase(&self) -> Option<&Arc<PlanPhase>> {
        self.previous_transition().and_then(Transition::next_phase)
    }

    pub fn current_price_list(&self) -> Option<&Arc<PriceList>> {
        self.previous_transition().and_then(Transition::next_price_list)
    }

    pub fn start_date(&self) -> Option<DateTime<Utc>> {
        self.transitions.first().map(Transition::effective_transition_time)
    }

    pub fn source_type(&self) -> Option<SourceType> {
        let initial = self.transitions.first()?;
        Some(match initial.api_event_type {
            Some(ApiEventType::MigrateBilling) | Some(ApiEventType::MigrateEntitlement) => SourceType::Migrated,
            Some(ApiEventType::Transfer) => SourceType::Transferred,
            _ => SourceType::Native,
        })
    }

    // --- Retroactive state ---

    fn previous_transition_at(&self, at: DateTime<Utc>) -> Option<&Transition> {
        self.transitions_at(PREVIOUS, at).first()
    }

    /// State as it was at `at`.
    pub fn state_as_of(&self, at: DateTime<Utc>) -> Option<SubscriptionState> {
        self.previous_transition_at(at).and_then(Transition::next_state)
    }

    pub fn plan_as_of(&self, at: DateTime<Utc>) -> Option<&Arc<Plan>> {
        self.previous_transition_at(at).and_then(Transition::next_plan)
    }

    pub fn phase_as_of(&self, at: DateTime<Utc>) -> Option<&Arc<PlanPhase>> {
        self.previous_transition_at(at).and_then(Transition::next_phase)
    }

    pub fn price_list_as_of(&self, at: DateTime<Utc>) -> Option<&Arc<PriceList>> {
        self.previous_transition_at(at).and_then(Transition::next_price_list)
    }

    // --- Cancellation ---

    /// When the subscription was cancelled, if it currently is.
    pub fn end_date(&self) -> Option<DateTime<Utc>> {
        self.previous_transition()
            .filter(|t| t.next_state() == Some(SubscriptionState::Cancelled))
            .map(Transition::effective_transition_time)
    }

    /// Effective date of a scheduled cancellation.
    pub fn future_end_date(&self) -> Option<DateTime<Utc>> {
        self.transitions(PENDING)
            .iter()
            .find(|t| t.transition_type() == TransitionType::Cancel)
            .map(Transition::effective_transition_time)
    }

    pub fn is_future_cancelled(&self) -> bool {
        self.future_end_date().is_some()
    }

    pub fn pending_transition(&self) -> Option<&Transition> {
        self.transitions(PENDING).first()
    }

    // --- Last active ---

    /// The side describing the last active plan: the previous side once
    /// cancelled, the current side otherwise.
    fn last_active_side(&self) -> Option<&TransitionSide> {
        let latest = self.previous_transition()?;
        if latest.next_state() == Some(SubscriptionState::Cancelled) {
            Some(&latest.previous)
        } else {
            Some(&latest.next)
        }
    }

    pub fn last_active_plan(&self) -> Option<&Arc<Plan>> {
        self.last_active_side()?.plan.as_ref()
    }

    pub fn last_active_phase(&self) -> Option<&Arc<PlanPhase>> {
        self.last_active_side()?.phase.as_ref()
    }

    pub fn last_active_product_name(&self) -> Option<&str> {
        self.last_active_plan().map(|p| p.product.name.as_str())
    }

    pub fn last_active_price_list_name(&self) -> Option<&str> {
        self.last_active_side()?
            .price_list
            .as_ref()
            .map(|p| p.name.as_str())
    }

    pub fn last_active_category(&self) -> Option<ProductCategory> {
        self.last_active_plan().map(|p| p.product.category)
    }

    pub fn last_active_billing_period(&self) -> Option<BillingPeriod> {
        self.last_active_plan().map(|p| p.billing_period)
    }

    // --- History ---

    pub fn all_transitions(&self) -> Vec<&Transition> {
        self.transitions(TransitionFilter::all()).iter().collect()
    }

    /// Billing history, starting at the first create, billing migration or
    /// transfer.
    pub fn billing_transitions(&self) -> Vec<&Transition> {
        self.transitions(BILLING)
            .iter()
            .skip_while(|t| {
                !matches!(
                    t.api_event_type,
                    Some(ApiEventType::Create) | Some(ApiEventType::MigrateBilling) | Some(ApiEventType::Transfer)
                )
            })
            .collect()
    }

    /// The effective transition that put the current plan in place.
    pub fn initial_transition_for_current_plan(&self) -> Result<&Transition> {
        self.latest_past_of(
            &[
                TransitionType::Create,
                TransitionType::ReCreate,
                TransitionType::Transfer,
                TransitionType::Change,
                TransitionType::MigrateEntitlement,
            ],
            "initial transition for current plan",
        )
    }

    /// Effective date of the current phase.
    pub fn current_phase_start(&self) -> Result<DateTime<Utc>> {
        self.latest_past_of(
            &[
                TransitionType::Phase,
                TransitionType::Transfer,
                TransitionType::Create,
                TransitionType::ReCreate,
                TransitionType::Change,
                TransitionType::MigrateEntitlement,
            ],
            "current phase start",
        )
        .map(Transition::effective_transition_time)
    }

    fn latest_past_of(&self, types: &[TransitionType], what: &'static str) -> Result<&Transition> {
        if self.transitions.is_empty() {
            return Err(TimelineError::NoTransitions(self.id));
        }
        self.transitions(PAST_DESC)
            .iter()
            .find(|t| types.contains(&t.transition_type()))
            .ok_or(TimelineError::TransitionNotFound {
                subscription: self.id,
                what,
            })
    }

    /// When a plan change requested at `requested_date` takes effect.
    pub fn plan_change_effective_date(
        &self,
        policy: BillingActionPolicy,
        requested_date: DateTime<Utc>,
    ) -> Result<DateTime<Utc>> {
        match policy {
            BillingActionPolicy::Immediate => Ok(requested_date),
            BillingActionPolicy::EndOfTerm => Ok(match self.charged_through_date {
                Some(ctd) if ctd > requested_date => ctd,
                _ => requested_date,
            }),
            other => Err(TimelineError::UnexpectedPolicy(other)),
        }
    }

    /// The transition produced by `event`, stamped with `sequence_id`.
    ///
    /// UNCANCEL events never produce a stored transition; for them a copy of
    /// the last transition ordered before the event is returned, retagged as
    /// UNCANCEL.
    pub fn transition_from_event(&self, event: &SubscriptionEvent, sequence_id: u32) -> Option<Transition> {
        let mut preceding = None;
        for transition in &self.transitions {
            if transition.id == event.id {
                return Some(transition.with_sequence_id(sequence_id));
            }
            if transition.total_ordering < event.total_ordering {
                preceding = Some(transition);
            }
        }

        match event.api_event_type() {
            Some(ApiEventType::Uncancel) => preceding.map(|t| t.retagged(ApiEventType::Uncancel, sequence_id)),
            _ => None,
        }
    }

    /// Ordering of the latest persisted transition.
    pub fn last_event_ordering(&self) -> Option<TotalOrdering> {
        self.transitions(PERSISTED_DESC).first().map(|t| t.total_ordering)
    }
}
