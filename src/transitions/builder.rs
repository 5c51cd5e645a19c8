//! Replays an event log into transitions.

use super::types::{Transition, TransitionSide};
use crate::catalog::{Catalog, CatalogError};
use crate::config::{CatalogResolution, ReplayConfig};
use crate::error::{Result, TimelineError};
use crate::events::{ApiEventType, EventKind, SubscriptionEvent};
use crate::types::{BundleId, SubscriptionId, SubscriptionState};
use chrono::{DateTime, Utc};
use tracing::{debug, error, trace};

/// Names carried forward from one event to the next.
#[derive(Default)]
struct PendingNames<'e> {
    plan: Option<&'e str>,
    phase: Option<&'e str>,
    price_list: Option<&'e str>,
}

/// Builds the transition list of one subscription.
#[derive(Clone, Debug)]
pub struct TransitionBuilder {
    subscription_id: SubscriptionId,
    bundle_id: BundleId,
    align_start_date: DateTime<Utc>,
    active_version: u64,
    resolution: CatalogResolution,
}

impl TransitionBuilder {
    pub fn new(subscription_id: SubscriptionId, bundle_id: BundleId, align_start_date: DateTime<Utc>) -> Self {
        Self {
            subscription_id,
            bundle_id,
            align_start_date,
            active_version: 0,
            resolution: CatalogResolution::default(),
        }
    }

    /// Skip events whose version is below `active_version`.
    pub fn with_active_version(mut self, active_version: u64) -> Self {
        self.active_version = active_version;
        self
    }

    pub fn with_config(mut self, config: &ReplayConfig) -> Self {
        self.resolution = config.catalog_resolution;
        self
    }

    /// Replay `events` (sorted by total ordering) into transitions.
    ///
    /// Inactive and superseded events are skipped. A raw UNCANCEL event
    /// fails the whole replay; nothing partial is returned.
    pub fn build<C: Catalog + ?Sized>(
        &self,
        events: &[SubscriptionEvent],
        catalog: &C,
    ) -> Result<Vec<Transition>> {
        let mut transitions = Vec::with_capacity(events.len());
        let mut skipped = 0usize;

        let mut previous = TransitionSide::default();
        let mut state: Option<SubscriptionState> = None;
        let mut names = PendingNames::default();

        for event in events {
            if !event.is_replayable(self.active_version) {
                trace!(
                    subscription = %self.subscription_id,
                    event = %event.id,
                    version = event.active_version,
                    active = event.is_active,
                    "Skipping event"
                );
                skipped += 1;
                continue;
            }

            match &event.kind {
                EventKind::Phase { phase_name } => {
                    names.phase = Some(phase_name.as_str());
                }
                EventKind::ApiUser(user) => match user.event_type {
                    ApiEventType::Create
                    | ApiEventType::ReCreate
                    | ApiEventType::Transfer
                    | ApiEventType::MigrateBilling
                    | ApiEventType::MigrateEntitlement => {
                        previous = TransitionSide::default();
                        state = Some(SubscriptionState::Active);
                        names = PendingNames {
                            plan: user.plan_name.as_deref(),
                            phase: user.phase_name.as_deref(),
                            price_list: user.price_list_name.as_deref(),
                        };
                    }
                    ApiEventType::Change => {
                        names = PendingNames {
                            plan: user.plan_name.as_deref(),
                            phase: user.phase_name.as_deref(),
                            price_list: user.price_list_name.as_deref(),
                        };
                    }
                    ApiEventType::Cancel => {
                        state = Some(SubscriptionState::Cancelled);
                        names.plan = None;
                        names.phase = None;
                    }
                    ApiEventType::Uncancel => {
                        return Err(TimelineError::UnexpectedUserEvent {
                            subscription: self.subscription_id,
                            event: event.id,
                            event_type: user.event_type,
                        });
                    }
                },
            }

            let as_of = event.requested_date;
            let next = TransitionSide {
                event_id: Some(event.id),
                created_date: Some(event.created_date),
                state,
                plan: self.resolve(event, names.plan, |name| {
                    catalog.find_plan(name, as_of, self.align_start_date)
                })?,
                phase: self.resolve(event, names.phase, |name| {
                    catalog.find_phase(name, as_of, self.align_start_date)
                })?,
                price_list: self.resolve(event, names.price_list, |name| {
                    catalog.find_price_list(name, as_of)
                })?,
            };

            let user_token = match &event.kind {
                EventKind::ApiUser(user) => user.user_token,
                EventKind::Phase { .. } => None,
            };

            transitions.push(Transition {
                id: event.id,
                subscription_id: self.subscription_id,
                bundle_id: self.bundle_id,
                event_type: event.event_type(),
                api_event_type: event.api_event_type(),
                requested_date: event.requested_date,
                effective_date: event.effective_date,
                previous: std::mem::take(&mut previous),
                next: next.clone(),
                total_ordering: event.total_ordering,
                user_token,
                is_from_disk: event.is_from_disk(),
                sequence_id: None,
            });

            previous = next;
        }

        debug!(
            subscription = %self.subscription_id,
            events = events.len(),
            transitions = transitions.len(),
            skipped,
            "Rebuilt transitions"
        );

        Ok(transitions)
    }

    /// Resolve one catalog name, honoring the configured failure mode.
    fn resolve<T>(
        &self,
        event: &SubscriptionEvent,
        name: Option<&str>,
        lookup: impl FnOnce(&str) -> std::result::Result<T, CatalogError>,
    ) -> Result<Option<T>> {
        let Some(name) = name else {
            return Ok(None);
        };

        match lookup(name) {
            Ok(value) => Ok(Some(value)),
            Err(e) => match self.resolution {
                CatalogResolution::Strict => Err(e.into()),
                CatalogResolution::Lenient => {
                    error!(
                        subscription = %self.subscription_id,
                        event = %event.id,
                        name,
                        error = %e,
                        "Failed to build transition"
                    );
                    Ok(None)
                }
            },
        }
    }
}
