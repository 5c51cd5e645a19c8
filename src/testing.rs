//! Shared fixtures for unit tests.

use crate::catalog::{
    BillingPeriod, CatalogVersion, PhaseType, Plan, PlanPhase, Product, ProductCategory, VersionedCatalog,
};
use crate::events::{EventInput, SubscriptionEvent};
use crate::types::{EventId, SubscriptionId, TotalOrdering};
use chrono::{DateTime, TimeZone, Utc};

pub fn date(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
}

fn plan_with_phases(product: &str, plan: &str, period: BillingPeriod) -> (Plan, Vec<PlanPhase>) {
    let phase = |suffix: &str, phase_type| PlanPhase {
        name: format!("{}-{}", plan, suffix),
        plan_name: plan.to_string(),
        phase_type,
        billing_period: period,
    };

    (
        Plan {
            name: plan.to_string(),
            product: Product {
                name: product.to_string(),
                category: ProductCategory::Base,
            },
            billing_period: period,
        },
        vec![phase("trial", PhaseType::Trial), phase("evergreen", PhaseType::Evergreen)],
    )
}

/// Gold and silver monthly plans with trial/evergreen phases, one price list.
pub fn gold_catalog() -> VersionedCatalog {
    let (gold, gold_phases) = plan_with_phases("Gold", "gold-monthly", BillingPeriod::Monthly);
    let (silver, silver_phases) = plan_with_phases("Silver", "silver-monthly", BillingPeriod::Monthly);

    VersionedCatalog::new().with_version(
        CatalogVersion::new(date(2000, 1, 1))
            .with_plan(gold, gold_phases)
            .with_plan(silver, silver_phases)
            .with_price_list("DEFAULT"),
    )
}

/// A hand-built, ordered event log for one subscription.
pub struct EventLog {
    pub subscription_id: SubscriptionId,
    pub events: Vec<SubscriptionEvent>,
    next_ordering: TotalOrdering,
}

impl EventLog {
    pub fn new() -> Self {
        Self {
            subscription_id: SubscriptionId::new(),
            events: Vec::new(),
            next_ordering: TotalOrdering(1),
        }
    }

    pub fn push(&mut self, input: EventInput) -> EventId {
        self.push_versioned(input, 0)
    }

    pub fn push_versioned(&mut self, input: EventInput, active_version: u64) -> EventId {
        let event = input.into_event(self.subscription_id, self.next_ordering, active_version);
        self.next_ordering = self.next_ordering.next();
        let id = event.id;
        self.events.push(event);
        id
    }

    pub fn deactivate(&mut self, id: EventId) {
        if let Some(event) = self.events.iter_mut().find(|e| e.id == id) {
            event.is_active = false;
        }
    }
}
