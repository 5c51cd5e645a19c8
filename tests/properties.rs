//! Property-based tests for transition replay.
//!
//! Generates random event logs (always opened by a create) and checks:
//! - Output follows the log's total ordering
//! - Exactly the replayable events produce transitions
//! - Each transition's previous side is its predecessor's next side,
//!   except where a history-restarting event empties it
//! - Rebuilding twice yields the same transitions
//! - Current state is known once any persisted transition is effective

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use std::sync::Arc;
use subscription_timeline::{
    ApiEventType, BillingPeriod, BundleId, CatalogVersion, EventInput, ManualClock, PhaseType, Plan, PlanPhase,
    Product, ProductCategory, SubscriptionBuilder, SubscriptionEvent, SubscriptionId, TotalOrdering,
    TransitionBuilder, VersionedCatalog,
};

const PLANS: [&str; 2] = ["A", "B"];

fn t(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

fn catalog() -> VersionedCatalog {
    let mut version = CatalogVersion::new(t(-365)).with_price_list("DEFAULT");
    for name in PLANS {
        let phases = [("trial", PhaseType::Trial), ("evergreen", PhaseType::Evergreen)]
            .into_iter()
            .map(|(suffix, phase_type)| PlanPhase {
                name: format!("{}-{}", name, suffix),
                plan_name: name.to_string(),
                phase_type,
                billing_period: BillingPeriod::Monthly,
            })
            .collect();
        version = version.with_plan(
            Plan {
                name: name.to_string(),
                product: Product {
                    name: name.to_lowercase(),
                    category: ProductCategory::Base,
                },
                billing_period: BillingPeriod::Monthly,
            },
            phases,
        );
    }
    VersionedCatalog::new().with_version(version)
}

// =============================================================================
// Strategies
// =============================================================================

#[derive(Clone, Debug)]
enum Step {
    Phase { plan: usize, evergreen: bool },
    Change { plan: usize },
    Cancel,
    ReCreate { plan: usize },
    Speculative { plan: usize },
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        4 => (0..PLANS.len(), any::<bool>()).prop_map(|(plan, evergreen)| Step::Phase { plan, evergreen }),
        2 => (0..PLANS.len()).prop_map(|plan| Step::Change { plan }),
        1 => Just(Step::Cancel),
        1 => (0..PLANS.len()).prop_map(|plan| Step::ReCreate { plan }),
        1 => (0..PLANS.len()).prop_map(|plan| Step::Speculative { plan }),
    ]
}

/// (step, days after the previous event, active, version)
fn arb_entry() -> impl Strategy<Value = (Step, i64, bool, u64)> {
    (arb_step(), 0i64..20, prop::bool::weighted(0.85), 0u64..3)
}

fn build_log(id: SubscriptionId, entries: &[(Step, i64, bool, u64)]) -> Vec<SubscriptionEvent> {
    let mut day = 0;
    let mut events = vec![EventInput::create(t(0), "A", "A-trial", "DEFAULT").into_event(id, TotalOrdering(1), 2)];

    for (i, (step, gap, active, version)) in entries.iter().enumerate() {
        day += gap;
        let at = t(day);
        let input = match step {
            Step::Phase { plan, evergreen } => {
                let suffix = if *evergreen { "evergreen" } else { "trial" };
                EventInput::phase(at, &format!("{}-{}", PLANS[*plan], suffix))
            }
            Step::Change { plan } => {
                let name = PLANS[*plan];
                EventInput::change(at, name, &format!("{}-evergreen", name), "DEFAULT")
            }
            Step::Cancel => EventInput::cancel(at),
            Step::ReCreate { plan } => {
                let name = PLANS[*plan];
                let phase = format!("{}-trial", name);
                EventInput::api_user(ApiEventType::ReCreate, at, Some(name), Some(&phase), Some("DEFAULT"))
            }
            Step::Speculative { plan } => {
                let name = PLANS[*plan];
                EventInput::change(at, name, &format!("{}-trial", name), "DEFAULT").speculative()
            }
        };

        let mut event = input.into_event(id, TotalOrdering(i as u64 + 2), *version);
        event.is_active = *active;
        events.push(event);
    }
    events
}

fn arb_log() -> impl Strategy<Value = (Vec<(Step, i64, bool, u64)>, u64)> {
    (prop::collection::vec(arb_entry(), 0..40), 0u64..3)
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    #[test]
    fn prop_transitions_follow_log_order((entries, active_version) in arb_log()) {
        let id = SubscriptionId::new();
        let events = build_log(id, &entries);
        let transitions = TransitionBuilder::new(id, BundleId::new(), t(0))
            .with_active_version(active_version)
            .build(&events, &catalog())
            .unwrap();

        prop_assert!(transitions
            .windows(2)
            .all(|w| w[0].total_ordering < w[1].total_ordering));
    }

    #[test]
    fn prop_one_transition_per_replayable_event((entries, active_version) in arb_log()) {
        let id = SubscriptionId::new();
        let events = build_log(id, &entries);
        let transitions = TransitionBuilder::new(id, BundleId::new(), t(0))
            .with_active_version(active_version)
            .build(&events, &catalog())
            .unwrap();

        let replayable: Vec<_> = events
            .iter()
            .filter(|e| e.is_replayable(active_version))
            .map(|e| e.id)
            .collect();
        let produced: Vec<_> = transitions.iter().map(|t| t.id).collect();
        prop_assert_eq!(produced, replayable);
    }

    #[test]
    fn prop_chain_is_continuous((entries, active_version) in arb_log()) {
        let id = SubscriptionId::new();
        let events = build_log(id, &entries);
        let transitions = TransitionBuilder::new(id, BundleId::new(), t(0))
            .with_active_version(active_version)
            .build(&events, &catalog())
            .unwrap();

        if let Some(first) = transitions.first() {
            prop_assert!(first.previous.is_empty());
        }
        for pair in transitions.windows(2) {
            let restarts = pair[1].api_event_type.map_or(false, ApiEventType::starts_history);
            if restarts {
                prop_assert!(pair[1].previous.is_empty());
            } else {
                prop_assert_eq!(&pair[1].previous, &pair[0].next);
            }
        }
    }

    #[test]
    fn prop_rebuild_is_idempotent((entries, active_version) in arb_log(), now in 0i64..400) {
        let clock = Arc::new(ManualClock::new(t(now)));
        let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0))
            .with_active_version(active_version)
            .build(clock);
        let events = build_log(sub.id(), &entries);
        let catalog = catalog();

        sub.rebuild_transitions(events.clone(), &catalog).unwrap();
        let first: Vec<_> = sub.all_transitions().into_iter().cloned().collect();
        let state = sub.state();

        sub.rebuild_transitions(events, &catalog).unwrap();
        let second: Vec<_> = sub.all_transitions().into_iter().cloned().collect();

        prop_assert_eq!(first, second);
        prop_assert_eq!(state, sub.state());
    }

    #[test]
    fn prop_state_known_once_history_started((entries, active_version) in arb_log(), now in 0i64..400) {
        let clock = Arc::new(ManualClock::new(t(now)));
        let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0))
            .with_active_version(active_version)
            .build(clock);
        let events = build_log(sub.id(), &entries);
        sub.rebuild_transitions(events, &catalog()).unwrap();

        prop_assert_eq!(sub.state().is_some(), sub.previous_transition().is_some());
        if let Some(previous) = sub.previous_transition() {
            prop_assert!(previous.is_from_disk);
            prop_assert!(previous.effective_date <= t(now));
        }
    }
}
