//! Error handling and edge case tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::Arc;
use subscription_timeline::{
    BillingActionPolicy, BillingPeriod, BundleId, CatalogError, CatalogResolution, CatalogVersion, EventInput,
    ManualClock, MemoryEventSource, Plan, Product, ProductCategory, ReplayConfig, SubscriptionBuilder,
    SubscriptionState, TimelineError, VersionedCatalog,
};

fn t(day: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::days(day)
}

/// Knows plan "A" and price list "DEFAULT" but no phases.
fn sparse_catalog() -> VersionedCatalog {
    VersionedCatalog::new().with_version(
        CatalogVersion::new(t(-365))
            .with_plan(
                Plan {
                    name: "A".to_string(),
                    product: Product {
                        name: "Alpha".to_string(),
                        category: ProductCategory::Base,
                    },
                    billing_period: BillingPeriod::Monthly,
                },
                vec![],
            )
            .with_price_list("DEFAULT"),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

// --- Replay Errors ---

#[test]
fn test_raw_uncancel_is_rejected() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let source = MemoryEventSource::new();
    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0)).build(clock);

    source.append(sub.id(), EventInput::create(t(0), "A", "A-trial", "DEFAULT"), 0);
    source.append(sub.id(), EventInput::cancel(t(2)), 0);
    let uncancel = source.append(sub.id(), EventInput::uncancel(t(3)), 0);

    let result = sub.reload(&source, &sparse_catalog());
    match result {
        Err(TimelineError::UnexpectedUserEvent { subscription, event, .. }) => {
            assert_eq!(subscription, sub.id());
            assert_eq!(event, uncancel.id);
        }
        other => panic!("Expected UnexpectedUserEvent, got {:?}", other),
    }

    // Nothing was committed
    assert!(sub.all_transitions().is_empty());
    assert!(sub.events().is_empty());
}

#[test]
fn test_inactive_uncancel_is_skipped() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let source = MemoryEventSource::new();
    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0)).build(clock);

    source.append(sub.id(), EventInput::create(t(0), "A", "A-trial", "DEFAULT"), 0);
    let uncancel = source.append(sub.id(), EventInput::uncancel(t(3)), 0);
    source.deactivate(sub.id(), uncancel.id).unwrap();

    sub.reload(&source, &sparse_catalog()).unwrap();
    assert_eq!(sub.all_transitions().len(), 1);
}

#[test]
fn test_lenient_missing_phase_keeps_transition() {
    init_tracing();
    let clock = Arc::new(ManualClock::new(t(5)));
    let source = MemoryEventSource::new();
    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0)).build(clock);

    source.append(sub.id(), EventInput::create(t(0), "A", "A-trial", "DEFAULT"), 0);
    sub.reload(&source, &sparse_catalog()).unwrap();

    assert_eq!(sub.state(), Some(SubscriptionState::Active));
    assert_eq!(sub.current_plan().unwrap().name, "A");
    assert!(sub.current_phase().is_none());
    assert_eq!(sub.current_price_list().unwrap().name, "DEFAULT");
}

#[test]
fn test_strict_missing_phase_fails() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let source = MemoryEventSource::new();
    let config = ReplayConfig::from_json(r#"{"catalog_resolution": "strict"}"#).unwrap();
    assert_eq!(config.catalog_resolution, CatalogResolution::Strict);

    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0))
        .with_config(config)
        .build(clock);
    source.append(sub.id(), EventInput::create(t(0), "A", "A-trial", "DEFAULT"), 0);

    let result = sub.reload(&source, &sparse_catalog());
    assert!(matches!(
        result,
        Err(TimelineError::Catalog(CatalogError::PhaseNotFound(_)))
    ));
}

#[test]
fn test_lookup_before_any_catalog_version() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let source = MemoryEventSource::new();
    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0))
        .with_config(ReplayConfig::strict())
        .build(clock);
    source.append(
        sub.id(),
        EventInput::create(t(0), "A", "A-trial", "DEFAULT").with_requested_date(t(-1000)),
        0,
    );

    let result = sub.reload(&source, &sparse_catalog());
    assert!(matches!(
        result,
        Err(TimelineError::Catalog(CatalogError::NoVersionInEffect(_)))
    ));
}

// --- Query Errors ---

#[test]
fn test_queries_on_empty_history() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let sub = SubscriptionBuilder::new(BundleId::new(), t(0)).build(clock);

    assert!(sub.state().is_none());
    assert!(sub.last_active_plan().is_none());
    assert!(sub.last_active_product_name().is_none());
    assert!(sub.end_date().is_none());
    assert!(sub.pending_transition().is_none());
    assert!(sub.billing_transitions().is_empty());

    let err = sub.initial_transition_for_current_plan().unwrap_err();
    assert!(err.to_string().contains(&sub.id().to_string()));
}

#[test]
fn test_query_error_names_subscription() {
    let clock = Arc::new(ManualClock::new(t(-5)));
    let source = MemoryEventSource::new();
    let mut sub = SubscriptionBuilder::new(BundleId::new(), t(0)).build(clock);
    source.append(sub.id(), EventInput::create(t(0), "A", "A-trial", "DEFAULT"), 0);
    sub.reload(&source, &sparse_catalog()).unwrap();

    let err = sub.current_phase_start().unwrap_err();
    assert!(matches!(err, TimelineError::TransitionNotFound { .. }));
    assert!(err.to_string().contains(&sub.id().to_string()));
}

#[test]
fn test_unsupported_policies() {
    let clock = Arc::new(ManualClock::new(t(5)));
    let sub = SubscriptionBuilder::new(BundleId::new(), t(0))
        .with_charged_through_date(t(30))
        .build(clock);

    for policy in [BillingActionPolicy::StartOfTerm, BillingActionPolicy::Illegal] {
        let result = sub.plan_change_effective_date(policy, t(5));
        assert!(matches!(result, Err(TimelineError::UnexpectedPolicy(p)) if p == policy));
    }

    assert_eq!(sub.plan_change_effective_date(BillingActionPolicy::EndOfTerm, t(5)).unwrap(), t(30));
    assert_eq!(sub.plan_change_effective_date(BillingActionPolicy::Immediate, t(5)).unwrap(), t(5));
}

#[test]
fn test_deactivate_unknown_event() {
    let source = MemoryEventSource::new();
    let id = subscription_timeline::SubscriptionId::new();
    let result = source.deactivate(id, subscription_timeline::EventId::new());
    assert!(matches!(result, Err(TimelineError::EventSource(_))));
}
