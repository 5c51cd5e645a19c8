//! # Subscription Timeline
//!
//! Rebuilds the lifecycle history of a billing subscription from its
//! ordered, versioned event log and answers questions about it.
//!
//! ## Core Concepts
//!
//! - **Events**: Persisted user actions and phase changes, ordered by total ordering
//! - **Transitions**: One before/after record per replayed event
//! - **Views**: Filtered traversals (direction, kind, visibility, time window)
//! - **Subscription**: Identity plus transitions, with derived queries
//!
//! ## Example
//!
//! ```ignore
//! use subscription_timeline::{EventInput, MemoryEventSource, SubscriptionBuilder, SystemClock};
//!
//! let source = MemoryEventSource::new();
//! let mut subscription = SubscriptionBuilder::new(bundle_id, start).build(Arc::new(SystemClock));
//!
//! source.append(subscription.id(), EventInput::create(start, "gold-monthly", "gold-monthly-trial", "DEFAULT"), 0);
//! source.append(subscription.id(), EventInput::cancel(end), 0);
//!
//! subscription.reload(&source, &catalog)?;
//! assert_eq!(subscription.future_end_date(), Some(end));
//! ```

pub mod catalog;
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod notifications;
pub mod subscription;
pub mod transitions;
pub mod types;

#[cfg(test)]
mod testing;

// Re-exports
pub use catalog::{
    BillingPeriod, CachedCatalog, Catalog, CatalogCacheConfig, CatalogError, CatalogVersion, PhaseType, Plan,
    PlanPhase, PriceList, Product, ProductCategory, VersionedCatalog,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{CatalogResolution, ReplayConfig};
pub use error::{Result, TimelineError};
pub use events::{
    ApiEventType, ApiUserEvent, EventInput, EventKind, EventSource, EventType, MemoryEventSource,
    SubscriptionEvent,
};
pub use notifications::{
    BusConfig, DropReason, ListenerHandle, ListenerId, NoticeFilter, TransitionBus, TransitionNotice,
};
pub use subscription::{Subscription, SubscriptionBuilder};
pub use transitions::{
    Kind, Order, TimeLimit, Transition, TransitionBuilder, TransitionFilter, TransitionIter, TransitionSide,
    TransitionType, TransitionView, Visibility,
};
pub use types::*;
