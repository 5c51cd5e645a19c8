//! Persisted subscription events and the source that supplies them.
//!
//! Events come in two categories: user actions (`API_USER`) and scheduled
//! phase changes (`PHASE`). Each event carries a total ordering, an active
//! version, and an active flag; replay consumes them in ordering order.

mod source;
mod types;

pub use source::{EventSource, MemoryEventSource};
pub use types::{ApiEventType, ApiUserEvent, EventInput, EventKind, EventType, SubscriptionEvent};
