//! In-process notifications of subscription transitions.
//!
//! After a new event is appended and the subscription rebuilt, the
//! orchestration layer publishes the event's transition on a
//! [`TransitionBus`]. Listeners receive it on a bounded channel:
//! - Filtering by subscription id and transition type
//! - UNCANCEL events are published as a synthesized transition
//! - Slow listeners are dropped when their buffer fills
//!
//! # Example
//!
//! ```ignore
//! let bus = TransitionBus::new();
//! let handle = bus.subscribe(BusConfig {
//!     filter: NoticeFilter::transition_types(vec![TransitionType::Cancel]),
//!     ..Default::default()
//! });
//!
//! subscription.reload(&events, &catalog)?;
//! bus.publish(&subscription, &event, 0);
//!
//! match handle.recv() {
//!     Ok(TransitionNotice::Transition { transition }) => println!("{:?}", transition),
//!     Ok(TransitionNotice::Dropped { reason }) => println!("dropped: {:?}", reason),
//!     Err(_) => {}
//! }
//! ```

mod bus;
mod types;

pub use bus::TransitionBus;
pub use types::{BusConfig, DropReason, ListenerHandle, ListenerId, NoticeFilter, TransitionNotice};
