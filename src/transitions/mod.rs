//! Transition replay and traversal.
//!
//! [`TransitionBuilder`] turns an ordered event log into an ordered list of
//! [`Transition`]s, one per replayed event. Each transition records the
//! subscription's state, plan, phase and price list before and after its
//! event; consecutive transitions chain (the previous side of one equals the
//! next side of the one before it) except where a history restarts.
//!
//! [`TransitionView`] is the only way the list is read: a direction plus
//! kind, visibility and time predicates evaluated against a fixed "now".

mod builder;
mod filter;
mod types;

pub use builder::TransitionBuilder;
pub use filter::{Kind, Order, TimeLimit, TransitionFilter, TransitionIter, TransitionView, Visibility};
pub use types::{Transition, TransitionSide, TransitionType};
