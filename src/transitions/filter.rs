//! Filtered traversal over a transition list.
//!
//! Every query on a subscription is a walk over its transitions in one
//! direction, keeping those that pass three independent predicates
//! (kind, visibility, time window).

use super::types::{Transition, TransitionType};
use chrono::{DateTime, Utc};
use std::iter::FusedIterator;
use std::slice;

/// Traversal direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Order {
    AscFromPast,
    DescFromFuture,
}

/// Which consumer the transitions are relevant to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    /// Subscription state changes (everything but billing-only migrations).
    Subscription,
    /// Billing changes (everything but entitlement-only migrations).
    Billing,
    All,
}

impl Kind {
    fn admits(self, transition_type: TransitionType) -> bool {
        match self {
            Kind::Subscription => transition_type != TransitionType::MigrateBilling,
            Kind::Billing => transition_type != TransitionType::MigrateEntitlement,
            Kind::All => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Visibility {
    /// Persisted transitions only.
    FromDiskOnly,
    All,
}

impl Visibility {
    fn admits(self, transition: &Transition) -> bool {
        match self {
            Visibility::FromDiskOnly => transition.is_from_disk,
            Visibility::All => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeLimit {
    /// Effective strictly after now.
    FutureOnly,
    /// Effective at or before now.
    PastOrPresentOnly,
    All,
}

impl TimeLimit {
    fn admits(self, effective: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        match self {
            TimeLimit::FutureOnly => effective > now,
            TimeLimit::PastOrPresentOnly => effective <= now,
            TimeLimit::All => true,
        }
    }
}

/// The four traversal axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransitionFilter {
    pub order: Order,
    pub kind: Kind,
    pub visibility: Visibility,
    pub time_limit: TimeLimit,
}

impl TransitionFilter {
    pub const fn new(order: Order, kind: Kind, visibility: Visibility, time_limit: TimeLimit) -> Self {
        Self {
            order,
            kind,
            visibility,
            time_limit,
        }
    }

    /// Everything, oldest first.
    pub const fn all() -> Self {
        Self::new(Order::AscFromPast, Kind::All, Visibility::All, TimeLimit::All)
    }

    pub fn matches(&self, transition: &Transition, now: DateTime<Utc>) -> bool {
        self.visibility.admits(transition)
            && self.time_limit.admits(transition.effective_transition_time(), now)
            && self.kind.admits(transition.transition_type())
    }
}

/// A restartable, filtered view of a transition list at a fixed "now".
#[derive(Clone, Copy, Debug)]
pub struct TransitionView<'a> {
    transitions: &'a [Transition],
    filter: TransitionFilter,
    now: DateTime<Utc>,
}

impl<'a> TransitionView<'a> {
    pub fn new(transitions: &'a [Transition], filter: TransitionFilter, now: DateTime<Utc>) -> Self {
        Self {
            transitions,
            filter,
            now,
        }
    }

    /// A fresh traversal from the start of the configured direction.
    pub fn iter(&self) -> TransitionIter<'a> {
        TransitionIter {
            inner: self.transitions.iter(),
            filter: self.filter,
            now: self.now,
        }
    }

    pub fn first(&self) -> Option<&'a Transition> {
        self.iter().next()
    }

    pub fn filter(&self) -> TransitionFilter {
        self.filter
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl<'a> IntoIterator for TransitionView<'a> {
    type Item = &'a Transition;
    type IntoIter = TransitionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a> IntoIterator for &TransitionView<'a> {
    type Item = &'a Transition;
    type IntoIter = TransitionIter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Lazy traversal produced by [`TransitionView::iter`].
#[derive(Clone, Debug)]
pub struct TransitionIter<'a> {
    inner: slice::Iter<'a, Transition>,
    filter: TransitionFilter,
    now: DateTime<Utc>,
}

impl<'a> Iterator for TransitionIter<'a> {
    type Item = &'a Transition;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let candidate = match self.filter.order {
                Order::AscFromPast => self.inner.next(),
                Order::DescFromFuture => self.inner.next_back(),
            }?;
            if self.filter.matches(candidate, self.now) {
                return Some(candidate);
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.inner.len()))
    }
}

impl FusedIterator for TransitionIter<'_> {}
