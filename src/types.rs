//! Core identity and state types shared across the crate.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        SubscriptionId(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of the bundle a subscription belongs to.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BundleId(pub Uuid);

impl BundleId {
    pub fn new() -> Self {
        BundleId(Uuid::new_v4())
    }
}

impl Default for BundleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BundleId({})", self.0)
    }
}

impl fmt::Display for BundleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a persisted event. A transition carries the id of the
/// event it was projected from.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(pub Uuid);

impl EventId {
    pub fn new() -> Self {
        EventId(Uuid::new_v4())
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EventId({})", self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Position of an event in the subscription's log.
///
/// This is the only authoritative ordering key; requested and effective
/// dates are descriptive.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
pub struct TotalOrdering(pub u64);

impl fmt::Debug for TotalOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Ord({})", self.0)
    }
}

impl fmt::Display for TotalOrdering {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TotalOrdering {
    pub fn next(self) -> Self {
        TotalOrdering(self.0 + 1)
    }
}

/// Lifecycle state of a subscription. "Not yet started" is modelled as the
/// absence of a state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionState {
    Active,
    Cancelled,
}

/// Where the subscription's history originates.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SourceType {
    Native,
    Migrated,
    Transferred,
}

/// When a plan change or cancellation takes effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingActionPolicy {
    StartOfTerm,
    EndOfTerm,
    Immediate,
    Illegal,
}

impl fmt::Display for BillingActionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BillingActionPolicy::StartOfTerm => "START_OF_TERM",
            BillingActionPolicy::EndOfTerm => "END_OF_TERM",
            BillingActionPolicy::Immediate => "IMMEDIATE",
            BillingActionPolicy::Illegal => "ILLEGAL",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_ordering_next() {
        let ord = TotalOrdering(41);
        assert_eq!(ord.next(), TotalOrdering(42));
        assert!(TotalOrdering(1) < TotalOrdering(2));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(SubscriptionId::new(), SubscriptionId::new());
        assert_ne!(EventId::new(), EventId::new());
    }

    #[test]
    fn test_state_serializes_uppercase() {
        let json = serde_json::to_string(&SubscriptionState::Cancelled).unwrap();
        assert_eq!(json, "\"CANCELLED\"");
        let policy: BillingActionPolicy = serde_json::from_str("\"END_OF_TERM\"").unwrap();
        assert_eq!(policy, BillingActionPolicy::EndOfTerm);
    }
}
