//! Catalog objects referenced by transitions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Base,
    AddOn,
    Standalone,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BillingPeriod {
    Monthly,
    Quarterly,
    Annual,
    NoBillingPeriod,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseType {
    Trial,
    Discount,
    Fixedterm,
    Evergreen,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub category: ProductCategory,
}

/// A billable plan of a product.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub product: Product,
    pub billing_period: BillingPeriod,
}

/// One phase of a plan (trial, evergreen, ...).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanPhase {
    pub name: String,
    pub plan_name: String,
    pub phase_type: PhaseType,
    pub billing_period: BillingPeriod,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceList {
    pub name: String,
}

/// Catalog lookup failure.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("No catalog version in effect at {0}")]
    NoVersionInEffect(DateTime<Utc>),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Phase not found: {0}")]
    PhaseNotFound(String),

    #[error("Price list not found: {0}")]
    PriceListNotFound(String),
}
