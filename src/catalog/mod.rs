//! Catalog lookup contract.
//!
//! The transition builder only needs to turn plan, phase and price list
//! names into catalog objects as of a date. This module defines that
//! contract plus two implementations:
//! - [`VersionedCatalog`]: in-memory dated catalog versions
//! - [`CachedCatalog`]: LRU memoization over any catalog

mod cache;
mod types;
mod versioned;

pub use cache::{CachedCatalog, CatalogCacheConfig};
pub use types::{
    BillingPeriod, CatalogError, PhaseType, Plan, PlanPhase, PriceList, Product, ProductCategory,
};
pub use versioned::{CatalogVersion, VersionedCatalog};

use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Resolves catalog names as of a date.
///
/// Lookups are expected to be synchronous and idempotent.
pub trait Catalog {
    /// Find a plan as of `as_of` for a subscription aligned at `align_start`.
    fn find_plan(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<Plan>, CatalogError>;

    /// Find a plan phase as of `as_of` for a subscription aligned at `align_start`.
    fn find_phase(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<PlanPhase>, CatalogError>;

    fn find_price_list(&self, name: &str, as_of: DateTime<Utc>) -> Result<Arc<PriceList>, CatalogError>;
}

impl<C: Catalog + ?Sized> Catalog for Arc<C> {
    fn find_plan(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<Plan>, CatalogError> {
        (**self).find_plan(name, as_of, align_start)
    }

    fn find_phase(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<PlanPhase>, CatalogError> {
        (**self).find_phase(name, as_of, align_start)
    }

    fn find_price_list(&self, name: &str, as_of: DateTime<Utc>) -> Result<Arc<PriceList>, CatalogError> {
        (**self).find_price_list(name, as_of)
    }
}
