//! In-memory catalog made of dated versions.

use super::types::{CatalogError, Plan, PlanPhase, PriceList};
use super::Catalog;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// One dated revision of the catalog.
#[derive(Clone, Debug)]
pub struct CatalogVersion {
    /// When this version starts applying.
    pub effective_date: DateTime<Utc>,

    /// Subscriptions aligned before `effective_date` keep resolving against
    /// older versions until this date. `None` applies the version to them
    /// immediately.
    pub existing_subscriptions_from: Option<DateTime<Utc>>,

    plans: HashMap<String, Arc<Plan>>,
    phases: HashMap<String, Arc<PlanPhase>>,
    price_lists: HashMap<String, Arc<PriceList>>,
}

impl CatalogVersion {
    pub fn new(effective_date: DateTime<Utc>) -> Self {
        Self {
            effective_date,
            existing_subscriptions_from: None,
            plans: HashMap::new(),
            phases: HashMap::new(),
            price_lists: HashMap::new(),
        }
    }

    /// Delay this version for already-aligned subscriptions.
    pub fn with_existing_subscriptions_from(mut self, date: DateTime<Utc>) -> Self {
        self.existing_subscriptions_from = Some(date);
        self
    }

    /// Add a plan together with its phases.
    pub fn with_plan(mut self, plan: Plan, phases: Vec<PlanPhase>) -> Self {
        for phase in phases {
            self.phases.insert(phase.name.clone(), Arc::new(phase));
        }
        self.plans.insert(plan.name.clone(), Arc::new(plan));
        self
    }

    pub fn with_price_list(mut self, name: &str) -> Self {
        self.price_lists.insert(
            name.to_string(),
            Arc::new(PriceList {
                name: name.to_string(),
            }),
        );
        self
    }

    /// Whether a subscription aligned at `align_start` sees this version at `as_of`.
    fn applies_to(&self, as_of: DateTime<Utc>, align_start: DateTime<Utc>) -> bool {
        match self.existing_subscriptions_from {
            Some(from) if align_start < self.effective_date => as_of >= from,
            _ => true,
        }
    }
}

/// Catalog resolving names against the version in effect at a date.
#[derive(Clone, Debug, Default)]
pub struct VersionedCatalog {
    /// Sorted by effective date, oldest first.
    versions: Vec<CatalogVersion>,
}

impl VersionedCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_version(mut self, version: CatalogVersion) -> Self {
        self.add_version(version);
        self
    }

    pub fn add_version(&mut self, version: CatalogVersion) {
        let pos = self
            .versions
            .partition_point(|v| v.effective_date <= version.effective_date);
        self.versions.insert(pos, version);
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    /// Pick the newest version visible to a subscription at `as_of`.
    fn version_at(
        &self,
        as_of: DateTime<Utc>,
        align_start: Option<DateTime<Utc>>,
    ) -> Result<&CatalogVersion, CatalogError> {
        self.versions
            .iter()
            .rev()
            .filter(|v| v.effective_date <= as_of)
            .find(|v| align_start.map_or(true, |align| v.applies_to(as_of, align)))
            .ok_or(CatalogError::NoVersionInEffect(as_of))
    }
}

impl Catalog for VersionedCatalog {
    fn find_plan(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<Plan>, CatalogError> {
        self.version_at(as_of, Some(align_start))?
            .plans
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::PlanNotFound(name.to_string()))
    }

    fn find_phase(
        &self,
        name: &str,
        as_of: DateTime<Utc>,
        align_start: DateTime<Utc>,
    ) -> Result<Arc<PlanPhase>, CatalogError> {
        self.version_at(as_of, Some(align_start))?
            .phases
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::PhaseNotFound(name.to_string()))
    }

    fn find_price_list(&self, name: &str, as_of: DateTime<Utc>) -> Result<Arc<PriceList>, CatalogError> {
        self.version_at(as_of, None)?
            .price_lists
            .get(name)
            .cloned()
            .ok_or_else(|| CatalogError::PriceListNotFound(name.to_string()))
    }
}
