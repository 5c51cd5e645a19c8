//! Replay configuration.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// How catalog lookup failures are handled during replay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogResolution {
    /// Log the failure and leave the affected field absent.
    #[default]
    Lenient,
    /// Abort the rebuild on the first failure.
    Strict,
}

/// Configuration for transition replay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub catalog_resolution: CatalogResolution,
}

impl ReplayConfig {
    pub fn strict() -> Self {
        Self {
            catalog_resolution: CatalogResolution::Strict,
        }
    }

    /// Parse from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
