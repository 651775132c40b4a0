//! Scenario records: a probability plus per-asset time profiles.

use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Name given to the scenario of a deterministic system.
pub const DETERMINISTIC_SCENARIO: &str = "deterministic";

/// The three profile families a scenario can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProfileKind {
    /// Per-generator cap on output, e.g. a wind or solar availability trace.
    AvailableCapacity,
    Load,
    MarketPrice,
}

impl ProfileKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileKind::AvailableCapacity => "available_capacity",
            ProfileKind::Load => "load",
            ProfileKind::MarketPrice => "market_price",
        }
    }
}

impl fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub probability: f64,
    #[serde(default)]
    pub available_capacity: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub loads: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub market_prices: BTreeMap<String, Vec<f64>>,
}

impl Scenario {
    pub fn new(name: impl Into<String>, probability: f64) -> Self {
        Self {
            name: name.into(),
            probability,
            available_capacity: BTreeMap::new(),
            loads: BTreeMap::new(),
            market_prices: BTreeMap::new(),
        }
    }

    /// The single certain scenario of a deterministic system.
    pub fn deterministic() -> Self {
        Self::new(DETERMINISTIC_SCENARIO, 1.0)
    }

    pub fn with_load(mut self, load: impl Into<String>, profile: Vec<f64>) -> Self {
        self.loads.insert(load.into(), profile);
        self
    }

    pub fn with_market_price(mut self, market: impl Into<String>, profile: Vec<f64>) -> Self {
        self.market_prices.insert(market.into(), profile);
        self
    }

    pub fn with_available_capacity(
        mut self,
        generator: impl Into<String>,
        profile: Vec<f64>,
    ) -> Self {
        self.available_capacity.insert(generator.into(), profile);
        self
    }

    pub fn profiles(&self, kind: ProfileKind) -> &BTreeMap<String, Vec<f64>> {
        match kind {
            ProfileKind::AvailableCapacity => &self.available_capacity,
            ProfileKind::Load => &self.loads,
            ProfileKind::MarketPrice => &self.market_prices,
        }
    }

    /// Profile for `asset` when present, checked against the horizon length.
    pub fn optional_profile(
        &self,
        kind: ProfileKind,
        asset: &str,
        steps: usize,
    ) -> ModelResult<Option<&[f64]>> {
        match self.profiles(kind).get(asset) {
            None => Ok(None),
            Some(values) if values.len() != steps => Err(ModelError::ProfileLengthMismatch {
                profile: kind.to_string(),
                asset: asset.to_string(),
                scenario: self.name.clone(),
                expected: steps,
                actual: values.len(),
            }),
            Some(values) => Ok(Some(values.as_slice())),
        }
    }

    /// Like [`Scenario::optional_profile`] but a missing entry is an error.
    pub fn required_profile(
        &self,
        kind: ProfileKind,
        asset: &str,
        steps: usize,
    ) -> ModelResult<&[f64]> {
        self.optional_profile(kind, asset, steps)?
            .ok_or_else(|| ModelError::MissingProfile {
                profile: kind.to_string(),
                asset: asset.to_string(),
                scenario: self.name.clone(),
            })
    }
}
