//! Validated energy system: portfolio + horizon + scenarios.
//!
//! [`EnergySystem::new`] is the only way to obtain one, so everything
//! downstream may assume names are unique, numeric fields are in range,
//! probabilities sum to one and every profile has horizon length.

use crate::assets::Portfolio;
use crate::dimension::Dimension;
use crate::error::{ModelError, ModelResult};
use crate::scenario::{ProfileKind, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tolerance on the sum of scenario probabilities.
pub const PROBABILITY_TOLERANCE: f64 = 1e-9;

/// Discretised planning horizon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Horizon {
    labels: Vec<String>,
}

impl Horizon {
    /// `steps` periods labelled `"0"`, `"1"`, ...
    pub fn new(steps: usize) -> Self {
        Self {
            labels: (0..steps).map(|t| t.to_string()).collect(),
        }
    }

    pub fn with_labels<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }

    pub fn steps(&self) -> usize {
        self.labels.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnergySystem {
    portfolio: Portfolio,
    horizon: Horizon,
    scenarios: Vec<Scenario>,
}

impl EnergySystem {
    pub fn new(
        portfolio: Portfolio,
        horizon: Horizon,
        scenarios: Vec<Scenario>,
    ) -> ModelResult<Self> {
        let system = Self {
            portfolio,
            horizon,
            scenarios,
        };
        system.validate()?;
        Ok(system)
    }

    /// A system with one certain scenario.
    pub fn deterministic(
        portfolio: Portfolio,
        horizon: Horizon,
        scenario: Scenario,
    ) -> ModelResult<Self> {
        let scenario = Scenario {
            name: crate::scenario::DETERMINISTIC_SCENARIO.to_string(),
            probability: 1.0,
            ..scenario
        };
        Self::new(portfolio, horizon, vec![scenario])
    }

    pub fn portfolio(&self) -> &Portfolio {
        &self.portfolio
    }

    pub fn horizon(&self) -> &Horizon {
        &self.horizon
    }

    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    pub fn is_stochastic(&self) -> bool {
        self.scenarios.len() > 1
    }

    fn validate(&self) -> ModelResult<()> {
        self.portfolio.validate()?;
        if self.horizon.steps() == 0 {
            return Err(ModelError::validation("horizon must have at least one step"));
        }
        let mut labels = HashSet::new();
        for label in self.horizon.labels() {
            if !labels.insert(label.as_str()) {
                return Err(ModelError::DuplicateLabel {
                    dimension: Dimension::Time,
                    label: label.clone(),
                });
            }
        }
        self.validate_scenarios()?;
        for scenario in &self.scenarios {
            self.validate_profiles(scenario)?;
        }
        if self.portfolio.markets().next().is_none() {
            self.validate_peak_power()?;
        }
        Ok(())
    }

    fn validate_scenarios(&self) -> ModelResult<()> {
        if self.scenarios.is_empty() {
            return Err(ModelError::validation("at least one scenario is required"));
        }
        let mut names = HashSet::new();
        for scenario in &self.scenarios {
            if !names.insert(scenario.name.as_str()) {
                return Err(ModelError::DuplicateLabel {
                    dimension: Dimension::Scenario,
                    label: scenario.name.clone(),
                });
            }
            if !(0.0..=1.0).contains(&scenario.probability) {
                return Err(ModelError::validation(format!(
                    "scenario '{}': probability {} outside [0, 1]",
                    scenario.name, scenario.probability
                )));
            }
        }
        let total: f64 = self.scenarios.iter().map(|s| s.probability).sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(ModelError::validation(format!(
                "scenario probabilities must sum to 1, got {total}"
            )));
        }
        Ok(())
    }

    fn validate_profiles(&self, scenario: &Scenario) -> ModelResult<()> {
        let steps = self.horizon.steps();
        let expect_kind = |kind: ProfileKind, dimension: Dimension| -> ModelResult<()> {
            for asset in scenario.profiles(kind).keys() {
                let owner = self.portfolio.get(asset).map(|a| a.dimension());
                if owner != Some(dimension) {
                    return Err(ModelError::validation(format!(
                        "scenario '{}': {kind} profile '{asset}' does not name a {dimension}",
                        scenario.name
                    )));
                }
            }
            Ok(())
        };
        expect_kind(ProfileKind::AvailableCapacity, Dimension::Generator)?;
        expect_kind(ProfileKind::Load, Dimension::Load)?;
        expect_kind(ProfileKind::MarketPrice, Dimension::Market)?;

        for kind in [
            ProfileKind::AvailableCapacity,
            ProfileKind::Load,
            ProfileKind::MarketPrice,
        ] {
            let non_negative = kind == ProfileKind::Load;
            for (asset, values) in scenario.profiles(kind) {
                let bad = values
                    .iter()
                    .find(|v| !v.is_finite() || (non_negative && **v < 0.0));
                if let Some(bad) = bad {
                    let rule = if non_negative {
                        "finite and non-negative"
                    } else {
                        "finite"
                    };
                    return Err(ModelError::validation(format!(
                        "scenario '{}': {kind} profile for '{asset}' holds {bad}; values must be {rule}",
                        scenario.name
                    )));
                }
            }
        }

        for load in self.portfolio.loads() {
            scenario.required_profile(ProfileKind::Load, &load.name, steps)?;
        }
        for market in self.portfolio.markets() {
            scenario.required_profile(ProfileKind::MarketPrice, &market.name, steps)?;
        }
        for generator in self.portfolio.generators() {
            let Some(profile) =
                scenario.optional_profile(ProfileKind::AvailableCapacity, &generator.name, steps)?
            else {
                continue;
            };
            if let Some(bad) = profile
                .iter()
                .find(|v| !(0.0..=generator.nominal_power).contains(*v))
            {
                return Err(ModelError::validation(format!(
                    "scenario '{}': available capacity {bad} for '{}' outside [0, {}]",
                    scenario.name, generator.name, generator.nominal_power
                )));
            }
        }
        Ok(())
    }

    /// Without markets, demand must be coverable by generation plus discharge.
    fn validate_peak_power(&self) -> ModelResult<()> {
        let supply: f64 = self
            .portfolio
            .generators()
            .map(|g| g.nominal_power)
            .chain(self.portfolio.batteries().map(|b| b.max_power))
            .sum();
        for scenario in &self.scenarios {
            for t in 0..self.horizon.steps() {
                let demand: f64 = scenario.loads.values().map(|profile| profile[t]).sum();
                if demand > supply {
                    return Err(ModelError::validation(format!(
                        "scenario '{}': demand {demand} at step '{}' exceeds available supply {supply}",
                        scenario.name,
                        self.horizon.labels()[t]
                    )));
                }
            }
        }
        Ok(())
    }
}
