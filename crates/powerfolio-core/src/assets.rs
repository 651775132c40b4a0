//! Asset records and the portfolio that groups them.

use crate::dimension::Dimension;
use crate::error::{ModelError, ModelResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

fn one() -> usize {
    1
}

fn unit() -> f64 {
    1.0
}

/// Dispatchable thermal-style unit with on/off commitment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generator {
    pub name: String,
    pub nominal_power: f64,
    pub variable_cost: f64,
    /// Maximum increase between consecutive steps; `None` leaves the ramp free.
    #[serde(default)]
    pub ramp_up: Option<f64>,
    #[serde(default)]
    pub ramp_down: Option<f64>,
    #[serde(default = "one")]
    pub min_up_time: usize,
    #[serde(default = "one")]
    pub min_down_time: usize,
    #[serde(default)]
    pub min_power: f64,
    #[serde(default)]
    pub startup_cost: f64,
    #[serde(default)]
    pub shutdown_cost: f64,
}

impl Generator {
    pub fn new(name: impl Into<String>, nominal_power: f64, variable_cost: f64) -> Self {
        Self {
            name: name.into(),
            nominal_power,
            variable_cost,
            ramp_up: None,
            ramp_down: None,
            min_up_time: 1,
            min_down_time: 1,
            min_power: 0.0,
            startup_cost: 0.0,
            shutdown_cost: 0.0,
        }
    }

    pub fn with_ramp_limits(mut self, up: f64, down: f64) -> Self {
        self.ramp_up = Some(up);
        self.ramp_down = Some(down);
        self
    }

    pub fn with_min_up_time(mut self, steps: usize) -> Self {
        self.min_up_time = steps;
        self
    }

    pub fn with_min_down_time(mut self, steps: usize) -> Self {
        self.min_down_time = steps;
        self
    }

    pub fn with_min_power(mut self, min_power: f64) -> Self {
        self.min_power = min_power;
        self
    }

    pub fn with_startup_cost(mut self, cost: f64) -> Self {
        self.startup_cost = cost;
        self
    }

    pub fn with_shutdown_cost(mut self, cost: f64) -> Self {
        self.shutdown_cost = cost;
        self
    }

    /// Effective ramp-up limit; an unset limit equals nominal power.
    pub fn max_ramp_up(&self) -> f64 {
        self.ramp_up.unwrap_or(self.nominal_power)
    }

    pub fn max_ramp_down(&self) -> f64 {
        self.ramp_down.unwrap_or(self.nominal_power)
    }

    pub fn validate(&self) -> ModelResult<()> {
        let name = &self.name;
        positive(name, "nominal_power", self.nominal_power)?;
        positive(name, "variable_cost", self.variable_cost)?;
        non_negative(name, "min_power", self.min_power)?;
        non_negative(name, "startup_cost", self.startup_cost)?;
        non_negative(name, "shutdown_cost", self.shutdown_cost)?;
        if let Some(up) = self.ramp_up {
            positive(name, "ramp_up", up)?;
        }
        if let Some(down) = self.ramp_down {
            positive(name, "ramp_down", down)?;
        }
        if self.min_up_time == 0 || self.min_down_time == 0 {
            return Err(ModelError::validation(format!(
                "generator '{name}': min_up_time and min_down_time must be at least 1"
            )));
        }
        if self.min_power > self.nominal_power {
            return Err(ModelError::validation(format!(
                "generator '{name}': min_power {} exceeds nominal_power {}",
                self.min_power, self.nominal_power
            )));
        }
        Ok(())
    }
}

/// Storage unit. State of charge fields are fractions of `capacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Battery {
    pub name: String,
    pub capacity: f64,
    pub max_power: f64,
    #[serde(default = "unit")]
    pub efficiency_charging: f64,
    #[serde(default = "unit")]
    pub efficiency_discharging: f64,
    pub soc_start: f64,
    #[serde(default)]
    pub soc_end: Option<f64>,
    #[serde(default)]
    pub soc_min: f64,
    #[serde(default = "unit")]
    pub soc_max: f64,
}

impl Battery {
    /// Lossless battery with the full SOC range available.
    pub fn new(name: impl Into<String>, capacity: f64, max_power: f64, soc_start: f64) -> Self {
        Self {
            name: name.into(),
            capacity,
            max_power,
            efficiency_charging: 1.0,
            efficiency_discharging: 1.0,
            soc_start,
            soc_end: None,
            soc_min: 0.0,
            soc_max: 1.0,
        }
    }

    pub fn with_efficiencies(mut self, charging: f64, discharging: f64) -> Self {
        self.efficiency_charging = charging;
        self.efficiency_discharging = discharging;
        self
    }

    pub fn with_soc_end(mut self, soc_end: f64) -> Self {
        self.soc_end = Some(soc_end);
        self
    }

    pub fn with_soc_bounds(mut self, soc_min: f64, soc_max: f64) -> Self {
        self.soc_min = soc_min;
        self.soc_max = soc_max;
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        let name = &self.name;
        positive(name, "capacity", self.capacity)?;
        positive(name, "max_power", self.max_power)?;
        for (field, value) in [
            ("efficiency_charging", self.efficiency_charging),
            ("efficiency_discharging", self.efficiency_discharging),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(ModelError::validation(format!(
                    "battery '{name}': {field} must lie in (0, 1], got {value}"
                )));
            }
        }
        let mut fractions = vec![
            ("soc_start", self.soc_start),
            ("soc_min", self.soc_min),
            ("soc_max", self.soc_max),
        ];
        if let Some(end) = self.soc_end {
            fractions.push(("soc_end", end));
        }
        for (field, value) in &fractions {
            if !(0.0..=1.0).contains(value) {
                return Err(ModelError::validation(format!(
                    "battery '{name}': {field} must lie in [0, 1], got {value}"
                )));
            }
        }
        if self.soc_min >= self.soc_max {
            return Err(ModelError::validation(format!(
                "battery '{name}': soc_min {} must be below soc_max {}",
                self.soc_min, self.soc_max
            )));
        }
        let targets = [("soc_start", Some(self.soc_start)), ("soc_end", self.soc_end)];
        for (field, value) in targets.iter().filter_map(|(f, v)| v.map(|v| (f, v))) {
            if value < self.soc_min || value > self.soc_max {
                return Err(ModelError::validation(format!(
                    "battery '{name}': {field} {value} outside [{}, {}]",
                    self.soc_min, self.soc_max
                )));
            }
        }
        Ok(())
    }
}

/// Inflexible demand; its profile comes from the scenario.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Load {
    pub name: String,
}

impl Load {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Which way a market may be traded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeDirection {
    Buy,
    Sell,
    #[default]
    Both,
}

impl TradeDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeDirection::Buy => "buy",
            TradeDirection::Sell => "sell",
            TradeDirection::Both => "both",
        }
    }
}

impl fmt::Display for TradeDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Bilateral energy market.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Market {
    pub name: String,
    /// Upper bound on buy and sell volume per time step.
    pub max_volume: f64,
    #[serde(default)]
    pub trade_direction: TradeDirection,
    /// Trades are first-stage decisions shared by every scenario.
    #[serde(default)]
    pub stage_fixed: bool,
}

impl Market {
    pub fn new(name: impl Into<String>, max_volume: f64) -> Self {
        Self {
            name: name.into(),
            max_volume,
            trade_direction: TradeDirection::Both,
            stage_fixed: false,
        }
    }

    pub fn with_direction(mut self, direction: TradeDirection) -> Self {
        self.trade_direction = direction;
        self
    }

    pub fn stage_fixed(mut self, fixed: bool) -> Self {
        self.stage_fixed = fixed;
        self
    }

    pub fn validate(&self) -> ModelResult<()> {
        positive(&self.name, "max_volume", self.max_volume)
    }
}

/// Any member of a portfolio, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Asset {
    Generator(Generator),
    Battery(Battery),
    Load(Load),
    Market(Market),
}

impl Asset {
    pub fn name(&self) -> &str {
        match self {
            Asset::Generator(g) => &g.name,
            Asset::Battery(b) => &b.name,
            Asset::Load(l) => &l.name,
            Asset::Market(m) => &m.name,
        }
    }

    /// The axis this asset's label lives on.
    pub fn dimension(&self) -> Dimension {
        match self {
            Asset::Generator(_) => Dimension::Generator,
            Asset::Battery(_) => Dimension::Battery,
            Asset::Load(_) => Dimension::Load,
            Asset::Market(_) => Dimension::Market,
        }
    }

    pub fn validate(&self) -> ModelResult<()> {
        match self {
            Asset::Generator(g) => g.validate(),
            Asset::Battery(b) => b.validate(),
            Asset::Load(_) => Ok(()),
            Asset::Market(m) => m.validate(),
        }
    }
}

impl From<Generator> for Asset {
    fn from(value: Generator) -> Self {
        Asset::Generator(value)
    }
}

impl From<Battery> for Asset {
    fn from(value: Battery) -> Self {
        Asset::Battery(value)
    }
}

impl From<Load> for Asset {
    fn from(value: Load) -> Self {
        Asset::Load(value)
    }
}

impl From<Market> for Asset {
    fn from(value: Market) -> Self {
        Asset::Market(value)
    }
}

/// Assets in insertion order; names are unique across every kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Portfolio {
    assets: Vec<Asset>,
}

impl Portfolio {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_assets<I>(assets: I) -> ModelResult<Self>
    where
        I: IntoIterator,
        I::Item: Into<Asset>,
    {
        let mut portfolio = Self::new();
        for asset in assets {
            portfolio.add(asset)?;
        }
        Ok(portfolio)
    }

    pub fn add(&mut self, asset: impl Into<Asset>) -> ModelResult<()> {
        let asset = asset.into();
        if self.contains(asset.name()) {
            return Err(ModelError::DuplicateLabel {
                dimension: asset.dimension(),
                label: asset.name().to_string(),
            });
        }
        self.assets.push(asset);
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.assets.iter().any(|a| a.name() == name)
    }

    pub fn get(&self, name: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.name() == name)
    }

    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn generators(&self) -> impl Iterator<Item = &Generator> {
        self.assets.iter().filter_map(|a| match a {
            Asset::Generator(g) => Some(g),
            _ => None,
        })
    }

    pub fn batteries(&self) -> impl Iterator<Item = &Battery> {
        self.assets.iter().filter_map(|a| match a {
            Asset::Battery(b) => Some(b),
            _ => None,
        })
    }

    pub fn loads(&self) -> impl Iterator<Item = &Load> {
        self.assets.iter().filter_map(|a| match a {
            Asset::Load(l) => Some(l),
            _ => None,
        })
    }

    pub fn markets(&self) -> impl Iterator<Item = &Market> {
        self.assets.iter().filter_map(|a| match a {
            Asset::Market(m) => Some(m),
            _ => None,
        })
    }

    /// Asset names on one axis, in insertion order.
    pub fn labels(&self, dimension: Dimension) -> Vec<String> {
        self.assets
            .iter()
            .filter(|a| a.dimension() == dimension)
            .map(|a| a.name().to_string())
            .collect()
    }

    pub fn validate(&self) -> ModelResult<()> {
        let mut seen = HashSet::new();
        for asset in &self.assets {
            if !seen.insert(asset.name()) {
                return Err(ModelError::DuplicateLabel {
                    dimension: asset.dimension(),
                    label: asset.name().to_string(),
                });
            }
            asset.validate()?;
        }
        Ok(())
    }
}

fn positive(asset: &str, field: &str, value: f64) -> ModelResult<()> {
    if value > 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::validation(format!(
            "'{asset}': {field} must be a positive number, got {value}"
        )))
    }
}

fn non_negative(asset: &str, field: &str, value: f64) -> ModelResult<()> {
    if value >= 0.0 && value.is_finite() {
        Ok(())
    } else {
        Err(ModelError::validation(format!(
            "'{asset}': {field} must be non-negative, got {value}"
        )))
    }
}
