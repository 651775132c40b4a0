use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use powerfolio_core::{Asset, EnergySystem, Horizon, Market, Portfolio, Scenario};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// A system specification file as written by users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemSpec {
    pub version: Option<u32>,
    pub horizon: HorizonSpec,
    #[serde(default)]
    pub assets: Vec<Asset>,
    #[serde(default)]
    pub markets: Vec<Market>,
    /// Stochastic scenarios with explicit probabilities.
    #[serde(default)]
    pub scenarios: Vec<Scenario>,
    /// Shorthand for a single certain scenario.
    pub scenario: Option<ProfileSpec>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonSpec {
    pub steps: usize,
    #[serde(default = "default_timestep_minutes")]
    pub timestep_minutes: u32,
    /// RFC3339 timestamp of the first step. Labels become timestamps when set.
    pub start: Option<String>,
    #[serde(default = "default_power_unit")]
    pub power_unit: String,
}

fn default_timestep_minutes() -> u32 {
    60
}

fn default_power_unit() -> String {
    "MW".to_string()
}

/// Profiles of the deterministic shorthand; name and probability are implied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileSpec {
    #[serde(default)]
    pub available_capacity: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub loads: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    pub market_prices: BTreeMap<String, Vec<f64>>,
}

/// A validated system plus the presentation details of its horizon.
#[derive(Debug, Clone)]
pub struct ResolvedSystem {
    pub system: EnergySystem,
    pub start: Option<DateTime<Utc>>,
    pub timestep: Duration,
    pub power_unit: String,
}

impl ResolvedSystem {
    pub fn energy_unit(&self) -> String {
        format!("{}h", self.power_unit)
    }
}

pub fn load_spec_from_path(path: &Path) -> Result<SystemSpec> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading system spec '{}'", path.display()))?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") => {
            serde_yaml::from_str(&data).context("parsing system spec yaml")
        }
        Some(ext) if ext.eq_ignore_ascii_case("json") => {
            serde_json::from_str(&data).context("parsing system spec json")
        }
        _ => serde_yaml::from_str(&data)
            .or_else(|_| serde_json::from_str(&data))
            .context("parsing system spec"),
    }
}

pub fn resolve_system(spec: &SystemSpec) -> Result<ResolvedSystem> {
    let horizon_spec = &spec.horizon;
    if horizon_spec.steps == 0 {
        return Err(anyhow!("horizon must have at least one step"));
    }
    if horizon_spec.timestep_minutes == 0 {
        return Err(anyhow!("timestep_minutes must be positive"));
    }
    let timestep = Duration::minutes(i64::from(horizon_spec.timestep_minutes));
    let start = horizon_spec
        .start
        .as_deref()
        .map(parse_timestamp)
        .transpose()
        .context("parsing horizon start")?;
    let horizon = match start {
        Some(start) => Horizon::with_labels(time_labels(start, timestep, horizon_spec.steps)),
        None => Horizon::new(horizon_spec.steps),
    };

    let assets = spec
        .assets
        .iter()
        .cloned()
        .chain(spec.markets.iter().cloned().map(Asset::from));
    let portfolio = Portfolio::from_assets(assets).context("building portfolio")?;

    let system = match (&spec.scenario, spec.scenarios.is_empty()) {
        (Some(_), false) => {
            return Err(anyhow!(
                "spec declares both 'scenario' and 'scenarios'; use one"
            ))
        }
        (None, true) => return Err(anyhow!("spec declares no scenario")),
        (Some(profiles), true) => {
            let mut scenario = Scenario::deterministic();
            scenario.available_capacity = profiles.available_capacity.clone();
            scenario.loads = profiles.loads.clone();
            scenario.market_prices = profiles.market_prices.clone();
            EnergySystem::deterministic(portfolio, horizon, scenario)
        }
        (None, false) => EnergySystem::new(portfolio, horizon, spec.scenarios.clone()),
    }
    .context("validating system")?;

    Ok(ResolvedSystem {
        system,
        start,
        timestep,
        power_unit: horizon_spec.power_unit.clone(),
    })
}

/// Reads and resolves a spec file in one step.
pub fn load_system(path: &Path) -> Result<ResolvedSystem> {
    let spec = load_spec_from_path(path)?;
    resolve_system(&spec).with_context(|| format!("resolving '{}'", path.display()))
}

pub fn validate(spec: &SystemSpec) -> Result<()> {
    resolve_system(spec).map(|_| ())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%z"))
        .with_context(|| format!("parsing timestamp '{}'; use RFC3339", value))?
        .with_timezone(&Utc))
}

fn time_labels(start: DateTime<Utc>, timestep: Duration, steps: usize) -> Vec<String> {
    (0..steps)
        .map(|k| {
            (start + timestep * k as i32).to_rfc3339_opts(SecondsFormat::Secs, true)
        })
        .collect()
}
