//! Result extraction: solved column values mapped back onto per-asset
//! tables indexed by (scenario, time).

use crate::model::AlgebraicModel;
use crate::solve::SolveOutcome;
use crate::variables::Variable;
use anyhow::{Context, Result};
use powerfolio_core::{Dimension, ModelError, ModelResult, Point};
use serde::Serialize;
use std::path::Path;

/// One variable as a table: rows are (scenario, time), columns are asset
/// labels. `scenarios` is `None` when the scenario level was dropped.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultTable {
    pub variable: String,
    pub scenarios: Option<Vec<String>>,
    pub times: Vec<String>,
    pub columns: Vec<String>,
    /// Row-major: scenario, then time, then column.
    pub values: Vec<f64>,
}

impl ResultTable {
    fn from_variable(
        model: &AlgebraicModel,
        outcome: &SolveOutcome,
        variable: &Variable,
        name: &str,
        scale: impl Fn(&Point) -> f64,
    ) -> ModelResult<Self> {
        let coords = model.coords();
        let asset = variable
            .dims()
            .iter()
            .copied()
            .find(|d| d.is_asset())
            .ok_or_else(|| ModelError::validation(format!("{name} has no asset axis")))?;
        let scenarios = coords.index(Dimension::Scenario)?.labels().to_vec();
        let times = coords.index(Dimension::Time)?.labels().to_vec();
        let columns = coords.index(asset)?.labels().to_vec();

        let mut values = Vec::with_capacity(scenarios.len() * times.len() * columns.len());
        for s in 0..scenarios.len() {
            for t in 0..times.len() {
                for a in 0..columns.len() {
                    let p = Point::new()
                        .with(Dimension::Scenario, s)
                        .with(Dimension::Time, t)
                        .with(asset, a);
                    let column = variable.at(&p).index();
                    let raw = outcome.value(column).ok_or_else(|| ModelError::ShapeMismatch {
                        name: name.to_string(),
                        expected: model.num_columns(),
                        actual: outcome.values.len(),
                    })?;
                    values.push(raw * scale(&p));
                }
            }
        }

        Ok(Self {
            variable: name.to_string(),
            scenarios: (scenarios.len() > 1).then_some(scenarios),
            times,
            columns,
            values,
        })
    }

    pub fn has_scenario_level(&self) -> bool {
        self.scenarios.is_some()
    }

    fn num_scenarios(&self) -> usize {
        self.scenarios.as_ref().map_or(1, Vec::len)
    }

    /// Value at a (scenario, time, column) position. Use scenario 0 for
    /// tables without a scenario level.
    pub fn get(&self, scenario: usize, time: usize, column: &str) -> Option<f64> {
        let c = self.columns.iter().position(|name| name == column)?;
        if scenario >= self.num_scenarios() || time >= self.times.len() {
            return None;
        }
        let offset = (scenario * self.times.len() + time) * self.columns.len() + c;
        self.values.get(offset).copied()
    }

    /// The time series of one column in one scenario.
    pub fn series(&self, scenario: usize, column: &str) -> Option<Vec<f64>> {
        (0..self.times.len())
            .map(|t| self.get(scenario, t, column))
            .collect()
    }

    /// Writes the table in wide format: `[scenario,]time,<columns...>`.
    #[cfg(feature = "csv")]
    pub fn to_csv(&self, path: &Path) -> Result<()> {
        let mut wtr = csv::Writer::from_path(path)
            .with_context(|| format!("creating CSV writer for {}", path.display()))?;

        let mut header = Vec::new();
        if self.has_scenario_level() {
            header.push("scenario".to_string());
        }
        header.push("time".to_string());
        header.extend(self.columns.iter().cloned());
        wtr.write_record(&header).context("writing CSV header")?;

        let width = self.columns.len();
        for s in 0..self.num_scenarios() {
            for (t, time) in self.times.iter().enumerate() {
                let mut record = Vec::with_capacity(width + 2);
                if let Some(scenarios) = &self.scenarios {
                    record.push(scenarios[s].clone());
                }
                record.push(time.clone());
                let start = (s * self.times.len() + t) * width;
                record.extend(self.values[start..start + width].iter().map(f64::to_string));
                wtr.write_record(&record).context("writing CSV record")?;
            }
        }

        wtr.flush().context("flushing CSV writer")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratorResults {
    pub power: ResultTable,
    pub status: ResultTable,
    pub startup: ResultTable,
    pub shutdown: ResultTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatteryResults {
    /// Charging minus discharging.
    pub net_power: ResultTable,
    /// Stored energy, `soc × capacity`.
    pub state_of_charge: ResultTable,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketResults {
    pub sell_volume: ResultTable,
    pub buy_volume: ResultTable,
}

/// Every asset class the portfolio holds, extracted in one call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSet {
    pub objective_value: Option<f64>,
    pub generators: Option<GeneratorResults>,
    pub batteries: Option<BatteryResults>,
    pub markets: Option<MarketResults>,
}

impl ResultSet {
    pub fn tables(&self) -> Vec<&ResultTable> {
        let mut out = Vec::new();
        if let Some(g) = &self.generators {
            out.extend([&g.power, &g.status, &g.startup, &g.shutdown]);
        }
        if let Some(b) = &self.batteries {
            out.extend([&b.net_power, &b.state_of_charge]);
        }
        if let Some(m) = &self.markets {
            out.extend([&m.sell_volume, &m.buy_volume]);
        }
        out
    }

    /// Export to JSON format
    pub fn to_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing results to JSON")?;
        std::fs::write(path, json)
            .with_context(|| format!("writing JSON to {}", path.display()))?;
        Ok(())
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).context("converting results to JSON value")
    }

    /// One `<variable>.csv` per table under `dir`.
    #[cfg(feature = "csv")]
    pub fn to_csv_dir(&self, dir: &Path) -> Result<Vec<std::path::PathBuf>> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("creating output directory {}", dir.display()))?;
        self.tables()
            .into_iter()
            .map(|table| {
                let path = dir.join(format!("{}.csv", table.variable));
                table.to_csv(&path)?;
                Ok(path)
            })
            .collect()
    }
}

/// One solved cell in long format.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SolutionRecord {
    pub variable: String,
    pub scenario: String,
    pub time: String,
    pub asset: String,
    pub value: f64,
}

/// Read access to a solved model. Every accessor refuses to answer unless the
/// solve terminated successfully.
#[derive(Debug, Clone, Copy)]
pub struct OptimizationResults<'m> {
    model: &'m AlgebraicModel,
    outcome: &'m SolveOutcome,
}

impl<'m> OptimizationResults<'m> {
    pub fn new(model: &'m AlgebraicModel, outcome: &'m SolveOutcome) -> Self {
        Self { model, outcome }
    }

    pub fn outcome(&self) -> &SolveOutcome {
        self.outcome
    }

    fn ensure_success(&self) -> ModelResult<()> {
        if self.outcome.is_success() {
            Ok(())
        } else {
            Err(ModelError::ResultsUnavailable {
                status: self.outcome.status.to_string(),
                termination: self.outcome.termination.to_string(),
            })
        }
    }

    fn table(&self, variable: &Variable, name: &str) -> ModelResult<ResultTable> {
        ResultTable::from_variable(self.model, self.outcome, variable, name, |_| 1.0)
    }

    pub fn objective_value(&self) -> ModelResult<f64> {
        self.ensure_success()?;
        self.outcome
            .objective_value
            .ok_or_else(|| ModelError::Solver("solver reported no objective value".into()))
    }

    pub fn generators(&self) -> ModelResult<GeneratorResults> {
        self.ensure_success()?;
        let m = self.model;
        Ok(GeneratorResults {
            power: self.table(m.generator_power()?, "power")?,
            status: self.table(m.generator_status()?, "status")?,
            startup: self.table(m.generator_startup()?, "startup")?,
            shutdown: self.table(m.generator_shutdown()?, "shutdown")?,
        })
    }

    pub fn batteries(&self) -> ModelResult<BatteryResults> {
        self.ensure_success()?;
        let m = self.model;
        let capacity = &m.params().batteries()?.capacity;
        Ok(BatteryResults {
            net_power: self.table(m.battery_net_power()?, "net_power")?,
            state_of_charge: ResultTable::from_variable(
                m,
                self.outcome,
                m.battery_soc()?,
                "state_of_charge",
                |p| capacity[p],
            )?,
        })
    }

    pub fn markets(&self) -> ModelResult<MarketResults> {
        self.ensure_success()?;
        let m = self.model;
        Ok(MarketResults {
            sell_volume: self.table(m.market_sell_volume()?, "sell_volume")?,
            buy_volume: self.table(m.market_buy_volume()?, "buy_volume")?,
        })
    }

    /// Extracts every present asset class. Absent classes come back as `None`.
    pub fn all(&self) -> ModelResult<ResultSet> {
        self.ensure_success()?;
        let present = |dim: Dimension| self.model.coords().has(dim);
        let generators = || {
            present(Dimension::Generator)
                .then(|| self.generators())
                .transpose()
        };
        let batteries = || {
            present(Dimension::Battery)
                .then(|| self.batteries())
                .transpose()
        };
        let markets = || present(Dimension::Market).then(|| self.markets()).transpose();

        #[cfg(feature = "rayon")]
        let (generators, (batteries, markets)) =
            rayon::join(generators, || rayon::join(batteries, markets));
        #[cfg(not(feature = "rayon"))]
        let (generators, batteries, markets) = (generators(), batteries(), markets());

        Ok(ResultSet {
            objective_value: self.outcome.objective_value,
            generators: generators?,
            batteries: batteries?,
            markets: markets?,
        })
    }

    /// Every declared variable flattened to one record per cell, raw values.
    pub fn records(&self) -> ModelResult<Vec<SolutionRecord>> {
        self.ensure_success()?;
        let coords = self.model.coords();
        let mut out = Vec::with_capacity(self.model.num_columns());
        for variable in self.model.registry().iter() {
            let Some(asset) = variable.dims().iter().copied().find(|d| d.is_asset()) else {
                continue;
            };
            for (point, id) in variable.cells() {
                let value = self.outcome.value(id.index()).ok_or_else(|| {
                    ModelError::ShapeMismatch {
                        name: variable.name().to_string(),
                        expected: self.model.num_columns(),
                        actual: self.outcome.values.len(),
                    }
                })?;
                out.push(SolutionRecord {
                    variable: variable.name().to_string(),
                    scenario: coords
                        .label(Dimension::Scenario, point.position(Dimension::Scenario))
                        .to_string(),
                    time: coords
                        .label(Dimension::Time, point.position(Dimension::Time))
                        .to_string(),
                    asset: coords.label(asset, point.position(asset)).to_string(),
                    value,
                });
            }
        }
        Ok(out)
    }
}
