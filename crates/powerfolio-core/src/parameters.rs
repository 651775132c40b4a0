//! Read-only parameter arrays aligned to the shared coordinates.
//!
//! A [`ParameterTable`] is addressed with a [`Point`]; any position the point
//! carries for an axis the table does not span is ignored. That is the whole
//! broadcasting story: a per-generator `nominal_power` and a
//! per-(scenario, time, generator) capacity profile are read with the same
//! point inside one constraint row.

use crate::assets::{Battery, Generator, Market, TradeDirection};
use crate::dimension::{Coordinates, Dimension, Index, Point, Shape};
use crate::error::{ModelError, ModelResult};
use crate::scenario::{ProfileKind, Scenario};
use crate::system::EnergySystem;
use std::collections::HashMap;
use std::ops;

#[derive(Debug, Clone, PartialEq)]
pub struct ParameterTable<T> {
    name: String,
    shape: Shape,
    data: Vec<T>,
}

impl<T: Copy> ParameterTable<T> {
    pub fn new(name: impl Into<String>, shape: Shape, data: Vec<T>) -> ModelResult<Self> {
        let name = name.into();
        if data.len() != shape.len() {
            return Err(ModelError::ShapeMismatch {
                name,
                expected: shape.len(),
                actual: data.len(),
            });
        }
        Ok(Self { name, shape, data })
    }

    pub fn from_fn(name: impl Into<String>, shape: Shape, mut f: impl FnMut(&Point) -> T) -> Self {
        let data = shape.points().map(|p| f(&p)).collect();
        Self {
            name: name.into(),
            shape,
            data,
        }
    }

    pub fn get(&self, point: &Point) -> Option<T> {
        self.shape.offset(point).map(|i| self.data[i])
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[Dimension] {
        self.shape.dims()
    }

    pub fn values(&self) -> &[T] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Panics if `point` lacks one of the table's axes; constraint generators
/// only index with points drawn from a shape that covers them.
impl<T: Copy> ops::Index<&Point> for ParameterTable<T> {
    type Output = T;

    fn index(&self, point: &Point) -> &T {
        match self.shape.offset(point) {
            Some(i) => &self.data[i],
            None => panic!("point {point:?} does not address parameter '{}'", self.name),
        }
    }
}

/// Lines up `assets` with the labels of `index`, failing on a label with no asset.
fn align<'a, A>(
    index: &Index,
    assets: &[&'a A],
    name_of: impl Fn(&A) -> &str,
) -> ModelResult<Vec<&'a A>> {
    let by_name: HashMap<&str, &'a A> = assets.iter().map(|a| (name_of(*a), *a)).collect();
    index
        .labels()
        .iter()
        .map(|label| {
            by_name
                .get(label.as_str())
                .copied()
                .ok_or_else(|| ModelError::UnknownLabel {
                    dimension: index.dimension(),
                    label: label.clone(),
                })
        })
        .collect()
}

fn per_asset<A, T: Copy>(
    name: &str,
    dimension: Dimension,
    shape: &Shape,
    assets: &[&A],
    f: impl Fn(&A) -> T,
) -> ParameterTable<T> {
    ParameterTable::from_fn(name, shape.clone(), |p| f(assets[p.position(dimension)]))
}

#[derive(Debug, Clone)]
pub struct GeneratorParameters {
    pub nominal_power: ParameterTable<f64>,
    pub variable_cost: ParameterTable<f64>,
    pub min_power: ParameterTable<f64>,
    pub max_ramp_up: ParameterTable<f64>,
    pub max_ramp_down: ParameterTable<f64>,
    pub min_up_time: ParameterTable<usize>,
    pub min_down_time: ParameterTable<usize>,
    pub startup_cost: ParameterTable<f64>,
    pub shutdown_cost: ParameterTable<f64>,
}

impl GeneratorParameters {
    pub fn new(coords: &Coordinates, generators: &[&Generator]) -> ModelResult<Self> {
        let index = coords.index(Dimension::Generator)?;
        let gens = align(index, generators, |g| g.name.as_str())?;
        let shape = coords.shape(&[Dimension::Generator])?;
        let d = Dimension::Generator;
        Ok(Self {
            nominal_power: per_asset("nominal_power", d, &shape, &gens, |g| g.nominal_power),
            variable_cost: per_asset("variable_cost", d, &shape, &gens, |g| g.variable_cost),
            min_power: per_asset("min_power", d, &shape, &gens, |g| g.min_power),
            max_ramp_up: per_asset("max_ramp_up", d, &shape, &gens, |g| g.max_ramp_up()),
            max_ramp_down: per_asset("max_ramp_down", d, &shape, &gens, |g| g.max_ramp_down()),
            min_up_time: per_asset("min_up_time", d, &shape, &gens, |g| g.min_up_time),
            min_down_time: per_asset("min_down_time", d, &shape, &gens, |g| g.min_down_time),
            startup_cost: per_asset("startup_cost", d, &shape, &gens, |g| g.startup_cost),
            shutdown_cost: per_asset("shutdown_cost", d, &shape, &gens, |g| g.shutdown_cost),
        })
    }
}

#[derive(Debug, Clone)]
pub struct BatteryParameters {
    pub capacity: ParameterTable<f64>,
    pub max_power: ParameterTable<f64>,
    pub efficiency_charging: ParameterTable<f64>,
    pub efficiency_discharging: ParameterTable<f64>,
    pub soc_start: ParameterTable<f64>,
    pub soc_end: ParameterTable<Option<f64>>,
    pub soc_min: ParameterTable<f64>,
    pub soc_max: ParameterTable<f64>,
}

impl BatteryParameters {
    pub fn new(coords: &Coordinates, batteries: &[&Battery]) -> ModelResult<Self> {
        let index = coords.index(Dimension::Battery)?;
        let bats = align(index, batteries, |b| b.name.as_str())?;
        let shape = coords.shape(&[Dimension::Battery])?;
        let d = Dimension::Battery;
        Ok(Self {
            capacity: per_asset("capacity", d, &shape, &bats, |b| b.capacity),
            max_power: per_asset("max_power", d, &shape, &bats, |b| b.max_power),
            efficiency_charging: per_asset("efficiency_charging", d, &shape, &bats, |b| {
                b.efficiency_charging
            }),
            efficiency_discharging: per_asset("efficiency_discharging", d, &shape, &bats, |b| {
                b.efficiency_discharging
            }),
            soc_start: per_asset("soc_start", d, &shape, &bats, |b| b.soc_start),
            soc_end: per_asset("soc_end", d, &shape, &bats, |b| b.soc_end),
            soc_min: per_asset("soc_min", d, &shape, &bats, |b| b.soc_min),
            soc_max: per_asset("soc_max", d, &shape, &bats, |b| b.soc_max),
        })
    }
}

#[derive(Debug, Clone)]
pub struct MarketParameters {
    pub max_volume: ParameterTable<f64>,
    pub trade_direction: ParameterTable<TradeDirection>,
    pub stage_fixed: ParameterTable<bool>,
}

impl MarketParameters {
    pub fn new(coords: &Coordinates, markets: &[&Market]) -> ModelResult<Self> {
        let index = coords.index(Dimension::Market)?;
        let mkts = align(index, markets, |m| m.name.as_str())?;
        let shape = coords.shape(&[Dimension::Market])?;
        let d = Dimension::Market;
        Ok(Self {
            max_volume: per_asset("max_volume", d, &shape, &mkts, |m| m.max_volume),
            trade_direction: per_asset("trade_direction", d, &shape, &mkts, |m| {
                m.trade_direction
            }),
            stage_fixed: per_asset("stage_fixed", d, &shape, &mkts, |m| m.stage_fixed),
        })
    }

    /// True when any market is stage-fixed.
    pub fn any_stage_fixed(&self) -> bool {
        self.stage_fixed.values().iter().any(|fixed| *fixed)
    }
}

/// Scenario-indexed data: probabilities and the (scenario, time, asset) profiles.
#[derive(Debug, Clone)]
pub struct ScenarioParameters {
    pub probability: ParameterTable<f64>,
    /// `None` cells have no explicit cap beyond nominal power.
    pub available_capacity: Option<ParameterTable<Option<f64>>>,
    pub load: Option<ParameterTable<f64>>,
    pub market_price: Option<ParameterTable<f64>>,
}

impl ScenarioParameters {
    /// Profiles of `scenarios` aligned to the coordinate axes. Load and price
    /// profiles are required for every load and market; capacity profiles are
    /// optional per generator.
    pub fn new(coords: &Coordinates, scenarios: &[Scenario]) -> ModelResult<Self> {
        let scenario_index = coords.index(Dimension::Scenario)?;
        let ordered = align(
            scenario_index,
            &scenarios.iter().collect::<Vec<_>>(),
            |s| s.name.as_str(),
        )?;
        let probability = per_asset(
            "probability",
            Dimension::Scenario,
            &coords.shape(&[Dimension::Scenario])?,
            &ordered,
            |s| s.probability,
        );

        let available_capacity = if coords.has(Dimension::Generator) {
            Some(profile_table(
                coords,
                &ordered,
                Dimension::Generator,
                ProfileKind::AvailableCapacity,
                false,
                |cell| cell,
            )?)
        } else {
            None
        };
        let load = if coords.has(Dimension::Load) {
            Some(profile_table(
                coords,
                &ordered,
                Dimension::Load,
                ProfileKind::Load,
                true,
                |cell| cell.unwrap_or(0.0),
            )?)
        } else {
            None
        };
        let market_price = if coords.has(Dimension::Market) {
            Some(profile_table(
                coords,
                &ordered,
                Dimension::Market,
                ProfileKind::MarketPrice,
                true,
                |cell| cell.unwrap_or(0.0),
            )?)
        } else {
            None
        };

        Ok(Self {
            probability,
            available_capacity,
            load,
            market_price,
        })
    }
}

/// (scenario, time, asset) table from one profile family. Required profiles
/// fail on a missing entry; optional ones leave `None` cells.
fn profile_table<T: Copy>(
    coords: &Coordinates,
    scenarios: &[&Scenario],
    asset_dim: Dimension,
    kind: ProfileKind,
    required: bool,
    cell: impl Fn(Option<f64>) -> T,
) -> ModelResult<ParameterTable<T>> {
    let steps = coords.index(Dimension::Time)?.len();
    let assets = coords.index(asset_dim)?;
    let mut profiles: Vec<Option<&[f64]>> = Vec::with_capacity(scenarios.len() * assets.len());
    for scenario in scenarios {
        for asset in assets.labels() {
            let profile = if required {
                Some(scenario.required_profile(kind, asset, steps)?)
            } else {
                scenario.optional_profile(kind, asset, steps)?
            };
            profiles.push(profile);
        }
    }
    let shape = coords.shape(&[Dimension::Scenario, Dimension::Time, asset_dim])?;
    let n_assets = assets.len();
    Ok(ParameterTable::from_fn(kind.as_str(), shape, |p| {
        let slot = p.position(Dimension::Scenario) * n_assets + p.position(asset_dim);
        let t = p.position(Dimension::Time);
        cell(profiles[slot].map(|values| values[t]))
    }))
}

/// Every parameter table of one build, plus the coordinates they align to.
#[derive(Debug, Clone)]
pub struct EnergySystemParameters {
    pub coords: Coordinates,
    pub generators: Option<GeneratorParameters>,
    pub batteries: Option<BatteryParameters>,
    pub markets: Option<MarketParameters>,
    pub scenarios: ScenarioParameters,
}

impl EnergySystemParameters {
    pub fn from_system(system: &EnergySystem) -> ModelResult<Self> {
        let portfolio = system.portfolio();
        let mut coords = Coordinates::new();
        coords.insert(Index::new(
            Dimension::Scenario,
            system.scenarios().iter().map(|s| s.name.clone()),
        )?)?;
        coords.insert(Index::new(
            Dimension::Time,
            system.horizon().labels().iter().cloned(),
        )?)?;
        for dim in [
            Dimension::Generator,
            Dimension::Battery,
            Dimension::Load,
            Dimension::Market,
        ] {
            let labels = portfolio.labels(dim);
            if !labels.is_empty() {
                coords.insert(Index::new(dim, labels)?)?;
            }
        }

        let generators: Vec<&Generator> = portfolio.generators().collect();
        let batteries: Vec<&Battery> = portfolio.batteries().collect();
        let markets: Vec<&Market> = portfolio.markets().collect();

        Ok(Self {
            generators: if generators.is_empty() {
                None
            } else {
                Some(GeneratorParameters::new(&coords, &generators)?)
            },
            batteries: if batteries.is_empty() {
                None
            } else {
                Some(BatteryParameters::new(&coords, &batteries)?)
            },
            markets: if markets.is_empty() {
                None
            } else {
                Some(MarketParameters::new(&coords, &markets)?)
            },
            scenarios: ScenarioParameters::new(&coords, system.scenarios())?,
            coords,
        })
    }

    pub fn generators(&self) -> ModelResult<&GeneratorParameters> {
        self.generators
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Generator))
    }

    pub fn batteries(&self) -> ModelResult<&BatteryParameters> {
        self.batteries
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Battery))
    }

    pub fn markets(&self) -> ModelResult<&MarketParameters> {
        self.markets
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Market))
    }

    pub fn load(&self) -> ModelResult<&ParameterTable<f64>> {
        self.scenarios
            .load
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Load))
    }

    pub fn market_price(&self) -> ModelResult<&ParameterTable<f64>> {
        self.scenarios
            .market_price
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Market))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{Asset, Load, Portfolio};
    use crate::system::Horizon;

    fn coords(scenarios: &[&str], steps: usize, generators: &[&str], loads: &[&str]) -> Coordinates {
        let mut coords = Coordinates::new();
        coords
            .insert(Index::new(Dimension::Scenario, scenarios.iter().copied()).unwrap())
            .unwrap();
        coords
            .insert(Index::new(Dimension::Time, (0..steps).map(|t| t.to_string())).unwrap())
            .unwrap();
        if !generators.is_empty() {
            coords
                .insert(Index::new(Dimension::Generator, generators.iter().copied()).unwrap())
                .unwrap();
        }
        if !loads.is_empty() {
            coords
                .insert(Index::new(Dimension::Load, loads.iter().copied()).unwrap())
                .unwrap();
        }
        coords
    }

    #[test]
    fn table_rejects_wrong_length() {
        let shape = Shape::from_pairs(&[(Dimension::Generator, 2)]);
        let err = ParameterTable::new("p", shape, vec![1.0]).unwrap_err();
        assert!(matches!(err, ModelError::ShapeMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn table_broadcasts_over_extra_axes() {
        let shape = Shape::from_pairs(&[(Dimension::Generator, 2)]);
        let table = ParameterTable::new("nominal", shape, vec![100.0, 50.0]).unwrap();
        let point = Point::new()
            .with(Dimension::Scenario, 1)
            .with(Dimension::Time, 3)
            .with(Dimension::Generator, 1);
        assert_eq!(table[&point], 50.0);
        assert_eq!(table.get(&Point::new()), None);
    }

    #[test]
    fn generator_parameters_follow_index_order() {
        let coords = coords(&["s"], 1, &["b", "a"], &[]);
        let a = Generator::new("a", 100.0, 10.0);
        let b = Generator::new("b", 50.0, 20.0).with_ramp_limits(5.0, 7.0);
        let params = GeneratorParameters::new(&coords, &[&a, &b]).unwrap();
        let first = Point::new().with(Dimension::Generator, 0);
        let second = Point::new().with(Dimension::Generator, 1);
        assert_eq!(params.nominal_power[&first], 50.0);
        assert_eq!(params.max_ramp_up[&first], 5.0);
        assert_eq!(params.max_ramp_down[&second], 100.0);
    }

    #[test]
    fn load_profile_missing_or_short() {
        let coords = coords(&["s"], 2, &[], &["city"]);
        let missing = ScenarioParameters::new(&coords, &[Scenario::new("s", 1.0)]).unwrap_err();
        assert_eq!(
            missing,
            ModelError::MissingProfile {
                profile: "load".into(),
                asset: "city".into(),
                scenario: "s".into()
            }
        );

        let short = Scenario::new("s", 1.0).with_load("city", vec![1.0]);
        let err = ScenarioParameters::new(&coords, &[short]).unwrap_err();
        assert!(matches!(err, ModelError::ProfileLengthMismatch { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn capacity_profiles_are_optional() {
        let coords = coords(&["windy", "calm"], 2, &["wind", "gas"], &[]);
        let scenarios = vec![
            Scenario::new("windy", 0.5).with_available_capacity("wind", vec![80.0, 90.0]),
            Scenario::new("calm", 0.5),
        ];
        let params = ScenarioParameters::new(&coords, &scenarios).unwrap();
        let table = params.available_capacity.unwrap();
        let at = |s, t, g| {
            Point::new()
                .with(Dimension::Scenario, s)
                .with(Dimension::Time, t)
                .with(Dimension::Generator, g)
        };
        assert_eq!(table[&at(0, 1, 0)], Some(90.0));
        assert_eq!(table[&at(0, 1, 1)], None);
        assert_eq!(table[&at(1, 0, 0)], None);
        assert_eq!(params.probability[&at(1, 0, 0)], 0.5);
    }

    #[test]
    fn system_parameters_skip_absent_classes() {
        let portfolio = Portfolio::from_assets([
            Asset::from(Generator::new("gas", 100.0, 30.0)),
            Asset::from(Load::new("city")),
        ])
        .unwrap();
        let system = EnergySystem::deterministic(
            portfolio,
            Horizon::new(3),
            Scenario::deterministic().with_load("city", vec![10.0, 20.0, 30.0]),
        )
        .unwrap();
        let params = EnergySystemParameters::from_system(&system).unwrap();
        assert!(params.generators().is_ok());
        assert_eq!(
            params.batteries().unwrap_err(),
            ModelError::MissingAssetClass(Dimension::Battery)
        );
        assert!(params.market_price().is_err());
        assert_eq!(params.load().unwrap().len(), 3);
        assert!(!params.coords.has(Dimension::Market));
    }
}
