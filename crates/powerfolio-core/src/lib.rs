//! # powerfolio-core: portfolio data model
//!
//! Asset records, scenarios and the coordinate system every model array is
//! aligned to.
//!
//! ## Core Data Structures
//!
//! - [`Dimension`], [`Index`], [`Coordinates`] - named axes and their labels
//! - [`Asset`], [`Portfolio`] - generators, batteries, loads and markets
//! - [`Scenario`], [`EnergySystem`] - validated system over a [`Horizon`]
//! - [`ParameterTable`], [`EnergySystemParameters`] - read-only arrays for one build
//!
//! ```rust
//! use powerfolio_core::*;
//!
//! let portfolio = Portfolio::from_assets([
//!     Asset::from(Generator::new("gas", 200.0, 30.0)),
//!     Asset::from(Load::new("city")),
//! ])
//! .unwrap();
//! let scenario = Scenario::deterministic().with_load("city", vec![50.0, 100.0, 150.0]);
//! let system = EnergySystem::deterministic(portfolio, Horizon::new(3), scenario).unwrap();
//! let params = EnergySystemParameters::from_system(&system).unwrap();
//! assert_eq!(params.coords.len(Dimension::Time), 3);
//! ```

pub mod assets;
pub mod dimension;
pub mod error;
pub mod parameters;
pub mod scenario;
pub mod system;

pub use assets::{Asset, Battery, Generator, Load, Market, Portfolio, TradeDirection};
pub use dimension::{Coordinates, Dimension, Index, Point, Shape};
pub use error::{ModelError, ModelResult};
pub use parameters::{
    BatteryParameters, EnergySystemParameters, GeneratorParameters, MarketParameters,
    ParameterTable, ScenarioParameters,
};
pub use scenario::{ProfileKind, Scenario, DETERMINISTIC_SCENARIO};
pub use system::{EnergySystem, Horizon, PROBABILITY_TOLERANCE};
