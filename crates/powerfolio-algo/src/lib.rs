//! # powerfolio-algo: portfolio MILP assembly and solving
//!
//! Turns a validated [`EnergySystem`] into an [`AlgebraicModel`] (named
//! variable grids, constraint families and an expected-profit objective),
//! solves it through good_lp, and maps the solution back onto per-asset
//! tables.
//!
//! ## Pipeline
//!
//! 1. [`ModelBuilder::build`] declares variables over (scenario, time, asset)
//!    and attaches generator, battery, market and scenario constraints.
//! 2. A [`MilpSolver`] (usually [`GoodLpSolver`]) produces a [`SolveOutcome`].
//! 3. [`OptimizationResults`] extracts [`ResultTable`]s, refusing when the
//!    solve did not terminate optimally.
//!
//! ```no_run
//! use powerfolio_algo::{optimize, GoodLpSolver};
//! use powerfolio_core::*;
//!
//! let portfolio = Portfolio::from_assets([
//!     Asset::from(Generator::new("gas", 200.0, 30.0)),
//!     Asset::from(Load::new("city")),
//! ])
//! .unwrap();
//! let scenario = Scenario::deterministic().with_load("city", vec![50.0, 100.0]);
//! let system = EnergySystem::deterministic(portfolio, Horizon::new(2), scenario).unwrap();
//!
//! let solved = optimize(&system, &GoodLpSolver::default()).unwrap();
//! let power = solved.results().generators().unwrap().power;
//! println!("{:?}", power.series(0, "gas"));
//! ```

pub mod constraints;
pub mod expr;
pub mod lp_format;
pub mod model;
pub mod objective;
pub mod results;
pub mod solve;
pub mod variables;

pub use constraints::{Constraint, Row, MIN_OUTPUT_FRACTION};
pub use expr::{LinearExpr, LinearRelation, Sense, VarId};
pub use lp_format::{write_lp, write_lp_file};
pub use model::{
    AlgebraicModel, BuildState, ConstraintSummary, ModelBuilder, ModelSummary, VariableSummary,
    Violation,
};
pub use objective::{Objective, ObjectiveComponent, ObjectiveSense};
pub use results::{
    BatteryResults, GeneratorResults, MarketResults, OptimizationResults, ResultSet, ResultTable,
    SolutionRecord,
};
pub use solve::{
    GoodLpSolver, MilpBackend, MilpSolver, SolveOutcome, SolverStatus, TerminationCondition,
};
pub use variables::{BoundPolicy, ModelVariables, Variable, VariableHandle, VariableRegistry};

use powerfolio_core::{EnergySystem, ModelResult};

/// A built model together with the outcome of solving it.
#[derive(Debug, Clone)]
pub struct SolvedModel {
    pub model: AlgebraicModel,
    pub outcome: SolveOutcome,
}

impl SolvedModel {
    pub fn results(&self) -> OptimizationResults<'_> {
        OptimizationResults::new(&self.model, &self.outcome)
    }
}

/// Builds the model for `system` and solves it once.
///
/// Build errors are returned; a solve that ends without an optimum is not an
/// error here and only surfaces when results are requested.
pub fn optimize(system: &EnergySystem, solver: &dyn MilpSolver) -> ModelResult<SolvedModel> {
    let model = ModelBuilder::from_system(system)?.build()?;
    let outcome = solver.solve(&model);
    Ok(SolvedModel { model, outcome })
}
