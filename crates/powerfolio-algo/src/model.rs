//! The assembled MILP and the one-shot build that produces it.

use crate::constraints::{
    battery_constraints, generator_constraints, market_constraints, scenario_constraints,
    Constraint, ModelView,
};
use crate::objective::{build_objective, Objective, ObjectiveSense};
use crate::variables::{ModelVariables, Variable, VariableHandle, VariableRegistry};
use powerfolio_core::{
    Coordinates, Dimension, EnergySystem, EnergySystemParameters, ModelError, ModelResult,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

/// Variables, constraints and objective of one build. Immutable once built.
#[derive(Debug, Clone)]
pub struct AlgebraicModel {
    params: EnergySystemParameters,
    registry: VariableRegistry,
    vars: ModelVariables,
    constraints: Vec<Constraint>,
    constraint_names: HashMap<String, usize>,
    objective: Objective,
}

impl AlgebraicModel {
    /// Appends a family. Empty families are dropped; a repeated name is an error.
    fn attach(&mut self, constraint: Constraint) -> ModelResult<()> {
        if constraint.is_empty() {
            debug!(constraint = constraint.name(), "skipping empty constraint family");
            return Ok(());
        }
        if self.constraint_names.contains_key(constraint.name()) {
            return Err(ModelError::DuplicateConstraint(constraint.name().to_string()));
        }
        debug!(
            constraint = constraint.name(),
            rows = constraint.len(),
            "attached constraint"
        );
        self.constraint_names
            .insert(constraint.name().to_string(), self.constraints.len());
        self.constraints.push(constraint);
        Ok(())
    }

    pub fn coords(&self) -> &Coordinates {
        &self.params.coords
    }

    pub fn params(&self) -> &EnergySystemParameters {
        &self.params
    }

    pub fn registry(&self) -> &VariableRegistry {
        &self.registry
    }

    pub fn variables(&self) -> &ModelVariables {
        &self.vars
    }

    pub fn variable(&self, handle: VariableHandle) -> &Variable {
        &self.registry[handle]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraint(&self, name: &str) -> Option<&Constraint> {
        self.constraint_names
            .get(name)
            .map(|i| &self.constraints[*i])
    }

    pub fn objective(&self) -> &Objective {
        &self.objective
    }

    pub fn num_columns(&self) -> usize {
        self.registry.num_columns()
    }

    pub fn num_rows(&self) -> usize {
        self.constraints.iter().map(Constraint::len).sum()
    }

    pub fn generator_power(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.generators()?.power))
    }

    pub fn generator_status(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.generators()?.status))
    }

    pub fn generator_startup(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.generators()?.startup))
    }

    pub fn generator_shutdown(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.generators()?.shutdown))
    }

    pub fn battery_power_in(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.batteries()?.power_in))
    }

    pub fn battery_power_out(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.batteries()?.power_out))
    }

    pub fn battery_net_power(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.batteries()?.net_power))
    }

    pub fn battery_soc(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.batteries()?.soc))
    }

    pub fn battery_charge_mode(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.batteries()?.charge_mode))
    }

    pub fn market_sell_volume(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.markets()?.sell_volume))
    }

    pub fn market_buy_volume(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.markets()?.buy_volume))
    }

    pub fn market_trade_mode(&self) -> ModelResult<&Variable> {
        Ok(self.variable(self.vars.markets()?.trade_mode))
    }

    /// Rows broken by more than `tolerance` under `values`.
    pub fn violations(&self, values: &[f64], tolerance: f64) -> Vec<Violation> {
        let coords = self.coords();
        self.constraints
            .iter()
            .flat_map(|c| c.rows().iter().map(move |row| (c, row)))
            .filter_map(|(c, row)| {
                let amount = row.relation.violation(values);
                (amount > tolerance).then(|| Violation {
                    constraint: c.name().to_string(),
                    index: coords.describe(c.dims(), &row.point),
                    amount,
                })
            })
            .collect()
    }

    pub fn summary(&self) -> ModelSummary {
        ModelSummary {
            dimensions: Dimension::ALL
                .iter()
                .filter_map(|d| self.coords().get(*d).map(|i| (d.as_str(), i.len())))
                .collect(),
            variables: self
                .registry
                .iter()
                .map(|v| VariableSummary {
                    name: v.name().to_string(),
                    dims: v.dims().iter().map(|d| d.as_str()).collect(),
                    columns: v.len(),
                    bound: v.bound().as_str(),
                })
                .collect(),
            constraints: self
                .constraints
                .iter()
                .map(|c| ConstraintSummary {
                    name: c.name().to_string(),
                    rows: c.len(),
                })
                .collect(),
            objective_sense: self.objective().sense,
            objective_components: self
                .objective()
                .components
                .iter()
                .map(|c| c.name)
                .collect(),
            columns: self.num_columns(),
            rows: self.num_rows(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub constraint: String,
    pub index: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct VariableSummary {
    pub name: String,
    pub dims: Vec<&'static str>,
    pub columns: usize,
    pub bound: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct ConstraintSummary {
    pub name: String,
    pub rows: usize,
}

/// Sizes of a built model, for inspection and reporting.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub dimensions: BTreeMap<&'static str, usize>,
    pub variables: Vec<VariableSummary>,
    pub constraints: Vec<ConstraintSummary>,
    pub objective_sense: ObjectiveSense,
    pub objective_components: Vec<&'static str>,
    pub columns: usize,
    pub rows: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildState {
    Unbuilt,
    Built,
}

/// Runs the build sequence exactly once.
///
/// Order: variables, generator, battery and market constraints, then the
/// scenario coupling constraints (which read every earlier family), then the
/// objective.
#[derive(Debug)]
pub struct ModelBuilder {
    params: Option<EnergySystemParameters>,
    state: BuildState,
}

impl ModelBuilder {
    pub fn new(params: EnergySystemParameters) -> Self {
        Self {
            params: Some(params),
            state: BuildState::Unbuilt,
        }
    }

    pub fn from_system(system: &EnergySystem) -> ModelResult<Self> {
        Ok(Self::new(EnergySystemParameters::from_system(system)?))
    }

    pub fn state(&self) -> BuildState {
        self.state
    }

    pub fn build(&mut self) -> ModelResult<AlgebraicModel> {
        if self.state == BuildState::Built {
            return Err(ModelError::AlreadyBuilt);
        }
        self.state = BuildState::Built;
        let params = self.params.take().ok_or(ModelError::AlreadyBuilt)?;

        let mut registry = VariableRegistry::new();
        let vars = ModelVariables::declare(&mut registry, &params.coords)?;

        let (families, objective) = {
            let view = ModelView {
                coords: &params.coords,
                params: &params,
                registry: &registry,
                vars: &vars,
            };
            let mut families = generator_constraints(&view)?;
            families.extend(battery_constraints(&view)?);
            families.extend(market_constraints(&view)?);
            families.extend(scenario_constraints(&view)?);
            (families, build_objective(&view)?)
        };

        let mut model = AlgebraicModel {
            params,
            registry,
            vars,
            constraints: Vec::new(),
            constraint_names: HashMap::new(),
            objective,
        };
        for constraint in families {
            model.attach(constraint)?;
        }

        info!(
            variables = model.registry.len(),
            columns = model.num_columns(),
            constraints = model.constraints.len(),
            rows = model.num_rows(),
            "model built"
        );
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::Constraint;
    use powerfolio_core::{Asset, Generator, Horizon, Load, Portfolio, Scenario};

    fn system() -> EnergySystem {
        let portfolio = Portfolio::from_assets([
            Asset::from(Generator::new("g", 100.0, 10.0)),
            Asset::from(Load::new("l")),
        ])
        .unwrap();
        EnergySystem::deterministic(
            portfolio,
            Horizon::new(3),
            Scenario::deterministic().with_load("l", vec![10.0, 20.0, 30.0]),
        )
        .unwrap()
    }

    #[test]
    fn build_twice_fails() {
        let mut builder = ModelBuilder::from_system(&system()).unwrap();
        assert_eq!(builder.state(), BuildState::Unbuilt);
        let model = builder.build().unwrap();
        assert_eq!(builder.state(), BuildState::Built);
        assert!(model.num_rows() > 0);
        assert_eq!(builder.build().unwrap_err(), ModelError::AlreadyBuilt);
    }

    #[test]
    fn duplicate_constraint_names_rejected() {
        let mut model = ModelBuilder::from_system(&system()).unwrap().build().unwrap();
        let again = model.constraint("power_balance").unwrap().clone();
        assert_eq!(
            model.attach(again).unwrap_err(),
            ModelError::DuplicateConstraint("power_balance".into())
        );
        assert!(model.attach(Constraint::new("empty", &[])).is_ok());
        assert!(model.constraint("empty").is_none());
    }

    #[test]
    fn accessors_report_missing_classes() {
        let model = ModelBuilder::from_system(&system()).unwrap().build().unwrap();
        assert_eq!(model.generator_power().unwrap().len(), 3);
        assert_eq!(
            model.battery_soc().unwrap_err(),
            ModelError::MissingAssetClass(Dimension::Battery)
        );
        assert!(model.market_sell_volume().is_err());
    }

    #[test]
    fn summary_lists_present_families() {
        let model = ModelBuilder::from_system(&system()).unwrap().build().unwrap();
        let summary = model.summary();
        assert_eq!(summary.dimensions["time"], 3);
        assert!(!summary.dimensions.contains_key("battery"));
        assert_eq!(summary.variables.len(), 4);
        assert_eq!(summary.objective_components, vec!["generation_cost"]);
        assert!(summary.constraints.iter().any(|c| c.name == "power_balance"));
        assert!(!summary
            .constraints
            .iter()
            .any(|c| c.name == "available_capacity"));
    }
}
