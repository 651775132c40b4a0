//! Solver adapter: hands an [`AlgebraicModel`] to a good_lp backend and
//! reads back one value per column.

use crate::expr::{LinearExpr, Sense};
use crate::model::AlgebraicModel;
use crate::objective::ObjectiveSense;
use crate::variables::BoundPolicy;
use good_lp::solvers::microlp::microlp;
#[cfg(feature = "solver-highs")]
use good_lp::solvers::highs::highs;
use good_lp::solvers::{ResolutionError, Solution, Solver, SolverModel};
use good_lp::{constraint, variable, Expression, ProblemVariables, VariableDefinition};
use powerfolio_core::ModelError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tracing::{info, warn};
use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolverStatus {
    Ok,
    Warning,
    Error,
}

impl fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SolverStatus::Ok => "ok",
            SolverStatus::Warning => "warning",
            SolverStatus::Error => "error",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminationCondition {
    Optimal,
    Infeasible,
    Unbounded,
    Error,
}

impl fmt::Display for TerminationCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TerminationCondition::Optimal => "optimal",
            TerminationCondition::Infeasible => "infeasible",
            TerminationCondition::Unbounded => "unbounded",
            TerminationCondition::Error => "error",
        })
    }
}

/// What a solver run produced. `values` is indexed by column and is empty
/// unless the run succeeded.
#[derive(Debug, Clone, Serialize)]
pub struct SolveOutcome {
    pub solver: &'static str,
    pub status: SolverStatus,
    pub termination: TerminationCondition,
    pub message: Option<String>,
    pub objective_value: Option<f64>,
    #[serde(skip)]
    pub values: Vec<f64>,
    pub solve_time: Duration,
}

impl SolveOutcome {
    /// Status `ok` with an optimal termination.
    pub fn is_success(&self) -> bool {
        self.status == SolverStatus::Ok && self.termination == TerminationCondition::Optimal
    }

    pub fn value(&self, column: usize) -> Option<f64> {
        self.values.get(column).copied()
    }
}

/// Anything that can solve a built model.
pub trait MilpSolver {
    fn name(&self) -> &'static str;

    fn solve(&self, model: &AlgebraicModel) -> SolveOutcome;
}

/// MILP backends compiled into this build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MilpBackend {
    /// Pure-Rust branch and bound.
    #[default]
    Microlp,
    #[cfg(feature = "solver-highs")]
    Highs,
}

impl MilpBackend {
    pub fn available() -> &'static [&'static str] {
        AVAILABLE_MILP_SOLVERS
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MilpBackend::Microlp => "microlp",
            #[cfg(feature = "solver-highs")]
            MilpBackend::Highs => "highs",
        }
    }
}

impl fmt::Display for MilpBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const AVAILABLE_MILP_SOLVERS: &[&str] = &[
    "microlp",
    #[cfg(feature = "solver-highs")]
    "highs",
];

fn unknown_solver_error(label: &str) -> ModelError {
    ModelError::Solver(format!(
        "unknown milp solver '{}'; supported values: {}",
        label,
        MilpBackend::available().join(", ")
    ))
}

impl FromStr for MilpBackend {
    type Err = ModelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.to_ascii_lowercase();
        match normalized.as_str() {
            "microlp" => Ok(MilpBackend::Microlp),
            "highs" => {
                #[cfg(feature = "solver-highs")]
                {
                    Ok(MilpBackend::Highs)
                }
                #[cfg(not(feature = "solver-highs"))]
                {
                    Err(unknown_solver_error(&normalized))
                }
            }
            other => Err(unknown_solver_error(other)),
        }
    }
}

/// [`MilpSolver`] backed by good_lp.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoodLpSolver {
    backend: MilpBackend,
}

impl GoodLpSolver {
    pub fn new(backend: MilpBackend) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> MilpBackend {
        self.backend
    }
}

impl MilpSolver for GoodLpSolver {
    fn name(&self) -> &'static str {
        self.backend.as_str()
    }

    fn solve(&self, model: &AlgebraicModel) -> SolveOutcome {
        let start = Instant::now();
        info!(
            solver = self.name(),
            columns = model.num_columns(),
            rows = model.num_rows(),
            "solving model"
        );
        let result = match self.backend {
            MilpBackend::Microlp => run(model, microlp),
            #[cfg(feature = "solver-highs")]
            MilpBackend::Highs => run(model, highs),
        };
        let solve_time = start.elapsed();

        let outcome = match result {
            Ok(values) => SolveOutcome {
                solver: self.name(),
                status: SolverStatus::Ok,
                termination: TerminationCondition::Optimal,
                message: None,
                objective_value: Some(model.objective().expression.evaluate(&values)),
                values,
                solve_time,
            },
            Err(err) => {
                let (status, termination) = classify(&err);
                SolveOutcome {
                    solver: self.name(),
                    status,
                    termination,
                    message: Some(err.to_string()),
                    objective_value: None,
                    values: Vec::new(),
                    solve_time,
                }
            }
        };

        if outcome.is_success() {
            info!(
                solver = outcome.solver,
                objective = outcome.objective_value,
                elapsed_ms = solve_time.as_millis() as u64,
                "solve finished"
            );
        } else {
            warn!(
                solver = outcome.solver,
                status = %outcome.status,
                termination = %outcome.termination,
                message = outcome.message.as_deref().unwrap_or(""),
                "solve did not reach an optimum"
            );
        }
        outcome
    }
}

fn classify(err: &ResolutionError) -> (SolverStatus, TerminationCondition) {
    match err {
        ResolutionError::Infeasible => (SolverStatus::Warning, TerminationCondition::Infeasible),
        ResolutionError::Unbounded => (SolverStatus::Warning, TerminationCondition::Unbounded),
        _ => (SolverStatus::Error, TerminationCondition::Error),
    }
}

fn definition(bound: BoundPolicy) -> VariableDefinition {
    match bound {
        BoundPolicy::Binary => variable().binary(),
        BoundPolicy::NonNegative => variable().min(0.0),
        BoundPolicy::Unbounded => variable(),
    }
}

fn to_expression(expr: &LinearExpr, columns: &[good_lp::Variable]) -> Expression {
    let mut out = Expression::from(expr.constant());
    for (var, coefficient) in expr.terms() {
        out += *coefficient * columns[var.index()];
    }
    out
}

fn run<S>(model: &AlgebraicModel, solver: S) -> Result<Vec<f64>, ResolutionError>
where
    S: Solver,
    S::Model: SolverModel<Error = ResolutionError>,
{
    let mut vars = ProblemVariables::new();
    let mut columns = Vec::with_capacity(model.num_columns());
    for variable in model.registry().iter() {
        for _ in variable.columns() {
            columns.push(vars.add(definition(variable.bound())));
        }
    }

    let objective = to_expression(&model.objective().expression, &columns);
    let unsolved = match model.objective().sense {
        ObjectiveSense::Maximize => vars.maximise(objective),
        ObjectiveSense::Minimize => vars.minimise(objective),
    };
    let mut problem = unsolved.using(solver);

    for family in model.constraints() {
        for row in family.rows() {
            let lhs = to_expression(&row.relation.expr, &columns);
            let rhs = row.relation.rhs;
            let c = match row.relation.sense {
                Sense::Le => constraint!(lhs <= rhs),
                Sense::Ge => constraint!(lhs >= rhs),
                Sense::Eq => constraint!(lhs == rhs),
            };
            problem = problem.with(c);
        }
    }

    let solution = problem.solve()?;
    Ok(columns.iter().map(|c| solution.value(*c)).collect())
}
