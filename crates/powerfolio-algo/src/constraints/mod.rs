//! Constraint generators.
//!
//! Each generator is a function of a read-only [`ModelView`] returning named
//! [`Constraint`] families. A family is a list of rows, one per index point it
//! applies to; rows that would reference a time step outside the horizon are
//! not generated. A generator asked about an asset class the portfolio lacks
//! returns an empty list.

mod battery;
mod generator;
mod market;
mod scenario;

pub use battery::battery_constraints;
pub use generator::{generator_constraints, MIN_OUTPUT_FRACTION};
pub use market::market_constraints;
pub use scenario::scenario_constraints;

use crate::expr::LinearRelation;
use crate::variables::{ModelVariables, Variable, VariableHandle, VariableRegistry};
use powerfolio_core::{Coordinates, Dimension, EnergySystemParameters, ModelResult, Point, Shape};

/// One instance of a constraint family.
#[derive(Debug, Clone)]
pub struct Row {
    pub point: Point,
    pub relation: LinearRelation,
}

/// A named family of linear relations over a shared index.
#[derive(Debug, Clone)]
pub struct Constraint {
    name: String,
    dims: Vec<Dimension>,
    rows: Vec<Row>,
}

impl Constraint {
    pub fn new(name: impl Into<String>, dims: &[Dimension]) -> Self {
        Self {
            name: name.into(),
            dims: dims.to_vec(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, point: Point, relation: LinearRelation) {
        self.rows.push(Row { point, relation });
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dims(&self) -> &[Dimension] {
        &self.dims
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Row at `point`, if the family has one there.
    pub fn row_at(&self, point: &Point) -> Option<&Row> {
        self.rows.iter().find(|row| {
            self.dims
                .iter()
                .all(|d| row.point.get(*d) == point.get(*d))
        })
    }
}

/// Builds a family by evaluating `row` at every point of `shape`; `None` skips the point.
pub(crate) fn family(
    name: &str,
    shape: &Shape,
    mut row: impl FnMut(&Point) -> Option<LinearRelation>,
) -> Constraint {
    let mut constraint = Constraint::new(name, shape.dims());
    for point in shape.points() {
        if let Some(relation) = row(&point) {
            constraint.push(point, relation);
        }
    }
    constraint
}

/// Everything a generator may read while the model is being assembled.
#[derive(Clone, Copy)]
pub struct ModelView<'a> {
    pub coords: &'a Coordinates,
    pub params: &'a EnergySystemParameters,
    pub registry: &'a VariableRegistry,
    pub vars: &'a ModelVariables,
}

impl<'a> ModelView<'a> {
    pub fn var(&self, handle: VariableHandle) -> &'a Variable {
        &self.registry[handle]
    }

    /// (scenario, time, asset) shape for one asset class.
    pub fn asset_shape(&self, asset: Dimension) -> ModelResult<Shape> {
        self.coords
            .shape(&crate::variables::asset_dims(asset))
    }

    pub fn last_time(&self) -> usize {
        self.coords.len(Dimension::Time).saturating_sub(1)
    }
}

pub(crate) fn time_of(point: &Point) -> usize {
    point.position(Dimension::Time)
}
