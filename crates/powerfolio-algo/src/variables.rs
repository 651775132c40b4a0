//! Variable registry: named decision grids laid out as contiguous column blocks.
//!
//! A [`Variable`] owns the columns `first_column .. first_column + shape.len()`
//! and maps every cell of its shape to one [`VarId`]. Time shifts and trailing
//! windows are index arithmetic on the Time position of a [`Point`].

use crate::expr::VarId;
use powerfolio_core::{Coordinates, Dimension, ModelError, ModelResult, Point, Shape};
use serde::Serialize;
use std::collections::HashMap;
use std::ops;
use tracing::debug;

/// Domain of a variable's cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundPolicy {
    NonNegative,
    Unbounded,
    /// Integral 0/1. The lower bound stays unset so it never fights the
    /// solver's binary domain.
    Binary,
}

impl BoundPolicy {
    pub fn lower_bound(&self) -> f64 {
        match self {
            BoundPolicy::NonNegative => 0.0,
            BoundPolicy::Unbounded | BoundPolicy::Binary => f64::NEG_INFINITY,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, BoundPolicy::Binary)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BoundPolicy::NonNegative => "non_negative",
            BoundPolicy::Unbounded => "unbounded",
            BoundPolicy::Binary => "binary",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    name: String,
    shape: Shape,
    bound: BoundPolicy,
    first_column: usize,
}

impl Variable {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn dims(&self) -> &[Dimension] {
        self.shape.dims()
    }

    pub fn bound(&self) -> BoundPolicy {
        self.bound
    }

    pub fn len(&self) -> usize {
        self.shape.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shape.is_empty()
    }

    pub fn columns(&self) -> ops::Range<usize> {
        self.first_column..self.first_column + self.shape.len()
    }

    pub fn get(&self, point: &Point) -> Option<VarId> {
        self.shape
            .offset(point)
            .map(|offset| VarId(self.first_column + offset))
    }

    /// Column of the cell at `point`.
    ///
    /// # Panics
    ///
    /// When `point` does not address a cell of this variable. Constraint
    /// generators iterate points of a shape that covers the variable, so a
    /// miss is a programming error.
    pub fn at(&self, point: &Point) -> VarId {
        match self.get(point) {
            Some(id) => id,
            None => panic!("point {point:?} does not address variable '{}'", self.name),
        }
    }

    /// Column `offset` steps along Time from `point`, if inside the horizon.
    pub fn shifted(&self, point: &Point, offset: isize) -> Option<VarId> {
        let t = point.get(Dimension::Time)?;
        let shifted = t.checked_add_signed(offset)?;
        self.get(&point.with(Dimension::Time, shifted))
    }

    pub fn previous(&self, point: &Point) -> Option<VarId> {
        self.shifted(point, -1)
    }

    pub fn next(&self, point: &Point) -> Option<VarId> {
        self.shifted(point, 1)
    }

    /// Columns of the window of `len` steps ending at `point`, clamped at the
    /// start of the horizon.
    pub fn trailing_window(&self, point: &Point, len: usize) -> Vec<VarId> {
        let Some(t) = point.get(Dimension::Time) else {
            return Vec::new();
        };
        let start = (t + 1).saturating_sub(len);
        (start..=t)
            .filter_map(|k| self.get(&point.with(Dimension::Time, k)))
            .collect()
    }

    /// Every cell with its column, row-major.
    pub fn cells(&self) -> impl Iterator<Item = (Point, VarId)> + '_ {
        self.shape
            .points()
            .enumerate()
            .map(move |(offset, p)| (p, VarId(self.first_column + offset)))
    }

    fn contains(&self, var: VarId) -> bool {
        self.columns().contains(&var.0)
    }
}

/// Typed handle returned by [`VariableRegistry::declare`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableHandle(usize);

#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    variables: Vec<Variable>,
    by_name: HashMap<String, usize>,
    columns: usize,
}

impl VariableRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares `name` over `dims`; a repeated name fails with
    /// [`ModelError::DuplicateVariable`].
    pub fn declare(
        &mut self,
        name: &str,
        dims: &[Dimension],
        bound: BoundPolicy,
        coords: &Coordinates,
    ) -> ModelResult<VariableHandle> {
        if self.by_name.contains_key(name) {
            return Err(ModelError::DuplicateVariable(name.to_string()));
        }
        let shape = coords.shape(dims)?;
        let variable = Variable {
            name: name.to_string(),
            bound,
            first_column: self.columns,
            shape,
        };
        debug!(
            variable = name,
            cells = variable.len(),
            bound = bound.as_str(),
            "declared variable"
        );
        self.columns += variable.len();
        let handle = VariableHandle(self.variables.len());
        self.by_name.insert(name.to_string(), handle.0);
        self.variables.push(variable);
        Ok(handle)
    }

    pub fn by_name(&self, name: &str) -> Option<&Variable> {
        self.by_name.get(name).map(|i| &self.variables[*i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Total number of columns across all variables.
    pub fn num_columns(&self) -> usize {
        self.columns
    }

    /// Owning variable and cell of a column.
    pub fn locate(&self, var: VarId) -> Option<(&Variable, Point)> {
        let variable = self.variables.iter().find(|v| v.contains(var))?;
        let point = variable.shape.point_at(var.0 - variable.first_column);
        Some((variable, point))
    }

    /// `variable(label,label,...)` for a column.
    pub fn column_name(&self, var: VarId, coords: &Coordinates) -> String {
        match self.locate(var) {
            Some((variable, point)) => format!(
                "{}({})",
                variable.name,
                coords.describe(variable.dims(), &point)
            ),
            None => format!("x{}", var.0),
        }
    }
}

impl ops::Index<VariableHandle> for VariableRegistry {
    type Output = Variable;

    fn index(&self, handle: VariableHandle) -> &Variable {
        &self.variables[handle.0]
    }
}

/// Axes of every asset variable family.
pub fn asset_dims(asset: Dimension) -> [Dimension; 3] {
    [Dimension::Scenario, Dimension::Time, asset]
}

#[derive(Debug, Clone, Copy)]
pub struct GeneratorVariables {
    pub power: VariableHandle,
    pub status: VariableHandle,
    pub startup: VariableHandle,
    pub shutdown: VariableHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct BatteryVariables {
    pub power_in: VariableHandle,
    pub power_out: VariableHandle,
    pub net_power: VariableHandle,
    /// Fraction of capacity.
    pub soc: VariableHandle,
    pub charge_mode: VariableHandle,
}

#[derive(Debug, Clone, Copy)]
pub struct MarketVariables {
    pub sell_volume: VariableHandle,
    pub buy_volume: VariableHandle,
    pub trade_mode: VariableHandle,
}

/// Handles for the variable families of the asset classes actually present.
#[derive(Debug, Clone, Copy, Default)]
pub struct ModelVariables {
    pub generators: Option<GeneratorVariables>,
    pub batteries: Option<BatteryVariables>,
    pub markets: Option<MarketVariables>,
}

impl ModelVariables {
    /// Declares every family over (scenario, time, asset), skipping absent classes.
    pub fn declare(registry: &mut VariableRegistry, coords: &Coordinates) -> ModelResult<Self> {
        use BoundPolicy::*;
        let mut vars = ModelVariables::default();

        if coords.has(Dimension::Generator) {
            let dims = asset_dims(Dimension::Generator);
            vars.generators = Some(GeneratorVariables {
                power: registry.declare("generator_power", &dims, NonNegative, coords)?,
                status: registry.declare("generator_status", &dims, Binary, coords)?,
                startup: registry.declare("generator_startup", &dims, Binary, coords)?,
                shutdown: registry.declare("generator_shutdown", &dims, Binary, coords)?,
            });
        }
        if coords.has(Dimension::Battery) {
            let dims = asset_dims(Dimension::Battery);
            vars.batteries = Some(BatteryVariables {
                power_in: registry.declare("battery_power_in", &dims, NonNegative, coords)?,
                power_out: registry.declare("battery_power_out", &dims, NonNegative, coords)?,
                net_power: registry.declare("battery_net_power", &dims, Unbounded, coords)?,
                soc: registry.declare("battery_soc", &dims, NonNegative, coords)?,
                charge_mode: registry.declare("battery_charge_mode", &dims, Binary, coords)?,
            });
        }
        if coords.has(Dimension::Market) {
            let dims = asset_dims(Dimension::Market);
            vars.markets = Some(MarketVariables {
                sell_volume: registry.declare("market_sell_volume", &dims, NonNegative, coords)?,
                buy_volume: registry.declare("market_buy_volume", &dims, NonNegative, coords)?,
                trade_mode: registry.declare("market_trade_mode", &dims, Binary, coords)?,
            });
        }
        Ok(vars)
    }

    pub fn generators(&self) -> ModelResult<&GeneratorVariables> {
        self.generators
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Generator))
    }

    pub fn batteries(&self) -> ModelResult<&BatteryVariables> {
        self.batteries
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Battery))
    }

    pub fn markets(&self) -> ModelResult<&MarketVariables> {
        self.markets
            .as_ref()
            .ok_or(ModelError::MissingAssetClass(Dimension::Market))
    }
}
