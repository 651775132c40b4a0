//! Expected profit: market revenue minus generation cost, weighted by
//! scenario probability.

use crate::constraints::ModelView;
use crate::expr::LinearExpr;
use powerfolio_core::{Dimension, ModelError, ModelResult};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveSense {
    Maximize,
    Minimize,
}

impl fmt::Display for ObjectiveSense {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectiveSense::Maximize => f.write_str("maximize"),
            ObjectiveSense::Minimize => f.write_str("minimize"),
        }
    }
}

/// A named additive part of the objective, already signed.
#[derive(Debug, Clone)]
pub struct ObjectiveComponent {
    pub name: &'static str,
    pub expression: LinearExpr,
}

#[derive(Debug, Clone)]
pub struct Objective {
    pub sense: ObjectiveSense,
    pub expression: LinearExpr,
    pub components: Vec<ObjectiveComponent>,
}

impl Objective {
    pub fn component(&self, name: &str) -> Option<&ObjectiveComponent> {
        self.components.iter().find(|c| c.name == name)
    }
}

/// Σ (sell - buy) · price · probability over (scenario, time, market).
fn market_revenue(view: &ModelView<'_>) -> ModelResult<Option<LinearExpr>> {
    let (Some(vars), Some(price)) = (
        view.vars.markets.as_ref(),
        view.params.scenarios.market_price.as_ref(),
    ) else {
        return Ok(None);
    };
    let probability = &view.params.scenarios.probability;
    let sell = view.var(vars.sell_volume);
    let buy = view.var(vars.buy_volume);
    let mut revenue = LinearExpr::new();
    for p in view.asset_shape(Dimension::Market)?.points() {
        let weight = price[&p] * probability[&p];
        revenue += (sell.at(&p) - buy.at(&p)) * weight;
    }
    Ok(Some(revenue))
}

/// Σ (power · variable cost + startup · startup cost + shutdown · shutdown
/// cost) · probability over (scenario, time, generator).
fn generation_cost(view: &ModelView<'_>) -> ModelResult<Option<LinearExpr>> {
    let Some(vars) = view.vars.generators.as_ref() else {
        return Ok(None);
    };
    let params = view.params.generators()?;
    let probability = &view.params.scenarios.probability;
    let power = view.var(vars.power);
    let startup = view.var(vars.startup);
    let shutdown = view.var(vars.shutdown);
    let mut cost = LinearExpr::new();
    for p in view.asset_shape(Dimension::Generator)?.points() {
        let weight = probability[&p];
        cost.add_term(power.at(&p), params.variable_cost[&p] * weight);
        if params.startup_cost[&p] != 0.0 {
            cost.add_term(startup.at(&p), params.startup_cost[&p] * weight);
        }
        if params.shutdown_cost[&p] != 0.0 {
            cost.add_term(shutdown.at(&p), params.shutdown_cost[&p] * weight);
        }
    }
    Ok(Some(cost))
}

/// `profit = revenue - cost`; fails with [`ModelError::EmptyObjective`] when
/// neither part exists.
pub fn build_objective(view: &ModelView<'_>) -> ModelResult<Objective> {
    let mut components = Vec::new();
    if let Some(revenue) = market_revenue(view)? {
        components.push(ObjectiveComponent {
            name: "market_revenue",
            expression: revenue,
        });
    }
    if let Some(cost) = generation_cost(view)? {
        components.push(ObjectiveComponent {
            name: "generation_cost",
            expression: -cost,
        });
    }
    if components.is_empty() {
        return Err(ModelError::EmptyObjective);
    }
    let expression = components
        .iter()
        .map(|c| c.expression.clone())
        .sum::<LinearExpr>()
        .normalized();
    Ok(Objective {
        sense: ObjectiveSense::Maximize,
        expression,
        components,
    })
}
