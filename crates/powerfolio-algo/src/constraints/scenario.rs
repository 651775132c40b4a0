//! Constraints that tie asset classes together or couple scenarios.

use super::{family, Constraint, ModelView};
use crate::expr::LinearExpr;
use powerfolio_core::{Dimension, ModelResult, Point};
use tracing::debug;

pub fn scenario_constraints(view: &ModelView<'_>) -> ModelResult<Vec<Constraint>> {
    let mut out = vec![power_balance(view)?];
    if let Some(capacity) = available_capacity(view)? {
        out.push(capacity);
    }
    out.extend(non_anticipativity(view)?);
    debug!(
        families = out.len(),
        rows = out.iter().map(Constraint::len).sum::<usize>(),
        "scenario constraints"
    );
    Ok(out)
}

/// Supply equals demand in every (scenario, time). Absent classes add no terms.
fn power_balance(view: &ModelView<'_>) -> ModelResult<Constraint> {
    let shape = view.coords.shape(&[Dimension::Scenario, Dimension::Time])?;
    let coords = view.coords;

    let over = |dim: Dimension, p: &Point| -> Vec<Point> {
        (0..coords.len(dim)).map(|i| p.with(dim, i)).collect()
    };

    Ok(family("power_balance", &shape, |p| {
        let mut supply = LinearExpr::new();
        if let Some(vars) = view.vars.generators.as_ref() {
            let power = view.var(vars.power);
            for cell in over(Dimension::Generator, p) {
                supply += power.at(&cell);
            }
        }
        if let Some(vars) = view.vars.batteries.as_ref() {
            // net power is charging minus discharging
            let net = view.var(vars.net_power);
            for cell in over(Dimension::Battery, p) {
                supply -= net.at(&cell);
            }
        }
        if let Some(vars) = view.vars.markets.as_ref() {
            let (buy, sell) = (view.var(vars.buy_volume), view.var(vars.sell_volume));
            for cell in over(Dimension::Market, p) {
                supply += buy.at(&cell) - sell.at(&cell);
            }
        }
        let demand: f64 = match view.params.scenarios.load.as_ref() {
            Some(load) => over(Dimension::Load, p).iter().map(|cell| load[cell]).sum(),
            None => 0.0,
        };
        Some(supply.eq_to(demand))
    }))
}

/// `power <= profile` wherever a scenario caps a generator explicitly.
fn available_capacity(view: &ModelView<'_>) -> ModelResult<Option<Constraint>> {
    let (Some(vars), Some(profile)) = (
        view.vars.generators.as_ref(),
        view.params.scenarios.available_capacity.as_ref(),
    ) else {
        return Ok(None);
    };
    let shape = view.asset_shape(Dimension::Generator)?;
    let power = view.var(vars.power);
    let constraint = family("available_capacity", &shape, |p| {
        let cap = profile[p]?;
        Some(LinearExpr::from(power.at(p)).le(cap))
    });
    Ok((!constraint.is_empty()).then_some(constraint))
}

/// Every market variable of a stage-fixed market equals its scenario-0 value.
fn non_anticipativity(view: &ModelView<'_>) -> ModelResult<Vec<Constraint>> {
    let Some(vars) = view.vars.markets.as_ref() else {
        return Ok(Vec::new());
    };
    let params = view.params.markets()?;
    if view.coords.len(Dimension::Scenario) < 2 || !params.any_stage_fixed() {
        return Ok(Vec::new());
    }
    let shape = view.asset_shape(Dimension::Market)?;
    let out = [vars.sell_volume, vars.buy_volume, vars.trade_mode]
        .into_iter()
        .map(|handle| {
            let var = view.var(handle);
            family(&format!("non_anticipativity_{}", var.name()), &shape, |p| {
                if p.position(Dimension::Scenario) == 0 || !params.stage_fixed[p] {
                    return None;
                }
                let first = var.at(&p.with(Dimension::Scenario, 0));
                Some((var.at(p) - first).eq_to(0.0))
            })
        })
        .collect();
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::tests_support::Fixture;
    use powerfolio_core::{
        Asset, EnergySystem, Generator, Horizon, Load, Market, Portfolio, Scenario,
    };

    fn st(s: usize, t: usize) -> Point {
        Point::new().with(Dimension::Scenario, s).with(Dimension::Time, t)
    }

    #[test]
    fn balance_has_zero_coefficients_for_absent_classes() {
        let portfolio = Portfolio::from_assets([
            Asset::from(Generator::new("g", 100.0, 10.0)),
            Asset::from(Load::new("l")),
        ])
        .unwrap();
        let system = EnergySystem::deterministic(
            portfolio,
            Horizon::new(2),
            Scenario::deterministic().with_load("l", vec![30.0, 40.0]),
        )
        .unwrap();
        let fixture = Fixture::from_system(&system);
        let constraints = scenario_constraints(&fixture.view()).unwrap();
        let balance = &constraints[0];
        assert_eq!(balance.name(), "power_balance");
        assert_eq!(balance.len(), 2);

        let row = balance.row_at(&st(0, 1)).unwrap();
        assert_eq!(row.relation.rhs, 40.0);
        assert_eq!(row.relation.expr.terms().len(), 1);
        let power = &fixture.registry[fixture.vars.generators().unwrap().power];
        let gen_cell = st(0, 1).with(Dimension::Generator, 0);
        assert_eq!(row.relation.expr.coefficient(power.at(&gen_cell)), 1.0);
        // every column not owned by generator power has coefficient zero
        for column in 0..fixture.registry.num_columns() {
            let id = crate::expr::VarId(column);
            if id != power.at(&gen_cell) {
                assert_eq!(row.relation.expr.coefficient(id), 0.0);
            }
        }
    }

    #[test]
    fn capacity_rows_only_where_profiled() {
        let portfolio = Portfolio::from_assets([
            Asset::from(Generator::new("wind", 100.0, 1.0)),
            Asset::from(Generator::new("gas", 100.0, 50.0)),
        ])
        .unwrap();
        let system = EnergySystem::deterministic(
            portfolio,
            Horizon::new(3),
            Scenario::deterministic().with_available_capacity("wind", vec![10.0, 20.0, 30.0]),
        )
        .unwrap();
        let fixture = Fixture::from_system(&system);
        let constraints = scenario_constraints(&fixture.view()).unwrap();
        let capacity = constraints
            .iter()
            .find(|c| c.name() == "available_capacity")
            .unwrap();
        assert_eq!(capacity.len(), 3);
        assert!(capacity
            .rows()
            .iter()
            .all(|r| r.point.get(Dimension::Generator) == Some(0)));
        assert_eq!(capacity.rows()[2].relation.rhs, 30.0);
    }

    #[test]
    fn non_anticipativity_only_for_stage_fixed_markets() {
        let portfolio = Portfolio::from_assets([
            Asset::from(Market::new("day_ahead", 50.0).stage_fixed(true)),
            Asset::from(Market::new("intraday", 50.0)),
        ])
        .unwrap();
        let scenario = |name: &str, p: f64| {
            Scenario::new(name, p)
                .with_market_price("day_ahead", vec![40.0, 45.0])
                .with_market_price("intraday", vec![50.0, 55.0])
        };
        let system = EnergySystem::new(
            portfolio,
            Horizon::new(2),
            vec![scenario("a", 0.5), scenario("b", 0.3), scenario("c", 0.2)],
        )
        .unwrap();
        let fixture = Fixture::from_system(&system);
        let constraints = scenario_constraints(&fixture.view()).unwrap();
        let coupling: Vec<_> = constraints
            .iter()
            .filter(|c| c.name().starts_with("non_anticipativity_"))
            .collect();
        assert_eq!(coupling.len(), 3);
        for c in &coupling {
            // scenarios b and c, two steps, day_ahead only
            assert_eq!(c.len(), 4);
            assert!(c
                .rows()
                .iter()
                .all(|r| r.point.get(Dimension::Market) == Some(0)
                    && r.point.get(Dimension::Scenario) != Some(0)));
        }
    }

    #[test]
    fn single_scenario_has_no_coupling() {
        let fixture = Fixture::new(vec![Market::new("m", 10.0).stage_fixed(true).into()], 2);
        let constraints = scenario_constraints(&fixture.view()).unwrap();
        assert_eq!(constraints.len(), 1);
    }
}
