//! Storage dynamics. SOC is a fraction of capacity; `charge_mode` forbids
//! charging and discharging in the same step.

use super::{family, time_of, Constraint, ModelView};
use crate::expr::LinearExpr;
use powerfolio_core::{Dimension, ModelResult, Point};
use tracing::debug;

pub fn battery_constraints(view: &ModelView<'_>) -> ModelResult<Vec<Constraint>> {
    let Some(vars) = view.vars.batteries.as_ref() else {
        return Ok(Vec::new());
    };
    let params = view.params.batteries()?;
    let shape = view.asset_shape(Dimension::Battery)?;
    let power_in = view.var(vars.power_in);
    let power_out = view.var(vars.power_out);
    let net_power = view.var(vars.net_power);
    let soc = view.var(vars.soc);
    let mode = view.var(vars.charge_mode);
    let last = view.last_time();

    // SOC change contributed by the flows of one step.
    let flows = |p: &Point| -> LinearExpr {
        let capacity = params.capacity[p];
        power_in.at(p) * (params.efficiency_charging[p] / capacity)
            - power_out.at(p) * (1.0 / (params.efficiency_discharging[p] * capacity))
    };

    let mut out = vec![
        family("battery_charge_limit", &shape, |p| {
            Some((power_in.at(p) - mode.at(p) * params.max_power[p]).le(0.0))
        }),
        family("battery_discharge_limit", &shape, |p| {
            Some((power_out.at(p) + mode.at(p) * params.max_power[p]).le(params.max_power[p]))
        }),
        family("battery_soc_dynamics", &shape, |p| {
            let prev = soc.previous(p)?;
            Some(LinearExpr::from(soc.at(p)).eq_to(flows(p) + prev))
        }),
        family("battery_soc_start", &shape, |p| {
            if time_of(p) != 0 {
                return None;
            }
            Some(LinearExpr::from(soc.at(p)).eq_to(flows(p) + params.soc_start[p]))
        }),
    ];

    let terminal = family("battery_soc_end", &shape, |p| {
        if time_of(p) != last {
            return None;
        }
        let target = params.soc_end[p]?;
        Some(LinearExpr::from(soc.at(p)).eq_to(target))
    });
    if !terminal.is_empty() {
        out.push(terminal);
    }

    out.push(family("battery_soc_min", &shape, |p| {
        Some(LinearExpr::from(soc.at(p)).ge(params.soc_min[p]))
    }));
    out.push(family("battery_soc_max", &shape, |p| {
        Some(LinearExpr::from(soc.at(p)).le(params.soc_max[p]))
    }));
    out.push(family("battery_net_power", &shape, |p| {
        Some(LinearExpr::from(net_power.at(p)).eq_to(power_in.at(p) - power_out.at(p)))
    }));

    debug!(
        families = out.len(),
        rows = out.iter().map(Constraint::len).sum::<usize>(),
        "battery constraints"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constraints::tests_support::Fixture;
    use powerfolio_core::Battery;

    fn at(t: usize) -> Point {
        Point::new()
            .with(Dimension::Scenario, 0)
            .with(Dimension::Time, t)
            .with(Dimension::Battery, 0)
    }

    fn find<'c>(constraints: &'c [Constraint], name: &str) -> Option<&'c Constraint> {
        constraints.iter().find(|c| c.name() == name)
    }

    #[test]
    fn soc_recursion_uses_efficiencies() {
        let battery = Battery::new("b", 200.0, 50.0, 0.5).with_efficiencies(0.8, 0.5);
        let fixture = Fixture::new(vec![battery.into()], 3);
        let constraints = battery_constraints(&fixture.view()).unwrap();
        let vars = fixture.vars.batteries().unwrap();
        let soc = &fixture.registry[vars.soc];
        let power_in = &fixture.registry[vars.power_in];
        let power_out = &fixture.registry[vars.power_out];

        let dynamics = find(&constraints, "battery_soc_dynamics").unwrap();
        assert_eq!(dynamics.len(), 2);
        let row = dynamics.row_at(&at(2)).unwrap();
        // soc[2] - soc[1] - 0.8/200 in[2] + 1/(0.5*200) out[2] = 0
        let e = &row.relation.expr;
        assert_eq!(e.coefficient(soc.at(&at(2))), 1.0);
        assert_eq!(e.coefficient(soc.at(&at(1))), -1.0);
        assert!((e.coefficient(power_in.at(&at(2))) + 0.004).abs() < 1e-12);
        assert!((e.coefficient(power_out.at(&at(2))) - 0.01).abs() < 1e-12);
        assert_eq!(row.relation.rhs, 0.0);

        let start = find(&constraints, "battery_soc_start").unwrap();
        assert_eq!(start.len(), 1);
        assert_eq!(start.rows()[0].relation.rhs, 0.5);
    }

    #[test]
    fn terminal_soc_only_when_requested() {
        let open = Fixture::new(vec![Battery::new("b", 100.0, 50.0, 0.0).into()], 3);
        let constraints = battery_constraints(&open.view()).unwrap();
        assert!(find(&constraints, "battery_soc_end").is_none());

        let closed = Fixture::new(
            vec![Battery::new("b", 100.0, 50.0, 0.0).with_soc_end(0.4).into()],
            3,
        );
        let constraints = battery_constraints(&closed.view()).unwrap();
        let end = find(&constraints, "battery_soc_end").unwrap();
        assert_eq!(end.len(), 1);
        assert!(end.row_at(&at(2)).is_some());
        assert_eq!(end.rows()[0].relation.rhs, 0.4);
    }

    #[test]
    fn round_trip_loses_efficiency_product() {
        // Charging 20 and discharging back to the starting SOC returns 20·ηc·ηd.
        let (eta_c, eta_d, cap) = (0.9, 0.8, 100.0);
        let battery = Battery::new("b", cap, 50.0, 0.2).with_efficiencies(eta_c, eta_d);
        let fixture = Fixture::new(vec![battery.into()], 2);
        let constraints = battery_constraints(&fixture.view()).unwrap();
        let vars = fixture.vars.batteries().unwrap();
        let mut values = vec![0.0; fixture.registry.num_columns()];
        let charged = 20.0;
        let returned = charged * eta_c * eta_d;
        values[fixture.registry[vars.power_in].at(&at(0)).index()] = charged;
        values[fixture.registry[vars.charge_mode].at(&at(0)).index()] = 1.0;
        values[fixture.registry[vars.soc].at(&at(0)).index()] = 0.2 + charged * eta_c / cap;
        values[fixture.registry[vars.power_out].at(&at(1)).index()] = returned;
        values[fixture.registry[vars.soc].at(&at(1)).index()] = 0.2;
        values[fixture.registry[vars.net_power].at(&at(0)).index()] = charged;
        values[fixture.registry[vars.net_power].at(&at(1)).index()] = -returned;

        for constraint in &constraints {
            for row in constraint.rows() {
                assert!(
                    row.relation.is_satisfied(&values, 1e-9),
                    "{} violated by {}",
                    constraint.name(),
                    row.relation.violation(&values)
                );
            }
        }
    }
}
