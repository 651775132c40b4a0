//! Unit commitment: output limits, start/stop logic, minimum up/down time, ramps.
//!
//! Step 0 has no predecessor and is a free initial condition: rows that read
//! `x[t-1]` start at step 1, rows that only read step t cover every step.
//! Minimum up/down windows are clamped to the start of the horizon and the
//! rows that read `x[t+1]` stop one step before the end.

use super::{family, time_of, Constraint, ModelView};
use crate::expr::LinearExpr;
use powerfolio_core::{Dimension, ModelResult};
use tracing::debug;

/// Fraction of nominal power a committed unit must at least produce.
pub const MIN_OUTPUT_FRACTION: f64 = 1e-5;

pub fn generator_constraints(view: &ModelView<'_>) -> ModelResult<Vec<Constraint>> {
    let Some(vars) = view.vars.generators.as_ref() else {
        return Ok(Vec::new());
    };
    let params = view.params.generators()?;
    let shape = view.asset_shape(Dimension::Generator)?;
    let power = view.var(vars.power);
    let status = view.var(vars.status);
    let startup = view.var(vars.startup);
    let shutdown = view.var(vars.shutdown);
    let last = view.last_time();

    let mut out = Vec::new();

    out.push(family("generator_max_power", &shape, |p| {
        Some((power.at(p) - status.at(p) * params.nominal_power[p]).le(0.0))
    }));
    out.push(family("generator_min_output", &shape, |p| {
        let floor = MIN_OUTPUT_FRACTION * params.nominal_power[p];
        Some(LinearExpr::from(power.at(p)).ge(status.at(p) * floor))
    }));
    out.push(family("generator_min_power", &shape, |p| {
        Some(LinearExpr::from(power.at(p)).ge(status.at(p) * params.min_power[p]))
    }));

    // off -> on
    out.push(family("generator_startup_transition", &shape, |p| {
        let prev = status.previous(p)?;
        Some(LinearExpr::from(startup.at(p)).ge(status.at(p) - prev))
    }));
    out.push(family("generator_startup_requires_on", &shape, |p| {
        Some(LinearExpr::from(startup.at(p)).le(status.at(p)))
    }));
    out.push(family("generator_startup_requires_previous_off", &shape, |p| {
        let prev = status.previous(p)?;
        Some((startup.at(p) + prev).le(1.0))
    }));

    // on -> off
    out.push(family("generator_shutdown_transition", &shape, |p| {
        let prev = status.previous(p)?;
        Some(LinearExpr::from(shutdown.at(p)).ge(prev - status.at(p)))
    }));
    out.push(family("generator_shutdown_requires_previous_on", &shape, |p| {
        let prev = status.previous(p)?;
        Some(LinearExpr::from(shutdown.at(p)).le(prev))
    }));
    out.push(family("generator_shutdown_requires_off", &shape, |p| {
        Some((shutdown.at(p) + status.at(p)).le(1.0))
    }));

    out.push(family("generator_min_up_time", &shape, |p| {
        if time_of(p) >= last {
            return None;
        }
        let window = params.min_up_time[p];
        let on: LinearExpr = status
            .trailing_window(p, window)
            .into_iter()
            .map(LinearExpr::from)
            .sum();
        let next_shutdown = shutdown.next(p)?;
        Some(on.ge(next_shutdown * window as f64))
    }));
    out.push(family("generator_min_down_time", &shape, |p| {
        if time_of(p) >= last {
            return None;
        }
        let window = params.min_down_time[p];
        let cells = status.trailing_window(p, window);
        // Σ(1 - status) over the window
        let mut off = LinearExpr::from_constant(cells.len() as f64);
        for cell in cells {
            off -= cell;
        }
        let next_startup = startup.next(p)?;
        Some(off.ge(next_startup * window as f64))
    }));

    out.push(family("generator_ramp_up", &shape, |p| {
        let prev = power.previous(p)?;
        Some((power.at(p) - prev).le(params.max_ramp_up[p]))
    }));
    out.push(family("generator_ramp_down", &shape, |p| {
        let prev = power.previous(p)?;
        Some((prev - power.at(p)).le(params.max_ramp_down[p]))
    }));

    debug!(
        families = out.len(),
        rows = out.iter().map(Constraint::len).sum::<usize>(),
        "generator constraints"
    );
    Ok(out)
}
