//! Market trading limits. `trade_mode = 1` means selling.

use super::{family, Constraint, ModelView};
use crate::expr::LinearExpr;
use powerfolio_core::{Dimension, ModelResult, TradeDirection};
use tracing::debug;

pub fn market_constraints(view: &ModelView<'_>) -> ModelResult<Vec<Constraint>> {
    let Some(vars) = view.vars.markets.as_ref() else {
        return Ok(Vec::new());
    };
    let params = view.params.markets()?;
    let shape = view.asset_shape(Dimension::Market)?;
    let sell = view.var(vars.sell_volume);
    let buy = view.var(vars.buy_volume);
    let mode = view.var(vars.trade_mode);

    let mut out = vec![
        family("market_max_sell", &shape, |p| {
            Some(LinearExpr::from(sell.at(p)).le(params.max_volume[p]))
        }),
        family("market_max_buy", &shape, |p| {
            Some(LinearExpr::from(buy.at(p)).le(params.max_volume[p]))
        }),
        family("market_sell_mode", &shape, |p| {
            Some((sell.at(p) - mode.at(p) * params.max_volume[p]).le(0.0))
        }),
        family("market_buy_mode", &shape, |p| {
            Some((buy.at(p) + mode.at(p) * params.max_volume[p]).le(params.max_volume[p]))
        }),
    ];

    let buy_only = family("market_buy_only", &shape, |p| {
        (params.trade_direction[p] == TradeDirection::Buy)
            .then(|| LinearExpr::from(sell.at(p)).eq_to(0.0))
    });
    let sell_only = family("market_sell_only", &shape, |p| {
        (params.trade_direction[p] == TradeDirection::Sell)
            .then(|| LinearExpr::from(buy.at(p)).eq_to(0.0))
    });
    out.extend([buy_only, sell_only].into_iter().filter(|c| !c.is_empty()));

    debug!(
        families = out.len(),
        rows = out.iter().map(Constraint::len).sum::<usize>(),
        "market constraints"
    );
    Ok(out)
}
