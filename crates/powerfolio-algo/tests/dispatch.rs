//! End-to-end dispatch tests: build, solve with the bundled microlp backend,
//! extract results.

use powerfolio_algo::{
    optimize, GoodLpSolver, MilpBackend, SolvedModel, SolverStatus, TerminationCondition,
};
use powerfolio_core::{
    Asset, Battery, EnergySystem, Generator, Horizon, Load, Market, ModelError, Portfolio,
    Scenario,
};

const TOL: f64 = 1e-4;

fn portfolio(assets: Vec<Asset>) -> Portfolio {
    Portfolio::from_assets(assets).unwrap()
}

fn solve(system: &EnergySystem) -> SolvedModel {
    let solved = optimize(system, &GoodLpSolver::new(MilpBackend::Microlp)).unwrap();
    assert!(
        solved.outcome.is_success(),
        "solve failed: {:?} / {:?}",
        solved.outcome.termination,
        solved.outcome.message
    );
    let violations = solved.model.violations(&solved.outcome.values, 1e-6);
    assert!(violations.is_empty(), "residual violations: {violations:?}");
    solved
}

fn assert_series(actual: &[f64], expected: &[f64]) {
    assert_eq!(actual.len(), expected.len(), "{actual:?} vs {expected:?}");
    for (a, e) in actual.iter().zip(expected) {
        assert!((a - e).abs() < TOL, "{actual:?} vs {expected:?}");
    }
}

#[test]
fn single_generator_follows_demand() {
    let demand = vec![50.0, 100.0, 150.0, 180.0, 120.0];
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 200.0, 30.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(5),
        Scenario::deterministic().with_load("city", demand.clone()),
    )
    .unwrap();

    let solved = solve(&system);
    assert_eq!(solved.outcome.status, SolverStatus::Ok);
    assert_eq!(solved.outcome.termination, TerminationCondition::Optimal);

    let results = solved.results();
    let generators = results.generators().unwrap();
    assert_series(&generators.power.series(0, "g").unwrap(), &demand);
    assert_series(&generators.status.series(0, "g").unwrap(), &[1.0; 5]);

    let expected_profit = -30.0 * demand.iter().sum::<f64>();
    assert!((results.objective_value().unwrap() - expected_profit).abs() < TOL);
}

#[test]
fn merit_order_dispatch() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("cheap", 100.0, 20.0).into(),
            Generator::new("mid", 100.0, 30.0).into(),
            Generator::new("peak", 100.0, 40.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(6),
        Scenario::deterministic().with_load(
            "city",
            vec![50.0, 100.0, 150.0, 200.0, 250.0, 300.0],
        ),
    )
    .unwrap();

    let power = solve(&system).results().generators().unwrap().power;
    assert_eq!(power.columns, vec!["cheap", "mid", "peak"]);
    assert_series(
        &power.series(0, "cheap").unwrap(),
        &[50.0, 100.0, 100.0, 100.0, 100.0, 100.0],
    );
    assert_series(
        &power.series(0, "mid").unwrap(),
        &[0.0, 0.0, 50.0, 100.0, 100.0, 100.0],
    );
    assert_series(
        &power.series(0, "peak").unwrap(),
        &[0.0, 0.0, 0.0, 0.0, 50.0, 100.0],
    );
}

#[test]
fn lossless_battery_shifts_energy() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0).into(),
            Battery::new("b", 100.0, 100.0, 0.0).with_soc_end(0.5).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(5),
        Scenario::deterministic().with_load("city", vec![50.0, 50.0, 150.0, 150.0, 50.0]),
    )
    .unwrap();

    let solved = solve(&system);
    let results = solved.results();
    assert_series(
        &results.generators().unwrap().power.series(0, "g").unwrap(),
        &[100.0; 5],
    );
    let battery = results.batteries().unwrap();
    assert_series(
        &battery.state_of_charge.series(0, "b").unwrap(),
        &[50.0, 100.0, 50.0, 0.0, 50.0],
    );
    assert_series(
        &battery.net_power.series(0, "b").unwrap(),
        &[50.0, 50.0, -50.0, -50.0, 50.0],
    );
}

#[test]
fn lossy_battery_charges_twice_the_stored_energy() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0).into(),
            Battery::new("b", 100.0, 50.0, 0.0)
                .with_efficiencies(0.5, 0.5)
                .with_soc_end(0.5)
                .into(),
            Load::new("city").into(),
        ]),
        Horizon::new(3),
        Scenario::deterministic().with_load("city", vec![50.0, 50.0, 100.0]),
    )
    .unwrap();

    let battery = solve(&system).results().batteries().unwrap();
    assert_series(
        &battery.state_of_charge.series(0, "b").unwrap(),
        &[25.0, 50.0, 50.0],
    );
    assert_series(&battery.net_power.series(0, "b").unwrap(), &[50.0, 50.0, 0.0]);
}

#[test]
fn surplus_is_sold_when_price_beats_cost() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 30.0).into(),
            Market::new("spot", 100.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(3),
        Scenario::deterministic()
            .with_load("city", vec![50.0, 75.0, 100.0])
            .with_market_price("spot", vec![50.0, 60.0, 55.0]),
    )
    .unwrap();

    let solved = solve(&system);
    let results = solved.results();
    assert_series(
        &results.generators().unwrap().power.series(0, "g").unwrap(),
        &[100.0, 100.0, 100.0],
    );
    let market = results.markets().unwrap();
    assert_series(&market.sell_volume.series(0, "spot").unwrap(), &[50.0, 25.0, 0.0]);
    assert_series(&market.buy_volume.series(0, "spot").unwrap(), &[0.0, 0.0, 0.0]);
    let profit = 50.0 * 50.0 + 25.0 * 60.0 - 30.0 * 300.0;
    assert!((results.objective_value().unwrap() - profit).abs() < TOL);
}

#[test]
fn market_only_portfolio_buys_the_load() {
    let system = EnergySystem::deterministic(
        portfolio(vec![Market::new("grid", 100.0).into(), Load::new("home").into()]),
        Horizon::new(2),
        Scenario::deterministic()
            .with_load("home", vec![30.0, 40.0])
            .with_market_price("grid", vec![10.0, 20.0]),
    )
    .unwrap();

    let solved = solve(&system);
    let results = solved.results();
    assert_eq!(
        results.generators().unwrap_err(),
        ModelError::MissingAssetClass(powerfolio_core::Dimension::Generator)
    );
    let market = results.markets().unwrap();
    assert_series(&market.buy_volume.series(0, "grid").unwrap(), &[30.0, 40.0]);
    assert!((results.objective_value().unwrap() + 1100.0).abs() < TOL);
}

#[test]
fn start_and_stop_flags_track_status() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0)
                .with_startup_cost(5.0)
                .with_shutdown_cost(1.0)
                .into(),
            Load::new("city").into(),
        ]),
        Horizon::new(4),
        Scenario::deterministic().with_load("city", vec![0.0, 50.0, 0.0, 50.0]),
    )
    .unwrap();

    let generators = solve(&system).results().generators().unwrap();
    assert_series(&generators.status.series(0, "g").unwrap(), &[0.0, 1.0, 0.0, 1.0]);
    assert_series(&generators.startup.series(0, "g").unwrap(), &[0.0, 1.0, 0.0, 1.0]);
    assert_series(&generators.shutdown.series(0, "g").unwrap(), &[0.0, 0.0, 1.0, 0.0]);
}

fn two_price_system(stage_fixed: bool) -> EnergySystem {
    let scenario = |name: &str, first_price: f64| {
        Scenario::new(name, 0.5)
            .with_load("city", vec![40.0, 40.0])
            .with_market_price("spot", vec![first_price, 5.0])
    };
    EnergySystem::new(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0).into(),
            Market::new("spot", 50.0).stage_fixed(stage_fixed).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(2),
        vec![scenario("high", 30.0), scenario("low", 5.0)],
    )
    .unwrap()
}

#[test]
fn stage_fixed_market_trades_identically_across_scenarios() {
    let market = solve(&two_price_system(true)).results().markets().unwrap();
    let sell = &market.sell_volume;
    assert!(sell.has_scenario_level());
    for column in ["spot"] {
        let high = sell.series(0, column).unwrap();
        let low = sell.series(1, column).unwrap();
        assert_series(&low, &high);
        assert_series(&high, &[50.0, 0.0]);
        assert_series(
            &market.buy_volume.series(1, column).unwrap(),
            &market.buy_volume.series(0, column).unwrap(),
        );
    }
}

#[test]
fn free_market_adapts_per_scenario() {
    let market = solve(&two_price_system(false)).results().markets().unwrap();
    assert_series(&market.sell_volume.series(0, "spot").unwrap(), &[50.0, 0.0]);
    assert_series(&market.sell_volume.series(1, "spot").unwrap(), &[0.0, 0.0]);
    assert_series(&market.buy_volume.series(1, "spot").unwrap(), &[40.0, 40.0]);
}

#[test]
fn single_scenario_tables_drop_the_scenario_level() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(2),
        Scenario::deterministic().with_load("city", vec![10.0, 20.0]),
    )
    .unwrap();
    let power = solve(&system).results().generators().unwrap().power;
    assert!(!power.has_scenario_level());
    assert_eq!(power.values.len(), 2);
}

#[test]
fn infeasible_model_has_no_results() {
    // 100 units of storage cannot be filled at 10 per step in two steps
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0).into(),
            Battery::new("b", 100.0, 10.0, 0.0).with_soc_end(1.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(2),
        Scenario::deterministic().with_load("city", vec![10.0, 10.0]),
    )
    .unwrap();

    let solved = optimize(&system, &GoodLpSolver::default()).unwrap();
    assert!(!solved.outcome.is_success());
    assert_eq!(solved.outcome.termination, TerminationCondition::Infeasible);
    assert!(matches!(
        solved.results().batteries(),
        Err(ModelError::ResultsUnavailable { .. })
    ));
    assert!(solved.results().records().is_err());
}

#[test]
fn ramp_limit_shifts_load_to_peaker() {
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("cheap", 100.0, 10.0)
                .with_ramp_limits(20.0, 100.0)
                .into(),
            Generator::new("peak", 100.0, 50.0).into(),
            Load::new("city").into(),
        ]),
        Horizon::new(3),
        Scenario::deterministic().with_load("city", vec![20.0, 80.0, 80.0]),
    )
    .unwrap();

    let generators = solve(&system).results().generators().unwrap();
    assert_series(
        &generators.power.series(0, "cheap").unwrap(),
        &[20.0, 40.0, 60.0],
    );
    assert_series(&generators.power.series(0, "peak").unwrap(), &[0.0, 40.0, 20.0]);
}

#[test]
fn min_up_time_keeps_unit_committed() {
    // one lucrative step pulls the unit on; it must then stay on for three steps
    let system = EnergySystem::deterministic(
        portfolio(vec![
            Generator::new("g", 100.0, 10.0)
                .with_min_up_time(3)
                .with_min_power(20.0)
                .into(),
            Market::new("spot", 50.0).into(),
        ]),
        Horizon::new(5),
        Scenario::deterministic().with_market_price("spot", vec![0.0, 30.0, 8.0, 8.0, 0.0]),
    )
    .unwrap();

    let solved = solve(&system);
    let results = solved.results();
    let generators = results.generators().unwrap();
    assert_series(
        &generators.status.series(0, "g").unwrap(),
        &[0.0, 1.0, 1.0, 1.0, 0.0],
    );
    assert_series(
        &generators.power.series(0, "g").unwrap(),
        &[0.0, 50.0, 20.0, 20.0, 0.0],
    );
    assert_series(
        &results.markets().unwrap().sell_volume.series(0, "spot").unwrap(),
        &[0.0, 50.0, 20.0, 20.0, 0.0],
    );
    let profit = 50.0 * 20.0 - 2.0 * 20.0 * 2.0;
    assert!((results.objective_value().unwrap() - profit).abs() < TOL);
}
