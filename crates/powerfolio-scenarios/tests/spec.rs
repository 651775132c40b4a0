use powerfolio_core::Dimension;
use powerfolio_scenarios::{load_spec_from_path, load_system, resolve_system, validate};
use std::fs;
use tempfile::tempdir;

const DETERMINISTIC: &str = r#"
version: 1
horizon:
  steps: 3
  start: "2024-06-01T00:00:00Z"
  timestep_minutes: 30
assets:
  - type: generator
    name: gas
    nominal_power: 200
    variable_cost: 30
    startup_cost: 50
  - type: battery
    name: store
    capacity: 100
    max_power: 50
    soc_start: 0.5
  - type: load
    name: city
markets:
  - name: spot
    max_volume: 100
    trade_direction: sell
scenario:
  loads:
    city: [50, 100, 150]
  market_prices:
    spot: [40, 45, 50]
"#;

#[test]
fn deterministic_yaml_resolves() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("system.yaml");
    fs::write(&path, DETERMINISTIC).unwrap();

    let resolved = load_system(&path).unwrap();
    let system = &resolved.system;
    assert!(!system.is_stochastic());
    assert_eq!(system.scenarios()[0].name, "deterministic");
    assert_eq!(system.scenarios()[0].probability, 1.0);
    assert_eq!(
        system.horizon().labels(),
        ["2024-06-01T00:00:00Z", "2024-06-01T00:30:00Z", "2024-06-01T01:00:00Z"]
    );
    assert_eq!(system.portfolio().labels(Dimension::Market), vec!["spot"]);
    assert_eq!(resolved.power_unit, "MW");
    assert_eq!(resolved.energy_unit(), "MWh");
}

#[test]
fn stochastic_json_without_start_uses_step_numbers() {
    let json = r#"{
        "horizon": {"steps": 2},
        "assets": [
            {"type": "generator", "name": "g", "nominal_power": 100, "variable_cost": 10},
            {"type": "load", "name": "l"}
        ],
        "scenarios": [
            {"name": "low", "probability": 0.4, "loads": {"l": [10, 20]}},
            {"name": "high", "probability": 0.6, "loads": {"l": [30, 40]}}
        ]
    }"#;
    let dir = tempdir().unwrap();
    let path = dir.path().join("system.json");
    fs::write(&path, json).unwrap();

    let resolved = load_system(&path).unwrap();
    assert!(resolved.system.is_stochastic());
    assert_eq!(resolved.system.horizon().labels(), ["0", "1"]);
    assert!(resolved.start.is_none());
}

#[test]
fn unknown_extension_falls_back_to_yaml() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("system.cfg");
    fs::write(&path, DETERMINISTIC).unwrap();
    let spec = load_spec_from_path(&path).unwrap();
    assert_eq!(spec.assets.len(), 3);
    assert!(validate(&spec).is_ok());
}

#[test]
fn probabilities_are_not_renormalised() {
    let yaml = r#"
horizon: {steps: 1}
assets:
  - {type: generator, name: g, nominal_power: 10, variable_cost: 1}
scenarios:
  - {name: a, probability: 0.5}
  - {name: b, probability: 0.4}
"#;
    let spec = serde_yaml::from_str(yaml).unwrap();
    let err = resolve_system(&spec).unwrap_err();
    assert!(format!("{err:#}").contains("sum to 1"), "{err:#}");
}

#[test]
fn scenario_and_scenarios_are_exclusive() {
    let yaml = r#"
horizon: {steps: 1}
assets:
  - {type: generator, name: g, nominal_power: 10, variable_cost: 1}
scenario: {}
scenarios:
  - {name: a, probability: 1.0}
"#;
    let spec = serde_yaml::from_str(yaml).unwrap();
    assert!(resolve_system(&spec)
        .unwrap_err()
        .to_string()
        .contains("both"));
}

#[test]
fn missing_load_profile_is_reported_with_context() {
    let yaml = r#"
horizon: {steps: 2}
assets:
  - {type: generator, name: g, nominal_power: 10, variable_cost: 1}
  - {type: load, name: city}
scenario: {}
"#;
    let spec = serde_yaml::from_str(yaml).unwrap();
    let err = format!("{:#}", resolve_system(&spec).unwrap_err());
    assert!(err.contains("validating system"), "{err}");
    assert!(err.contains("city"), "{err}");
}
