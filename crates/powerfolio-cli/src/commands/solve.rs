use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use powerfolio_algo::{optimize, GoodLpSolver, MilpBackend, ResultSet, SolveOutcome};
use powerfolio_cli::common::{write_json, write_table};
use powerfolio_cli::OutputFormat;
use powerfolio_scenarios::{load_system, ResolvedSystem};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct SolveReport<'a> {
    outcome: &'a SolveOutcome,
    results: &'a ResultSet,
}

pub fn handle(system: &Path, solver: &str, out: Option<&Path>, format: OutputFormat) -> Result<()> {
    let backend = solver.parse::<MilpBackend>()?;
    let resolved = load_system(system)?;
    info!("Solving {} with {}", system.display(), backend);

    let solved = optimize(&resolved.system, &GoodLpSolver::new(backend))
        .context("building model")?;
    let results = solved.results().all().context("extracting results")?;

    if let Some(dir) = out {
        write_outputs(dir, &solved.outcome, &results)?;
    }

    let report = SolveReport {
        outcome: &solved.outcome,
        results: &results,
    };
    match format {
        OutputFormat::Json => write_json(&report, &mut io::stdout(), true),
        OutputFormat::Table => print_tables(&resolved, &solved.outcome, &results),
    }
}

fn write_outputs(dir: &Path, outcome: &SolveOutcome, results: &ResultSet) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("creating output directory {}", dir.display()))?;
    results.to_json(&dir.join("results.json"))?;
    #[cfg(feature = "desktop")]
    {
        let written = results.to_csv_dir(dir)?;
        info!(files = written.len(), "wrote CSV tables");
    }
    info!(
        solver = outcome.solver,
        dir = %dir.display(),
        "wrote results"
    );
    Ok(())
}

fn print_tables(resolved: &ResolvedSystem, outcome: &SolveOutcome, results: &ResultSet) -> Result<()> {
    println!(
        "status: {}  termination: {}  solver: {}",
        outcome.status, outcome.termination, outcome.solver
    );
    if let Some(objective) = outcome.objective_value {
        println!("expected profit: {objective:.3}");
    }
    println!();

    let power = resolved.power_unit.as_str();
    let energy = resolved.energy_unit();
    let stdout = io::stdout();
    if let Some(generators) = &results.generators {
        write_table(&generators.power, power, stdout.lock())?;
        write_table(&generators.status, "on/off", stdout.lock())?;
    }
    if let Some(batteries) = &results.batteries {
        write_table(&batteries.net_power, power, stdout.lock())?;
        write_table(&batteries.state_of_charge, &energy, stdout.lock())?;
    }
    if let Some(markets) = &results.markets {
        write_table(&markets.sell_volume, power, stdout.lock())?;
        write_table(&markets.buy_volume, power, stdout.lock())?;
    }
    Ok(())
}
