use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use powerfolio_algo::{ModelBuilder, ModelSummary};
use powerfolio_cli::common::write_json;
use powerfolio_scenarios::load_system;
use tabwriter::TabWriter;

pub fn handle(system: &Path, json: bool) -> Result<()> {
    let resolved = load_system(system)?;
    let model = ModelBuilder::from_system(&resolved.system)
        .and_then(|mut builder| builder.build())
        .context("building model")?;
    let summary = model.summary();
    if json {
        write_json(&summary, &mut io::stdout(), true)
    } else {
        print_summary(&summary)
    }
}

fn print_summary(summary: &ModelSummary) -> Result<()> {
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "DIMENSION\tLABELS")?;
    for (dimension, len) in &summary.dimensions {
        writeln!(writer, "{dimension}\t{len}")?;
    }
    writeln!(writer)?;

    writeln!(writer, "VARIABLE\tDIMS\tBOUND\tCOLUMNS")?;
    for variable in &summary.variables {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}",
            variable.name,
            variable.dims.join(","),
            variable.bound,
            variable.columns
        )?;
    }
    writeln!(writer)?;

    writeln!(writer, "CONSTRAINT\tROWS")?;
    for constraint in &summary.constraints {
        writeln!(writer, "{}\t{}", constraint.name, constraint.rows)?;
    }
    writeln!(writer)?;

    writeln!(
        writer,
        "objective: {} {}",
        summary.objective_sense,
        summary.objective_components.join(" + ")
    )?;
    writeln!(
        writer,
        "size: {} columns, {} rows",
        summary.columns, summary.rows
    )?;
    writer.flush()?;
    Ok(())
}
