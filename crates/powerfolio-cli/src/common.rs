//! Output helpers shared across commands.

use anyhow::{Context, Result};
use powerfolio_algo::ResultTable;
use serde::Serialize;
use std::io::Write;
use tabwriter::TabWriter;

/// Write data as JSON to a writer.
pub fn write_json<T: Serialize, W: Write>(data: &T, writer: &mut W, pretty: bool) -> Result<()> {
    if pretty {
        serde_json::to_writer_pretty(&mut *writer, data).context("serializing JSON")?;
    } else {
        serde_json::to_writer(&mut *writer, data).context("serializing JSON")?;
    }
    writeln!(writer)?;
    Ok(())
}

/// Aligned rendering of one result table, `unit` appended to the heading.
pub fn write_table<W: Write>(table: &ResultTable, unit: &str, writer: W) -> Result<()> {
    let mut tw = TabWriter::new(writer);
    writeln!(tw, "{} [{}]", table.variable, unit)?;
    let mut header = Vec::new();
    if table.has_scenario_level() {
        header.push("SCENARIO".to_string());
    }
    header.push("TIME".to_string());
    header.extend(table.columns.iter().cloned());
    writeln!(tw, "{}", header.join("\t"))?;

    let scenarios: Vec<Option<&str>> = match &table.scenarios {
        Some(names) => names.iter().map(|s| Some(s.as_str())).collect(),
        None => vec![None],
    };
    for (s, scenario) in scenarios.iter().enumerate() {
        for (t, time) in table.times.iter().enumerate() {
            let mut cells = Vec::with_capacity(table.columns.len() + 2);
            if let Some(name) = scenario {
                cells.push(name.to_string());
            }
            cells.push(time.clone());
            for column in &table.columns {
                let value = table.get(s, t, column).unwrap_or(f64::NAN);
                cells.push(format!("{value:.3}"));
            }
            writeln!(tw, "{}", cells.join("\t"))?;
        }
    }
    writeln!(tw)?;
    tw.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_renders_header_and_rows() {
        let table = ResultTable {
            variable: "power".into(),
            scenarios: None,
            times: vec!["0".into(), "1".into()],
            columns: vec!["gas".into()],
            values: vec![50.0, 75.5],
        };
        let mut buf = Vec::new();
        write_table(&table, "MW", &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "power [MW]");
        assert!(lines[1].starts_with("TIME"));
        assert!(lines[1].contains("gas"));
        assert!(lines[3].contains("75.500"));
    }
}
