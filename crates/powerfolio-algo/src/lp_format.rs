//! CPLEX LP text export of a built model.

use crate::expr::{LinearExpr, VarId};
use crate::model::AlgebraicModel;
use crate::objective::ObjectiveSense;
use crate::variables::BoundPolicy;
use anyhow::{Context, Result};
use std::io::{self, Write};
use std::path::Path;

const TERMS_PER_LINE: usize = 8;

/// Keeps the characters LP readers accept in names and replaces the rest.
fn sanitize(name: &str) -> String {
    const EXTRA: &str = "!\"#$%&()/,.;?@_`'{}|~";
    let mut out: String = name
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || EXTRA.contains(c) {
                c
            } else {
                '_'
            }
        })
        .collect();
    if out.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        out.insert(0, '_');
    }
    out
}

fn write_expr<W: Write>(out: &mut W, expr: &LinearExpr, names: &[String]) -> io::Result<()> {
    if expr.terms().is_empty() {
        // a row needs at least one column to parse
        return match names.first() {
            Some(name) => write!(out, " 0 {name}"),
            None => write!(out, " 0"),
        };
    }
    for (i, (var, coefficient)) in expr.terms().iter().enumerate() {
        if i > 0 && i % TERMS_PER_LINE == 0 {
            write!(out, "\n   ")?;
        }
        let sign = if *coefficient < 0.0 { '-' } else { '+' };
        write!(out, " {sign} {} {}", coefficient.abs(), names[var.index()])?;
    }
    Ok(())
}

/// Renders `model` in CPLEX LP format.
pub fn write_lp<W: Write>(model: &AlgebraicModel, out: &mut W) -> io::Result<()> {
    let coords = model.coords();
    let registry = model.registry();
    let names: Vec<String> = (0..model.num_columns())
        .map(|c| sanitize(&registry.column_name(VarId(c), coords)))
        .collect();

    let objective = model.objective();
    writeln!(out, "\\ powerfolio model: {} columns, {} rows", names.len(), model.num_rows())?;
    writeln!(
        out,
        "{}",
        match objective.sense {
            ObjectiveSense::Maximize => "Maximize",
            ObjectiveSense::Minimize => "Minimize",
        }
    )?;
    write!(out, " obj:")?;
    write_expr(out, &objective.expression, &names)?;
    if objective.expression.constant() != 0.0 {
        write!(out, " + {}", objective.expression.constant())?;
    }
    writeln!(out)?;

    writeln!(out, "Subject To")?;
    for family in model.constraints() {
        for row in family.rows() {
            let label = sanitize(&format!(
                "{}({})",
                family.name(),
                coords.describe(family.dims(), &row.point)
            ));
            write!(out, " {label}:")?;
            write_expr(out, &row.relation.expr, &names)?;
            writeln!(out, " {} {}", row.relation.sense, row.relation.rhs)?;
        }
    }

    writeln!(out, "Bounds")?;
    for variable in registry.iter() {
        if variable.bound() == BoundPolicy::Unbounded {
            for c in variable.columns() {
                writeln!(out, " {} free", names[c])?;
            }
        }
    }

    let binaries: Vec<&str> = registry
        .iter()
        .filter(|v| v.bound().is_integer())
        .flat_map(|v| v.columns())
        .map(|c| names[c].as_str())
        .collect();
    if !binaries.is_empty() {
        writeln!(out, "Binaries")?;
        for chunk in binaries.chunks(TERMS_PER_LINE) {
            writeln!(out, " {}", chunk.join(" "))?;
        }
    }
    writeln!(out, "End")
}

pub fn write_lp_file(model: &AlgebraicModel, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating LP file at {}", path.display()))?;
    let mut writer = io::BufWriter::new(file);
    write_lp(model, &mut writer).with_context(|| format!("writing LP to {}", path.display()))?;
    writer
        .flush()
        .with_context(|| format!("flushing {}", path.display()))
}
