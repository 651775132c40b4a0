use std::path::Path;

use anyhow::{Context, Result};
use powerfolio_algo::{write_lp_file, ModelBuilder};
use powerfolio_scenarios::load_system;
use tracing::info;

pub fn handle(system: &Path, out: &Path) -> Result<()> {
    let resolved = load_system(system)?;
    let model = ModelBuilder::from_system(&resolved.system)
        .and_then(|mut builder| builder.build())
        .context("building model")?;
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    write_lp_file(&model, out)?;
    info!(
        columns = model.num_columns(),
        rows = model.num_rows(),
        "wrote LP model"
    );
    println!("Wrote LP model to {}", out.display());
    Ok(())
}
