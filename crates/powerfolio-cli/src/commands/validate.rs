use std::path::Path;

use anyhow::Result;
use powerfolio_core::Dimension;
use powerfolio_scenarios::load_system;

pub fn handle(system: &Path) -> Result<()> {
    let resolved = load_system(system)?;
    let system = &resolved.system;
    let portfolio = system.portfolio();
    println!("System spec validated successfully");
    println!(
        "  {} generators, {} batteries, {} loads, {} markets",
        portfolio.labels(Dimension::Generator).len(),
        portfolio.labels(Dimension::Battery).len(),
        portfolio.labels(Dimension::Load).len(),
        portfolio.labels(Dimension::Market).len(),
    );
    println!(
        "  {} steps of {} min, {} scenario(s)",
        system.horizon().steps(),
        resolved.timestep.num_minutes(),
        system.scenarios().len()
    );
    Ok(())
}
