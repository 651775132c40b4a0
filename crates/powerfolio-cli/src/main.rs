use clap::Parser;
use powerfolio_cli::cli::{Cli, Commands};
use std::io;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    // stdout carries tables and JSON; logs go to stderr
    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let result = match &cli.command {
        Some(Commands::Validate { system }) => {
            info!("Validating system spec {}", system.display());
            commands::validate::handle(system)
        }
        Some(Commands::Inspect { system, json }) => commands::inspect::handle(system, *json),
        Some(Commands::Solve {
            system,
            solver,
            out,
            format,
        }) => commands::solve::handle(system, solver, out.as_deref(), *format),
        Some(Commands::Export { system, out }) => commands::export::handle(system, out),
        Some(Commands::Completions { shell, out }) => {
            commands::completions::handle(*shell, out.as_deref())
        }
        None => {
            info!("No subcommand provided. Use `powerfolio --help` for more information.");
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("{err:#}");
        std::process::exit(1);
    }
}
