use clap::{CommandFactory, Parser, Subcommand, ValueEnum, ValueHint};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about = "Energy portfolio dispatch optimisation", long_about = None)]
pub struct Cli {
    /// Set the logging level
    #[arg(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate a system specification without building a model
    Validate {
        /// Path to the system specification file (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        system: PathBuf,
    },
    /// Build the model and report its dimensions, variables and constraints
    Inspect {
        /// Path to the system specification file (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        system: PathBuf,
        /// Print the summary as JSON
        #[arg(long)]
        json: bool,
    },
    /// Build and solve the model, then print the dispatch
    Solve {
        /// Path to the system specification file (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        system: PathBuf,
        /// MILP backend (microlp, or highs when compiled in)
        #[arg(long, default_value = "microlp")]
        solver: String,
        /// Directory to write results.json (and one CSV per table) into
        #[arg(long, value_hint = ValueHint::DirPath)]
        out: Option<PathBuf>,
        /// Output format for stdout
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Write the model in CPLEX LP format for an external solver
    Export {
        /// Path to the system specification file (YAML or JSON)
        #[arg(value_hint = ValueHint::FilePath)]
        system: PathBuf,
        /// Destination .lp file
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        out: PathBuf,
    },
    /// Generate shell completion scripts
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: Shell,
        /// Write output to a file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

/// Output format for tabular/structured data.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable aligned tables
    #[default]
    Table,
    /// JSON object (pipe-friendly, structured)
    Json,
}

pub fn build_cli_command() -> clap::Command {
    Cli::command()
}
