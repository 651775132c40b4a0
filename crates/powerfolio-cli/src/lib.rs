pub mod cli;
pub mod common;

pub use cli::{build_cli_command, Cli, Commands, OutputFormat};
