//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name string for log records (e.g. "generate", "watch").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Generate { .. } => "generate",
        Commands::Job { .. } => "job",
        Commands::Watch { .. } => "watch",
        Commands::Artifacts { .. } => "artifacts",
        Commands::Providers { .. } => "providers",
        Commands::Config { .. } => "config",
    }
}
