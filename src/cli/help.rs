//! CLI command-name contract for logging.

use crate::cli::parse::Commands;

/// Command name recorded on log events (e.g. "validate", "export").
pub fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Validate { .. } => "validate",
        Commands::Migrate { .. } => "migrate",
        Commands::Export { .. } => "export",
        Commands::Schemas { .. } => "schemas",
        Commands::Targets { .. } => "targets",
    }
}

/// Output format flag of a command.
pub fn output_format(command: &Commands) -> &str {
    match command {
        Commands::Validate { format, .. }
        | Commands::Migrate { format, .. }
        | Commands::Export { format, .. }
        | Commands::Schemas { format }
        | Commands::Targets { format } => format,
    }
}
