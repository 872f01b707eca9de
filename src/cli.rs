//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the pipeline.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::{exit_code, map_error, OutputFormat};
pub use parse::{Cli, Commands};
pub use presentation::{
    format_batch_text, format_export_text, format_migrate_text, format_schemas, format_targets,
    format_validate_text,
};
pub use route::{CommandOutput, RunContext};
