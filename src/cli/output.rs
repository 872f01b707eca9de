//! CLI output: error mapping from domain errors to the stable CLI surface.

use crate::error::PipelineError;
use crate::pipeline::ExitStatus;

/// Map a pipeline error to a message for stderr.
pub fn map_error(e: &PipelineError) -> String {
    format!("error: {}", e)
}

/// Process exit code for an error that stopped the command.
pub fn exit_code(e: &PipelineError) -> i32 {
    ExitStatus::from(e).code()
}

/// Text or JSON output, from the `--format` flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Result<Self, PipelineError> {
        match raw {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => Err(PipelineError::Usage(format!(
                "unknown output format '{}' (expected text or json)",
                other
            ))),
        }
    }
}
