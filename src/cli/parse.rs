//! CLI parse: clap types for agentspec. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// agentspec - validate, migrate and export AI agent manifests
#[derive(Parser)]
#[command(name = "agentspec")]
#[command(version)]
#[command(about = "Validate, migrate and export vendor-neutral AI agent manifests")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (where agentspec.toml is looked up)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log at debug level, mirrored to stderr when logging to a file
    #[arg(long, short, default_value = "false", conflicts_with = "quiet")]
    pub verbose: bool,

    /// Disable logging
    #[arg(long, short, default_value = "false")]
    pub quiet: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stderr, stdout, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate manifests against their schema
    Validate {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Schema selector (latest, 0.3.0, ^0.3); defaults to each manifest's apiVersion
        #[arg(long)]
        schema: Option<String>,
        /// Validation mode (progressive or fail-fast)
        #[arg(long)]
        mode: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Migrate manifests to another schema version
    Migrate {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target schema selector
        #[arg(long, default_value = "latest")]
        to: String,
        /// Output file (single manifest only); .json writes JSON, anything else YAML
        #[arg(long, short, conflicts_with = "output_dir")]
        output: Option<PathBuf>,
        /// Output directory for migrated manifests
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Export manifests to target platforms
    Export {
        /// Manifest files or directories
        #[arg(required = true)]
        paths: Vec<PathBuf>,
        /// Target names; repeat or comma-separate. Defaults to every target
        #[arg(long, short, value_delimiter = ',')]
        target: Vec<String>,
        /// Output directory (default: export.output_dir)
        #[arg(long)]
        out_dir: Option<PathBuf>,
        /// Test categories (comma-separated, "all" or "none"; default: export.tests)
        #[arg(long)]
        tests: Option<String>,
        /// Memory backend (in-memory, summarizing, key-value, relational)
        #[arg(long)]
        memory_backend: Option<String>,
        /// Feature policy override, e.g. tool:code_interpreter=degrade
        #[arg(long = "policy", value_name = "FEATURE=POLICY")]
        policies: Vec<String>,
        /// Record the generation time in the metadata artifact
        #[arg(long)]
        timestamp: bool,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List published schema versions
    Schemas {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List export targets
    Targets {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
}
