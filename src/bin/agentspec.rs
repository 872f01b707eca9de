//! agentspec CLI Binary
//!
//! Command-line interface for validating, migrating and exporting agent manifests.

use agentspec::cli::{exit_code, map_error, Cli, RunContext};
use agentspec::config::ConfigLoader;
use agentspec::logging::{init_logging, LoggingConfig};
use anyhow::Context;
use clap::Parser;
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("agentspec CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone())
        .with_context(|| format!("loading configuration for {}", cli.workspace.display()))
    {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing pipeline: {:#}", e);
            eprintln!("error: {:#}", e);
            let code = e
                .downcast_ref::<agentspec::error::PipelineError>()
                .map(exit_code)
                .unwrap_or(1);
            process::exit(code);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            print!("{}", output.text);
            if !output.text.ends_with('\n') {
                println!();
            }
            process::exit(output.status.code());
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(exit_code(&e));
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let loaded = match cli.config {
        Some(ref config_path) => ConfigLoader::load_from_file(config_path),
        None => ConfigLoader::load(&cli.workspace),
    };
    let mut config = loaded.map(|c| c.logging).unwrap_or_default();

    if cli.quiet {
        config.enabled = false;
    }
    if cli.verbose {
        config.enabled = true;
        config.level = "debug".to_string();
    }

    // Explicit flags win over --verbose and the config file
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if let Some(ref output) = cli.log_output {
        config.output = output.clone();
    }
    if let Some(ref file) = cli.log_file {
        config.file = file.clone();
    }
    config
}
