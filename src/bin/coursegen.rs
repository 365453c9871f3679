//! coursegen CLI Binary
//!
//! Command-line interface for submitting and tracking chapter generation jobs.

use clap::Parser;
use coursegen::cli::{Cli, RunContext};
use coursegen::config::ConfigLoader;
use coursegen::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("coursegen CLI starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone(), cli.api_base.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error initializing CLI context: {}", e);
            eprintln!("{}", coursegen::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", coursegen::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args, environment, and config file
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    // Without --verbose, logging stays off
    if !cli.verbose {
        return LoggingConfig {
            level: "off".to_string(),
            ..LoggingConfig::default()
        };
    }

    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    // CLI arguments win
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
