//! Logging System
//!
//! Structured logging via `tracing`. Level, format and destination come from
//! configuration and can be overridden by `COURSEGEN_LOG`, `COURSEGEN_LOG_FORMAT`,
//! `COURSEGEN_LOG_OUTPUT` and `COURSEGEN_LOG_MODULES`.

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path when output is "file"
    #[serde(default = "default_log_file")]
    pub file: PathBuf,

    /// Colored output (text format on a terminal stream only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

// stdout carries command output
fn default_output() -> String {
    "stderr".to_string()
}

fn default_log_file() -> PathBuf {
    PathBuf::from(".coursegen/coursegen.log")
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: default_log_file(),
            color: default_true(),
            modules: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Result<(), String> {
        match self.level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" | "off" => {}
            other => return Err(format!("invalid log level '{}'", other)),
        }
        parse_format(&self.format).map_err(|e| e.to_string())?;
        parse_output(&self.output).map_err(|e| e.to_string())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Output {
    Stdout,
    Stderr,
    File,
}

/// Initialize the global subscriber.
///
/// Priority order (highest to lowest):
/// 1. Environment variables (COURSEGEN_LOG, COURSEGEN_LOG_FORMAT, ...)
/// 2. The given config (CLI flags are folded in by the caller)
/// 3. Defaults
pub fn init_logging(config: Option<&LoggingConfig>) -> Result<(), CoreError> {
    let filter = build_env_filter(config)?;
    let format = determine_format(config)?;
    let output = determine_output(config)?;
    let use_color = config.map(|c| c.color).unwrap_or(true);

    let base_subscriber = Registry::default().with(filter);

    let result = match (format, output) {
        (Format::Json, Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(open_log_file(config)?),
            )
            .try_init(),
        (Format::Json, Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        (Format::Json, Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        (Format::Text, Output::File) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(false)
                    .with_writer(open_log_file(config)?),
            )
            .try_init(),
        (Format::Text, Output::Stdout) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(std::io::stdout),
            )
            .try_init(),
        (Format::Text, Output::Stderr) => base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    result.map_err(|e| CoreError::Config(format!("Failed to initialize logging: {}", e)))
}

fn open_log_file(config: Option<&LoggingConfig>) -> Result<std::fs::File, CoreError> {
    let log_file = config
        .map(|c| c.file.clone())
        .unwrap_or_else(default_log_file);

    if let Some(parent) = log_file.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CoreError::Config(format!("Failed to create log directory: {}", e))
            })?;
        }
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_file)
        .map_err(|e| CoreError::Config(format!("Failed to open log file {:?}: {}", log_file, e)))
}

fn build_env_filter(config: Option<&LoggingConfig>) -> Result<EnvFilter, CoreError> {
    if let Ok(filter) = EnvFilter::try_from_env("COURSEGEN_LOG") {
        return Ok(filter);
    }

    let level = config.map(|c| c.level.as_str()).unwrap_or("info");
    if level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(level);

    if let Some(config) = config {
        for (module, module_level) in &config.modules {
            filter = filter.add_directive(parse_directive(module, module_level)?);
        }
    }

    if let Ok(modules_str) = std::env::var("COURSEGEN_LOG_MODULES") {
        for module_spec in modules_str.split(',') {
            if let Some((module, module_level)) = module_spec.split_once('=') {
                filter = filter.add_directive(parse_directive(module, module_level)?);
            }
        }
    }

    Ok(filter)
}

fn parse_directive(
    module: &str,
    level: &str,
) -> Result<tracing_subscriber::filter::Directive, CoreError> {
    format!("{}={}", module.trim(), level.trim())
        .parse()
        .map_err(|e| CoreError::Config(format!("Invalid log directive: {}", e)))
}

fn determine_format(config: Option<&LoggingConfig>) -> Result<Format, CoreError> {
    if let Ok(format) = std::env::var("COURSEGEN_LOG_FORMAT") {
        if let Ok(parsed) = parse_format(&format) {
            return Ok(parsed);
        }
    }
    parse_format(config.map(|c| c.format.as_str()).unwrap_or("text"))
}

fn parse_format(format: &str) -> Result<Format, CoreError> {
    match format {
        "text" => Ok(Format::Text),
        "json" => Ok(Format::Json),
        other => Err(CoreError::Config(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn determine_output(config: Option<&LoggingConfig>) -> Result<Output, CoreError> {
    if let Ok(output) = std::env::var("COURSEGEN_LOG_OUTPUT") {
        return parse_output(&output);
    }
    parse_output(config.map(|c| c.output.as_str()).unwrap_or("stderr"))
}

fn parse_output(output: &str) -> Result<Output, CoreError> {
    match output {
        "stdout" => Ok(Output::Stdout),
        "stderr" => Ok(Output::Stderr),
        "file" => Ok(Output::File),
        other => Err(CoreError::Config(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr', or 'file')",
            other
        ))),
    }
}
