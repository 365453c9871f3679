//! CLI parse: clap types for coursegen. No behavior; definitions only.

use crate::types::{Difficulty, Length, Tone};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// coursegen - submit and track chapter generation jobs
#[derive(Parser)]
#[command(name = "coursegen")]
#[command(about = "Submit chapter generation jobs and track them to completion")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// API base URL (overrides [api] base_url)
    #[arg(long)]
    pub api_base: Option<String>,

    /// Workspace root directory (for config/config.toml)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Log output (stdout, stderr, file)
    #[arg(long)]
    pub log_output: Option<String>,

    /// Log file path (if output is "file")
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

/// Output format of the `config` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ConfigFormat {
    Toml,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Submit a generation job for one chapter
    Generate {
        book_id: i64,
        /// 1-based chapter index within the book
        chapter_index: i64,

        /// Request a summary (no output flags requests all four)
        #[arg(long)]
        summary: bool,
        /// Request a quiz
        #[arg(long)]
        quiz: bool,
        /// Request a lab
        #[arg(long)]
        lab: bool,
        /// Request key takeaways
        #[arg(long)]
        takeaways: bool,

        #[arg(long, value_enum)]
        difficulty: Option<Difficulty>,
        #[arg(long, value_enum)]
        tone: Option<Tone>,
        #[arg(long, value_enum)]
        length: Option<Length>,

        /// Ask the generator to leave out code samples
        #[arg(long)]
        no_code: bool,

        /// Provider id (default: the catalog's default provider)
        #[arg(long)]
        provider: Option<String>,
        /// Model id (default: the provider's first model)
        #[arg(long)]
        model: Option<String>,
        /// Sampling temperature, 0.0 to 1.5
        #[arg(long)]
        temperature: Option<f64>,

        /// Track the job until it finishes, then list the chapter's artifacts
        #[arg(long)]
        wait: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Show one job snapshot and its stage
    Job {
        job_id: String,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Poll a job until it reaches a terminal status
    Watch {
        job_id: String,

        /// Chapter whose artifacts are listed once the job finishes
        #[arg(long)]
        chapter_id: Option<i64>,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List the latest generated artifact of each type for a chapter
    Artifacts {
        chapter_id: i64,

        /// Show every stored version instead of only the latest per type
        #[arg(long)]
        all: bool,

        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// List providers and their models
    Providers {
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
    /// Print the effective configuration
    Config {
        #[arg(long, value_enum, default_value_t = ConfigFormat::Toml)]
        format: ConfigFormat,
    },
}
