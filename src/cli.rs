//! CLI domain: parse, route, help, output, and presentation only.
//! No domain orchestration; single route table dispatches to the generation core.

mod help;
mod output;
mod parse;
mod presentation;
mod route;

pub use help::command_name;
pub use output::map_error;
pub use parse::{Cli, Commands, ConfigFormat, OutputFormat};
pub use presentation::{
    format_artifacts_json, format_artifacts_text, format_completion_json, format_completion_text,
    format_job_json, format_job_text, format_progress_line, format_providers_json,
    format_providers_text, format_submitted_json, format_submitted_text,
};
pub use route::RunContext;
