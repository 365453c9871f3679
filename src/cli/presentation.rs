//! CLI presentation: text and json formatters per command family.

mod artifacts;
mod job;
mod providers;
mod shared;

pub use artifacts::{format_artifacts_json, format_artifacts_text};
pub use job::{
    format_completion_json, format_completion_text, format_job_json, format_job_text,
    format_progress_line, format_submitted_json, format_submitted_text,
};
pub use providers::{format_providers_json, format_providers_text};
pub use shared::to_json;
