//! Job presentation: submission, snapshot, live progress and completion.

use super::shared::{format_section_heading, format_stage_track, or_dash, styled_stage_label, to_json};
use crate::error::CoreError;
use crate::poller::CompletionEvent;
use crate::stage::{resolve_snapshot, StageView};
use crate::types::{Artifact, JobId, JobSnapshot};
use serde_json::json;

pub fn format_submitted_text(job_id: &JobId) -> String {
    format!(
        "Submitted job {}\n\nTrack it with 'coursegen watch {}'",
        job_id, job_id
    )
}

pub fn format_submitted_json(job_id: &JobId) -> Result<String, CoreError> {
    to_json(&json!({ "job_id": job_id }))
}

pub fn format_job_text(job: &JobSnapshot) -> String {
    let view = resolve_snapshot(job);
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading(&format!("Job {}", job.id))));
    out.push_str(&format!("  Status:   {}\n", job.status));
    out.push_str(&format!("  Stage:    {}\n", styled_stage_label(&view)));
    out.push_str(&format!("  Progress: {}%\n", job.progress));
    out.push_str(&format!("  Message:  {}\n", or_dash(job.message.as_deref())));
    out.push_str(&format!("  Updated:  {}\n", or_dash(job.updated_at.as_deref())));
    if !view.failed {
        out.push_str(&format!("\n  {}\n", format_stage_track(&view)));
    }
    out
}

pub fn format_job_json(job: &JobSnapshot) -> Result<String, CoreError> {
    to_json(&json!({ "job": job, "stage": resolve_snapshot(job) }))
}

/// One progress line for a live snapshot, e.g. `[Generating] 45% Writing quiz`.
pub fn format_progress_line(job: &JobSnapshot, view: &StageView) -> String {
    match job.message.as_deref().filter(|m| !m.is_empty()) {
        Some(message) => format!("[{}] {}% {}", styled_stage_label(view), job.progress, message),
        None => format!("[{}] {}%", styled_stage_label(view), job.progress),
    }
}

pub fn format_completion_text(event: &CompletionEvent, artifacts: Option<&[Artifact]>) -> String {
    let mut out = format!("Job {} finished.\n", event.job_id);
    if let Some(artifacts) = artifacts {
        out.push('\n');
        out.push_str(&super::artifacts::format_artifacts_text(
            artifacts.first().map(|a| a.chapter_id),
            artifacts,
        ));
    }
    out
}

pub fn format_completion_json(
    event: &CompletionEvent,
    artifacts: Option<&[Artifact]>,
) -> Result<String, CoreError> {
    to_json(&json!({
        "job_id": event.job_id,
        "status": event.snapshot.status,
        "snapshot": event.snapshot,
        "artifacts": artifacts,
    }))
}
