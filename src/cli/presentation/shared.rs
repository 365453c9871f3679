//! Shared presentation helpers: headings, stage styling, json encoding.

use crate::error::CoreError;
use crate::stage::{Stage, StageView};
use owo_colors::OwoColorize;
use serde::Serialize;

/// Format a section heading with bold/underline.
pub fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Stage label colored by outcome: red for failure, green when done.
pub fn styled_stage_label(view: &StageView) -> String {
    let label = view.label();
    match view.stage {
        None => format!("{}", label.red().bold()),
        Some(Stage::Finished) => format!("{}", label.green().bold()),
        Some(Stage::Generating) => format!("{}", label.cyan()),
        Some(_) => format!("{}", label.yellow()),
    }
}

/// The four-step track, with steps up to the current one marked.
pub fn format_stage_track(view: &StageView) -> String {
    Stage::ALL
        .iter()
        .map(|stage| {
            let reached = view.stage.map(|s| s >= *stage).unwrap_or(false);
            if view.stage == Some(*stage) {
                format!("[{}]", stage.label())
            } else if reached {
                stage.label().to_string()
            } else {
                format!("{}", stage.label().dimmed())
            }
        })
        .collect::<Vec<_>>()
        .join(" > ")
}

pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, CoreError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::Output(format!("Failed to encode output: {}", e)))
}

pub fn or_dash(value: Option<&str>) -> String {
    value
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| "-".to_string())
}
