//! Artifact listing presentation.

use super::shared::{format_section_heading, or_dash, to_json};
use crate::error::CoreError;
use crate::types::Artifact;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;
use serde_json::json;

pub fn format_artifacts_text(chapter_id: Option<i64>, artifacts: &[Artifact]) -> String {
    let title = match chapter_id {
        Some(id) => format!("Artifacts for chapter {}", id),
        None => "Artifacts".to_string(),
    };
    let mut out = format!("{}\n\n", format_section_heading(&title));
    if artifacts.is_empty() {
        out.push_str("No artifacts generated yet.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Type", "Version", "Provider", "Model", "Created"]);
    for artifact in artifacts {
        table.add_row(vec![
            artifact.artifact_type.to_string(),
            artifact.version.to_string(),
            artifact.provider.clone(),
            artifact.model.clone(),
            or_dash(artifact.created_at.as_deref()),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!("Total: {} artifact(s)\n", artifacts.len()));
    out
}

pub fn format_artifacts_json(chapter_id: i64, artifacts: &[Artifact]) -> Result<String, CoreError> {
    to_json(&json!({
        "chapter_id": chapter_id,
        "artifacts": artifacts,
        "total": artifacts.len(),
    }))
}
