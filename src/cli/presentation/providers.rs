//! Provider catalog presentation.

use super::shared::{format_section_heading, to_json};
use crate::error::CoreError;
use crate::types::ProviderListing;
use comfy_table::presets::UTF8_BORDERS_ONLY;
use comfy_table::Table;

pub fn format_providers_text(listing: &ProviderListing) -> String {
    let mut out = format!("{}\n\n", format_section_heading("Providers"));
    if listing.providers.is_empty() {
        out.push_str("No providers available.\n");
        return out;
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Provider", "Models", "Default"]);
    for entry in &listing.providers {
        let is_default = if entry.id == listing.default_provider {
            "yes"
        } else {
            ""
        };
        table.add_row(vec![
            entry.id.clone(),
            entry.models.join(", "),
            is_default.to_string(),
        ]);
    }
    out.push_str(&format!("{}\n\n", table));
    out.push_str(&format!("Total: {} provider(s)\n", listing.providers.len()));
    out
}

pub fn format_providers_json(listing: &ProviderListing) -> Result<String, CoreError> {
    to_json(listing)
}
