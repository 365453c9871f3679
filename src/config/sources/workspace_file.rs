//! Per-project settings checked in next to the course material.
//!
//! A coursegen workspace keeps its API endpoint and polling cadence under
//! `<workspace>/config/`: `config.toml` for shared settings and one
//! `<env>.toml` per deployment (`development`, `staging`, ...), picked by
//! `COURSEGEN_ENV`.

use config::builder::DefaultState;
use config::{ConfigBuilder, ConfigError, File};
use std::path::{Path, PathBuf};

const ENV_VAR: &str = "COURSEGEN_ENV";
const DEFAULT_ENV: &str = "development";

/// Files read from `workspace_root`, lowest precedence first.
fn workspace_files(workspace_root: &Path) -> [PathBuf; 2] {
    let config_dir = workspace_root.join("config");
    let deployment = std::env::var(ENV_VAR).unwrap_or_else(|_| DEFAULT_ENV.to_string());
    [
        config_dir.join("config.toml"),
        config_dir.join(format!("{}.toml", deployment)),
    ]
}

/// Layer the workspace's shared file, then its deployment file, onto `builder`.
/// Missing files are skipped.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Ok(workspace_files(workspace_root)
        .into_iter()
        .filter(|path| path.exists())
        .fold(builder, |builder, path| {
            builder.add_source(File::from(path).required(false))
        }))
}
