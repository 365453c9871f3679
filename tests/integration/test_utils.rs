//! Shared test utilities for integration tests
//!
//! Environment isolation for config loading, and canned API payloads for
//! the mock HTTP server.

use serde_json::{json, Value};
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes HOME / XDG_CONFIG_HOME / COURSEGEN__* access across tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

struct EnvState {
    home: Option<String>,
    xdg_config_home: Option<String>,
    overrides: Vec<(String, Option<String>)>,
}

impl EnvState {
    fn capture(keys: &[(&str, &str)]) -> Self {
        Self {
            home: std::env::var("HOME").ok(),
            xdg_config_home: std::env::var("XDG_CONFIG_HOME").ok(),
            overrides: keys
                .iter()
                .map(|(key, _)| (key.to_string(), std::env::var(key).ok()))
                .collect(),
        }
    }

    fn restore(self) {
        restore_var("HOME", self.home);
        restore_var("XDG_CONFIG_HOME", self.xdg_config_home);
        for (key, value) in self.overrides {
            restore_var(&key, value);
        }
    }
}

fn restore_var(key: &str, value: Option<String>) {
    match value {
        Some(orig) => std::env::set_var(key, orig),
        None => std::env::remove_var(key),
    }
}

/// Run `f` with XDG_CONFIG_HOME and HOME pointed into `test_dir`, plus the
/// given extra environment variables. Everything is restored afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    let env_state = EnvState::capture(vars);

    let test_config_home = test_dir.path().join("config-home");
    let test_home = test_dir.path().join("home");
    std::fs::create_dir_all(&test_config_home).unwrap();
    std::fs::create_dir_all(&test_home).unwrap();

    std::env::set_var("HOME", test_home.to_str().unwrap());
    std::env::set_var("XDG_CONFIG_HOME", test_config_home.to_str().unwrap());
    for (key, value) in vars {
        std::env::set_var(key, value);
    }

    let result = f();

    env_state.restore();

    result
}

pub fn job_json(id: &str, status: &str, progress: i64, message: Option<&str>) -> Value {
    json!({
        "id": id,
        "status": status,
        "progress": progress,
        "message": message,
        "payload": {},
        "created_at": "2024-05-01T10:00:00",
        "updated_at": "2024-05-01T10:00:05"
    })
}

pub fn providers_json() -> Value {
    json!({
        "default_provider": "openai",
        "providers": [
            { "id": "openai", "models": ["gpt-4.1-mini", "gpt-4.1"] },
            { "id": "anthropic", "models": ["claude-sonnet"] }
        ]
    })
}

pub fn artifact_json(id: i64, chapter_id: i64, artifact_type: &str, version: i64) -> Value {
    json!({
        "id": id,
        "chapter_id": chapter_id,
        "type": artifact_type,
        "content_md": format!("# {} v{}", artifact_type, version),
        "content_json": {},
        "provider": "openai",
        "model": "gpt-4.1-mini",
        "params_hash": "3f2a",
        "version": version,
        "created_at": "2024-05-01T10:01:00"
    })
}

pub fn chapters_json(book_id: i64) -> Value {
    json!([
        { "id": 41, "book_id": book_id, "index": 1, "title": "Getting Started", "word_count": 2100 },
        { "id": 42, "book_id": book_id, "index": 2, "title": "Ownership", "word_count": 3400 }
    ])
}
