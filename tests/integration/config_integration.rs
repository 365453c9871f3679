//! Integration tests for the configuration system

use crate::integration::test_utils::with_isolated_env;
use coursegen::config::{ConfigLoader, ConfigValidationError, CoursegenConfig};
use std::time::Duration;
use tempfile::TempDir;

#[test]
fn test_environment_overrides_files() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("workspace");
    std::fs::create_dir_all(workspace.join("config")).unwrap();
    std::fs::write(
        workspace.join("config").join("config.toml"),
        r#"
[api]
base_url = "http://workspace:8000"

[polling]
success_interval_ms = 800
failure_interval_ms = 1600
"#,
    )
    .unwrap();

    let config = with_isolated_env(
        &test_dir,
        &[
            ("COURSEGEN__API__BASE_URL", "http://env:9000"),
            ("COURSEGEN__POLLING__MAX_CONSECUTIVE_FAILURES", "6"),
        ],
        || ConfigLoader::load(&workspace).unwrap(),
    );

    assert_eq!(config.api.base_url, "http://env:9000");
    assert_eq!(config.polling.success_interval_ms, 800);
    assert_eq!(config.polling.max_consecutive_failures, Some(6));
    assert!(config.validate().is_ok());

    let policy = config.polling.to_policy();
    assert_eq!(policy.success_interval, Duration::from_millis(800));
    assert_eq!(policy.failure_interval, Duration::from_millis(1600));
}

#[test]
fn test_environment_specific_workspace_file() {
    let test_dir = TempDir::new().unwrap();
    let workspace = test_dir.path().join("workspace");
    let config_dir = workspace.join("config");
    std::fs::create_dir_all(&config_dir).unwrap();
    std::fs::write(
        config_dir.join("config.toml"),
        "[api]\nbase_url = \"http://base:8000\"\n",
    )
    .unwrap();
    std::fs::write(
        config_dir.join("staging.toml"),
        "[api]\nbase_url = \"https://staging.example.com\"\nrequest_timeout_ms = 30000\n",
    )
    .unwrap();

    let config = with_isolated_env(&test_dir, &[("COURSEGEN_ENV", "staging")], || {
        ConfigLoader::load(&workspace).unwrap()
    });

    assert_eq!(config.api.base_url, "https://staging.example.com");
    let options = config.api.client_options();
    assert_eq!(options.request_timeout, Some(Duration::from_secs(30)));
    assert_eq!(options.connect_timeout, Duration::from_secs(10));
}

#[test]
fn test_global_config_from_xdg_config_home() {
    let test_dir = TempDir::new().unwrap();
    let global_dir = test_dir.path().join("config-home").join("coursegen");
    std::fs::create_dir_all(&global_dir).unwrap();
    std::fs::write(
        global_dir.join("config.toml"),
        r#"
[logging]
level = "debug"
format = "json"

[logging.modules]
"coursegen::poller" = "trace"
"#,
    )
    .unwrap();
    let workspace = test_dir.path().join("workspace");
    std::fs::create_dir_all(&workspace).unwrap();

    let config = with_isolated_env(&test_dir, &[], || ConfigLoader::load(&workspace).unwrap());

    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.logging.format, "json");
    assert_eq!(
        config.logging.modules.get("coursegen::poller").map(String::as_str),
        Some("trace")
    );
}

#[test]
fn test_invalid_polling_config_is_reported() {
    let test_dir = TempDir::new().unwrap();
    let config_file = test_dir.path().join("coursegen.toml");
    std::fs::write(
        &config_file,
        r#"
[api]
base_url = "ftp://files"

[polling]
success_interval_ms = 2000
failure_interval_ms = 2000

[logging]
output = "syslog"
"#,
    )
    .unwrap();

    let config: CoursegenConfig =
        with_isolated_env(&test_dir, &[], || ConfigLoader::load_from_file(&config_file).unwrap());
    let errors = config.validate().unwrap_err();
    assert_eq!(errors.len(), 3);
    assert!(matches!(errors[0], ConfigValidationError::Api(_)));
    assert!(matches!(errors[1], ConfigValidationError::Polling(_)));
    assert!(matches!(errors[2], ConfigValidationError::Logging(_)));
}
