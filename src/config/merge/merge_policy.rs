//! Merge rules: defaults first, then files, then environment.

use crate::service::DEFAULT_API_BASE;
use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("api.base_url", DEFAULT_API_BASE)?
        .set_default("api.connect_timeout_ms", 10_000)?
        .set_default("polling.success_interval_ms", 1200)?
        .set_default("polling.failure_interval_ms", 2000)
}
