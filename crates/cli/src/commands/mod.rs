pub mod check;
pub mod serve;

use std::path::Path;

use anyhow::Context;
use mastermind_config::AppConfig;

/// Load config from `path`, or from the default location.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::load_with_env(path),
        None => AppConfig::load(),
    };
    config.context("Failed to load config")
}
