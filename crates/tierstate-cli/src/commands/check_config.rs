//! Configuration validation

use anyhow::{Context, Result};
use std::path::Path;
use tierstate_core::TierConfig;

/// Load a config file, apply environment overrides and validate the result
pub fn load(path: Option<&Path>) -> Result<TierConfig> {
    load_with_vars(path, std::env::vars())
}

/// Like [`load`], taking the override variables explicitly
pub fn load_with_vars<I, K, V>(path: Option<&Path>, vars: I) -> Result<TierConfig>
where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
{
    let mut config = match path {
        Some(path) => TierConfig::load_from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => TierConfig::default(),
    };
    config
        .merge_with_vars(vars)
        .context("applying TIERSTATE_* overrides")?;
    Ok(config)
}

/// Validate a config file and render the effective configuration
pub fn run(path: &Path) -> Result<String> {
    Ok(render(&load(Some(path))?))
}

/// Render a configuration as TOML-like text
pub fn render(config: &TierConfig) -> String {
    format!(
        "[controller]\nevent_channel_capacity = {}\n\n\
         [pressure]\ngrace_threshold = {}\ncancel_threshold = {}\n\n\
         [flush]\ngrace_period_ms = {}\nmax_attempts = {}\nretry_backoff_ms = {}\n",
        config.controller.event_channel_capacity,
        config.pressure.grace_threshold,
        config.pressure.cancel_threshold,
        config.flush.grace_period_ms,
        config.flush.max_attempts,
        config.flush.retry_backoff_ms,
    )
}
