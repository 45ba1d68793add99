//! Configuration for the tier controller and its background workers
//!
//! Loaded from TOML, overridable through `TIERSTATE_*` environment variables:
//!
//! ```toml
//! [controller]
//! event_channel_capacity = 1024
//!
//! [pressure]
//! grace_threshold = 0.9
//! cancel_threshold = 0.7
//!
//! [flush]
//! grace_period_ms = 5000
//! max_attempts = 3
//! retry_backoff_ms = 200
//! ```

use crate::errors::{Result, TierError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Prefix of environment variables recognized by [`TierConfig::merge_with_env`]
pub const ENV_PREFIX: &str = "TIERSTATE_";

/// Keys accepted by [`TierConfig::set_from_string`]
pub const CONFIG_KEYS: [&str; 6] = [
    "controller_event_channel_capacity",
    "pressure_grace_threshold",
    "pressure_cancel_threshold",
    "flush_grace_period_ms",
    "flush_max_attempts",
    "flush_retry_backoff_ms",
];

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    /// Controller settings
    pub controller: ControllerConfig,
    /// Capacity pressure policy
    pub pressure: PressureConfig,
    /// Flush worker settings
    pub flush: FlushConfig,
}

/// Controller settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Buffer size of the transition event broadcast channel
    pub event_channel_capacity: usize,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: 1024,
        }
    }
}

/// Capacity pressure thresholds, as fractions of partition capacity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PressureConfig {
    /// Utilization at or above which an in-memory partition enters grace
    pub grace_threshold: f64,
    /// Utilization below which a partition in grace returns to memory
    pub cancel_threshold: f64,
}

impl Default for PressureConfig {
    fn default() -> Self {
        Self {
            grace_threshold: 0.9,
            cancel_threshold: 0.7,
        }
    }
}

/// Flush worker settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlushConfig {
    /// How long a partition stays in grace before its flush starts
    pub grace_period_ms: u64,
    /// Attempts at persisting a partition before the flush is aborted
    pub max_attempts: u32,
    /// Base delay between attempts, multiplied by the attempt number
    pub retry_backoff_ms: u64,
}

impl Default for FlushConfig {
    fn default() -> Self {
        Self {
            grace_period_ms: 5_000,
            max_attempts: 3,
            retry_backoff_ms: 200,
        }
    }
}

impl FlushConfig {
    /// Grace period as a duration
    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    /// Delay before retrying after `attempt` failed attempts
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.retry_backoff_ms.saturating_mul(u64::from(attempt)))
    }
}

impl TierConfig {
    /// Create config for testing (no grace period, fast retries)
    pub fn for_testing() -> Self {
        Self {
            controller: ControllerConfig {
                event_channel_capacity: 64,
            },
            pressure: PressureConfig::default(),
            flush: FlushConfig {
                grace_period_ms: 0,
                max_attempts: 3,
                retry_backoff_ms: 1,
            },
        }
    }

    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file and validate it
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TierError::config(format!(
                "Failed to read config file {}: {e}",
                path.display()
            ))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!(path = %path.display(), "Loaded tier configuration");
        Ok(config)
    }

    /// Merge with `TIERSTATE_*` environment variables
    pub fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_vars(std::env::vars())
    }

    /// Merge with key/value pairs using the environment variable convention
    ///
    /// `TIERSTATE_FLUSH_MAX_ATTEMPTS=5` sets `flush.max_attempts`. Variables
    /// without the prefix are ignored, and so are prefixed variables that name
    /// no setting (e.g. `TIERSTATE_LOG`), with a warning. A known key with an
    /// unparsable value is an error.
    pub fn merge_with_vars<I, K, V>(&mut self, vars: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(config_key) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let config_key = config_key.to_lowercase();
            if !CONFIG_KEYS.contains(&config_key.as_str()) {
                tracing::warn!(variable = key.as_ref(), "Ignoring unknown tierstate variable");
                continue;
            }
            self.set_from_string(&config_key, value.as_ref())?;
        }
        self.validate()
    }

    /// Set a single value by its underscore-joined key (one of [`CONFIG_KEYS`]), e.g. `pressure_grace_threshold`
    pub fn set_from_string(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "controller_event_channel_capacity" => {
                self.controller.event_channel_capacity = parse_value(key, value)?;
            }
            "pressure_grace_threshold" => self.pressure.grace_threshold = parse_value(key, value)?,
            "pressure_cancel_threshold" => {
                self.pressure.cancel_threshold = parse_value(key, value)?;
            }
            "flush_grace_period_ms" => self.flush.grace_period_ms = parse_value(key, value)?,
            "flush_max_attempts" => self.flush.max_attempts = parse_value(key, value)?,
            "flush_retry_backoff_ms" => self.flush.retry_backoff_ms = parse_value(key, value)?,
            _ => return Err(TierError::config(format!("Unknown configuration key: {key}"))),
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.controller.event_channel_capacity == 0 {
            return Err(TierError::config(
                "controller.event_channel_capacity must be greater than zero",
            ));
        }

        let PressureConfig {
            grace_threshold,
            cancel_threshold,
        } = self.pressure;
        if !(0.0..=1.0).contains(&grace_threshold) {
            return Err(TierError::config(format!(
                "pressure.grace_threshold must be within [0, 1], got {grace_threshold}"
            )));
        }
        if !(0.0..=1.0).contains(&cancel_threshold) {
            return Err(TierError::config(format!(
                "pressure.cancel_threshold must be within [0, 1], got {cancel_threshold}"
            )));
        }
        if cancel_threshold > grace_threshold {
            return Err(TierError::config(format!(
                "pressure.cancel_threshold ({cancel_threshold}) must not exceed \
                 pressure.grace_threshold ({grace_threshold})"
            )));
        }

        if self.flush.max_attempts == 0 {
            return Err(TierError::config(
                "flush.max_attempts must be at least one",
            ));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| TierError::config(format!("Invalid value for {key}: {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn test_defaults_are_valid() {
        assert!(TierConfig::default().validate().is_ok());
        assert!(TierConfig::for_testing().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = TierConfig::from_toml_str(
            r#"
            [flush]
            max_attempts = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.flush.max_attempts, 5);
        assert_eq!(config.flush.grace_period_ms, 5_000);
        assert_eq!(config.pressure, PressureConfig::default());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let result = TierConfig::from_toml_str(
            r#"
            [pressure]
            grace_threshold = 0.5
            cancel_threshold = 0.8
            "#,
        );
        assert_matches!(result, Err(TierError::Config { .. }));
    }

    #[test]
    fn test_zero_attempts_rejected() {
        let mut config = TierConfig::default();
        config.flush.max_attempts = 0;
        assert_matches!(config.validate(), Err(TierError::Config { .. }));
    }

    #[test]
    fn test_malformed_toml_is_config_error() {
        assert_matches!(
            TierConfig::from_toml_str("[flush\nmax_attempts = "),
            Err(TierError::Config { .. })
        );
    }

    #[test]
    fn test_env_overrides() {
        let mut config = TierConfig::default();
        config
            .merge_with_vars([
                ("TIERSTATE_FLUSH_MAX_ATTEMPTS", "7"),
                ("TIERSTATE_PRESSURE_GRACE_THRESHOLD", "0.95"),
                ("HOME", "/root"),
            ])
            .unwrap();
        assert_eq!(config.flush.max_attempts, 7);
        assert_eq!(config.pressure.grace_threshold, 0.95);
    }

    #[test]
    fn test_env_unknown_key_ignored() {
        let mut config = TierConfig::default();
        config
            .merge_with_vars([
                ("TIERSTATE_LOG", "debug"),
                ("TIERSTATE_FLUSH_COLOR", "blue"),
                ("TIERSTATE_FLUSH_RETRY_BACKOFF_MS", "50"),
            ])
            .unwrap();
        assert_eq!(config.flush.retry_backoff_ms, 50);
        assert_eq!(config.flush.max_attempts, 3);
    }

    #[test]
    fn test_env_bad_value_rejected() {
        let mut config = TierConfig::default();
        assert_matches!(
            config.merge_with_vars([("TIERSTATE_FLUSH_MAX_ATTEMPTS", "many")]),
            Err(TierError::Config { .. })
        );
        assert_matches!(
            config.set_from_string("flush_color", "blue"),
            Err(TierError::Config { .. })
        );
    }

    #[test]
    fn test_every_listed_key_is_settable() {
        let mut config = TierConfig::default();
        for key in CONFIG_KEYS {
            config.set_from_string(key, "1").unwrap();
        }
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tierstate.toml");
        std::fs::write(&path, "[controller]\nevent_channel_capacity = 8\n").unwrap();

        let config = TierConfig::load_from_file(&path).unwrap();
        assert_eq!(config.controller.event_channel_capacity, 8);

        let missing = TierConfig::load_from_file(&dir.path().join("missing.toml"));
        assert_matches!(missing, Err(TierError::Config { .. }));
    }

    #[test]
    fn test_backoff_grows_linearly() {
        let flush = FlushConfig {
            retry_backoff_ms: 100,
            ..FlushConfig::default()
        };
        assert_eq!(flush.backoff_for(1), Duration::from_millis(100));
        assert_eq!(flush.backoff_for(3), Duration::from_millis(300));
    }
}
