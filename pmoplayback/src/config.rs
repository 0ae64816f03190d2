//! Configuration for playback sessions.
//!
//! Every field has a default, so an empty YAML document (or none at all)
//! yields a usable configuration. Values can be overridden from the
//! environment with `PMOPLAYBACK_CONFIG__<FIELD>` variables, nested fields
//! joined by a double underscore (e.g. `PMOPLAYBACK_CONFIG__RETRY__MAX_ATTEMPTS_PER_ENGINE`).

use std::{env, fs, path::Path, time::Duration};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::*;
use crate::errors::PlaybackError;

const ENV_PREFIX: &str = "PMOPLAYBACK_CONFIG__";

/// Top-level configuration block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    #[serde(default = "PlaybackConfig::default_buffer_timeout")]
    pub buffer_timeout_secs: u64,
    #[serde(default = "PlaybackConfig::default_manual_actions_grace")]
    pub manual_actions_grace_secs: u64,
    #[serde(default = "PlaybackConfig::default_overlay_hide")]
    pub overlay_hide_secs: u64,
    #[serde(default = "PlaybackConfig::default_seek_step")]
    pub seek_step_secs: u64,
    #[serde(default = "PlaybackConfig::default_progress_save_interval")]
    pub progress_save_interval_ms: u64,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub number_entry: NumberEntryConfig,
}

impl PlaybackConfig {
    const fn default_buffer_timeout() -> u64 {
        DEFAULT_BUFFER_TIMEOUT_SECONDS
    }

    const fn default_manual_actions_grace() -> u64 {
        MANUAL_ACTIONS_GRACE_SECONDS
    }

    const fn default_overlay_hide() -> u64 {
        OVERLAY_HIDE_SECONDS
    }

    const fn default_seek_step() -> u64 {
        SEEK_STEP_SECONDS
    }

    const fn default_progress_save_interval() -> u64 {
        PROGRESS_SAVE_INTERVAL_MS
    }

    /// Parses a YAML document and validates the result.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: PlaybackConfig =
            serde_yaml::from_str(yaml).context("Cannot parse playback configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the configuration file at `path`, then applies environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .with_context(|| format!("Cannot read playback configuration {}", path.display()))?;
        let mut config = Self::from_yaml_str(&yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        debug!(path = %path.display(), ?config, "Playback configuration loaded");
        Ok(config)
    }

    /// Applies `PMOPLAYBACK_CONFIG__*` variables on top of the current values.
    ///
    /// Unknown variables and unparsable values are logged and skipped.
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in env::vars() {
            let Some(field) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let field = field.to_ascii_lowercase();
            if !self.set_field(&field, &value) {
                warn!(variable = %key, value = %value, "Ignoring playback configuration override");
            }
        }
    }

    fn set_field(&mut self, field: &str, value: &str) -> bool {
        fn parse<T: std::str::FromStr>(value: &str, slot: &mut T) -> bool {
            match value.trim().parse() {
                Ok(parsed) => {
                    *slot = parsed;
                    true
                }
                Err(_) => false,
            }
        }

        match field {
            "buffer_timeout_secs" => parse(value, &mut self.buffer_timeout_secs),
            "manual_actions_grace_secs" => parse(value, &mut self.manual_actions_grace_secs),
            "overlay_hide_secs" => parse(value, &mut self.overlay_hide_secs),
            "seek_step_secs" => parse(value, &mut self.seek_step_secs),
            "progress_save_interval_ms" => parse(value, &mut self.progress_save_interval_ms),
            "retry__max_attempts_per_engine" => {
                parse(value, &mut self.retry.max_attempts_per_engine)
            }
            "retry__fail_fast_on_unavailable" => {
                parse(value, &mut self.retry.fail_fast_on_unavailable)
            }
            "retry__delays_secs" => {
                let delays: Result<Vec<u64>, _> =
                    value.split(',').map(|d| d.trim().parse::<u64>()).collect();
                match delays {
                    Ok(delays) => {
                        self.retry.delays_secs = delays;
                        true
                    }
                    Err(_) => false,
                }
            }
            "number_entry__max_digits" => parse(value, &mut self.number_entry.max_digits),
            "number_entry__debounce_ms" => parse(value, &mut self.number_entry.debounce_ms),
            _ => false,
        }
    }

    /// Checks the invariants the controller relies on.
    pub fn validate(&self) -> Result<(), PlaybackError> {
        if !BUFFER_TIMEOUT_CHOICES.contains(&self.buffer_timeout_secs) {
            return Err(PlaybackError::InvalidConfig(format!(
                "buffer_timeout_secs must be one of {:?}, got {}",
                BUFFER_TIMEOUT_CHOICES, self.buffer_timeout_secs
            )));
        }
        if self.overlay_hide_secs == 0 {
            return Err(PlaybackError::InvalidConfig(
                "overlay_hide_secs must be greater than 0".to_string(),
            ));
        }
        check_at_most(
            "overlay_hide_secs",
            self.overlay_hide_secs,
            MAX_TIMER_DELAY_SECONDS,
        )?;
        check_at_most(
            "manual_actions_grace_secs",
            self.manual_actions_grace_secs,
            MAX_STEP_SECONDS,
        )?;
        check_at_most("seek_step_secs", self.seek_step_secs, MAX_STEP_SECONDS)?;
        check_at_most(
            "progress_save_interval_ms",
            self.progress_save_interval_ms,
            MAX_TIMER_DELAY_SECONDS * 1000,
        )?;
        for delay in &self.retry.delays_secs {
            check_at_most("retry.delays_secs", *delay, MAX_TIMER_DELAY_SECONDS)?;
        }
        check_at_most(
            "number_entry.debounce_ms",
            self.number_entry.debounce_ms,
            MAX_TIMER_DELAY_SECONDS * 1000,
        )?;
        if self.retry.max_attempts_per_engine == 0 {
            return Err(PlaybackError::InvalidConfig(
                "retry.max_attempts_per_engine must be greater than 0".to_string(),
            ));
        }
        if self.retry.delays_secs.is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "retry.delays_secs must not be empty".to_string(),
            ));
        }
        if self.number_entry.max_digits == 0 {
            return Err(PlaybackError::InvalidConfig(
                "number_entry.max_digits must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn buffer_timeout(&self) -> Duration {
        Duration::from_secs(self.buffer_timeout_secs)
    }

    /// Buffering time after which manual recovery actions are offered.
    pub fn manual_actions_after(&self) -> Duration {
        Duration::from_secs(
            self.buffer_timeout_secs
                .saturating_add(self.manual_actions_grace_secs),
        )
    }

    pub fn overlay_hide_delay(&self) -> Duration {
        Duration::from_secs(self.overlay_hide_secs)
    }

    pub fn progress_save_interval(&self) -> Duration {
        Duration::from_millis(self.progress_save_interval_ms)
    }
}

fn check_at_most(field: &str, value: u64, max: u64) -> Result<(), PlaybackError> {
    if value > max {
        return Err(PlaybackError::InvalidConfig(format!(
            "{field} must be at most {max}, got {value}"
        )));
    }
    Ok(())
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            buffer_timeout_secs: Self::default_buffer_timeout(),
            manual_actions_grace_secs: Self::default_manual_actions_grace(),
            overlay_hide_secs: Self::default_overlay_hide(),
            seek_step_secs: Self::default_seek_step(),
            progress_save_interval_ms: Self::default_progress_save_interval(),
            retry: RetryConfig::default(),
            number_entry: NumberEntryConfig::default(),
        }
    }
}

/// Automatic retry and failover tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "RetryConfig::default_max_attempts")]
    pub max_attempts_per_engine: u32,
    #[serde(default = "RetryConfig::default_delays")]
    pub delays_secs: Vec<u64>,
    /// Go straight to `Error(StreamUnavailable)` instead of retrying an
    /// unavailable stream.
    #[serde(default)]
    pub fail_fast_on_unavailable: bool,
}

impl RetryConfig {
    const fn default_max_attempts() -> u32 {
        MAX_RETRIES_PER_ENGINE
    }

    fn default_delays() -> Vec<u64> {
        RETRY_DELAYS_SECONDS.to_vec()
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts_per_engine: Self::default_max_attempts(),
            delays_secs: Self::default_delays(),
            fail_fast_on_unavailable: false,
        }
    }
}

/// Numeric channel entry tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumberEntryConfig {
    #[serde(default = "NumberEntryConfig::default_max_digits")]
    pub max_digits: usize,
    #[serde(default = "NumberEntryConfig::default_debounce")]
    pub debounce_ms: u64,
}

impl NumberEntryConfig {
    const fn default_max_digits() -> usize {
        NUMBER_ENTRY_MAX_DIGITS
    }

    const fn default_debounce() -> u64 {
        NUMBER_ENTRY_DEBOUNCE_MS
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for NumberEntryConfig {
    fn default() -> Self {
        Self {
            max_digits: Self::default_max_digits(),
            debounce_ms: Self::default_debounce(),
        }
    }
}
