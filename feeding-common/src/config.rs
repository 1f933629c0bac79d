//! Configuration for the feeding bot.
//!
//! The bot reads `~/.feeding-bot/config.json`. Every field has a default, so a
//! missing file is fine as long as the bot token arrives via the environment.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `FEEDING_BOT_TOKEN` (then `BOT_TOKEN`, then `TOKEN`) → telegram.bot_token
//! - `FEEDING_LOG_LEVEL` → observability.log_level
//! - `FEEDING_LOG_FORMAT` → observability.log_format
//! - `FEEDING_UTC_OFFSET` → clock.utc_offset

use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result, ResultExt};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".feeding-bot"),
        |dirs| dirs.home_dir().join(".feeding-bot"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Telegram Bot API settings
    #[serde(default)]
    pub telegram: TelegramConfig,

    /// Timezone the bot stamps feedings in
    #[serde(default)]
    pub clock: ClockConfig,

    /// Logging configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .context(format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration and apply environment variable overrides.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable source.
    pub fn apply_overrides_from<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = ["FEEDING_BOT_TOKEN", "BOT_TOKEN", "TOKEN"]
            .iter()
            .find_map(|key| var(key).filter(|v| !v.trim().is_empty()));
        if let Some(token) = token {
            self.telegram.bot_token = token;
        }

        if let Some(level) = var("FEEDING_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = var("FEEDING_LOG_FORMAT") {
            self.observability.log_format = format;
        }
        if let Some(offset) = var("FEEDING_UTC_OFFSET") {
            self.clock.utc_offset = offset;
        }
    }

    /// Check that the configuration can actually run a bot.
    pub fn validate(&self) -> Result<()> {
        if self.telegram.bot_token.trim().is_empty() {
            return Err(Error::Config(
                "telegram bot token is not set (FEEDING_BOT_TOKEN)".into(),
            ));
        }
        if self.telegram.poll_timeout_secs == 0 {
            return Err(Error::Config("telegram.poll_timeout_secs must be > 0".into()));
        }
        self.clock
            .offset()
            .map_err(|e| e.with_context("clock.utc_offset"))?;
        Ok(())
    }
}

// ============================================================================
// Telegram
// ============================================================================

/// Telegram Bot API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    /// Token from BotFather
    #[serde(default)]
    pub bot_token: String,

    /// Bot API base URL (overridden in tests)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Long-poll timeout passed to getUpdates
    #[serde(default = "default_poll_timeout")]
    pub poll_timeout_secs: u64,

    /// Upper bound for every other Bot API call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Chats the bot answers in; empty means all chats
    #[serde(default)]
    pub allowed_chats: Vec<i64>,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: String::new(),
            api_base: default_api_base(),
            poll_timeout_secs: default_poll_timeout(),
            request_timeout_secs: default_request_timeout(),
            allowed_chats: Vec::new(),
        }
    }
}

fn default_api_base() -> String {
    "https://api.telegram.org".into()
}

fn default_poll_timeout() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    10
}

// ============================================================================
// Clock
// ============================================================================

/// Fixed timezone used for every timestamp the bot shows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockConfig {
    /// UTC offset in `+HH:MM` form. Moscow time by default.
    #[serde(default = "default_utc_offset")]
    pub utc_offset: String,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            utc_offset: default_utc_offset(),
        }
    }
}

fn default_utc_offset() -> String {
    "+03:00".into()
}

impl ClockConfig {
    /// Parse the configured offset.
    pub fn offset(&self) -> Result<FixedOffset> {
        parse_utc_offset(&self.utc_offset)
    }
}

/// Parse `+HH:MM`, `-HH:MM` or `+HHMM`.
pub fn parse_utc_offset(raw: &str) -> Result<FixedOffset> {
    raw.trim()
        .parse::<FixedOffset>()
        .map_err(|_| Error::Config(format!("invalid UTC offset: {raw:?}")))
}

// ============================================================================
// Observability
// ============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
        }
    }
}

fn default_log_level() -> String {
    "info".into()
}

fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_sensible() {
        let config = Config::default();
        assert_eq!(config.telegram.api_base, "https://api.telegram.org");
        assert_eq!(config.telegram.poll_timeout_secs, 30);
        assert_eq!(config.clock.utc_offset, "+03:00");
        assert_eq!(config.observability.log_level, "info");
        assert!(config.telegram.allowed_chats.is_empty());
    }

    #[test]
    fn load_from_file_fills_missing_fields() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"telegram": {{"bot_token": "123:ABC", "allowed_chats": [-100]}},
               "observability": {{"level": "debug"}}}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.telegram.bot_token, "123:ABC");
        assert_eq!(config.telegram.allowed_chats, vec![-100]);
        assert_eq!(config.telegram.request_timeout_secs, 10);
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn load_from_rejects_broken_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();
        let err = Config::load_from(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn token_env_precedence() {
        let mut config = Config::default();
        config.apply_overrides_from(env(&[("TOKEN", "legacy"), ("BOT_TOKEN", "bot")]));
        assert_eq!(config.telegram.bot_token, "bot");

        config.apply_overrides_from(env(&[("FEEDING_BOT_TOKEN", "primary"), ("TOKEN", "x")]));
        assert_eq!(config.telegram.bot_token, "primary");
    }

    #[test]
    fn blank_token_env_is_ignored() {
        let mut config = Config::default();
        config.telegram.bot_token = "from-file".into();
        config.apply_overrides_from(env(&[("FEEDING_BOT_TOKEN", "  ")]));
        assert_eq!(config.telegram.bot_token, "from-file");
    }

    #[test]
    fn env_overrides_logging_and_offset() {
        let mut config = Config::default();
        config.apply_overrides_from(env(&[
            ("FEEDING_LOG_LEVEL", "warn"),
            ("FEEDING_LOG_FORMAT", "json"),
            ("FEEDING_UTC_OFFSET", "+05:30"),
        ]));
        assert_eq!(config.observability.log_level, "warn");
        assert_eq!(config.observability.log_format, "json");
        assert_eq!(config.clock.offset().unwrap().local_minus_utc(), 5 * 3600 + 1800);
    }

    #[test]
    fn validate_requires_token() {
        let config = Config::default();
        assert!(config.validate().unwrap_err().is_config());

        let mut config = Config::default();
        config.telegram.bot_token = "123:ABC".into();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_offset() {
        let mut config = Config::default();
        config.telegram.bot_token = "123:ABC".into();
        config.clock.utc_offset = "Europe/Moscow".into();
        let err = config.validate().unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().starts_with("clock.utc_offset: "));
    }

    #[test]
    fn parse_offsets() {
        assert_eq!(parse_utc_offset("+03:00").unwrap().local_minus_utc(), 10_800);
        assert_eq!(parse_utc_offset("-0430").unwrap().local_minus_utc(), -16_200);
        assert_eq!(parse_utc_offset(" +00:00 ").unwrap().local_minus_utc(), 0);
        assert!(parse_utc_offset("+00").is_err());
        assert!(parse_utc_offset("03:00").is_err());
        assert!(parse_utc_offset("+3").is_err());
        assert!(parse_utc_offset("+25:00").is_err());
        assert!(parse_utc_offset("+03:75").is_err());
        assert!(parse_utc_offset("+ab:cd").is_err());
        assert!(parse_utc_offset("Europe/Moscow").is_err());
    }
}
