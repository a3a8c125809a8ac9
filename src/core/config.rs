use crate::core::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Shortest polling interval accepted
pub const MIN_INTERVAL_SECS: u64 = 5;

pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub client: ClientConfig,
    pub notifier: NotifierConfig,
    pub schedule: ScheduleConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the qBittorrent Web UI, e.g. `http://localhost:8080`
    pub url: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    pub webhook_url: String,
    /// Display name override for webhook messages
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Derived from the interval when unset, see `Config::request_timeout`
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    /// Derived from the interval when unset, see `Config::max_backoff`
    #[serde(default)]
    pub max_backoff_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
    #[serde(default = "default_console")]
    pub console: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            request_timeout_secs: None,
            max_backoff_secs: None,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            console: default_console(),
        }
    }
}

// Default value functions
fn default_interval_secs() -> u64 {
    30
}

fn default_request_timeout_secs(interval_secs: u64) -> u64 {
    // Always shorter than the interval, even at the minimum of 5s
    10.min(interval_secs.saturating_sub(1)).max(1)
}

fn default_max_backoff_secs(interval_secs: u64) -> u64 {
    600.max(interval_secs) // 10 minutes, or one interval for slow schedules
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_console() -> bool {
    false
}

impl Config {
    /// Load configuration once at startup.
    ///
    /// Reads the given TOML file, or `config.toml` when it exists, then lets
    /// environment variables override individual settings.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?
            }
            None => Self::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Parse a TOML file without applying overrides or validating
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Apply overrides from environment-style variables
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("QBITTORRENT_URL") {
            self.client.url = url;
        }
        if let Some(username) = lookup("QBITTORRENT_USERNAME") {
            self.client.username = username;
        }
        if let Some(password) = lookup("QBITTORRENT_PASSWORD") {
            self.client.password = password;
        }
        if let Some(webhook_url) = lookup("DISCORD_WEBHOOK_URL") {
            self.notifier.webhook_url = webhook_url;
        }
        if let Some(interval) = lookup("POLLING_INTERVAL") {
            self.schedule.interval_secs = parse_secs("POLLING_INTERVAL", &interval)?;
        }
        if let Some(timeout) = lookup("REQUEST_TIMEOUT") {
            self.schedule.request_timeout_secs = Some(parse_secs("REQUEST_TIMEOUT", &timeout)?);
        }
        if let Some(backoff) = lookup("MAX_BACKOFF") {
            self.schedule.max_backoff_secs = Some(parse_secs("MAX_BACKOFF", &backoff)?);
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            self.logging.format = format;
        }

        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Validate client config
        if self.client.url.is_empty() {
            return Err(ConfigError::Missing("client.url (QBITTORRENT_URL)"));
        }
        if !is_http_url(&self.client.url) {
            return Err(ConfigError::Invalid {
                field: "client.url",
                reason: format!("'{}' is not an http(s) URL", self.client.url),
            });
        }

        // Validate notifier config
        if self.notifier.webhook_url.is_empty() {
            return Err(ConfigError::Missing("notifier.webhook_url (DISCORD_WEBHOOK_URL)"));
        }
        if !is_http_url(&self.notifier.webhook_url) {
            return Err(ConfigError::Invalid {
                field: "notifier.webhook_url",
                reason: "not an http(s) URL".to_string(),
            });
        }

        // Validate schedule config
        let schedule = &self.schedule;
        if schedule.interval_secs < MIN_INTERVAL_SECS {
            return Err(ConfigError::Invalid {
                field: "schedule.interval_secs",
                reason: format!(
                    "{} is below the minimum of {} seconds",
                    schedule.interval_secs, MIN_INTERVAL_SECS
                ),
            });
        }
        let request_timeout_secs = self.request_timeout().as_secs();
        let max_backoff_secs = self.max_backoff().as_secs();
        if request_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "schedule.request_timeout_secs",
                reason: "must be greater than 0".to_string(),
            });
        }
        // A hung backend must never hold a cycle past the next tick
        if request_timeout_secs >= schedule.interval_secs {
            return Err(ConfigError::Invalid {
                field: "schedule.request_timeout_secs",
                reason: format!(
                    "request timeout ({}) must be shorter than the interval ({})",
                    request_timeout_secs, schedule.interval_secs
                ),
            });
        }
        if max_backoff_secs < schedule.interval_secs {
            return Err(ConfigError::Invalid {
                field: "schedule.max_backoff_secs",
                reason: format!(
                    "max backoff ({}) must not be shorter than the interval ({})",
                    max_backoff_secs, schedule.interval_secs
                ),
            });
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logging.level",
                reason: format!(
                    "'{}' must be one of: trace, debug, info, warn, error",
                    self.logging.level
                ),
            });
        }

        let valid_formats = ["json", "console"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(ConfigError::Invalid {
                field: "logging.format",
                reason: format!("'{}' must be one of: json, console", self.logging.format),
            });
        }

        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.schedule.interval_secs)
    }

    /// Bound on each external call: the configured value, or 10s capped
    /// below the interval
    pub fn request_timeout(&self) -> Duration {
        let secs = self
            .schedule
            .request_timeout_secs
            .unwrap_or_else(|| default_request_timeout_secs(self.schedule.interval_secs));
        Duration::from_secs(secs)
    }

    /// Longest backoff: the configured value, or at least 10 minutes and never
    /// below the interval
    pub fn max_backoff(&self) -> Duration {
        let secs = self
            .schedule
            .max_backoff_secs
            .unwrap_or_else(|| default_max_backoff_secs(self.schedule.interval_secs));
        Duration::from_secs(secs)
    }
}

fn parse_secs(field: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
        field,
        reason: format!("'{}' is not a positive integer", raw),
    })
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}
