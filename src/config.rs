use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::app::ViewMode;
use crate::facts::DEFAULT_FACT_INTERVAL;

pub const DEFAULT_ENDPOINT: &str = "http://localhost:3000/latestdata";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(2000);
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(1500);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Toml {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Settings file contents; every key is optional
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    pub endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub fact_interval_ms: Option<u64>,
    pub view: Option<ViewMode>,
    pub follow: Option<bool>,
    pub data_dir: Option<PathBuf>,
}

impl Settings {
    /// Load the settings file. An explicit path must exist; the default
    /// location is optional.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(p) => p.to_path_buf(),
            None => {
                let p = Self::default_path();
                if !p.exists() {
                    return Ok(Self::default());
                }
                p
            }
        };

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Toml { path, source })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("iss-tui")
            .join("config.toml")
    }
}

/// Command-line values that take precedence over the settings file
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_ms: Option<u64>,
    pub view: Option<ViewMode>,
    pub no_follow: bool,
    pub data_dir: Option<PathBuf>,
}

/// Effective configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub endpoint: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub fact_interval: Duration,
    pub view: ViewMode,
    pub follow: bool,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            fact_interval: DEFAULT_FACT_INTERVAL,
            view: ViewMode::Globe,
            follow: true,
            data_dir: PathBuf::from("data"),
        }
    }
}

impl Config {
    /// Layer defaults, then the settings file, then command-line overrides
    pub fn resolve(settings: Settings, overrides: Overrides) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let endpoint = overrides
            .endpoint
            .or(settings.endpoint)
            .unwrap_or(defaults.endpoint);
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "endpoint must be an http(s) URL, got {:?}",
                endpoint
            )));
        }

        let poll_interval = millis(
            "poll interval",
            overrides.poll_interval_ms.or(settings.poll_interval_ms),
            defaults.poll_interval,
        )?;
        let request_timeout = millis(
            "request timeout",
            overrides.request_timeout_ms.or(settings.request_timeout_ms),
            defaults.request_timeout,
        )?;
        let fact_interval = millis("fact interval", settings.fact_interval_ms, defaults.fact_interval)?;

        let follow = if overrides.no_follow {
            false
        } else {
            settings.follow.unwrap_or(defaults.follow)
        };

        Ok(Self {
            endpoint,
            poll_interval,
            request_timeout,
            fact_interval,
            view: overrides.view.or(settings.view).unwrap_or(defaults.view),
            follow,
            data_dir: overrides
                .data_dir
                .or(settings.data_dir)
                .unwrap_or(defaults.data_dir),
        })
    }
}

fn millis(name: &str, value: Option<u64>, default: Duration) -> Result<Duration, ConfigError> {
    match value {
        Some(0) => Err(ConfigError::Invalid(format!("{} must be greater than 0 ms", name))),
        Some(ms) => Ok(Duration::from_millis(ms)),
        None => Ok(default),
    }
}
