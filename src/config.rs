//! Configuration for the live-refresh client.
//!
//! Settings come from `.kanban/live.toml` (or `--config PATH`), then the
//! environment, then CLI flags, each layer overriding the one before.
//! Empty strings at any layer count as unset.
//!
//! # Configuration File Format
//!
//! ```toml
//! [channel]
//! endpoint = "wss://boards.example.com/api/v1/ws"
//! page_origin = "https://boards.example.com"
//! reconnect_delay_ms = 3000
//! close_grace_ms = 1000
//!
//! [logging]
//! level = "info"
//! json = false
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use kanban_common::Origin;
use serde::{Deserialize, Serialize};

use crate::channel::{ChannelOptions, DEFAULT_CLOSE_GRACE, DEFAULT_RECONNECT_DELAY};
use crate::errors::ConfigError;

pub const CONFIG_DIR: &str = ".kanban";
pub const CONFIG_FILE: &str = "live.toml";

/// Explicit channel address; wins over everything in the file.
pub const ENV_WS_URL: &str = "KANBAN_WS_URL";
/// Origin of the hosting page, used to derive the address.
pub const ENV_PAGE_ORIGIN: &str = "KANBAN_PAGE_ORIGIN";

/// `[channel]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSection {
    /// Explicit push-channel URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Origin of the page hosting the board client, e.g. `https://example.com:9`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_origin: Option<String>,
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_close_grace_ms")]
    pub close_grace_ms: u64,
}

fn default_reconnect_delay_ms() -> u64 {
    duration_ms(DEFAULT_RECONNECT_DELAY)
}

fn default_close_grace_ms() -> u64 {
    duration_ms(DEFAULT_CLOSE_GRACE)
}

/// Whole milliseconds in `duration`, saturating at `u64::MAX`.
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl Default for ChannelSection {
    fn default() -> Self {
        Self {
            endpoint: None,
            page_origin: None,
            reconnect_delay_ms: default_reconnect_delay_ms(),
            close_grace_ms: default_close_grace_ms(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

/// Parsed `live.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveToml {
    #[serde(default)]
    pub channel: ChannelSection,
    #[serde(default)]
    pub logging: LoggingSection,
}

impl LiveToml {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load `live.toml` from `config_dir`, or defaults if it does not exist.
    pub fn load_or_default(config_dir: &Path) -> Result<Self, ConfigError> {
        let path = config_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, content).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Return warnings for settings that load but will not behave as intended.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.channel.reconnect_delay_ms == 0 {
            warnings.push(
                "reconnect_delay_ms is 0: a server that refuses connections will be retried in a tight loop"
                    .to_string(),
            );
        }

        if let Some(origin) = non_empty(self.channel.page_origin.as_deref())
            && let Err(e) = Origin::parse(origin)
        {
            warnings.push(format!("Invalid page_origin '{}': {}", origin, e));
        }

        if let Some(endpoint) = non_empty(self.channel.endpoint.as_deref())
            && !is_websocket_url(endpoint)
        {
            warnings.push(format!(
                "endpoint '{}' does not start with ws:// or wss://",
                endpoint
            ));
        }

        warnings
    }
}

/// Path of the default config file under `project_dir`.
pub fn default_config_path(project_dir: &Path) -> PathBuf {
    project_dir.join(CONFIG_DIR).join(CONFIG_FILE)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

fn is_websocket_url(url: &str) -> bool {
    let lower = url.to_ascii_lowercase();
    lower.starts_with("ws://") || lower.starts_with("wss://")
}

/// Effective configuration after layering file, environment and CLI.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Parsed live.toml (or defaults)
    pub toml: LiveToml,
    /// Where `toml` was read from, if a file existed
    pub source: Option<PathBuf>,
    env_endpoint: Option<String>,
    env_page_origin: Option<String>,
    cli_endpoint: Option<String>,
    cli_page_origin: Option<String>,
}

impl LiveConfig {
    pub fn new(toml: LiveToml, source: Option<PathBuf>) -> Self {
        Self {
            toml,
            source,
            env_endpoint: None,
            env_page_origin: None,
            cli_endpoint: None,
            cli_page_origin: None,
        }
    }

    /// Load from an explicit path (must exist) or from `.kanban/live.toml`
    /// under `project_dir` (may be missing).
    pub fn load(explicit: Option<&Path>, project_dir: &Path) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Ok(Self::new(LiveToml::load(path)?, Some(path.to_path_buf()))),
            None => {
                let path = default_config_path(project_dir);
                let toml = LiveToml::load_or_default(&project_dir.join(CONFIG_DIR))?;
                Ok(Self::new(toml, path.exists().then_some(path)))
            }
        }
    }

    /// Apply environment overrides from the process environment.
    pub fn with_env(self) -> Self {
        self.with_env_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides from `lookup`.
    pub fn with_env_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        self.env_endpoint = lookup(ENV_WS_URL).filter(|v| !v.is_empty());
        self.env_page_origin = lookup(ENV_PAGE_ORIGIN).filter(|v| !v.is_empty());
        self
    }

    /// Apply CLI overrides.
    pub fn with_cli_args(mut self, endpoint: Option<String>, page_origin: Option<String>) -> Self {
        self.cli_endpoint = endpoint.filter(|v| !v.is_empty());
        self.cli_page_origin = page_origin.filter(|v| !v.is_empty());
        self
    }

    /// Explicit endpoint (CLI → env → file).
    pub fn explicit_endpoint(&self) -> Option<&str> {
        self.cli_endpoint
            .as_deref()
            .or(self.env_endpoint.as_deref())
            .or(non_empty(self.toml.channel.endpoint.as_deref()))
    }

    /// Page origin string (CLI → env → file).
    pub fn page_origin_raw(&self) -> Option<&str> {
        self.cli_page_origin
            .as_deref()
            .or(self.env_page_origin.as_deref())
            .or(non_empty(self.toml.channel.page_origin.as_deref()))
    }

    pub fn page_origin(&self) -> Result<Option<Origin>, ConfigError> {
        self.page_origin_raw()
            .map(Origin::parse)
            .transpose()
            .map_err(ConfigError::from)
    }

    /// Resolve the push-channel address from the layered settings.
    pub fn resolve_endpoint(&self) -> Result<String, ConfigError> {
        let origin = self.page_origin()?;
        Ok(kanban_common::resolve_endpoint(
            self.explicit_endpoint(),
            &origin,
        ))
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.toml.channel.reconnect_delay_ms)
    }

    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.toml.channel.close_grace_ms)
    }

    pub fn channel_options(&self) -> Result<ChannelOptions, ConfigError> {
        Ok(ChannelOptions::new(self.resolve_endpoint()?)
            .with_reconnect_delay(self.reconnect_delay())
            .with_close_grace(self.close_grace()))
    }

    pub fn validate(&self) -> Vec<String> {
        let mut warnings = self.toml.validate();
        for (name, value) in [
            (ENV_PAGE_ORIGIN, self.env_page_origin.as_deref()),
            ("--origin", self.cli_page_origin.as_deref()),
        ] {
            if let Some(origin) = value
                && let Err(e) = Origin::parse(origin)
            {
                warnings.push(format!("Invalid page origin from {}: {}", name, e));
            }
        }
        warnings
    }
}
