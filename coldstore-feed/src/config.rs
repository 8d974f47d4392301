use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use serde_with::serde_as;
use strum::{Display, EnumString};

const ENV_PREFIX: &str = "COLDSTORE";

#[derive(Deserialize, Clone, Debug, Default)]
#[serde(default)]
pub struct Settings {
    pub feed: FeedSettings,
    pub notifications: NotificationSettings,
    pub log: LogSettings,
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct FeedSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub debounce_ms: u64,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self { debounce_ms: 300 }
    }
}

impl FeedSettings {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

#[serde_as]
#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct NotificationSettings {
    #[serde_as(as = "serde_with::DisplayFromStr")]
    pub page_size: usize,
    pub api_url: String,
    /// Trace every transport event, not only notification pushes
    pub log_transport_events: bool,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            page_size: 20,
            api_url: "http://localhost:8080/api".to_string(),
            log_transport_events: false,
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct LogSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "coldstore_feed=info".to_string(),
        }
    }
}

/// Read `config/base.yaml`, then `config/{APP_ENVIRONMENT}.yaml`, then `COLDSTORE_*`
/// environment variables (`__` separates nested keys).
pub fn read_config() -> Result<Settings, config::ConfigError> {
    dotenvy::from_filename(".env.local").ok();

    let base_path = std::env::current_dir().map_err(|e| {
        config::ConfigError::Message(format!("Failed to determine the current directory: {}", e))
    })?;

    let environment = Environment::from_str(
        std::env::var("APP_ENVIRONMENT")
            .unwrap_or_else(|_| "local".into())
            .as_str(),
    )
    .map_err(|e| config::ConfigError::Message(format!("Failed to parse APP_ENVIRONMENT: {}", e)))?;

    read_config_from(&base_path.join("config"), environment, None)
}

/// Layered read from an explicit directory. `env_source` replaces the process environment
/// when given.
pub fn read_config_from(
    config_directory: &Path,
    environment: Environment,
    env_source: Option<config::Map<String, String>>,
) -> Result<Settings, config::ConfigError> {
    let environment_filename = format!("{}.yaml", environment);

    let settings = config::Config::builder()
        .add_source(config::File::from(config_directory.join("base.yaml")))
        .add_source(config::File::from(
            config_directory.join(environment_filename),
        ))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .source(env_source),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, EnumString)]
pub enum Environment {
    #[strum(ascii_case_insensitive, serialize = "local")]
    Local,
    #[strum(ascii_case_insensitive, serialize = "production")]
    Production,
}
