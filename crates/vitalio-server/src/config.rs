use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use thiserror::Error;
use vitalio_core::TimestampFallback;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Resource watch / update notification configuration
    #[serde(default)]
    pub watch: WatchConfig,
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be > 0".into());
        }
        if self.server.body_limit_bytes == 0 {
            return Err("server.body_limit_bytes must be > 0".into());
        }
        let lvl = self.logging.level.to_ascii_lowercase();
        let valid_levels = ["trace", "debug", "info", "warn", "error", "off"];
        if !valid_levels.contains(&lvl.as_str()) {
            return Err(format!("logging.level must be one of {valid_levels:?}"));
        }
        if self.resources.types.is_empty() {
            return Err("resources.types must not be empty".into());
        }
        if self.watch.channel_capacity == 0 {
            return Err("watch.channel_capacity must be > 0".into());
        }
        if self.watch.workers == 0 {
            return Err("watch.workers must be > 0".into());
        }
        for watched in &self.watch.resource_types {
            if !self.resources.types.contains(watched) {
                return Err(format!(
                    "watch.resource_types contains '{watched}' which is not in resources.types"
                ));
            }
        }
        Ok(())
    }

    pub fn addr(&self) -> SocketAddr {
        use std::net::{IpAddr, Ipv4Addr};
        let host: IpAddr = self
            .server
            .host
            .parse()
            .unwrap_or(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)));
        SocketAddr::from((host, self.server.port))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".into()
}
fn default_port() -> u16 {
    8080
}
fn default_body_limit() -> usize {
    1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// The resource types the server registers routes for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourcesConfig {
    #[serde(default = "default_resource_types")]
    pub types: Vec<String>,
}

fn default_resource_types() -> Vec<String> {
    [
        "Patient",
        "Observation",
        "Condition",
        "Procedure",
        "Encounter",
        "MedicationStatement",
        "MedicationOrder",
        "Immunization",
        "DiagnosticReport",
        "AllergyIntolerance",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            types: default_resource_types(),
        }
    }
}

/// Which resource types get a watch interceptor, and how the update channel
/// behaves. The mapping here drives route registration; the interceptor
/// itself carries no per-type knowledge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Fixed capacity of the update channel, set once at startup.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    /// Resource types to install the watch interceptor on.
    #[serde(default)]
    pub resource_types: Vec<String>,
    /// What to do when a payload has no canonical event-time field.
    #[serde(default)]
    pub timestamp_fallback: TimestampFallback,
    /// Number of worker tasks draining the update channel.
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_true() -> bool {
    true
}
fn default_channel_capacity() -> usize {
    64
}
fn default_workers() -> usize {
    1
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            channel_capacity: default_channel_capacity(),
            resource_types: Vec::new(),
            timestamp_fallback: TimestampFallback::default(),
            workers: default_workers(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Load configuration from a TOML file, or defaults when no path is given.
pub fn load_config(path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let cfg = match path {
        Some(p) => toml::from_str(&std::fs::read_to_string(p)?)?,
        None => AppConfig::default(),
    };
    cfg.validate().map_err(ConfigError::Invalid)?;
    Ok(cfg)
}
