use serde::Deserialize;
use std::net::SocketAddr;

use domain::geo::BlurRange;
use domain::services::ProximitySettings;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub proximity: ProximityConfig,
    #[serde(default)]
    pub jobs: JobsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Required only by the postgres backend.
    #[serde(default)]
    pub url: String,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

impl DatabaseConfig {
    pub fn pool_config(&self) -> persistence::db::DatabaseConfig {
        persistence::db::DatabaseConfig {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            connect_timeout_secs: self.connect_timeout_secs,
            idle_timeout_secs: self.idle_timeout_secs,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SecurityConfig {
    /// Allowed CORS origins. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

/// Where location, alert and social data live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProximityConfig {
    #[serde(default = "default_max_alerts_per_user")]
    pub max_alerts_per_user: usize,

    #[serde(default = "default_dedup_window_hours")]
    pub dedup_window_hours: i64,

    #[serde(default = "default_true")]
    pub spatial_prefilter: bool,

    #[serde(default = "default_blur_min_meters")]
    pub blur_min_meters: f64,

    #[serde(default = "default_blur_max_meters")]
    pub blur_max_meters: f64,

    #[serde(default = "default_beacon_minutes")]
    pub default_beacon_minutes: i64,

    #[serde(default = "default_max_nearby_radius")]
    pub max_nearby_radius_meters: f64,

    #[serde(default = "default_notify_timeout_ms")]
    pub notify_timeout_ms: u64,
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_alerts_per_user: default_max_alerts_per_user(),
            dedup_window_hours: default_dedup_window_hours(),
            spatial_prefilter: true,
            blur_min_meters: default_blur_min_meters(),
            blur_max_meters: default_blur_max_meters(),
            default_beacon_minutes: default_beacon_minutes(),
            max_nearby_radius_meters: default_max_nearby_radius(),
            notify_timeout_ms: default_notify_timeout_ms(),
        }
    }
}

impl ProximityConfig {
    pub fn settings(&self) -> ProximitySettings {
        ProximitySettings {
            max_alerts_per_user: self.max_alerts_per_user,
            dedup_window_hours: self.dedup_window_hours,
            spatial_prefilter: self.spatial_prefilter,
            blur: BlurRange {
                min_meters: self.blur_min_meters,
                max_meters: self.blur_max_meters,
            },
            default_beacon_minutes: self.default_beacon_minutes,
            max_nearby_radius_meters: self.max_nearby_radius_meters,
            notify_timeout_ms: self.notify_timeout_ms,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// Default value functions
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_request_timeout() -> u64 {
    30
}
fn default_max_connections() -> u32 {
    20
}
fn default_min_connections() -> u32 {
    5
}
fn default_connect_timeout() -> u64 {
    10
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_log_format() -> String {
    "json".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_alerts_per_user() -> usize {
    5
}
fn default_dedup_window_hours() -> i64 {
    24
}
fn default_blur_min_meters() -> f64 {
    500.0
}
fn default_blur_max_meters() -> f64 {
    1500.0
}
fn default_beacon_minutes() -> i64 {
    60
}
fn default_max_nearby_radius() -> f64 {
    50_000.0
}
fn default_notify_timeout_ms() -> u64 {
    2_000
}

/// Configuration validation error
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl Config {
    /// Load configuration from files and environment variables.
    ///
    /// Loading order (later sources override earlier):
    /// 1. config/default.toml - base configuration with defaults
    /// 2. config/local.toml - local overrides (optional, not in git)
    /// 3. Environment variables with PX__ prefix
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("PX").separator("__"))
            .build()?;

        let cfg: Self = config.try_deserialize()?;
        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// Builds a configuration from embedded defaults plus overrides, without touching the filesystem.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = r#"
            [server]
            host = "0.0.0.0"
            port = 8080
            request_timeout_secs = 30

            [database]
            url = ""
            max_connections = 20
            min_connections = 5
            connect_timeout_secs = 10
            idle_timeout_secs = 600

            [logging]
            level = "info"
            format = "json"

            [storage]
            backend = "postgres"
        "#;

        let mut builder = config::Config::builder()
            .add_source(config::File::from_str(defaults, config::FileFormat::Toml));

        for (key, value) in overrides {
            builder = builder.set_override(*key, *value)?;
        }

        builder.build()?.try_deserialize()
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.storage.backend == StorageBackend::Postgres && self.database.url.is_empty() {
            return Err(ConfigValidationError::MissingRequired(
                "PX__DATABASE__URL environment variable must be set".to_string(),
            ));
        }

        if self.server.port == 0 {
            return Err(ConfigValidationError::InvalidValue(
                "Server port cannot be 0".to_string(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigValidationError::InvalidValue(
                "min_connections cannot exceed max_connections".to_string(),
            ));
        }

        if self.proximity.blur_min_meters < 0.0
            || self.proximity.blur_min_meters > self.proximity.blur_max_meters
        {
            return Err(ConfigValidationError::InvalidValue(
                "blur_min_meters must be non-negative and not exceed blur_max_meters".to_string(),
            ));
        }

        self.socket_addr()
            .map_err(|e| ConfigValidationError::InvalidValue(format!("Server address: {}", e)))?;

        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
