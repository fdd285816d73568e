//! Layered service configuration: `config/default.toml`, then the optional
//! `config/local.toml`, then `SRI__SECTION__KEY` environment variables.

use serde::Deserialize;
use std::net::SocketAddr;
use std::time::Duration;

const ENV_PREFIX: &str = "SRI";
const MIN_SECRET_BYTES: usize = 16;
const MAX_CODE_LENGTH: usize = 64;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    /// Admin session signing; the secret has no default
    pub session: SessionConfig,
    #[serde(default)]
    pub invite_codes: InviteCodesConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            request_timeout_secs: 30,
            max_body_size: 1 << 20,
        }
    }
}

/// Remote backend connection. An empty `url` selects the local backend.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            min_connections: 1,
            connect_timeout_secs: 10,
            idle_timeout_secs: 600,
        }
    }
}

impl DatabaseConfig {
    pub fn pool_settings(&self) -> persistence::db::PoolSettings {
        persistence::db::PoolSettings {
            url: self.url.clone(),
            max_connections: self.max_connections,
            min_connections: self.min_connections,
            acquire_timeout: Duration::from_secs(self.connect_timeout_secs),
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub level: String,
    /// `json` or `pretty`
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "json".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding the client-local key-value files
    pub data_dir: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "data".into(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default = "default_session_ttl_hours")]
    pub ttl_hours: i64,
}

fn default_session_ttl_hours() -> i64 {
    shared::session::DEFAULT_SESSION_TTL_HOURS
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InviteCodesConfig {
    /// Body length used when a request does not give one
    pub default_length: usize,
    /// Upper bound on `count` for batch creation
    pub max_batch_size: usize,
}

impl Default for InviteCodesConfig {
    fn default() -> Self {
        Self {
            default_length: shared::code::DEFAULT_CODE_LENGTH,
            max_batch_size: 100,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Allowed CORS origins; empty allows any origin
    pub cors_origins: Vec<String>,
    /// Adds `Secure` to the client id cookie; enable behind HTTPS
    pub secure_cookies: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

fn ensure(condition: bool, message: &str) -> Result<(), ConfigValidationError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigValidationError::InvalidValue(message.to_string()))
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let cfg: Self = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?
            .try_deserialize()?;

        cfg.validate()
            .map_err(|e| config::ConfigError::Message(e.to_string()))?;
        Ok(cfg)
    }

    /// The shipped defaults plus `overrides`, unvalidated.
    #[cfg(test)]
    pub fn load_for_test(overrides: &[(&str, &str)]) -> Result<Self, config::ConfigError> {
        let defaults = include_str!("../../../config/default.toml");
        let builder = overrides.iter().try_fold(
            config::Config::builder()
                .add_source(config::File::from_str(defaults, config::FileFormat::Toml)),
            |builder, (key, value)| builder.set_override(*key, *value),
        )?;
        builder.build()?.try_deserialize()
    }

    fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.session.secret.is_empty() {
            return Err(ConfigValidationError::MissingRequired(format!(
                "{}__SESSION__SECRET environment variable must be set",
                ENV_PREFIX
            )));
        }
        ensure(
            self.session.secret.len() >= MIN_SECRET_BYTES,
            "session.secret must be at least 16 bytes",
        )?;
        ensure(self.session.ttl_hours > 0, "session.ttl_hours must be positive")?;
        ensure(self.server.port != 0, "server.port cannot be 0")?;
        ensure(
            self.database.min_connections <= self.database.max_connections,
            "database.min_connections cannot exceed max_connections",
        )?;
        ensure(
            (1..=MAX_CODE_LENGTH).contains(&self.invite_codes.default_length),
            "invite_codes.default_length must be between 1 and 64",
        )?;
        ensure(
            self.invite_codes.max_batch_size > 0,
            "invite_codes.max_batch_size must be positive",
        )
    }

    /// True when invite codes and admins live in the remote database.
    pub fn remote_configured(&self) -> bool {
        !self.database.url.trim().is_empty()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.server.host, self.server.port).parse()
    }
}
