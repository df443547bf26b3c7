//! Application configuration structures.

use std::path::Path;
use std::time::Duration;

use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};

use super::validation::{ConfigError, expand_env_vars};

// =============================================================================
// Constants
// =============================================================================

/// Default PostgreSQL port.
pub const DEFAULT_PORT: u16 = 5432;

fn default_port() -> u16 {
    DEFAULT_PORT
}

/// Characters escaped in the URL user-info; RFC 3986 unreserved ones pass through.
const USERINFO: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Render a `postgresql://` URL. User and password are percent-encoded so
/// that reserved characters (`/`, `#`, `?`, `@`, `:`) survive parsing.
pub(super) fn postgres_url(user: &str, password: &str, host: &str, port: u16, db: &str) -> String {
    format!(
        "postgresql://{}:{}@{host}:{port}/{db}",
        utf8_percent_encode(user, USERINFO),
        utf8_percent_encode(password, USERINFO),
    )
}

// =============================================================================
// Database Configuration
// =============================================================================

/// PostgreSQL connection parameters.
///
/// String fields may reference environment variables with `${VAR}` or
/// `${VAR:-default}`; they are expanded when the connection URL is built.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Server host name or address.
    pub host: String,

    /// Server port (default: 5432).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Login role.
    pub user: String,

    /// Login password.
    #[serde(default)]
    pub password: String,
}

impl std::fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: DEFAULT_PORT,
            database: "tcp_audit".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Build a `postgresql://` connection URL from these parameters.
    pub fn connection_url(&self) -> String {
        postgres_url(
            &expand_env_vars(&self.user),
            &expand_env_vars(&self.password),
            &expand_env_vars(&self.host),
            self.port,
            &expand_env_vars(&self.database),
        )
    }

    /// Validate connection parameters.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if a required field is empty
    /// or the port is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("host", &self.host),
            ("database", &self.database),
            ("user", &self.user),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "database {field} must not be empty"
                )));
            }
        }

        if self.port == 0 {
            return Err(ConfigError::ValidationError(
                "database port must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Sink Configuration
// =============================================================================

/// Runtime behaviour of the sink.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    /// Deadline applied to each store operation (e.g. `"5s"`). Unset means
    /// operations wait for the store indefinitely.
    #[serde(with = "humantime_serde")]
    pub operation_timeout: Option<Duration>,
}

impl SinkConfig {
    /// Reject a zero deadline; it would fail every operation that waits on I/O.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation_timeout == Some(Duration::ZERO) {
            return Err(ConfigError::ValidationError(
                "sink operation_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Database configuration.
    pub database: DatabaseConfig,

    /// Sink configuration.
    #[serde(default)]
    pub sink: SinkConfig,
}

impl AppConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.database.validate()?;
        self.sink.validate()
    }
}
