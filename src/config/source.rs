//! Connection descriptor sources.
//!
//! A [`ConfigSource`] yields the opaque connection string consumed by the
//! connector. Two sources are provided: the standard libpq environment
//! variables and a static [`DatabaseConfig`].

use super::app::{DEFAULT_PORT, DatabaseConfig, postgres_url};
use super::validation::ConfigError;

const HOST_ENV_VAR: &str = "PGHOST";
const PORT_ENV_VAR: &str = "PGPORT";
const DB_ENV_VAR: &str = "PGDATABASE";
const USER_ENV_VAR: &str = "PGUSER";
const PASSWORD_ENV_VAR: &str = "PGPASSWORD";

/// Provides a database connection string from some configuration source.
pub trait ConfigSource: Send + Sync {
    /// Return the connection string.
    fn config(&self) -> Result<String, ConfigError>;
}

/// Reads connection parameters from the standard PostgreSQL client
/// environment variables.
///
/// See <https://www.postgresql.org/docs/current/libpq-envars.html>.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvVarConfigSource;

impl EnvVarConfigSource {
    pub fn new() -> Self {
        Self
    }
}

fn required_env(name: &'static str) -> Result<String, ConfigError> {
    match std::env::var(name) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::MissingEnvVar(name)),
    }
}

impl ConfigSource for EnvVarConfigSource {
    fn config(&self) -> Result<String, ConfigError> {
        let host = required_env(HOST_ENV_VAR)?;

        let port = match std::env::var(PORT_ENV_VAR) {
            Ok(value) if !value.is_empty() => {
                value
                    .parse::<u16>()
                    .map_err(|_| ConfigError::InvalidEnvVar {
                        name: PORT_ENV_VAR,
                        value,
                    })?
            }
            _ => DEFAULT_PORT,
        };

        let db = required_env(DB_ENV_VAR)?;
        let user = required_env(USER_ENV_VAR)?;
        let password = required_env(PASSWORD_ENV_VAR)?;

        Ok(postgres_url(&user, &password, &host, port, &db))
    }
}

/// Serves a fixed, already-loaded [`DatabaseConfig`].
#[derive(Debug, Clone)]
pub struct StaticConfigSource {
    database: DatabaseConfig,
}

impl StaticConfigSource {
    pub fn new(database: DatabaseConfig) -> Self {
        Self { database }
    }
}

impl ConfigSource for StaticConfigSource {
    fn config(&self) -> Result<String, ConfigError> {
        self.database.validate()?;
        Ok(self.database.connection_url())
    }
}
