//! Configuration module.
//!
//! Provides YAML-based configuration loading and the connection string
//! sources consumed by the connector:
//! - Database settings (host, port, database, credentials)
//! - Sink settings (per-operation deadline)
//! - [`ConfigSource`] implementations (environment variables, static config)

mod app;
mod source;
mod validation;

pub use app::{AppConfig, DEFAULT_PORT, DatabaseConfig, SinkConfig};
pub use source::{ConfigSource, EnvVarConfigSource, StaticConfigSource};
pub use validation::{ConfigError, expand_env_vars, parse_duration};
