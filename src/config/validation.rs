//! Configuration errors and string helpers.

use std::time::Duration;

use thiserror::Error;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse YAML configuration.
    #[error("failed to parse YAML config: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation failed.
    #[error("config validation error: {0}")]
    ValidationError(String),

    /// A required environment variable is unset or empty.
    #[error("environment variable {0} not set")]
    MissingEnvVar(&'static str),

    /// An environment variable holds a value that cannot be used.
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnvVar { name: &'static str, value: String },
}

/// Parse duration string using humantime.
///
/// Supports various formats: `30s`, `1m`, `5m30s`, `1h`, `100ms`, etc.
///
/// # Examples
///
/// ```
/// use tcp_audit_pg::config::parse_duration;
///
/// assert_eq!(parse_duration("30s").unwrap().as_secs(), 30);
/// assert_eq!(parse_duration("1m").unwrap().as_secs(), 60);
/// assert_eq!(parse_duration("250ms").unwrap().as_millis(), 250);
/// ```
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("duration string is empty".to_string());
    }
    humantime::parse_duration(s).map_err(|e| e.to_string())
}

/// Expand environment variables in a string.
/// Supports ${VAR} and ${VAR:-default} syntax.
pub fn expand_env_vars(input: &str) -> String {
    static ENV_VAR_REGEX: std::sync::OnceLock<regex::Regex> = std::sync::OnceLock::new();

    let regex = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("failed to compile env var regex")
    });

    regex
        .replace_all(input, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default_value = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            std::env::var(var_name).unwrap_or_else(|_| default_value.to_string())
        })
        .into_owned()
}
