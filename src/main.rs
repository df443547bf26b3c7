//! tcp-audit-pg Binary Entry Point
//!
//! Reads newline-delimited JSON events from stdin and persists each one.
//! Core functionality is provided by the `tcp_audit_pg` library crate.

use std::time::Duration;

use clap::Parser;
use tcp_audit_pg::config::parse_duration;
use tcp_audit_pg::{
    AppConfig, ConfigSource, EnvVarConfigSource, Event, PgSink, SinkConfig, StaticConfigSource,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// tcp-audit-pg - PostgreSQL sink for TCP state-change events
#[derive(Parser, Debug)]
#[command(name = "tcp-audit-pg", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file. Without one, connection parameters are
    /// read from PGHOST, PGPORT, PGDATABASE, PGUSER and PGPASSWORD.
    #[arg(short, long, env = "TCP_AUDIT_CONFIG")]
    config: Option<String>,

    /// Deadline for each store operation, e.g. "5s" (overrides config file)
    #[arg(long, env = "TCP_AUDIT_OPERATION_TIMEOUT", value_parser = parse_duration)]
    operation_timeout: Option<Duration>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tcp_audit_pg=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let mut sink = match cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path);
            let mut config = AppConfig::load(&path)?;
            if cli.operation_timeout.is_some() {
                config.sink.operation_timeout = cli.operation_timeout;
                config.sink.validate()?;
            }
            tracing::info!(
                "Database: {}:{}/{}",
                config.database.host,
                config.database.port,
                config.database.database,
            );
            connect(StaticConfigSource::new(config.database), &config.sink).await?
        }
        None => {
            tracing::info!("No configuration file, using PG* environment variables");
            let sink_config = SinkConfig {
                operation_timeout: cli.operation_timeout,
            };
            sink_config.validate()?;
            connect(EnvVarConfigSource::new(), &sink_config).await?
        }
    };

    tracing::info!("Reading events from stdin, press Ctrl+C to stop");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stored = 0usize;
    let mut failed = 0usize;

    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C signal");
                break;
            }
        };

        let Some(line) = line else {
            tracing::info!("End of input");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let event: Event = match serde_json::from_str(&line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!("Skipping malformed event: {}", e);
                continue;
            }
        };

        match sink.sink(&event).await {
            Ok(()) => stored += 1,
            Err(e) => {
                failed += 1;
                if e.is_ambiguous_durability() {
                    tracing::error!("Event may or may not have been stored: {}", e);
                } else {
                    tracing::error!("Failed to store event: {}", e);
                }
            }
        }
    }

    tracing::info!("Stored {} events, {} failed", stored, failed);

    if let Err(e) = sink.close().await {
        tracing::error!("Failed to close sink: {}", e);
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

async fn connect<S: ConfigSource>(
    source: S,
    config: &SinkConfig,
) -> Result<PgSink, Box<dyn std::error::Error>> {
    let sink = PgSink::connect(source, config).await?;
    Ok(sink)
}
