//! tcp-audit-pg - PostgreSQL sink for TCP state-change events
//!
//! This crate persists TCP connection state transitions (as reported by a
//! kernel tracer) into PostgreSQL over a single long-lived connection. It
//! can be used as a library by an event pipeline, or run as a standalone
//! binary that reads JSON-lines events from stdin.
//!
//! # Architecture
//!
//! - **Config**: Connection descriptor from libpq environment variables or YAML
//! - **Storage**: Schema creation, named statements, transactional execution
//! - **Sink**: Event-to-row translation and the construction sequence
//!
//! # Example
//!
//! ```rust,ignore
//! use tcp_audit_pg::{EnvVarConfigSource, PgSink, SinkConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut sink = PgSink::connect(EnvVarConfigSource::new(), &SinkConfig::default()).await?;
//!
//!     for event in events {
//!         sink.sink(&event).await?;
//!     }
//!
//!     sink.close().await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod event;
pub mod sink;
pub mod storage;

pub use config::{
    AppConfig, ConfigError, ConfigSource, DatabaseConfig, EnvVarConfigSource, SinkConfig,
    StaticConfigSource,
};
pub use event::{Event, SocketInfo, TcpState};
pub use sink::{PgSink, SessionInserter, Sink};
pub use storage::{DbError, StorageError};
