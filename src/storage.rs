//! Storage Layer
//!
//! Transactional PostgreSQL write path over a single long-lived connection:
//! - **Schema**: idempotent creation of the event tables
//! - **Statements**: named statements registered once per connection
//! - **Executor**: single-statement execution and all-or-nothing batches
//!
//! # Components
//!
//! - [`Connector`] / [`PgConnector`]: Establishes the connection from a config source
//! - [`SchemaPreparer`] / [`PgSchemaPreparer`]: Creates tables if absent
//! - [`StatementPreparer`] / [`PgStatementPreparer`]: Registers named statements
//! - [`Executor`] / [`PgExecutor`]: Executes statements, owns transactions and close
//! - [`Inserter`] / [`PreparedStatementInserter`]: Decides between one row and two
//!
//! The preparers and the executor share one [`db::Session`]; none of them
//! is usable on its own once the executor has closed it.

mod connector;
pub mod db;
mod error;
mod executor;
mod inserter;
mod schema;
mod statements;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use connector::{Connector, PgConnector};
pub use error::{DbError, StorageError};
pub use executor::{Executor, PgExecutor};
pub use inserter::{
    INSERT_SOCKET_INFO_SQL, INSERT_TCP_EVENT_SQL, Inserter, PreparedStatementInserter,
    SOCKET_INFO_INSERT, TCP_EVENTS_INSERT,
};
pub use schema::{
    PgSchemaPreparer, SOCKET_INFO_TABLE, SOCKET_INFO_TABLE_DDL, SchemaPreparer, TCP_EVENTS_TABLE,
    TCP_EVENTS_TABLE_DDL,
};
pub use statements::{PgStatementPreparer, StatementPreparer};
pub use types::{EventRow, SocketInfoRow, SqlValue, Statement, StatementBatch};
