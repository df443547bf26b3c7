//! Row insertion over registered statements.
//!
//! An event without socket metadata is one row and goes through
//! [`Executor::exec`]. An event with socket metadata is two rows, event
//! first, written with [`Executor::exec_multiple`] so both land or neither
//! does.

use std::net::IpAddr;

use async_trait::async_trait;

use crate::storage::StorageError;
use crate::storage::executor::Executor;
use crate::storage::schema::TCP_EVENTS_TABLE;
use crate::storage::statements::StatementPreparer;
use crate::storage::types::{EventRow, SocketInfoRow, SqlValue, Statement, StatementBatch};

/// Insert into `tcp_events`.
pub const INSERT_TCP_EVENT_SQL: &str = r#"
INSERT INTO tcp_events (
    uid,
    timestamp,
    pid_on_cpu,
    comm_on_cpu,
    src_ip,
    dst_ip,
    src_port,
    dst_port,
    old_state,
    new_state
) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#;

pub const TCP_EVENTS_INSERT: &str = "tcp_events_insert";

/// Insert into `socket_info`. `$2` is the owning event's uid.
pub const INSERT_SOCKET_INFO_SQL: &str = r#"
INSERT INTO socket_info (
    uid,
    event_uid,
    socket_id,
    inode,
    user_id,
    group_id,
    socket_state
) VALUES ($1, $2, $3, $4, $5, $6, $7)"#;

pub const SOCKET_INFO_INSERT: &str = "socket_info_insert";

/// Every statement an inserter references, in registration order.
const STATEMENTS: [(&str, &str); 2] = [
    (INSERT_TCP_EVENT_SQL, TCP_EVENTS_INSERT),
    (INSERT_SOCKET_INFO_SQL, SOCKET_INFO_INSERT),
];

/// Label used in errors for a two-row write.
const EVENT_WITH_SOCKET_INFO: &str = "tcp_events and socket_info";

/// Writes event rows to the backing store.
#[async_trait]
pub trait Inserter: Send {
    /// Register every statement `insert` will reference. Must succeed
    /// before `insert` is called.
    async fn prepare(&mut self) -> Result<(), StorageError>;

    /// Write one event and, if present, its socket metadata.
    ///
    /// No retries: a failure is returned as-is and nothing from this call
    /// is visible in the store, unless the error reports ambiguous
    /// durability.
    async fn insert(
        &mut self,
        event: EventRow,
        socket_info: Option<SocketInfoRow>,
    ) -> Result<(), StorageError>;

    /// Release the underlying connection.
    async fn close(&mut self) -> Result<(), StorageError>;
}

/// [`Inserter`] backed by named statements.
#[derive(Debug)]
pub struct PreparedStatementInserter<P, E> {
    preparer: P,
    executor: E,
}

impl<P: StatementPreparer, E: Executor> PreparedStatementInserter<P, E> {
    pub fn new(preparer: P, executor: E) -> Self {
        Self { preparer, executor }
    }
}

#[async_trait]
impl<P: StatementPreparer, E: Executor> Inserter for PreparedStatementInserter<P, E> {
    async fn prepare(&mut self) -> Result<(), StorageError> {
        for (sql, name) in STATEMENTS {
            self.preparer.prepare_statement(sql, name).await?;
        }
        Ok(())
    }

    async fn insert(
        &mut self,
        event: EventRow,
        socket_info: Option<SocketInfoRow>,
    ) -> Result<(), StorageError> {
        let Some(socket_info) = socket_info else {
            return self
                .executor
                .exec(TCP_EVENTS_INSERT, &event_args(&event))
                .await
                .map_err(|e| StorageError::Insert {
                    table: TCP_EVENTS_TABLE,
                    source: Box::new(e),
                });
        };

        // The socket_info row references the event row, so the event goes first.
        let batch: StatementBatch = vec![
            Statement::new(TCP_EVENTS_INSERT, event_args(&event)),
            Statement::new(SOCKET_INFO_INSERT, socket_info_args(&event.uid, &socket_info)),
        ];

        self.executor
            .exec_multiple(&batch)
            .await
            .map_err(|e| StorageError::Insert {
                table: EVENT_WITH_SOCKET_INFO,
                source: Box::new(e),
            })
    }

    async fn close(&mut self) -> Result<(), StorageError> {
        self.executor.close().await
    }
}

fn event_args(event: &EventRow) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(event.uid.clone()),
        SqlValue::Timestamp(event.time),
        SqlValue::Int(event.pid_on_cpu),
        SqlValue::Text(event.comm_on_cpu.clone()),
        SqlValue::Inet(canonical_ip(event.src_ip)),
        SqlValue::Inet(canonical_ip(event.dst_ip)),
        SqlValue::Int(i32::from(event.src_port)),
        SqlValue::Int(i32::from(event.dst_port)),
        SqlValue::Text(event.old_state.clone()),
        SqlValue::Text(event.new_state.clone()),
    ]
}

fn socket_info_args(event_uid: &str, info: &SocketInfoRow) -> Vec<SqlValue> {
    vec![
        SqlValue::Text(info.uid.clone()),
        SqlValue::Text(event_uid.to_string()),
        SqlValue::Text(info.socket_id.clone()),
        SqlValue::BigInt(i64::from(info.inode)),
        SqlValue::BigInt(i64::from(info.user_id)),
        SqlValue::BigInt(i64::from(info.group_id)),
        SqlValue::Text(info.state.clone()),
    ]
}

/// IPv4-mapped IPv6 addresses are stored as plain IPv4.
fn canonical_ip(ip: IpAddr) -> IpAddr {
    ip.to_canonical()
}
