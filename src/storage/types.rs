//! Core data types for the storage layer.
//!
//! - [`SqlValue`]: A loosely-typed statement argument drawn from a closed set of kinds
//! - [`Statement`]: A named statement invocation (name + ordered arguments)
//! - [`StatementBatch`]: Statements submitted together for atomic execution
//! - [`EventRow`] / [`SocketInfoRow`]: Row-level parameters accepted by the inserter

use std::net::IpAddr;

use chrono::{DateTime, Utc};

/// A statement argument.
///
/// Variants map one-to-one onto PostgreSQL parameter types so that a bound
/// value always matches the type the server inferred for its placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlValue {
    /// `TEXT`
    Text(String),
    /// `INTEGER`
    Int(i32),
    /// `BIGINT`
    BigInt(i64),
    /// `TIMESTAMP`, stored as UTC wall-clock time.
    Timestamp(DateTime<Utc>),
    /// `INET`
    Inet(IpAddr),
    /// `BYTEA`
    Bytes(Vec<u8>),
}

impl SqlValue {
    /// Text content, if this is a `Text` value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        Self::BigInt(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl From<IpAddr> for SqlValue {
    fn from(value: IpAddr) -> Self {
        Self::Inet(value)
    }
}

impl From<Vec<u8>> for SqlValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

/// Invocation of a registered statement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    /// Name the statement was registered under.
    pub name: &'static str,
    /// Positional arguments (`$1`, `$2`, ...).
    pub args: Vec<SqlValue>,
}

impl Statement {
    pub fn new(name: &'static str, args: Vec<SqlValue>) -> Self {
        Self { name, args }
    }
}

/// Ordered statements executed as one all-or-nothing unit.
pub type StatementBatch = Vec<Statement>;

/// Parameters for one `tcp_events` row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRow {
    /// Row identifier, unique across all event rows.
    pub uid: String,
    pub time: DateTime<Utc>,
    pub pid_on_cpu: i32,
    pub comm_on_cpu: String,
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    /// Canonical label of the state before the transition.
    pub old_state: String,
    /// Canonical label of the state after the transition.
    pub new_state: String,
}

/// Parameters for one `socket_info` row.
///
/// The reference to the owning event is not part of the row: the inserter
/// fills it in from the [`EventRow`] written in the same transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketInfoRow {
    /// Row identifier, unique across all socket-info rows.
    pub uid: String,
    pub socket_id: String,
    pub inode: u32,
    pub user_id: u32,
    pub group_id: u32,
    /// Canonical label of the socket state.
    pub state: String,
}
