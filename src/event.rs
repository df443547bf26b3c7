//! Input event shape.
//!
//! An [`Event`] is one observed TCP connection state transition as reported
//! by the upstream tracer. It optionally carries [`SocketInfo`], the kernel's
//! view of the socket involved.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumIter, EnumString};

/// Linux TCP connection states.
///
/// `Display`/`AsRef<str>` yield the canonical upper-case label stored in
/// the database (e.g. `"SYN_RECEIVED"`); `FromStr` parses it back.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
    EnumIter,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TcpState {
    Established,
    SynSent,
    SynReceived,
    #[serde(rename = "FIN_WAIT_1")]
    #[strum(serialize = "FIN_WAIT_1")]
    FinWait1,
    #[serde(rename = "FIN_WAIT_2")]
    #[strum(serialize = "FIN_WAIT_2")]
    FinWait2,
    TimeWait,
    Closed,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    NewSynRecv,
}

/// Kernel-level metadata about the socket involved in an event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SocketInfo {
    /// Kernel socket identifier (typically the `struct sock` address).
    pub id: String,
    /// Inode number of the socket.
    pub inode: u32,
    /// Owning user id.
    pub uid: u32,
    /// Owning group id.
    pub gid: u32,
    /// Socket state at observation time.
    pub state: TcpState,
}

/// One observed TCP state transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Observation timestamp (UTC).
    pub time: DateTime<Utc>,
    /// Process id on the CPU when the transition was observed.
    pub pid_on_cpu: i32,
    /// Command name of that process.
    pub command_on_cpu: String,
    pub source_ip: IpAddr,
    pub dest_ip: IpAddr,
    pub source_port: u16,
    pub dest_port: u16,
    pub old_state: TcpState,
    pub new_state: TcpState,
    /// Optional socket metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub socket_info: Option<SocketInfo>,
}
