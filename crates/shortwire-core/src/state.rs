//! Connection-role state

use std::fmt;

use serde::{Deserialize, Serialize};

/// Observable state of the single connection role.
///
/// Exactly one instance exists per link manager; it is mutated only through
/// the manager's transition methods and read by any caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No worker or stream pump is active.
    #[default]
    None,
    /// An acceptor is waiting for one inbound connection.
    Listening,
    /// A connector is dialing a peer.
    Connecting,
    /// A stream pump owns an established connection.
    Connected,
}

impl ConnectionState {
    /// State name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            ConnectionState::None => "None",
            ConnectionState::Listening => "Listening",
            ConnectionState::Connecting => "Connecting",
            ConnectionState::Connected => "Connected",
        }
    }

    /// True while any worker or pump is running.
    pub fn is_active(&self) -> bool {
        !matches!(self, ConnectionState::None)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
