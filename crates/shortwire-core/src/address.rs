//! Peer addressing

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque address of a remote device, as handed over by the discovery
/// collaborator. Used as the dial target and as the subscription key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Wrap a raw address string.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PeerAddress {
    fn from(address: &str) -> Self {
        Self(address.to_string())
    }
}

impl From<String> for PeerAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_matches_raw_string() {
        let address = PeerAddress::new("AA:BB:CC:DD:EE:FF");
        assert_eq!(address.to_string(), "AA:BB:CC:DD:EE:FF");
        assert_eq!(address.as_str(), "AA:BB:CC:DD:EE:FF");
    }

    #[test]
    fn equality_is_by_value() {
        assert_eq!(PeerAddress::from("a"), PeerAddress::new(String::from("a")));
        assert_ne!(PeerAddress::from("a"), PeerAddress::from("b"));
    }
}
