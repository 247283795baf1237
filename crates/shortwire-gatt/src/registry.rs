//! Subscription registry

use std::collections::HashSet;

use parking_lot::Mutex;
use smallvec::SmallVec;

use shortwire_core::PeerAddress;

/// Set of peers currently subscribed to notifications for the content
/// characteristic.
///
/// A peer appears at most once; membership reflects the most recent
/// descriptor write, and a disconnect removes the peer unconditionally so
/// no subscription outlives its connection. Process-lifetime only.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    peers: Mutex<HashSet<PeerAddress>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns true if it was not subscribed before.
    pub fn subscribe(&self, peer: PeerAddress) -> bool {
        self.peers.lock().insert(peer)
    }

    /// Remove a peer. Returns true if it was subscribed.
    pub fn unsubscribe(&self, peer: &PeerAddress) -> bool {
        self.peers.lock().remove(peer)
    }

    /// True while the peer is subscribed.
    pub fn contains(&self, peer: &PeerAddress) -> bool {
        self.peers.lock().contains(peer)
    }

    pub fn len(&self) -> usize {
        self.peers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.lock().is_empty()
    }

    /// Snapshot of the current subscribers.
    pub fn subscribers(&self) -> SmallVec<[PeerAddress; 4]> {
        self.peers.lock().iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_peer_appears_at_most_once() {
        let registry = SubscriptionRegistry::new();
        let peer = PeerAddress::new("X");

        assert!(registry.subscribe(peer.clone()));
        assert!(!registry.subscribe(peer.clone()));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&peer));
    }

    #[test]
    fn membership_follows_the_latest_operation() {
        let registry = SubscriptionRegistry::new();
        let peer = PeerAddress::new("X");

        registry.subscribe(peer.clone());
        assert!(registry.unsubscribe(&peer));
        assert!(!registry.contains(&peer));
        assert!(!registry.unsubscribe(&peer));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_contains_every_subscriber() {
        let registry = SubscriptionRegistry::new();
        registry.subscribe(PeerAddress::new("a"));
        registry.subscribe(PeerAddress::new("b"));

        let mut subscribers = registry.subscribers();
        subscribers.sort_by(|x, y| x.as_str().cmp(y.as_str()));
        assert_eq!(
            subscribers.to_vec(),
            vec![PeerAddress::new("a"), PeerAddress::new("b")]
        );
    }
}
