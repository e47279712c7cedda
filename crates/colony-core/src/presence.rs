//! Collaborator presence merging.
//!
//! Peer ephemeral state comes from an external shared-awareness channel,
//! treated as an opaque capability: a keyed snapshot of peer payloads plus a
//! change signal. This module turns a snapshot into a stable roster: self
//! excluded, colors assigned deterministically, and owns nothing about the
//! underlying synchronization protocol. Propagation latency of local cursor
//! writes is the channel's problem.

use std::collections::HashSet;

use sha2::{Digest, Sha256};

use crate::constants::PRESENCE_PALETTE;
use crate::models::{short_peer_id, PeerStatus, PresenceEntry, RawPeerState};

/// The shared-awareness channel the host wires in. Only a snapshot getter
/// and a local-state writer; change notification is delivered by the host
/// calling `merge_roster` again.
pub trait AwarenessChannel {
    /// Current snapshot of every peer's ephemeral state, self included.
    fn peer_states(&self) -> Vec<RawPeerState>;
    /// Write the local cursor/selection/status into the local slot.
    fn publish_local(&self, state: RawPeerState);
}

/// Deterministic palette color for a peer id. The same user renders the
/// same color across reloads and across peers with no coordination.
pub fn color_for_peer(peer_id: &str) -> &'static str {
    let digest = Sha256::digest(peer_id.as_bytes());
    PRESENCE_PALETTE[digest[0] as usize % PRESENCE_PALETTE.len()]
}

/// Build the roster from a snapshot: self excluded, ordered by join time
/// then peer id so the rendering order does not jump between merges. Peers
/// with partial state are included as soon as their identity is known.
pub fn merge_roster(
    self_peer_id: &str,
    peers: impl IntoIterator<Item = RawPeerState>,
) -> Vec<PresenceEntry> {
    let mut raw: Vec<RawPeerState> = peers
        .into_iter()
        .filter(|p| !p.peer_id.is_empty() && p.peer_id != self_peer_id)
        .collect();
    raw.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then(a.peer_id.cmp(&b.peer_id)));

    raw.into_iter()
        .map(|peer| PresenceEntry {
            display_name: peer
                .display_name
                .filter(|n| !n.is_empty())
                .unwrap_or_else(|| short_peer_id(&peer.peer_id)),
            color: color_for_peer(&peer.peer_id),
            status: peer
                .status
                .as_deref()
                .map(PeerStatus::parse)
                .unwrap_or_default(),
            cursor: peer.cursor,
            selection: peer.selection,
            sharing: peer.sharing.unwrap_or_default(),
            peer_id: peer.peer_id,
        })
        .collect()
}

/// Peers the local user has chosen to follow. Purely local view state.
#[derive(Debug, Default)]
pub struct FollowList {
    followed: HashSet<String>,
}

impl FollowList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the peer was not already followed.
    pub fn follow(&mut self, peer_id: &str) -> bool {
        self.followed.insert(peer_id.to_string())
    }

    pub fn unfollow(&mut self, peer_id: &str) -> bool {
        self.followed.remove(peer_id)
    }

    pub fn is_following(&self, peer_id: &str) -> bool {
        self.followed.contains(peer_id)
    }

    pub fn followed_peers(&self) -> Vec<&str> {
        let mut peers: Vec<&str> = self.followed.iter().map(|s| s.as_str()).collect();
        peers.sort();
        peers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(id: &str, joined_at: u64) -> RawPeerState {
        RawPeerState {
            peer_id: id.to_string(),
            display_name: None,
            status: None,
            cursor: None,
            selection: None,
            sharing: None,
            joined_at,
        }
    }

    #[test]
    fn test_color_stable_across_merges() {
        let first = color_for_peer("peer-abc");
        for _ in 0..10 {
            assert_eq!(color_for_peer("peer-abc"), first);
        }
        assert!(PRESENCE_PALETTE.contains(&first));
    }

    #[test]
    fn test_roster_excludes_self() {
        let roster = merge_roster("me", vec![peer("me", 1), peer("p1", 2)]);
        assert_eq!(roster.len(), 1);
        assert_eq!(roster[0].peer_id, "p1");
    }

    #[test]
    fn test_partial_peer_included_with_fallback_name() {
        let roster = merge_roster("me", vec![peer("abcdef1234567890", 1)]);
        assert_eq!(roster[0].display_name, "abcdef12...");
        assert_eq!(roster[0].status, PeerStatus::Viewing);
        assert!(roster[0].cursor.is_none());
    }

    #[test]
    fn test_roster_order_stable_regardless_of_snapshot_order() {
        let forward = merge_roster("me", vec![peer("p1", 10), peer("p2", 20), peer("p3", 20)]);
        let backward = merge_roster("me", vec![peer("p3", 20), peer("p2", 20), peer("p1", 10)]);
        let forward_ids: Vec<&str> = forward.iter().map(|e| e.peer_id.as_str()).collect();
        let backward_ids: Vec<&str> = backward.iter().map(|e| e.peer_id.as_str()).collect();
        assert_eq!(forward_ids, vec!["p1", "p2", "p3"]);
        assert_eq!(forward_ids, backward_ids);
    }

    #[test]
    fn test_named_peer_keeps_name() {
        let mut named = peer("p1", 1);
        named.display_name = Some("ada".to_string());
        named.status = Some("editing".to_string());
        let roster = merge_roster("me", vec![named]);
        assert_eq!(roster[0].display_name, "ada");
        assert_eq!(roster[0].status, PeerStatus::Editing);
    }

    #[test]
    fn test_follow_list() {
        let mut follows = FollowList::new();
        assert!(follows.follow("p1"));
        assert!(!follows.follow("p1"));
        assert!(follows.is_following("p1"));
        assert!(follows.unfollow("p1"));
        assert!(!follows.unfollow("p1"));
        assert!(follows.followed_peers().is_empty());
    }
}
