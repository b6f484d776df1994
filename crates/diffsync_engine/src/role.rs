//! Which side of the protocol a reconciler runs on.

use diffsync_protocol::{BackupShadowDocument, Edit, ShadowDocument};

/// The side of the protocol the local engine plays.
///
/// Each side *owns* one shadow counter, which it bumps when it diffs its
/// own changes, and advances the *peer* counter when it applies edits from
/// the other side:
///
/// | role   | own counter      | peer counter     |
/// |--------|------------------|------------------|
/// | client | `client_version` | `server_version` |
/// | server | `server_version` | `client_version` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The client side.
    Client,
    /// The server side.
    Server,
}

impl Role {
    /// The shadow counter this side owns.
    pub fn own_version<C>(self, shadow: &ShadowDocument<C>) -> u64 {
        match self {
            Role::Client => shadow.client_version,
            Role::Server => shadow.server_version,
        }
    }

    /// The shadow counter the peer owns.
    pub fn peer_version<C>(self, shadow: &ShadowDocument<C>) -> u64 {
        match self {
            Role::Client => shadow.server_version,
            Role::Server => shadow.client_version,
        }
    }

    /// The edit's claim about this side's counter.
    ///
    /// `None` sorts below every version; it only occurs for seed or
    /// malformed client versions.
    pub fn edit_own_version<D>(self, edit: &Edit<D>) -> Option<u64> {
        match self {
            Role::Client => edit.client_counter(),
            Role::Server => Some(edit.server_version),
        }
    }

    /// The edit's claim about the peer's counter.
    pub fn edit_peer_version<D>(self, edit: &Edit<D>) -> Option<u64> {
        match self {
            Role::Client => Some(edit.server_version),
            Role::Server => edit.client_counter(),
        }
    }

    /// Returns true if this side honours seed edits.
    ///
    /// Seeds only ever flow from server to client.
    pub fn accepts_seed(self) -> bool {
        self == Role::Client
    }

    /// Returns `shadow` with the given own and peer counters.
    pub fn with_versions<C>(
        self,
        shadow: ShadowDocument<C>,
        own: u64,
        peer: u64,
    ) -> ShadowDocument<C> {
        match self {
            Role::Client => shadow.with_versions(peer, own),
            Role::Server => shadow.with_versions(own, peer),
        }
    }

    /// Bumps the own counter, after diffing a local change.
    pub fn advance_own<C>(self, shadow: ShadowDocument<C>) -> ShadowDocument<C> {
        let (own, peer) = (self.own_version(&shadow), self.peer_version(&shadow));
        self.with_versions(shadow, own + 1, peer)
    }

    /// Bumps the peer counter, after applying a peer edit.
    pub fn advance_peer<C>(self, shadow: ShadowDocument<C>) -> ShadowDocument<C> {
        let (own, peer) = (self.own_version(&shadow), self.peer_version(&shadow));
        self.with_versions(shadow, own, peer + 1)
    }

    /// Checkpoints `shadow` under this side's own counter.
    pub fn checkpoint<C: Clone>(self, shadow: &ShadowDocument<C>) -> BackupShadowDocument<C> {
        BackupShadowDocument::new(self.own_version(shadow), shadow.clone())
    }
}
