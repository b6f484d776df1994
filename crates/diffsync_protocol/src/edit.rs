//! Edits and patch messages.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Reserved client version marking a seed edit.
///
/// A seed edit bootstraps a client shadow from a document the client has
/// never synchronized; the receiver skips version matching for it.
pub const SEED_CLIENT_VERSION: i64 = -1;

/// A self-describing delta.
///
/// The version pair names the shadow state the diff was computed against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Edit<D> {
    /// Client version of the source shadow, or [`SEED_CLIENT_VERSION`].
    pub client_version: i64,
    /// Server version of the source shadow.
    pub server_version: u64,
    /// Checksum of the source shadow content.
    pub checksum: String,
    /// Opaque diff produced by a synchronizer.
    pub diff: D,
}

impl<D> Edit<D> {
    /// Creates an edit computed against a shadow at the given versions.
    pub fn new(client_version: u64, server_version: u64, checksum: String, diff: D) -> Self {
        Self {
            client_version: i64::try_from(client_version).unwrap_or(i64::MAX),
            server_version,
            checksum,
            diff,
        }
    }

    /// Creates a seed edit.
    pub fn seed(server_version: u64, checksum: String, diff: D) -> Self {
        Self {
            client_version: SEED_CLIENT_VERSION,
            server_version,
            checksum,
            diff,
        }
    }

    /// Returns true if this is a seed edit.
    pub fn is_seed(&self) -> bool {
        self.client_version == SEED_CLIENT_VERSION
    }

    /// The client version as a shadow counter, `None` for seed edits.
    pub fn client_counter(&self) -> Option<u64> {
        u64::try_from(self.client_version).ok()
    }
}

/// The envelope carrying edits for one `(document, client)` pair.
///
/// Edits are applied strictly in order; each one assumes the shadow state
/// produced by its predecessor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatchMessage<D> {
    /// Document identifier.
    pub document_id: String,
    /// Client identifier.
    pub client_id: String,
    /// Ordered edits.
    #[serde(default = "VecDeque::new")]
    pub edits: VecDeque<Edit<D>>,
}

impl<D> PatchMessage<D> {
    /// Creates a message carrying `edits`.
    pub fn new(
        document_id: impl Into<String>,
        client_id: impl Into<String>,
        edits: VecDeque<Edit<D>>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            client_id: client_id.into(),
            edits,
        }
    }

    /// Creates a message without edits.
    pub fn empty(document_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::new(document_id, client_id, VecDeque::new())
    }

    /// Creates a message carrying a single edit.
    pub fn single(
        document_id: impl Into<String>,
        client_id: impl Into<String>,
        edit: Edit<D>,
    ) -> Self {
        Self::new(document_id, client_id, VecDeque::from([edit]))
    }

    /// Returns true if the message carries no edits.
    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }
}
