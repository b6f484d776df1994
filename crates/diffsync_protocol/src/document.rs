//! Documents and their shadows.

use serde::{Deserialize, Serialize};

/// The authoritative copy of a document held by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document<C> {
    /// Document identifier.
    pub id: String,
    /// Document content.
    pub content: C,
}

impl<C> Document<C> {
    /// Creates a new document.
    pub fn new(id: impl Into<String>, content: C) -> Self {
        Self {
            id: id.into(),
            content,
        }
    }
}

/// A document as seen by one particular client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDocument<C> {
    /// Document identifier.
    pub id: String,
    /// Identifier of the client this copy belongs to.
    pub client_id: String,
    /// Document content.
    pub content: C,
}

impl<C> ClientDocument<C> {
    /// Creates a new client document.
    pub fn new(id: impl Into<String>, client_id: impl Into<String>, content: C) -> Self {
        Self {
            id: id.into(),
            client_id: client_id.into(),
            content,
        }
    }

    /// Returns a copy of this document with different content.
    pub fn with_content(&self, content: C) -> Self {
        Self {
            id: self.id.clone(),
            client_id: self.client_id.clone(),
            content,
        }
    }
}

/// A side's belief about what the peer last acknowledged for one
/// `(document, client)` pair.
///
/// # Invariants
///
/// - There is at most one live shadow per pair
/// - Counters never decrease, except for the one-time seed reset of
///   `client_version` to 0
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShadowDocument<C> {
    /// Number of server-side diffs folded into this shadow.
    pub server_version: u64,
    /// Number of client-side diffs folded into this shadow.
    pub client_version: u64,
    /// The shadowed document.
    pub document: ClientDocument<C>,
}

impl<C> ShadowDocument<C> {
    /// Creates a new shadow.
    pub fn new(server_version: u64, client_version: u64, document: ClientDocument<C>) -> Self {
        Self {
            server_version,
            client_version,
            document,
        }
    }

    /// Document identifier of the shadowed document.
    pub fn document_id(&self) -> &str {
        &self.document.id
    }

    /// Client identifier of the shadowed document.
    pub fn client_id(&self) -> &str {
        &self.document.client_id
    }

    /// Shadowed content.
    pub fn content(&self) -> &C {
        &self.document.content
    }

    /// Returns a copy of this shadow holding `content` at the same versions.
    pub fn with_content(&self, content: C) -> Self {
        Self {
            server_version: self.server_version,
            client_version: self.client_version,
            document: self.document.with_content(content),
        }
    }

    /// Returns this shadow with both counters replaced.
    pub fn with_versions(self, server_version: u64, client_version: u64) -> Self {
        Self {
            server_version,
            client_version,
            document: self.document,
        }
    }
}

/// A checkpoint of a shadow, used to recover when the peer reports an
/// older version than the live shadow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupShadowDocument<C> {
    /// The checkpointing side's own counter at the time of the checkpoint.
    pub version: u64,
    /// The checkpointed shadow.
    pub shadow: ShadowDocument<C>,
}

impl<C> BackupShadowDocument<C> {
    /// Creates a new backup.
    pub fn new(version: u64, shadow: ShadowDocument<C>) -> Self {
        Self { version, shadow }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadow_with_content_keeps_versions() {
        let shadow = ShadowDocument::new(3, 7, ClientDocument::new("d1", "c1", "old"));
        let updated = shadow.with_content("new");

        assert_eq!(updated.server_version, 3);
        assert_eq!(updated.client_version, 7);
        assert_eq!(updated.content(), &"new");
        assert_eq!(updated.document_id(), "d1");
        assert_eq!(updated.client_id(), "c1");
    }

    #[test]
    fn shadow_serializes_camel_case() {
        let shadow = ShadowDocument::new(1, 2, ClientDocument::new("d1", "c1", "x".to_string()));
        let json = serde_json::to_value(&shadow).unwrap();

        assert_eq!(json["serverVersion"], 1);
        assert_eq!(json["clientVersion"], 2);
        assert_eq!(json["document"]["clientId"], "c1");
    }
}
