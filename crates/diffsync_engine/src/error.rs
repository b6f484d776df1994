//! Error types for the sync engines.

use diffsync_protocol::ProtocolError;
use diffsync_store::StoreError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// No shadow exists for the pair; the document was never added.
    #[error("no shadow for document {document_id} and client {client_id}")]
    MissingShadow {
        /// Document ID.
        document_id: String,
        /// Client ID.
        client_id: String,
    },

    /// The working document does not exist.
    #[error("document {document_id} not found")]
    MissingDocument {
        /// Document ID.
        document_id: String,
    },

    /// Recovery was needed but no backup shadow exists for the pair.
    #[error("no backup shadow for document {document_id} and client {client_id}")]
    MissingBackup {
        /// Document ID.
        document_id: String,
        /// Client ID.
        client_id: String,
    },

    /// The peer referenced a version that no retained checkpoint matches.
    #[error(
        "backup version {backup_version} for document {document_id} and client {client_id} \
         does not match edit version {edit_version:?}"
    )]
    BackupVersionMismatch {
        /// Document ID.
        document_id: String,
        /// Client ID.
        client_id: String,
        /// Version of the retained backup.
        backup_version: u64,
        /// Version the edit claims, `None` for a malformed client version.
        edit_version: Option<u64>,
    },

    /// Protocol error (codec or patch failure).
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl SyncError {
    /// Creates a missing shadow error.
    pub fn missing_shadow(document_id: &str, client_id: &str) -> Self {
        Self::MissingShadow {
            document_id: document_id.to_string(),
            client_id: client_id.to_string(),
        }
    }

    /// Creates a missing document error.
    pub fn missing_document(document_id: &str) -> Self {
        Self::MissingDocument {
            document_id: document_id.to_string(),
        }
    }

    /// Returns true if the peer's history for the pair cannot be reconciled.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(
            self,
            SyncError::MissingBackup { .. } | SyncError::BackupVersionMismatch { .. }
        )
    }

    /// Returns true if retrying the same call cannot succeed.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::Store(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_violations() {
        let err = SyncError::BackupVersionMismatch {
            document_id: "d1".into(),
            client_id: "c1".into(),
            backup_version: 1,
            edit_version: Some(0),
        };
        assert!(err.is_protocol_violation());
        assert!(err.is_fatal());

        let err = SyncError::MissingBackup {
            document_id: "d1".into(),
            client_id: "c1".into(),
        };
        assert!(err.is_protocol_violation());

        assert!(!SyncError::missing_shadow("d1", "c1").is_protocol_violation());
    }

    #[test]
    fn store_errors_are_not_fatal() {
        let err = SyncError::from(StoreError::backend("unavailable"));
        assert!(!err.is_fatal());
        assert!(!err.is_protocol_violation());
    }

    #[test]
    fn error_display() {
        let err = SyncError::missing_document("d1");
        assert_eq!(err.to_string(), "document d1 not found");

        let err = SyncError::BackupVersionMismatch {
            document_id: "d1".into(),
            client_id: "c1".into(),
            backup_version: 3,
            edit_version: Some(1),
        };
        assert!(err.to_string().contains("backup version 3"));
        assert!(err.to_string().contains("Some(1)"));
    }
}
