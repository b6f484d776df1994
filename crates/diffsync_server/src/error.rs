//! Error types for the sync server.

use diffsync_engine::SyncError;
use diffsync_protocol::ProtocolError;
use thiserror::Error;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;

/// Errors that can occur in the sync server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Invalid request.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Engine error.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Wire codec error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

impl ServerError {
    /// Returns true if the peer sent something it should not have.
    pub fn is_client_error(&self) -> bool {
        match self {
            ServerError::InvalidRequest(_) => true,
            ServerError::Protocol(err) => err.is_malformed_input(),
            ServerError::Sync(err) => {
                err.is_protocol_violation() || matches!(err, SyncError::MissingShadow { .. })
            }
        }
    }

    /// Returns true if the pair cannot make progress without intervention.
    pub fn is_fatal(&self) -> bool {
        match self {
            ServerError::Sync(err) => err.is_protocol_violation(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diffsync_store::StoreError;

    #[test]
    fn error_classification() {
        assert!(ServerError::InvalidRequest("bad".into()).is_client_error());
        assert!(!ServerError::InvalidRequest("bad".into()).is_fatal());

        let violation = ServerError::from(SyncError::MissingBackup {
            document_id: "d1".into(),
            client_id: "c1".into(),
        });
        assert!(violation.is_client_error());
        assert!(violation.is_fatal());

        let store = ServerError::from(SyncError::from(StoreError::backend("down")));
        assert!(!store.is_client_error());
        assert!(!store.is_fatal());
    }

    #[test]
    fn error_display() {
        let err = ServerError::from(ProtocolError::UnknownMessageType("bogus".into()));
        assert!(err.to_string().contains("bogus"));
        assert!(err.is_client_error());
    }
}
