//! Error types for protocol handling.

use thiserror::Error;

/// Result type for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Errors raised while encoding, decoding or applying protocol data.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// The `msgType` field named a type this protocol does not know.
    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    /// A required field was absent from a message.
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// A diff could not be applied to the content it was given.
    #[error("patch rejected: {0}")]
    PatchRejected(String),
}

impl ProtocolError {
    /// Creates a patch rejection error.
    pub fn patch_rejected(message: impl Into<String>) -> Self {
        Self::PatchRejected(message.into())
    }

    /// Returns true if the error was caused by malformed input from a peer.
    pub fn is_malformed_input(&self) -> bool {
        matches!(
            self,
            ProtocolError::Codec(_)
                | ProtocolError::UnknownMessageType(_)
                | ProtocolError::MissingField(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_input_errors() {
        assert!(ProtocolError::UnknownMessageType("ping".into()).is_malformed_input());
        assert!(ProtocolError::MissingField("msgType").is_malformed_input());
        assert!(!ProtocolError::patch_rejected("base mismatch").is_malformed_input());
    }

    #[test]
    fn error_display() {
        let err = ProtocolError::UnknownMessageType("ping".into());
        assert_eq!(err.to_string(), "unknown message type 'ping'");

        let err = ProtocolError::MissingField("documentId");
        assert!(err.to_string().contains("documentId"));
    }
}
