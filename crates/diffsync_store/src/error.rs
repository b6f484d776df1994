//! Error types for store operations.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
///
/// The in-memory stores never fail; durable implementations report their
/// failures through [`StoreError::Backend`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store failed.
    #[error("store backend error: {0}")]
    Backend(String),
}

impl StoreError {
    /// Creates a backend error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = StoreError::backend("disk full");
        assert_eq!(err.to_string(), "store backend error: disk full");
    }
}
