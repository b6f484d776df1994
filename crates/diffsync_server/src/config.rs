//! Server configuration.

/// What happens when a client attaches with content to a document that
/// already exists.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AttachPolicy {
    /// The stored document is kept; the client is seeded with it.
    #[default]
    StoredWins,
    /// The supplied content replaces the stored document and the other
    /// subscribers are notified.
    SuppliedWins,
}

/// Configuration for the server sync engine.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Conflict policy for attaching with content.
    pub attach_policy: AttachPolicy,
    /// Whether subscribers whose shadow already matches the document are
    /// still sent a patch message.
    pub notify_unchanged: bool,
    /// Server version carried by seed edits and new-document replies.
    pub seed_server_version: u64,
}

impl ServerConfig {
    /// Creates a configuration with default settings.
    pub fn new() -> Self {
        Self {
            attach_policy: AttachPolicy::StoredWins,
            notify_unchanged: false,
            seed_server_version: 1,
        }
    }

    /// Sets the attach policy.
    pub fn with_attach_policy(mut self, policy: AttachPolicy) -> Self {
        self.attach_policy = policy;
        self
    }

    /// Sets whether unchanged subscribers are notified.
    pub fn with_notify_unchanged(mut self, notify: bool) -> Self {
        self.notify_unchanged = notify;
        self
    }

    /// Sets the server version of seed edits.
    pub fn with_seed_server_version(mut self, version: u64) -> Self {
        self.seed_server_version = version;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new()
    }
}
