//! Data store traits.

use crate::error::StoreResult;
use diffsync_protocol::{BackupShadowDocument, ClientDocument, Document, Edit, ShadowDocument};
use std::collections::VecDeque;

/// Per-pair synchronization state shared by both sides.
///
/// All state is keyed by `(document_id, client_id)`.
///
/// # Invariants
///
/// - At most one shadow and one backup exist per pair; saving replaces them
/// - Pending edits keep their insertion order
/// - Concurrent `save_edit`/`remove_edit` calls for the same pair never lose
///   each other's effect
/// - Implementations must be `Send + Sync` for concurrent access
///
/// # Implementors
///
/// - [`crate::ClientInMemoryDataStore`]
/// - [`crate::ServerInMemoryDataStore`]
pub trait DataStore<C, D>: Send + Sync {
    /// Stores the live shadow for the pair named by `shadow.document`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_shadow(&self, shadow: ShadowDocument<C>) -> StoreResult<()>;

    /// Returns the live shadow for the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn shadow(&self, document_id: &str, client_id: &str) -> StoreResult<Option<ShadowDocument<C>>>;

    /// Stores the backup for the pair named by `backup.shadow.document`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_backup(&self, backup: BackupShadowDocument<C>) -> StoreResult<()>;

    /// Returns the backup for the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn backup(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> StoreResult<Option<BackupShadowDocument<C>>>;

    /// Appends `edit` to the pending queue of the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_edit(&self, document_id: &str, client_id: &str, edit: Edit<D>) -> StoreResult<()>;

    /// Removes the pending edits acknowledged by `edit`.
    ///
    /// Every queued edit whose `client_version` is less than or equal to
    /// `edit.client_version` is removed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn remove_edit(&self, document_id: &str, client_id: &str, edit: &Edit<D>) -> StoreResult<()>;

    /// Returns the pending edits of the pair in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn edits(&self, document_id: &str, client_id: &str) -> StoreResult<VecDeque<Edit<D>>>;

    /// Clears the pending queue of the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn remove_edits(&self, document_id: &str, client_id: &str) -> StoreResult<()>;
}

/// Client-side store: adds the client's working copies.
pub trait ClientDataStore<C, D>: DataStore<C, D> {
    /// Stores the working copy named by `document.id` and `document.client_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_client_document(&self, document: ClientDocument<C>) -> StoreResult<()>;

    /// Returns the working copy for the pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn client_document(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> StoreResult<Option<ClientDocument<C>>>;
}

/// Server-side store: adds the authoritative documents.
pub trait ServerDataStore<C, D>: DataStore<C, D> {
    /// Creates `document` if no document with its id exists.
    ///
    /// This is a single atomic insert-if-absent: of several concurrent
    /// callers for the same id exactly one observes `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn save_document(&self, document: Document<C>) -> StoreResult<bool>;

    /// Stores `document`, replacing any existing content.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn update_document(&self, document: Document<C>) -> StoreResult<()>;

    /// Returns the document with the given id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store fails.
    fn document(&self, document_id: &str) -> StoreResult<Option<Document<C>>>;
}
