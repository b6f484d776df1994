//! Client sync engine.

use crate::error::{SyncError, SyncResult};
use crate::reconcile::{Reconciler, SyncStats};
use crate::role::Role;
use diffsync_protocol::{
    AddRequest, BackupShadowDocument, ClientDocument, Edit, PatchMessage, ShadowDocument,
    SyncMessage, Synchronizer,
};
use diffsync_store::ClientDataStore;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::debug;

/// Callback invoked after every successful [`ClientSyncEngine::patch`].
pub trait PatchListener<C>: Send + Sync {
    /// Called with the updated working document.
    fn patched(&self, document: &ClientDocument<C>);
}

impl<C, F> PatchListener<C> for F
where
    F: Fn(&ClientDocument<C>) + Send + Sync,
{
    fn patched(&self, document: &ClientDocument<C>) {
        self(document)
    }
}

/// The client half of the protocol.
///
/// One engine serves any number of documents; state is partitioned by
/// `(document_id, client_id)` in the store.
pub struct ClientSyncEngine<S: Synchronizer, St> {
    synchronizer: S,
    store: Arc<St>,
    listeners: RwLock<Vec<Box<dyn PatchListener<S::Content>>>>,
    stats: RwLock<SyncStats>,
}

impl<S, St> ClientSyncEngine<S, St>
where
    S: Synchronizer,
    St: ClientDataStore<S::Content, S::Diff>,
{
    /// Creates a new client engine.
    pub fn new(synchronizer: S, store: Arc<St>) -> Self {
        Self {
            synchronizer,
            store,
            listeners: RwLock::new(Vec::new()),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Registers a listener for patched documents.
    ///
    /// Listeners run synchronously, in registration order.
    pub fn add_listener(&self, listener: impl PatchListener<S::Content> + 'static) {
        self.listeners.write().push(Box::new(listener));
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Starts tracking `document`.
    ///
    /// The shadow starts at version `(0, 0)` and is checkpointed as the
    /// first backup. Nothing is sent.
    pub fn add_document(&self, document: ClientDocument<S::Content>) -> SyncResult<()> {
        let shadow = ShadowDocument::new(0, 0, document.clone());
        debug!(document_id = %document.id, client_id = %document.client_id, "added document");
        self.store.save_client_document(document)?;
        self.store.save_backup(Role::Client.checkpoint(&shadow))?;
        self.store.save_shadow(shadow)?;
        Ok(())
    }

    /// Builds the `add` message announcing `document` to the server.
    pub fn add_message(
        &self,
        document: &ClientDocument<S::Content>,
    ) -> SyncMessage<S::Content, S::Diff> {
        SyncMessage::Add(AddRequest::new(
            document.id.clone(),
            document.client_id.clone(),
            Some(document.content.clone()),
        ))
    }

    /// Records a local change.
    ///
    /// Diffs `document` against the shadow, queues the edit, and folds it
    /// into the shadow. The returned message carries every edit the server
    /// has not acknowledged yet, so edits lost in transit are resent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingShadow`] if the document was never added.
    pub fn diff(
        &self,
        document: ClientDocument<S::Content>,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        let (document_id, client_id) = (document.id.clone(), document.client_id.clone());
        let shadow = self.require_shadow(&document_id, &client_id)?;

        let edit = self.synchronizer.diff(&document.content, &shadow);
        let patched = self.synchronizer.patch_shadow(&edit, &shadow)?;
        self.store.save_edit(&document_id, &client_id, edit)?;
        self.store.save_shadow(Role::Client.advance_own(patched))?;
        self.store.save_client_document(document)?;
        self.stats.write().diffs += 1;

        let edits = self.store.edits(&document_id, &client_id)?;
        debug!(
            document_id = %document_id,
            client_id = %client_id,
            pending = edits.len(),
            "diffed local document"
        );
        Ok(PatchMessage::new(document_id, client_id, edits))
    }

    /// Applies a message from the server and returns the updated working
    /// document.
    ///
    /// Listeners are notified on success, whether or not the document
    /// changed.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingShadow`] or [`SyncError::MissingDocument`]
    /// for an unknown pair, and a protocol violation if the server's history
    /// cannot be reconciled.
    pub fn patch(
        &self,
        message: &PatchMessage<S::Diff>,
    ) -> SyncResult<ClientDocument<S::Content>> {
        let mut message = message.clone();
        let outcome =
            Reconciler::new(Role::Client, &self.synchronizer, self.store.as_ref())
                .reconcile(&mut message)?;
        self.stats.write().record(&outcome);

        let mut document = self
            .store
            .client_document(&message.document_id, &message.client_id)?
            .ok_or_else(|| SyncError::missing_document(&message.document_id))?;

        if outcome.changed() {
            let edit = self.synchronizer.document_edit(&document.content, &outcome.shadow);
            let content = self.synchronizer.patch_content(&edit.diff, &document.content)?;
            document = document.with_content(content);
            self.store.save_client_document(document.clone())?;
            self.store.save_backup(Role::Client.checkpoint(&outcome.shadow))?;
        }

        for listener in self.listeners.read().iter() {
            listener.patched(&document);
        }
        Ok(document)
    }

    /// The working document for the pair.
    pub fn document(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<Option<ClientDocument<S::Content>>> {
        Ok(self.store.client_document(document_id, client_id)?)
    }

    /// The live shadow for the pair.
    pub fn shadow(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<Option<ShadowDocument<S::Content>>> {
        Ok(self.store.shadow(document_id, client_id)?)
    }

    /// The last checkpoint of the shadow.
    pub fn backup(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<Option<BackupShadowDocument<S::Content>>> {
        Ok(self.store.backup(document_id, client_id)?)
    }

    /// Edits not yet acknowledged by the server.
    pub fn pending_edits(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<VecDeque<Edit<S::Diff>>> {
        Ok(self.store.edits(document_id, client_id)?)
    }

    fn require_shadow(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<ShadowDocument<S::Content>> {
        self.store
            .shadow(document_id, client_id)?
            .ok_or_else(|| SyncError::missing_shadow(document_id, client_id))
    }
}
