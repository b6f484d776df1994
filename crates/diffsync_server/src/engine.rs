//! Server sync engine.

use crate::config::{AttachPolicy, ServerConfig};
use crate::registry::{Subscriber, SubscriberRegistry};
use diffsync_engine::{Reconciler, Role, SyncError, SyncResult, SyncStats};
use diffsync_protocol::{
    BackupShadowDocument, ClientDocument, Document, Edit, PatchMessage, ShadowDocument,
    Synchronizer,
};
use diffsync_store::ServerDataStore;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The server half of the protocol.
///
/// Holds one authoritative document per id and one shadow per
/// `(document, client)` pair. Calls may run concurrently from any number of
/// connection threads.
pub struct ServerSyncEngine<S: Synchronizer, St> {
    synchronizer: S,
    store: Arc<St>,
    registry: Arc<SubscriberRegistry<S::Diff>>,
    config: ServerConfig,
    stats: RwLock<SyncStats>,
}

impl<S, St> ServerSyncEngine<S, St>
where
    S: Synchronizer,
    St: ServerDataStore<S::Content, S::Diff>,
{
    /// Creates a new server engine.
    pub fn new(
        synchronizer: S,
        store: Arc<St>,
        registry: Arc<SubscriberRegistry<S::Diff>>,
        config: ServerConfig,
    ) -> Self {
        Self {
            synchronizer,
            store,
            registry,
            config,
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The subscriber registry.
    pub fn registry(&self) -> &Arc<SubscriberRegistry<S::Diff>> {
        &self.registry
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The authoritative document.
    pub fn document(&self, document_id: &str) -> SyncResult<Option<Document<S::Content>>> {
        Ok(self.store.document(document_id)?)
    }

    /// The server's shadow for a client.
    pub fn shadow(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<Option<ShadowDocument<S::Content>>> {
        Ok(self.store.shadow(document_id, client_id)?)
    }

    /// The last checkpoint of the server's shadow for a client.
    pub fn backup(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<Option<BackupShadowDocument<S::Content>>> {
        Ok(self.store.backup(document_id, client_id)?)
    }

    /// Edits queued for a client and not yet acknowledged.
    pub fn pending_edits(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<VecDeque<Edit<S::Diff>>> {
        Ok(self.store.edits(document_id, client_id)?)
    }

    /// Attaches `subscriber` to `document_id` and returns its first message.
    ///
    /// - New document with content: the document is created and the reply
    ///   is an unchanged edit one server version ahead of the stored shadow
    /// - Existing document: the client is seeded from the stored content
    ///   (or from `content` under [`AttachPolicy::SuppliedWins`])
    /// - Neither: an empty reply, and the subscriber is not registered
    ///
    /// Of two concurrent first attaches with content, exactly one creates
    /// the document; the other is seeded from the winner's content.
    pub fn add_subscriber(
        &self,
        subscriber: Arc<dyn Subscriber<S::Diff>>,
        document_id: &str,
        content: Option<S::Content>,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        let client_id = subscriber.client_id().to_string();

        let reply = match content {
            None => match self.store.document(document_id)? {
                Some(stored) => self.seed(&stored, &client_id, &stored.content)?,
                None => {
                    debug!(document_id, client_id = %client_id, "attach to unknown document");
                    return Ok(PatchMessage::empty(document_id, client_id));
                }
            },
            Some(content) => {
                let document = Document::new(document_id, content);
                if self.store.save_document(document.clone())? {
                    info!(document_id, client_id = %client_id, "created document");
                    let shadow = self.create_shadow(&document, &client_id)?;
                    let edit = self
                        .synchronizer
                        .diff(&document.content, &Role::Server.advance_own(shadow));
                    PatchMessage::single(document_id, client_id.clone(), edit)
                } else {
                    self.attach_existing(document, &client_id)?
                }
            }
        };

        self.connect_subscriber(subscriber, document_id);
        Ok(reply)
    }

    fn attach_existing(
        &self,
        supplied: Document<S::Content>,
        client_id: &str,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        match self.config.attach_policy {
            AttachPolicy::StoredWins => {
                let stored = self.require_document(&supplied.id)?;
                self.seed(&stored, client_id, &supplied.content)
            }
            AttachPolicy::SuppliedWins => {
                self.store.update_document(supplied.clone())?;
                info!(document_id = %supplied.id, client_id, "attach replaced stored document");
                let reply = self.seed(&supplied, client_id, &supplied.content)?;
                self.fan_out(&supplied.id)?;
                Ok(reply)
            }
        }
    }

    /// Creates the client's shadow from `document` and replies with a seed
    /// edit that turns `base` into the document's content.
    fn seed(
        &self,
        document: &Document<S::Content>,
        client_id: &str,
        base: &S::Content,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        self.create_shadow(document, client_id)?;
        let edit = Edit::seed(
            self.config.seed_server_version,
            self.synchronizer.checksum(base),
            self.synchronizer.diff_content(base, &document.content),
        );
        info!(document_id = %document.id, client_id, "seeding client");
        Ok(PatchMessage::single(document.id.clone(), client_id, edit))
    }

    fn create_shadow(
        &self,
        document: &Document<S::Content>,
        client_id: &str,
    ) -> SyncResult<ShadowDocument<S::Content>> {
        let shadow = ShadowDocument::new(
            0,
            0,
            ClientDocument::new(document.id.clone(), client_id, document.content.clone()),
        );
        self.store.save_shadow(shadow.clone())?;
        self.store.save_backup(Role::Server.checkpoint(&shadow))?;
        Ok(shadow)
    }

    /// Registers `subscriber` for `document_id` without touching any shadow.
    pub fn connect_subscriber(&self, subscriber: Arc<dyn Subscriber<S::Diff>>, document_id: &str) {
        debug!(document_id, client_id = subscriber.client_id(), "connected subscriber");
        self.registry.add(document_id, subscriber);
    }

    /// Unregisters `subscriber`. Returns true if it was registered.
    pub fn remove_subscriber(
        &self,
        subscriber: &Arc<dyn Subscriber<S::Diff>>,
        document_id: &str,
    ) -> bool {
        let removed = self.registry.remove(document_id, subscriber);
        debug!(document_id, client_id = subscriber.client_id(), removed, "removed subscriber");
        removed
    }

    /// Subscribers of `document_id`.
    pub fn subscribers(&self, document_id: &str) -> Vec<Arc<dyn Subscriber<S::Diff>>> {
        self.registry.subscribers(document_id)
    }

    /// Diffs the document against the client's shadow.
    ///
    /// The edit is queued for the client and folded into the shadow, whose
    /// server version advances.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::MissingDocument`] or [`SyncError::MissingShadow`]
    /// if the pair was never attached.
    pub fn diff(&self, document_id: &str, client_id: &str) -> SyncResult<Edit<S::Diff>> {
        let document = self.require_document(document_id)?;
        let shadow = self.require_shadow(document_id, client_id)?;

        let edit = self.synchronizer.diff(&document.content, &shadow);
        let patched = self.synchronizer.patch_shadow(&edit, &shadow)?;
        self.store.save_edit(document_id, client_id, edit.clone())?;
        self.store.save_shadow(Role::Server.advance_own(patched))?;
        self.stats.write().diffs += 1;
        Ok(edit)
    }

    /// Diffs, then returns every edit the client has not acknowledged.
    pub fn patch_message(
        &self,
        document_id: &str,
        client_id: &str,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        self.diff(document_id, client_id)?;
        let edits = self.store.edits(document_id, client_id)?;
        Ok(PatchMessage::new(document_id, client_id, edits))
    }

    /// Applies a client's message to its shadow and the document.
    ///
    /// Returns the message with discarded edits removed.
    pub fn patch(&self, message: PatchMessage<S::Diff>) -> SyncResult<PatchMessage<S::Diff>> {
        let mut message = message;
        let outcome = Reconciler::new(Role::Server, &self.synchronizer, self.store.as_ref())
            .reconcile(&mut message)?;
        self.stats.write().record(&outcome);

        if outcome.changed() {
            let document = self.require_document(&message.document_id)?;
            let edit = self.synchronizer.document_edit(&document.content, &outcome.shadow);
            let document = self.synchronizer.patch_document(&edit, &document)?;
            self.store.update_document(document)?;
            self.store.save_backup(Role::Server.checkpoint(&outcome.shadow))?;
        }
        Ok(message)
    }

    /// Pushes the current document to every subscriber of the message's
    /// document whose shadow is behind. Returns the number notified.
    ///
    /// A message without edits notifies nobody. A failing subscriber is
    /// logged and skipped.
    pub fn notify_subscribers(&self, message: &PatchMessage<S::Diff>) -> SyncResult<usize> {
        if message.is_empty() {
            return Ok(0);
        }
        self.fan_out(&message.document_id)
    }

    /// [`patch`](Self::patch) followed by
    /// [`notify_subscribers`](Self::notify_subscribers).
    pub fn patch_and_notify(
        &self,
        message: PatchMessage<S::Diff>,
    ) -> SyncResult<PatchMessage<S::Diff>> {
        let patched = self.patch(message)?;
        self.notify_subscribers(&patched)?;
        Ok(patched)
    }

    fn fan_out(&self, document_id: &str) -> SyncResult<usize> {
        let document = self.require_document(document_id)?;
        let mut notified = 0;
        for subscriber in self.registry.subscribers(document_id) {
            match self.notify(&document, subscriber.as_ref()) {
                Ok(true) => notified += 1,
                Ok(false) => {}
                Err(err) => warn!(
                    document_id,
                    client_id = subscriber.client_id(),
                    error = %err,
                    "failed to notify subscriber"
                ),
            }
        }
        debug!(document_id, notified, "notified subscribers");
        Ok(notified)
    }

    fn notify(
        &self,
        document: &Document<S::Content>,
        subscriber: &dyn Subscriber<S::Diff>,
    ) -> SyncResult<bool> {
        let client_id = subscriber.client_id();
        let shadow = self.require_shadow(&document.id, client_id)?;
        let outstanding = self
            .synchronizer
            .diff_content(shadow.content(), &document.content);
        if !self.config.notify_unchanged && self.synchronizer.is_unchanged(&outstanding) {
            return Ok(false);
        }
        subscriber.patched(self.patch_message(&document.id, client_id)?);
        Ok(true)
    }

    fn require_document(&self, document_id: &str) -> SyncResult<Document<S::Content>> {
        self.store
            .document(document_id)?
            .ok_or_else(|| SyncError::missing_document(document_id))
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
