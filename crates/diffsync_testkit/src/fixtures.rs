//! Test fixtures: in-memory engines, recording subscribers, and client
//! sessions with controllable delivery.

use diffsync_engine::{ClientSyncEngine, SyncResult};
use diffsync_protocol::{ClientDocument, Edit, PatchMessage, ShadowDocument, Synchronizer};
use diffsync_server::{ServerConfig, ServerSyncEngine, Subscriber, SubscriberRegistry};
use diffsync_store::{ClientInMemoryDataStore, ServerInMemoryDataStore};
use diffsync_synchronizer::TextSynchronizer;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use uuid::Uuid;

/// Server engine over the in-memory store.
pub type MemoryServer<S> = ServerSyncEngine<
    S,
    ServerInMemoryDataStore<<S as Synchronizer>::Content, <S as Synchronizer>::Diff>,
>;

/// Client engine over the in-memory store.
pub type MemoryClient<S> = ClientSyncEngine<
    S,
    ClientInMemoryDataStore<<S as Synchronizer>::Content, <S as Synchronizer>::Diff>,
>;

/// Returns a fresh id with the given prefix.
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4())
}

/// Creates a server engine with its own store and registry.
pub fn memory_server<S: Synchronizer>(synchronizer: S, config: ServerConfig) -> Arc<MemoryServer<S>> {
    Arc::new(ServerSyncEngine::new(
        synchronizer,
        Arc::new(ServerInMemoryDataStore::new()),
        Arc::new(SubscriberRegistry::new()),
        config,
    ))
}

/// Creates a text server with default configuration.
pub fn text_server() -> Arc<MemoryServer<TextSynchronizer>> {
    memory_server(TextSynchronizer, ServerConfig::default())
}

/// Creates a client engine with its own store.
pub fn memory_client<S: Synchronizer>(synchronizer: S) -> MemoryClient<S> {
    ClientSyncEngine::new(synchronizer, Arc::new(ClientInMemoryDataStore::new()))
}

/// A subscriber that records every pushed message.
pub struct RecordingSubscriber<D> {
    client_id: String,
    inbox: Mutex<VecDeque<PatchMessage<D>>>,
    total: Mutex<usize>,
}

impl<D> RecordingSubscriber<D> {
    /// Creates a subscriber for `client_id`.
    pub fn new(client_id: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            client_id: client_id.into(),
            inbox: Mutex::new(VecDeque::new()),
            total: Mutex::new(0),
        })
    }

    /// Removes and returns the undelivered messages.
    pub fn take(&self) -> Vec<PatchMessage<D>> {
        self.inbox.lock().drain(..).collect()
    }

    /// Number of undelivered messages.
    pub fn len(&self) -> usize {
        self.inbox.lock().len()
    }

    /// Returns true if nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.inbox.lock().is_empty()
    }

    /// Number of messages ever received.
    pub fn total(&self) -> usize {
        *self.total.lock()
    }
}

impl<D: Send> Subscriber<D> for RecordingSubscriber<D> {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn patched(&self, message: PatchMessage<D>) {
        self.inbox.lock().push_back(message);
        *self.total.lock() += 1;
    }
}

/// One client attached to a server, with manual message delivery.
///
/// Messages pushed by the server collect in the session's inbox until the
/// test delivers or drops them.
pub struct ClientSession<S: Synchronizer> {
    /// Document id.
    pub document_id: String,
    /// Client id.
    pub client_id: String,
    /// The client engine.
    pub engine: MemoryClient<S>,
    /// Messages pushed by the server.
    pub inbox: Arc<RecordingSubscriber<S::Diff>>,
    server: Arc<MemoryServer<S>>,
}

impl<S: Synchronizer + Clone> ClientSession<S> {
    /// Adds the document on a new client and attaches it to `server` with
    /// `content`. Returns the session and the server's reply, which has
    /// already been applied.
    pub fn attach(
        server: &Arc<MemoryServer<S>>,
        synchronizer: S,
        document_id: &str,
        content: S::Content,
    ) -> (Self, PatchMessage<S::Diff>) {
        let session = Self::detached(server, synchronizer, document_id, content.clone());
        let reply = server
            .add_subscriber(session.subscriber(), document_id, Some(content))
            .expect("add subscriber");
        session.engine.patch(&reply).expect("apply add reply");
        (session, reply)
    }

    /// Adds the document on a new client without telling the server.
    pub fn detached(
        server: &Arc<MemoryServer<S>>,
        synchronizer: S,
        document_id: &str,
        content: S::Content,
    ) -> Self {
        let client_id = unique_id("client");
        let engine = ClientSyncEngine::new(synchronizer, Arc::new(ClientInMemoryDataStore::new()));
        engine
            .add_document(ClientDocument::new(document_id, client_id.clone(), content))
            .expect("add document");
        Self {
            document_id: document_id.to_string(),
            inbox: RecordingSubscriber::new(client_id.clone()),
            client_id,
            engine,
            server: Arc::clone(server),
        }
    }

    /// The session's subscriber handle.
    pub fn subscriber(&self) -> Arc<dyn Subscriber<S::Diff>> {
        self.inbox.clone()
    }

    /// Records a local change and returns the message to send.
    pub fn edit(&self, content: S::Content) -> PatchMessage<S::Diff> {
        self.engine
            .diff(ClientDocument::new(&self.document_id, &self.client_id, content))
            .expect("client diff")
    }

    /// Sends a message to the server, which patches and notifies.
    pub fn send(&self, message: PatchMessage<S::Diff>) -> SyncResult<PatchMessage<S::Diff>> {
        self.server.patch_and_notify(message)
    }

    /// Edits and sends.
    pub fn change(&self, content: S::Content) {
        let message = self.edit(content);
        self.send(message).expect("server patch");
    }

    /// Applies every waiting server message and returns them.
    pub fn deliver(&self) -> Vec<PatchMessage<S::Diff>> {
        let messages = self.inbox.take();
        for message in &messages {
            self.engine.patch(message).expect("client patch");
        }
        messages
    }

    /// Discards every waiting server message and returns how many.
    pub fn drop_inbox(&self) -> usize {
        self.inbox.take().len()
    }

    /// Asks the server for a fresh diff and applies it directly.
    pub fn pull(&self) -> PatchMessage<S::Diff> {
        let message = self
            .server
            .patch_message(&self.document_id, &self.client_id)
            .expect("server patch message");
        self.engine.patch(&message).expect("client patch");
        message
    }

    /// The client's working content.
    pub fn content(&self) -> S::Content {
        self.engine
            .document(&self.document_id, &self.client_id)
            .expect("client document")
            .expect("document exists")
            .content
    }

    /// The client's shadow.
    pub fn shadow(&self) -> ShadowDocument<S::Content> {
        self.engine
            .shadow(&self.document_id, &self.client_id)
            .expect("client shadow")
            .expect("shadow exists")
    }

    /// The server's shadow for this client.
    pub fn server_shadow(&self) -> ShadowDocument<S::Content> {
        self.server
            .shadow(&self.document_id, &self.client_id)
            .expect("server shadow")
            .expect("shadow exists")
    }

    /// Edits the client has not seen acknowledged.
    pub fn pending(&self) -> VecDeque<Edit<S::Diff>> {
        self.engine
            .pending_edits(&self.document_id, &self.client_id)
            .expect("pending edits")
    }
}

/// The server's current content of `document_id`.
pub fn server_content<S: Synchronizer>(server: &MemoryServer<S>, document_id: &str) -> S::Content {
    server
        .document(document_id)
        .expect("server document")
        .expect("document exists")
        .content
}
