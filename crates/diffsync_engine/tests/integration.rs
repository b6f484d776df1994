//! Integration tests for the client engine against a reconciling peer.

use diffsync_engine::{ClientSyncEngine, Reconciler, Role, SyncError};
use diffsync_protocol::{ClientDocument, Document, PatchMessage, ShadowDocument, Synchronizer};
use diffsync_store::{
    ClientInMemoryDataStore, DataStore, ServerDataStore, ServerInMemoryDataStore,
};
use diffsync_synchronizer::{JsonMergeSynchronizer, TextDiff, TextSynchronizer};
use serde_json::{json, Value};
use std::sync::Arc;

/// A minimal server side for one client, driven by hand.
struct Peer<S: Synchronizer> {
    synchronizer: S,
    store: ServerInMemoryDataStore<S::Content, S::Diff>,
}

impl<S: Synchronizer> Peer<S> {
    fn new(synchronizer: S, document_id: &str, client_id: &str, content: S::Content) -> Self {
        let store = ServerInMemoryDataStore::new();
        let shadow = ShadowDocument::new(
            0,
            0,
            ClientDocument::new(document_id, client_id, content.clone()),
        );
        store.save_document(Document::new(document_id, content)).unwrap();
        store.save_backup(Role::Server.checkpoint(&shadow)).unwrap();
        store.save_shadow(shadow).unwrap();
        Self { synchronizer, store }
    }

    fn content(&self, document_id: &str) -> S::Content {
        self.store.document(document_id).unwrap().unwrap().content
    }

    fn edit_document(&self, document_id: &str, content: S::Content) {
        self.store.update_document(Document::new(document_id, content)).unwrap();
    }

    /// Diffs the document against the shadow and returns all pending edits.
    fn diff(&self, document_id: &str, client_id: &str) -> PatchMessage<S::Diff> {
        let document = self.store.document(document_id).unwrap().unwrap();
        let shadow = self.store.shadow(document_id, client_id).unwrap().unwrap();
        let edit = self.synchronizer.diff(&document.content, &shadow);
        let patched = self.synchronizer.patch_shadow(&edit, &shadow).unwrap();
        self.store.save_edit(document_id, client_id, edit).unwrap();
        self.store.save_shadow(Role::Server.advance_own(patched)).unwrap();
        let edits = self.store.edits(document_id, client_id).unwrap();
        PatchMessage::new(document_id, client_id, edits)
    }

    fn patch(&self, message: &PatchMessage<S::Diff>) -> Result<(), SyncError> {
        let mut message = message.clone();
        let outcome = Reconciler::new(Role::Server, &self.synchronizer, &self.store)
            .reconcile(&mut message)?;
        if outcome.changed() {
            let document = self.store.document(&message.document_id).unwrap().unwrap();
            let edit = self.synchronizer.document_edit(&document.content, &outcome.shadow);
            let document = self.synchronizer.patch_document(&edit, &document)?;
            self.store.update_document(document).unwrap();
            self.store.save_backup(Role::Server.checkpoint(&outcome.shadow)).unwrap();
        }
        Ok(())
    }
}

type TextClient = ClientSyncEngine<TextSynchronizer, ClientInMemoryDataStore<String, TextDiff>>;

fn text_client() -> TextClient {
    ClientSyncEngine::new(TextSynchronizer, Arc::new(ClientInMemoryDataStore::new()))
}

fn text(document_id: &str, content: &str) -> ClientDocument<String> {
    ClientDocument::new(document_id, "c1", content.to_string())
}

#[test]
fn client_and_peer_converge_on_text() {
    let client = text_client();
    client.add_document(text("d1", "the fox")).unwrap();
    let peer = Peer::new(TextSynchronizer, "d1", "c1", "the fox".to_string());

    let message = client.diff(text("d1", "the quick fox")).unwrap();
    peer.patch(&message).unwrap();
    assert_eq!(peer.content("d1"), "the quick fox");

    peer.edit_document("d1", "the quick brown fox".to_string());
    let reply = peer.diff("d1", "c1");
    let document = client.patch(&reply).unwrap();

    assert_eq!(document.content, "the quick brown fox");
    assert!(client.pending_edits("d1", "c1").unwrap().is_empty());

    let client_shadow = client.shadow("d1", "c1").unwrap().unwrap();
    let peer_shadow = peer.store.shadow("d1", "c1").unwrap().unwrap();
    assert_eq!(client_shadow, peer_shadow);
}

#[test]
fn lost_client_message_is_resent() {
    let client = text_client();
    client.add_document(text("d1", "a")).unwrap();
    let peer = Peer::new(TextSynchronizer, "d1", "c1", "a".to_string());

    let _lost = client.diff(text("d1", "ab")).unwrap();
    let message = client.diff(text("d1", "abc")).unwrap();
    assert_eq!(message.edits.len(), 2);

    peer.patch(&message).unwrap();
    assert_eq!(peer.content("d1"), "abc");
    assert_eq!(peer.store.shadow("d1", "c1").unwrap().unwrap().client_version, 2);
}

#[test]
fn lost_peer_message_recovers_from_backup() {
    let client = text_client();
    client.add_document(text("d1", "a")).unwrap();
    let peer = Peer::new(TextSynchronizer, "d1", "c1", "a".to_string());

    peer.edit_document("d1", "ab".to_string());
    let _lost = peer.diff("d1", "c1");

    let message = client.diff(text("d1", "ac")).unwrap();
    peer.patch(&message).unwrap();

    assert!(peer.store.edits("d1", "c1").unwrap().is_empty());
    let shadow = peer.store.shadow("d1", "c1").unwrap().unwrap();
    assert_eq!((shadow.server_version, shadow.client_version), (0, 1));

    let reply = peer.diff("d1", "c1");
    let document = client.patch(&reply).unwrap();
    assert_eq!(document.content, peer.content("d1"));
    assert_eq!(
        client.shadow("d1", "c1").unwrap().unwrap(),
        peer.store.shadow("d1", "c1").unwrap().unwrap()
    );
}

#[test]
fn json_documents_merge() {
    let client = ClientSyncEngine::new(
        JsonMergeSynchronizer,
        Arc::new(ClientInMemoryDataStore::<Value, Option<Value>>::new()),
    );
    let initial = json!({"name": "Mr.Babar", "tags": ["a"]});
    client
        .add_document(ClientDocument::new("d1", "c1", initial.clone()))
        .unwrap();
    let peer = Peer::new(JsonMergeSynchronizer, "d1", "c1", initial);

    let message = client
        .diff(ClientDocument::new("d1", "c1", json!({"name": "Mr.Rosen", "tags": ["a"]})))
        .unwrap();
    peer.patch(&message).unwrap();

    peer.edit_document("d1", json!({"name": "Mr.Rosen", "tags": ["a", "b"]}));
    let document = client.patch(&peer.diff("d1", "c1")).unwrap();

    assert_eq!(document.content, json!({"name": "Mr.Rosen", "tags": ["a", "b"]}));
}

#[test]
fn replay_is_harmless_but_forged_history_is_rejected() {
    let client = text_client();
    client.add_document(text("d1", "a")).unwrap();
    let peer = Peer::new(TextSynchronizer, "d1", "c1", "a".to_string());

    let first = client.diff(text("d1", "ab")).unwrap();
    peer.patch(&first).unwrap();
    peer.edit_document("d1", "abc".to_string());
    client.patch(&peer.diff("d1", "c1")).unwrap();
    peer.patch(&client.diff(text("d1", "abcd")).unwrap()).unwrap();

    let shadow = peer.store.shadow("d1", "c1").unwrap().unwrap();
    assert_eq!((shadow.server_version, shadow.client_version), (1, 2));

    peer.patch(&first).unwrap();
    assert_eq!(peer.store.shadow("d1", "c1").unwrap().unwrap(), shadow);
    assert_eq!(peer.content("d1"), "abcd");

    // Claims server version 0 while being current on client versions: no
    // checkpoint can explain it.
    let forged_base = ShadowDocument::new(0, 2, text("d1", "abcd"));
    let forged = TextSynchronizer.diff(&"abcde".to_string(), &forged_base);
    let err = peer
        .patch(&PatchMessage::single("d1", "c1", forged))
        .unwrap_err();

    assert!(err.is_protocol_violation());
    assert_eq!(peer.store.shadow("d1", "c1").unwrap().unwrap(), shadow);
}
