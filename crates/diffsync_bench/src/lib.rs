//! Benchmark utilities.

use diffsync_engine::ClientSyncEngine;
use diffsync_protocol::{ClientDocument, PatchMessage};
use diffsync_server::{ServerConfig, ServerSyncEngine, Subscriber, SubscriberRegistry};
use diffsync_store::{ClientInMemoryDataStore, ServerInMemoryDataStore};
use diffsync_synchronizer::{TextDiff, TextSynchronizer};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;

/// Text server over the in-memory store.
pub type TextServer =
    ServerSyncEngine<TextSynchronizer, ServerInMemoryDataStore<String, TextDiff>>;

/// Text client over the in-memory store.
pub type TextClient =
    ClientSyncEngine<TextSynchronizer, ClientInMemoryDataStore<String, TextDiff>>;

/// Deterministic generator for benchmark inputs.
pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0x5eed)
}

/// Generate random lowercase text of `len` characters.
pub fn random_text(rng: &mut impl Rng, len: usize) -> String {
    (0..len)
        .map(|_| {
            if rng.gen_ratio(1, 6) {
                ' '
            } else {
                char::from(rng.gen_range(b'a'..=b'z'))
            }
        })
        .collect()
}

/// Generate `steps` successive versions of `start`, each a small insert
/// or removal of its predecessor.
pub fn edit_script(rng: &mut impl Rng, start: &str, steps: usize) -> Vec<String> {
    let mut current: Vec<char> = start.chars().collect();
    (0..steps)
        .map(|_| {
            let at = rng.gen_range(0..=current.len());
            if current.is_empty() || rng.gen_bool(0.6) {
                let len = rng.gen_range(1..8);
                let tail = current.split_off(at);
                current.extend(random_text(&mut *rng, len).chars());
                current.extend(tail);
            } else {
                let at = at.min(current.len() - 1);
                let end = (at + rng.gen_range(1..6)).min(current.len());
                current.drain(at..end);
            }
            current.iter().collect()
        })
        .collect()
}

/// A subscriber that drops every message.
pub struct Sink(pub String);

impl Subscriber<TextDiff> for Sink {
    fn client_id(&self) -> &str {
        &self.0
    }

    fn patched(&self, message: PatchMessage<TextDiff>) {
        drop(message);
    }
}

/// Creates a text server with default configuration.
pub fn text_server() -> TextServer {
    ServerSyncEngine::new(
        TextSynchronizer,
        Arc::new(ServerInMemoryDataStore::new()),
        Arc::new(SubscriberRegistry::new()),
        ServerConfig::default(),
    )
}

/// Creates a client holding `content` and attaches it to `server`.
pub fn attached_client(
    server: &TextServer,
    document_id: &str,
    client_id: &str,
    content: &str,
) -> TextClient {
    let client = ClientSyncEngine::new(TextSynchronizer, Arc::new(ClientInMemoryDataStore::new()));
    client
        .add_document(ClientDocument::new(document_id, client_id, content.to_string()))
        .expect("add document");
    let reply = server
        .add_subscriber(
            Arc::new(Sink(client_id.to_string())),
            document_id,
            Some(content.to_string()),
        )
        .expect("add subscriber");
    client.patch(&reply).expect("apply reply");
    client
}
