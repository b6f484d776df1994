//! Message handling at the transport boundary.

use crate::engine::ServerSyncEngine;
use crate::error::{ServerError, ServerResult};
use crate::registry::Subscriber;
use diffsync_protocol::{PatchMessage, ProtocolError, SyncMessage, Synchronizer};
use diffsync_store::ServerDataStore;
use std::sync::Arc;
use tracing::{info, warn};

/// What to send back on the connection a message arrived on.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply<D> {
    /// Nothing.
    None,
    /// A patch message for the sender.
    Patch(PatchMessage<D>),
    /// The message was refused; the connection stays open.
    Rejected {
        /// Human-readable reason.
        reason: String,
    },
}

/// Dispatches decoded messages from one connection to the engine.
///
/// The connection supplies its [`Subscriber`]; it is registered on `add`,
/// re-registered on `patch` after a reconnect, and removed on `detach` or
/// [`disconnect`](Self::disconnect).
pub struct SyncHandler<S: Synchronizer, St> {
    engine: Arc<ServerSyncEngine<S, St>>,
}

impl<S, St> SyncHandler<S, St>
where
    S: Synchronizer,
    St: ServerDataStore<S::Content, S::Diff>,
{
    /// Creates a handler for `engine`.
    pub fn new(engine: Arc<ServerSyncEngine<S, St>>) -> Self {
        Self { engine }
    }

    /// The wrapped engine.
    pub fn engine(&self) -> &Arc<ServerSyncEngine<S, St>> {
        &self.engine
    }

    /// Handles one message from `subscriber`'s connection.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::InvalidRequest`] if the message names a
    /// different client than the connection, and engine errors otherwise.
    pub fn handle_message(
        &self,
        message: SyncMessage<S::Content, S::Diff>,
        subscriber: &Arc<dyn Subscriber<S::Diff>>,
    ) -> ServerResult<Reply<S::Diff>> {
        if message.client_id() != subscriber.client_id() {
            return Err(ServerError::InvalidRequest(format!(
                "message for client '{}' on connection of client '{}'",
                message.client_id(),
                subscriber.client_id()
            )));
        }

        match message {
            SyncMessage::Add(request) => {
                let reply = self.engine.add_subscriber(
                    Arc::clone(subscriber),
                    &request.document_id,
                    request.content,
                )?;
                Ok(Reply::Patch(reply))
            }
            SyncMessage::Patch(patch) => {
                if !self.engine.registry().is_subscribed(&patch.document_id, subscriber) {
                    info!(
                        document_id = %patch.document_id,
                        client_id = %patch.client_id,
                        "reconnecting subscriber"
                    );
                    self.engine
                        .connect_subscriber(Arc::clone(subscriber), &patch.document_id);
                }
                self.engine.patch_and_notify(patch)?;
                Ok(Reply::None)
            }
            SyncMessage::Detach(request) => {
                self.engine
                    .remove_subscriber(subscriber, &request.document_id);
                Ok(Reply::None)
            }
        }
    }

    /// Decodes a JSON message, handles it, and encodes the reply.
    ///
    /// An unknown `msgType` is answered with `{"result": "Unknown msgType '<name>'"}`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Protocol`] for undecodable input, and
    /// whatever [`handle_message`](Self::handle_message) returns.
    pub fn handle_json(
        &self,
        text: &str,
        subscriber: &Arc<dyn Subscriber<S::Diff>>,
    ) -> ServerResult<Option<String>> {
        let reply = match SyncMessage::<S::Content, S::Diff>::decode(text) {
            Ok(message) => self.handle_message(message, subscriber)?,
            Err(ProtocolError::UnknownMessageType(name)) => {
                warn!(client_id = subscriber.client_id(), msg_type = %name, "unknown message type");
                Reply::Rejected {
                    reason: format!("Unknown msgType '{name}'"),
                }
            }
            Err(err) => return Err(err.into()),
        };
        self.encode(reply)
    }

    /// Removes `subscriber` from `document_id` when its connection closes.
    pub fn disconnect(&self, subscriber: &Arc<dyn Subscriber<S::Diff>>, document_id: &str) -> bool {
        self.engine.remove_subscriber(subscriber, document_id)
    }

    fn encode(&self, reply: Reply<S::Diff>) -> ServerResult<Option<String>> {
        Ok(match reply {
            Reply::None => None,
            Reply::Patch(message) => {
                Some(SyncMessage::<S::Content, S::Diff>::Patch(message).encode()?)
            }
            Reply::Rejected { reason } => Some(serde_json::json!({ "result": reason }).to_string()),
        })
    }
}
