//! Wire envelope for sync messages.
//!
//! Every message is a JSON object carrying a `msgType` discriminator:
//!
//! ```text
//! {"msgType": "add",    "documentId": "...", "clientId": "...", "content": ...}
//! {"msgType": "patch",  "documentId": "...", "clientId": "...", "edits": [...]}
//! {"msgType": "detach", "documentId": "...", "clientId": "..."}
//! ```

use crate::edit::PatchMessage;
use crate::error::{ProtocolError, ProtocolResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const MSG_TYPE: &str = "msgType";

/// Kind of a sync message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Attach a client to a document, optionally supplying content.
    Add,
    /// Deliver edits.
    Patch,
    /// Detach a client from a document.
    Detach,
    /// Anything else.
    Unknown,
}

impl MessageType {
    /// Parses a message type name, ignoring ASCII case.
    ///
    /// Unrecognized names map to [`MessageType::Unknown`].
    pub fn from_name(name: &str) -> Self {
        [MessageType::Add, MessageType::Patch, MessageType::Detach]
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(name))
            .unwrap_or(MessageType::Unknown)
    }

    /// Wire name of this message type.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Add => "add",
            MessageType::Patch => "patch",
            MessageType::Detach => "detach",
            MessageType::Unknown => "unknown",
        }
    }
}

impl fmt::Display for MessageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request to attach a client to a document.
///
/// Without content this is an attach to an existing document whose state
/// the client does not know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddRequest<C> {
    /// Document identifier.
    #[serde(alias = "id")]
    pub document_id: String,
    /// Client identifier.
    pub client_id: String,
    /// Content the client starts from, if any.
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub content: Option<C>,
}

impl<C> AddRequest<C> {
    /// Creates a new add request.
    pub fn new(
        document_id: impl Into<String>,
        client_id: impl Into<String>,
        content: Option<C>,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            client_id: client_id.into(),
            content,
        }
    }
}

/// Request to detach a client from a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachRequest {
    /// Document identifier.
    #[serde(alias = "id")]
    pub document_id: String,
    /// Client identifier.
    pub client_id: String,
}

/// A sync protocol message.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncMessage<C, D> {
    /// Attach request.
    Add(AddRequest<C>),
    /// Edits for one `(document, client)` pair.
    Patch(PatchMessage<D>),
    /// Detach request.
    Detach(DetachRequest),
}

impl<C, D> SyncMessage<C, D> {
    /// Returns the message type.
    pub fn message_type(&self) -> MessageType {
        match self {
            SyncMessage::Add(_) => MessageType::Add,
            SyncMessage::Patch(_) => MessageType::Patch,
            SyncMessage::Detach(_) => MessageType::Detach,
        }
    }

    /// Document the message refers to.
    pub fn document_id(&self) -> &str {
        match self {
            SyncMessage::Add(request) => &request.document_id,
            SyncMessage::Patch(message) => &message.document_id,
            SyncMessage::Detach(request) => &request.document_id,
        }
    }

    /// Client the message refers to.
    pub fn client_id(&self) -> &str {
        match self {
            SyncMessage::Add(request) => &request.client_id,
            SyncMessage::Patch(message) => &message.client_id,
            SyncMessage::Detach(request) => &request.client_id,
        }
    }
}

impl<C: Serialize, D: Serialize> SyncMessage<C, D> {
    /// Encodes to JSON.
    pub fn encode(&self) -> ProtocolResult<String> {
        let body = match self {
            SyncMessage::Add(request) => serde_json::to_value(request)?,
            SyncMessage::Patch(message) => serde_json::to_value(message)?,
            SyncMessage::Detach(request) => serde_json::to_value(request)?,
        };
        let mut object = match body {
            Value::Object(object) => object,
            _ => return Err(ProtocolError::MissingField("documentId")),
        };
        object.insert(
            MSG_TYPE.to_string(),
            Value::String(self.message_type().as_str().to_string()),
        );
        Ok(Value::Object(object).to_string())
    }
}

impl<C: DeserializeOwned, D: DeserializeOwned> SyncMessage<C, D> {
    /// Decodes from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownMessageType`] if `msgType` names an
    /// unsupported type, so callers can reject it without dropping the
    /// connection.
    pub fn decode(text: &str) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_str(text)?;
        let name = value
            .get(MSG_TYPE)
            .and_then(Value::as_str)
            .ok_or(ProtocolError::MissingField(MSG_TYPE))?
            .to_string();

        match MessageType::from_name(&name) {
            MessageType::Add => Ok(SyncMessage::Add(serde_json::from_value(value)?)),
            MessageType::Patch => Ok(SyncMessage::Patch(serde_json::from_value(value)?)),
            MessageType::Detach => Ok(SyncMessage::Detach(serde_json::from_value(value)?)),
            MessageType::Unknown => Err(ProtocolError::UnknownMessageType(name)),
        }
    }
}
