//! # Diffsync Protocol
//!
//! Data model, synchronizer contract and wire envelope for differential
//! synchronization.
//!
//! This crate provides:
//! - `Document`, `ClientDocument`, `ShadowDocument` and `BackupShadowDocument`
//! - `Edit` and `PatchMessage`, the units exchanged between peers
//! - The `Synchronizer` trait that content-specific diff algorithms implement
//! - The `SyncMessage` wire envelope with a JSON codec
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Versions
//!
//! Every shadow carries two counters. The client owns `client_version` and
//! bumps it on every client-side diff; the server owns `server_version` and
//! bumps it on every server-side diff. An edit is tagged with the counters of
//! the shadow it was computed against. A `client_version` of
//! [`SEED_CLIENT_VERSION`] marks a seed edit that bootstraps a client shadow
//! from an existing server document.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod document;
mod edit;
mod error;
mod messages;
mod synchronizer;

pub use document::{BackupShadowDocument, ClientDocument, Document, ShadowDocument};
pub use edit::{Edit, PatchMessage, SEED_CLIENT_VERSION};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{AddRequest, DetachRequest, MessageType, SyncMessage};
pub use synchronizer::Synchronizer;
