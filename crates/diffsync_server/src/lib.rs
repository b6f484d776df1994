//! # Diffsync Server
//!
//! Server half of differential synchronization.
//!
//! This crate provides:
//! - [`ServerSyncEngine`], one authoritative document and a shadow per client
//! - [`SubscriberRegistry`], the document to subscriber index used for fan-out
//! - [`SyncHandler`], which maps wire messages from a connection to engine calls
//!
//! # Architecture
//!
//! The server keeps, per document:
//! - The authoritative document
//! - A shadow, a backup shadow and a pending-edit queue per attached client
//! - The set of connected subscribers
//!
//! A patch from one client is reconciled against that client's shadow,
//! folded into the document, and then diffed against every other
//! subscriber's shadow; subscribers that are already up to date receive
//! nothing.
//!
//! # Transport
//!
//! The transport owns connections and wire I/O. It implements
//! [`Subscriber`] for each connection and feeds incoming text to
//! [`SyncHandler::handle_json`]:
//!
//! ```rust,ignore
//! let registry = Arc::new(SubscriberRegistry::new());
//! let engine = ServerSyncEngine::new(TextSynchronizer, store, registry, ServerConfig::default());
//! let handler = SyncHandler::new(Arc::new(engine));
//!
//! if let Some(reply) = handler.handle_json(&frame, &connection)? {
//!     connection.send(reply);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
// Production code MUST NOT use panic!/unwrap()/expect()
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

mod config;
mod engine;
mod error;
mod handler;
mod registry;

pub use config::{AttachPolicy, ServerConfig};
pub use engine::ServerSyncEngine;
pub use error::{ServerError, ServerResult};
pub use handler::{Reply, SyncHandler};
pub use registry::{Subscriber, SubscriberRegistry};
