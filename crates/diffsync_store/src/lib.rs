//! # Diffsync Store
//!
//! Data store traits and concurrent in-memory stores for differential
//! synchronization.
//!
//! Stores hold four kinds of per-key state: documents, shadows, backup
//! shadows and pending-edit queues. Shadows, backups and documents are
//! last-writer-wins slots; pending-edit queues are updated with an
//! optimistic compare-and-swap retry loop so concurrent appends and removals
//! never lose each other's work.
//!
//! ## Available Stores
//!
//! - [`ClientInMemoryDataStore`] - Client-side state for any number of documents
//! - [`ServerInMemoryDataStore`] - Server-side state with atomic document creation
//!
//! ## Example
//!
//! ```rust
//! use diffsync_protocol::Document;
//! use diffsync_store::{ServerDataStore, ServerInMemoryDataStore};
//!
//! let store: ServerInMemoryDataStore<String, String> = ServerInMemoryDataStore::new();
//! assert!(store.save_document(Document::new("d1", "first".to_string())).unwrap());
//! assert!(!store.save_document(Document::new("d1", "second".to_string())).unwrap());
//! assert_eq!(store.document("d1").unwrap().unwrap().content, "first");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cas;
mod error;
mod memory;
mod store;

pub use cas::CasMap;
pub use error::{StoreError, StoreResult};
pub use memory::{ClientInMemoryDataStore, ServerInMemoryDataStore};
pub use store::{ClientDataStore, DataStore, ServerDataStore};
