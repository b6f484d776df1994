//! # Diffsync Engine
//!
//! Version reconciliation core and client engine for differential
//! synchronization.
//!
//! This crate provides:
//! - [`Reconciler`], the state machine that folds incoming edits into a shadow
//! - [`Role`], which tells the reconciler which counter the local side owns
//! - [`ClientSyncEngine`], the client half of the protocol
//!
//! ## Architecture
//!
//! Each side keeps a working document, a shadow per peer, a backup of that
//! shadow, and a queue of edits the peer has not yet acknowledged:
//! 1. A local change is diffed against the shadow, queued, and folded into
//!    the shadow; the whole queue is sent to the peer
//! 2. The peer reconciles the edits against its own shadow for the pair
//! 3. The peer brings its working document in line with the new shadow and
//!    checkpoints the shadow as its backup
//!
//! Client and server run the same reconciler with mirrored roles.
//!
//! ## Key Invariants
//!
//! - Edits within one message are processed strictly in order
//! - Already-applied edits are discarded, never re-applied
//! - A gap in the peer's view of our versions is recovered from the backup,
//!   or reported as a protocol violation
//! - Version counters only move forward, except for the seed reset

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod reconcile;
mod role;

pub use client::{ClientSyncEngine, PatchListener};
pub use error::{SyncError, SyncResult};
pub use reconcile::{Reconciler, Reconciliation, SyncStats};
pub use role::Role;
