//! # Diffsync Synchronizers
//!
//! Reference [`Synchronizer`](diffsync_protocol::Synchronizer)
//! implementations.
//!
//! This crate provides:
//! - [`TextSynchronizer`] - character-level diffs over `String` content
//! - [`JsonMergeSynchronizer`] - RFC 7386 merge patches over JSON values
//!
//! Both compute SHA-256 checksums of the content an edit was taken against.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod checksum;
mod json;
mod text;

pub use json::JsonMergeSynchronizer;
pub use text::{Operation, TextChange, TextDiff, TextSynchronizer};
