//! # Diffsync Testkit
//!
//! Test utilities for diffsync.
//!
//! This crate provides:
//! - In-memory server and client fixtures, and client sessions whose
//!   incoming messages can be delivered, dropped or replayed at will
//! - Property-based test generators using proptest
//! - Concurrency and stress harnesses
//!
//! The cross-crate scenario, property and concurrency tests live in this
//! crate's `tests/` directory.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use diffsync_testkit::prelude::*;
//!
//! #[test]
//! fn converges() {
//!     let server = text_server();
//!     let (alice, _) = ClientSession::attach(&server, TextSynchronizer, "d1", "hi".into());
//!     alice.change("hi there".into());
//!     assert_eq!(server_content(&server, "d1"), "hi there");
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod stress;

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Installs a test-friendly tracing subscriber once per process.
///
/// Filtering follows `RUST_LOG`; output goes through the test harness so
/// it is only shown for failing tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::init_tracing;
    pub use crate::stress::*;
    pub use diffsync_synchronizer::{JsonMergeSynchronizer, TextSynchronizer};
}

pub use fixtures::*;
pub use generators::*;
pub use stress::*;
