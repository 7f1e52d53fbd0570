//! # Tandem Testkit
//!
//! Test utilities for Tandem.
//!
//! This crate provides:
//! - Property-based test generators using proptest
//! - An in-memory loopback sequencer for end-to-end tests
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tandem_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn test_with_sequencer() {
//!     let sequencer = LoopbackSequencer::with_document("abc");
//!     let (session, document) = sequencer
//!         .session(ClientConfig::new())
//!         .init()
//!         .await
//!         .unwrap();
//!     // ... edit, sync, compare
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod generators;
pub mod sequencer;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::generators::*;
    pub use crate::sequencer::*;
    pub use tandem_client::ClientConfig;
}

pub use generators::*;
pub use sequencer::*;
