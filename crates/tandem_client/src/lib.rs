//! # Tandem Client
//!
//! Call/event multiplexer and session facade for Tandem.
//!
//! This crate provides:
//! - Frame transport traits and an in-memory duplex transport
//! - `Multiplexer`: correlates calls with responses and dispatches events
//!   over one connection
//! - `Session` / `ActiveSession`: start, push, pull and sync rounds
//! - Client configuration
//!
//! ## Architecture
//!
//! One task runs the multiplexer loop. It owns the receiving side of the
//! connection, the table of pending calls and the event handlers; nothing
//! else touches them. A second task owns the sending side and writes frames
//! in order. Callers talk to the loop through a cloneable `MuxHandle` and
//! get their responses back over single-shot channels.
//!
//! ## Key Invariants
//!
//! - Responses are matched to calls by id only, never by arrival order
//! - Every pending call resolves or is rejected exactly once
//! - Closing the connection rejects every pending call
//! - Calls made after closure fail immediately
//! - A session cannot pull before it has been started

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod mux;
mod session;
mod transport;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, CloseReason};
pub use mux::{Multiplexer, MuxHandle};
pub use session::{ActiveSession, Session, SyncRound};
pub use transport::{duplex, FrameSink, FrameStream, MemorySink, MemoryStream};
