//! # Tandem Protocol
//!
//! Change model, operational transform and wire messages for Tandem.
//!
//! This crate provides:
//! - `Change` edits and their application to text
//! - `reconcile` for a pair of concurrent changes
//! - `reconcile_against` for the incoming and outgoing pending queues
//! - `Replica` bookkeeping for a local copy of the document
//! - Session messages and frame classification (JSON)
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Key Invariants
//!
//! - Applying `b` then `a'` yields the same text as applying `a` then `b'`,
//!   where `(a', b') = reconcile(a, b)`
//! - `Change::Noop` is absorbing: it passes through every transform untouched
//! - Reconciliation is total and holds no shared state

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod change;
mod error;
mod messages;
mod rebase;
mod replica;
mod transform;

pub use change::{apply_all, Change, Delete, Insert};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{CallFrame, EditorEvent, Frame, Request, Response, ResponseFrame};
pub use rebase::{reconcile_against, Rebased};
pub use replica::Replica;
pub use transform::reconcile;
