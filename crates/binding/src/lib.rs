//! nsbench benchmark binding.
//!
//! Implements the key/value benchmark contract ([`Db`]) on top of the namespace
//! master ports defined in the [`namespace`] crate. Each verb is translated into
//! the nearest namespace RPC and its outcome collapsed into a
//! [`namespace::ResultCode`]:
//!
//! | Verb | Remote call(s) |
//! |------|----------------|
//! | insert | `delete` (best-effort) then `create_file` |
//! | read | `get_status`, serialized under the mapped path |
//! | update | `set_attribute` with default options |
//! | delete | `delete` |
//! | scan | none; always `NOT_IMPLEMENTED` |
//!
//! ## Architectural Layer
//!
//! **Orchestration layer.** This crate sequences calls against the ports; it
//! never depends on a concrete transport. The composition root builds one
//! [`ClientContext`] per process and hands a clone to every [`NamespaceDb`].
//!
//! ## Threading
//!
//! The harness API is synchronous. Every port call is driven to completion on
//! the context's runtime with `block_on`, blocking the calling thread. One
//! [`NamespaceDb`] belongs to one harness thread; `init` completes before any
//! verb runs and `cleanup` runs after the last one.

mod adapter;
mod context;
mod db;
mod diagnostics;
mod session;

pub use adapter::NamespaceDb;
pub use context::ClientContext;
pub use db::{Db, InitError, Record};
pub use diagnostics::{check_connectivity, ConnectivityReport, ProbeFailure};
pub use session::{CleanupFailure, CleanupReport, CleanupStep, Session};
