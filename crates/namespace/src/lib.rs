//! Namespace domain for nsbench.
//!
//! This crate contains every domain concept shared by the benchmark binding and
//! the master client: the hierarchical [`NamespacePath`] and the rule that maps a
//! benchmark `(table, key)` pair onto it, the three-valued [`ResultCode`], the
//! error taxonomy, and the port traits through which the namespace master is
//! reached. Infrastructure crates implement the traits defined here; they never
//! add domain rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; infrastructure crates define *how* to supply it.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`path`] | [`NamespacePath`], [`map_path`], session-scoped constant paths |
//! | [`classify`] | [`Verb`] and the per-verb outcome classification rules |
//! | [`identifiers`] | Newtype identifiers (`SessionId`, `WorkerId`) |
//! | [`types`] | Value types (`ResultCode`, `FileStatus`, `WorkerInfo`, option records) |
//! | [`errors`] | Connection, namespace and configuration errors; retry policy |
//! | [`config`] | Adapter configuration (endpoint, security, transport) |
//! | [`ports`] | `FileSystemMasterClient`, `BlockMasterClient`, `MasterClientFactory` |

pub mod classify;
pub mod config;
pub mod errors;
pub mod identifiers;
pub mod path;
pub mod ports;
pub mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use classify::{classify, unsupported, Verb};
pub use config::{AdapterConfig, AuthType, MasterEndpoint, SecurityConfig, TransportConfig};
pub use errors::{ConfigError, ConnectionError, NamespaceError, RetryPolicy};
pub use identifiers::{SessionId, WorkerId};
pub use path::{map_path, NamespacePath, DEFAULT_DIRECTORY, PROBE_DIRECTORY, PROBE_FILE, SEPARATOR};
pub use ports::{BlockMasterClient, FileSystemMasterClient, MasterClientFactory};
pub use types::{
    ByteCount, CreateDirectoryOptions, CreateFileOptions, DeleteOptions, FileStatus, ResultCode,
    SetAttributeOptions, Timestamp, WorkerInfo, WorkerState,
};
