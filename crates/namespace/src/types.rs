//! Shared value types for the namespace domain.
//!
//! Unlike the newtype identifiers in [`crate::identifiers`], these types carry
//! meaningful values: the benchmark result code, the status record returned by
//! the master, worker descriptions, and the option records sent with each RPC.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{NamespacePath, WorkerId};

// ---------------------------------------------------------------------------
// Result code
// ---------------------------------------------------------------------------

/// Outcome of one benchmark verb as reported to the harness.
///
/// Every call collapses to exactly one of these; there is no partial success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultCode {
    /// The remote call succeeded, or failed in a way that is benign for the verb.
    Ok,
    /// The remote call failed (domain rejection or transport failure).
    Error,
    /// The verb has no remote mapping and was not attempted.
    NotImplemented,
}

impl ResultCode {
    /// Returns `true` for [`ResultCode::Ok`].
    pub fn is_ok(self) -> bool {
        self == Self::Ok
    }

    /// The harness-facing name of the code.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Error => "ERROR",
            Self::NotImplemented => "NOT_IMPLEMENTED",
        }
    }
}

impl std::fmt::Display for ResultCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Sizes and time
// ---------------------------------------------------------------------------

/// A number of bytes reported by the master (capacity, usage, file length).
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ByteCount(u64);

impl ByteCount {
    /// Creates a [`ByteCount`] from a raw integer.
    pub fn new(bytes: u64) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Display for ByteCount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}B", self.0)
    }
}

impl std::ops::Add for ByteCount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

/// A UTC wall-clock timestamp.
///
/// Wraps [`chrono::DateTime<Utc>`] so callers never depend on `chrono` types
/// directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Returns the current UTC time as a [`Timestamp`].
    pub fn now() -> Self {
        Self(Utc::now())
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

// ---------------------------------------------------------------------------
// Status records
// ---------------------------------------------------------------------------

/// Metadata of one namespace node, as returned by `get_status`.
///
/// `read` serializes the whole record; no field projection is applied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStatus {
    /// Absolute path of the node.
    pub path: NamespacePath,
    /// Last path segment.
    pub name: String,
    /// `true` for directories.
    pub folder: bool,
    /// Length in bytes (zero for directories and freshly created files).
    pub length: ByteCount,
    /// Owning user.
    pub owner: String,
    /// Owning group.
    pub group: String,
    /// POSIX-style permission bits.
    pub mode: u32,
    /// Path in the under-storage system, empty when not persisted.
    #[serde(default)]
    pub ufs_path: String,
    /// Whether the node is pinned in worker storage.
    #[serde(default)]
    pub pinned: bool,
    /// Whether the node has been persisted to under-storage.
    #[serde(default)]
    pub persisted: bool,
    /// Time-to-live in milliseconds, if one is set.
    #[serde(default)]
    pub ttl_ms: Option<i64>,
    pub creation_time: Timestamp,
    pub last_modification_time: Timestamp,
}

/// Liveness of a worker as seen by the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkerState {
    Live,
    Lost,
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Live => f.write_str("LIVE"),
            Self::Lost => f.write_str("LOST"),
        }
    }
}

/// A storage worker registered with the master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkerInfo {
    pub id: WorkerId,
    /// `host:port` the worker serves data on.
    pub address: String,
    pub state: WorkerState,
    pub capacity_bytes: ByteCount,
    pub used_bytes: ByteCount,
    /// Seconds since the master last heard from the worker.
    #[serde(default)]
    pub last_contact_sec: u64,
}

// ---------------------------------------------------------------------------
// RPC option records
// ---------------------------------------------------------------------------

/// Options sent with `create_file`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFileOptions {
    /// Create missing ancestor directories.
    pub recursive: bool,
    /// Block size for the new file.
    pub block_size_bytes: ByteCount,
}

impl Default for CreateFileOptions {
    fn default() -> Self {
        Self {
            recursive: true,
            block_size_bytes: ByteCount::new(64 * 1024 * 1024),
        }
    }
}

/// Options sent with `create_directory`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDirectoryOptions {
    /// Create missing ancestor directories.
    pub recursive: bool,
    /// Succeed silently when the directory already exists.
    pub allow_exists: bool,
}

/// Options sent with `delete`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteOptions {
    /// Delete a non-empty directory together with its contents.
    pub recursive: bool,
}

impl DeleteOptions {
    /// Options for a recursive delete.
    pub fn recursive() -> Self {
        Self { recursive: true }
    }
}

/// Options sent with `set_attribute`.
///
/// All fields default to `None`, which leaves the node's attributes untouched
/// while still exercising the mutation path on the master.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetAttributeOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ttl_ms: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_codes_use_harness_names() {
        assert_eq!(ResultCode::Ok.to_string(), "OK");
        assert_eq!(ResultCode::Error.to_string(), "ERROR");
        assert_eq!(ResultCode::NotImplemented.to_string(), "NOT_IMPLEMENTED");
        assert_eq!(
            serde_json::to_string(&ResultCode::NotImplemented).unwrap(),
            "\"NOT_IMPLEMENTED\""
        );
    }

    #[test]
    fn default_set_attribute_options_serialize_empty() {
        let json = serde_json::to_string(&SetAttributeOptions::default()).unwrap();
        assert_eq!(json, "{}");
    }

    #[test]
    fn default_create_file_options_are_recursive() {
        let options = CreateFileOptions::default();
        assert!(options.recursive);
        let json = serde_json::to_value(&options).unwrap();
        assert_eq!(json["blockSizeBytes"], 64 * 1024 * 1024);
    }

    #[test]
    fn file_status_tolerates_missing_optional_fields() {
        let json = r#"{
            "path": "/usertable/user1",
            "name": "user1",
            "folder": false,
            "length": 0,
            "owner": "bench",
            "group": "bench",
            "mode": 420,
            "creationTime": "2024-01-01T00:00:00Z",
            "lastModificationTime": "2024-01-01T00:00:00Z"
        }"#;
        let status: FileStatus = serde_json::from_str(json).unwrap();
        assert_eq!(status.path.as_str(), "/usertable/user1");
        assert!(!status.pinned);
        assert_eq!(status.ttl_ms, None);
    }
}
