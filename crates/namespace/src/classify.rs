//! Translation of remote outcomes into benchmark result codes.
//!
//! The rules are a single table keyed by [`Verb`]:
//!
//! | Outcome | Code |
//! |---------|------|
//! | remote call returned normally | `OK` |
//! | failure the verb tolerates (only: `AlreadyExists` on insert) | `OK` |
//! | any other domain or transport failure | `ERROR`, cause logged |
//! | verb without a remote mapping (scan) | `NOT_IMPLEMENTED`, never attempted |

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{NamespaceError, NamespacePath, ResultCode};

/// One of the five benchmark operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verb {
    Insert,
    Read,
    Update,
    Delete,
    Scan,
}

impl Verb {
    /// All verbs, in harness order.
    pub const ALL: [Verb; 5] = [
        Verb::Insert,
        Verb::Read,
        Verb::Update,
        Verb::Delete,
        Verb::Scan,
    ];

    /// Name of the master RPC the verb maps onto, or `None` when the master
    /// exposes no faithful equivalent.
    pub fn remote_operation(self) -> Option<&'static str> {
        match self {
            Self::Insert => Some("create_file"),
            Self::Read => Some("get_status"),
            Self::Update => Some("set_attribute"),
            Self::Delete => Some("delete"),
            // No ordered range query over the namespace.
            Self::Scan => None,
        }
    }

    /// Returns `true` if `error` still leaves the namespace in the state the
    /// verb was asked to reach.
    pub fn tolerates(self, error: &NamespaceError) -> bool {
        matches!(
            (self, error),
            (Self::Insert, NamespaceError::AlreadyExists { .. })
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "insert",
            Self::Read => "read",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Scan => "scan",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classifies the outcome of the remote call issued for `verb` on `path`.
///
/// Failures that map to `ERROR` are logged with their cause.
pub fn classify<T>(
    verb: Verb,
    path: &NamespacePath,
    outcome: &Result<T, NamespaceError>,
) -> ResultCode {
    match outcome {
        Ok(_) => ResultCode::Ok,
        Err(error) if verb.tolerates(error) => {
            debug!(%verb, rpc = rpc_name(verb), %path, %error, "tolerated namespace failure");
            ResultCode::Ok
        }
        Err(error) => {
            warn!(
                %verb,
                rpc = rpc_name(verb),
                %path,
                %error,
                domain = error.is_domain(),
                "namespace call failed"
            );
            ResultCode::Error
        }
    }
}

fn rpc_name(verb: Verb) -> &'static str {
    verb.remote_operation().unwrap_or("none")
}

/// Result for a verb that has no remote mapping.
pub fn unsupported(verb: Verb) -> ResultCode {
    debug!(%verb, "verb has no namespace equivalent");
    ResultCode::NotImplemented
}
