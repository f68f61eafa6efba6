//! Error and retry-policy types for the namespace domain.
//!
//! [`ConnectionError`] covers everything between the adapter and the master:
//! address problems, handshake failures, dropped transports and calls made on a
//! released client. [`NamespaceError`] is what a namespace RPC returns: either a
//! rejection by the master (path not found, already exists, permission denied)
//! or a wrapped [`ConnectionError`].
//!
//! [`RetryPolicy`] is a cross-cutting concern: the transport decides whether to
//! re-issue a call by asking the error for its policy.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::NamespacePath;

// ---------------------------------------------------------------------------
// Retry semantics
// ---------------------------------------------------------------------------

/// Whether an error condition is safe to retry and, if so, after what delay.
///
/// - `Retryable` errors: dropped connections, timeouts, a master that is
///   temporarily unavailable.
/// - `NonRetryable` errors: every rejection the master made on purpose, invalid
///   addresses, handshake failures, calls on a closed client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RetryPolicy {
    /// The operation may be retried.
    Retryable {
        /// Minimum back-off before the next attempt. `None` means apply the
        /// caller's own back-off schedule.
        after: Option<Duration>,
    },
    /// The operation must not be retried.
    NonRetryable,
}

impl RetryPolicy {
    /// Returns `true` for [`RetryPolicy::Retryable`].
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Retryable { .. })
    }
}

// ---------------------------------------------------------------------------
// Connection errors
// ---------------------------------------------------------------------------

/// Failures to reach, or stay connected to, the namespace master.
///
/// Fatal to session establishment when raised while acquiring the namespace
/// client; reported as `ERROR` when raised by an individual call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectionError {
    /// The configured master address is syntactically invalid.
    #[error("Invalid master address '{address}': {reason}")]
    InvalidAddress { address: String, reason: String },

    /// The master host name did not resolve.
    #[error("Master address '{address}' could not be resolved: {reason}")]
    Unresolvable { address: String, reason: String },

    /// No connection could be established with the master.
    #[error("Master at {address} is unreachable: {message}")]
    Unreachable { address: String, message: String },

    /// The master answered but refused the client handshake.
    #[error("Handshake with master at {address} failed: {message}")]
    Handshake { address: String, message: String },

    /// An established exchange failed mid-flight (reset, timeout, bad frame).
    #[error("Transport failure: {message}")]
    Transport { message: String },

    /// The client handle was already released.
    #[error("Client is closed")]
    Closed,
}

impl ConnectionError {
    /// Retry policy for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Unreachable { .. } | Self::Transport { .. } => {
                RetryPolicy::Retryable { after: None }
            }
            Self::InvalidAddress { .. }
            | Self::Unresolvable { .. }
            | Self::Handshake { .. }
            | Self::Closed => RetryPolicy::NonRetryable,
        }
    }
}

// ---------------------------------------------------------------------------
// Namespace errors
// ---------------------------------------------------------------------------

/// Outcome of a failed namespace RPC.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NamespaceError {
    /// A node already exists at the target path.
    #[error("Path already exists: {path}")]
    AlreadyExists { path: NamespacePath },

    /// No node exists at the target path (or one of its ancestors).
    #[error("Path does not exist: {path}")]
    NotFound { path: NamespacePath },

    /// The master refused the operation on authorization grounds.
    #[error("Permission denied on {path}: {message}")]
    PermissionDenied {
        path: NamespacePath,
        message: String,
    },

    /// Any other deliberate rejection by the master.
    #[error("Master rejected request ({code}): {message}")]
    Rejected {
        /// Status code reported by the master (e.g. `"DIRECTORY_NOT_EMPTY"`).
        code: String,
        message: String,
    },

    /// The master is temporarily unable to serve requests.
    #[error("Master unavailable: {message}")]
    Unavailable { message: String },

    /// A request or response body could not be encoded or decoded.
    #[error("Serialization failure: {message}")]
    Serialization { message: String },

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

impl NamespaceError {
    /// Retry policy for this failure.
    pub fn retry_policy(&self) -> RetryPolicy {
        match self {
            Self::Unavailable { .. } => RetryPolicy::Retryable { after: None },
            Self::Connection(err) => err.retry_policy(),
            Self::AlreadyExists { .. }
            | Self::NotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::Rejected { .. }
            | Self::Serialization { .. } => RetryPolicy::NonRetryable,
        }
    }

    /// Returns `true` if the failure was a deliberate decision of the master
    /// rather than a transport problem.
    pub fn is_domain(&self) -> bool {
        !matches!(self, Self::Connection(_) | Self::Serialization { .. })
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// The adapter configuration is invalid.
///
/// Produced at load time; a session is never opened with an invalid config.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("Configuration error: {field} {message}")]
    Invalid {
        /// Dotted name of the offending field (e.g. `"master.port"`).
        field: &'static str,
        message: String,
    },
}

impl ConfigError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map_path;

    #[test]
    fn domain_rejections_are_not_retried() {
        let path = map_path("usertable", "user1");
        assert_eq!(
            NamespaceError::AlreadyExists { path: path.clone() }.retry_policy(),
            RetryPolicy::NonRetryable
        );
        assert_eq!(
            NamespaceError::NotFound { path }.retry_policy(),
            RetryPolicy::NonRetryable
        );
    }

    #[test]
    fn transport_failures_are_retried() {
        let err = NamespaceError::from(ConnectionError::Transport {
            message: "connection reset".into(),
        });
        assert!(err.retry_policy().is_retryable());
        assert!(!err.is_domain());
        assert!(NamespaceError::Unavailable {
            message: "safe mode".into()
        }
        .retry_policy()
        .is_retryable());
    }

    #[test]
    fn closed_client_is_not_retried() {
        let err = NamespaceError::from(ConnectionError::Closed);
        assert_eq!(err.retry_policy(), RetryPolicy::NonRetryable);
        assert_eq!(err.to_string(), "Client is closed");
    }
}
