//! Newtype domain identifiers.
//!
//! Identity-bearing concepts are wrapped in distinct newtypes so a [`WorkerId`]
//! reported by the master can never be confused with an arbitrary integer, and a
//! [`SessionId`] can be threaded through tracing spans without ambiguity.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Master-assigned identifiers
// ---------------------------------------------------------------------------

/// Identifies a storage worker registered with the namespace master.
///
/// Assigned by the master; the adapter only reports it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(u64);

impl WorkerId {
    /// Creates a new identifier from a raw integer.
    pub fn new(value: u64) -> Self {
        Self(value)
    }
}

impl std::fmt::Display for WorkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Locally generated identifiers
// ---------------------------------------------------------------------------

/// Identifies one adapter session (one `init` .. `cleanup` lifetime).
///
/// Generated fresh for every session; recorded on the session span so all
/// activity from a single adapter instance can be correlated across threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generates a new random session identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
