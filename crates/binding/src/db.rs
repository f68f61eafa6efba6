//! The benchmark harness contract.

use std::collections::{HashMap, HashSet};

use namespace::{ConfigError, ConnectionError, ResultCode};
use thiserror::Error;

use crate::CleanupReport;

/// One record as exchanged with the harness: field name to raw bytes.
pub type Record = HashMap<String, Vec<u8>>;

/// Why `init` could not produce a usable session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InitError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

/// Key/value store interface driven by the benchmark harness.
///
/// Verbs never fail with an error value: every outcome collapses into a
/// [`ResultCode`]. `values` and `fields` arguments are accepted for contract
/// compatibility; implementations may ignore their contents.
pub trait Db {
    /// Establishes the session. Must complete before any verb is called.
    fn init(&mut self) -> Result<(), InitError>;

    /// Releases the session, best-effort. Safe to call repeatedly and after a
    /// failed `init`.
    fn cleanup(&mut self) -> CleanupReport;

    fn insert(&self, table: &str, key: &str, values: &Record) -> ResultCode;

    fn read(
        &self,
        table: &str,
        key: &str,
        fields: Option<&HashSet<String>>,
        result: &mut Record,
    ) -> ResultCode;

    fn update(&self, table: &str, key: &str, values: &Record) -> ResultCode;

    fn delete(&self, table: &str, key: &str) -> ResultCode;

    fn scan(
        &self,
        table: &str,
        start_key: &str,
        record_count: usize,
        fields: Option<&HashSet<String>>,
        result: &mut Vec<Record>,
    ) -> ResultCode;
}
