//! In-memory namespace master for tests.
//!
//! [`InMemoryNamespace`] keeps a tree of [`FileStatus`] records behind a mutex
//! and implements both client ports with the same semantics a real master has:
//! creating an existing node fails with `AlreadyExists`, deleting a non-empty
//! directory needs `recursive`, and so on. Every call is appended to a call log
//! so tests can assert on ordering.
//!
//! [`InMemoryClientFactory`] hands out clients bound to one namespace and can be
//! told to fail in the ways a real deployment fails.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;

use crate::{
    BlockMasterClient, ByteCount, ConnectionError, CreateDirectoryOptions, CreateFileOptions,
    DeleteOptions, FileStatus, FileSystemMasterClient, MasterClientFactory, MasterEndpoint,
    NamespaceError, NamespacePath, SecurityConfig, SetAttributeOptions, Timestamp, WorkerId,
    WorkerInfo, WorkerState,
};

/// Capacity reported by the in-memory block master.
pub const CAPACITY_BYTES: u64 = 1 << 40;

#[derive(Default)]
struct State {
    nodes: BTreeMap<NamespacePath, FileStatus>,
    calls: Vec<String>,
    unavailable: bool,
    reject_directories: bool,
}

/// Shared in-memory namespace tree.
#[derive(Clone, Default)]
pub struct InMemoryNamespace {
    state: Arc<Mutex<State>>,
}

impl InMemoryNamespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every namespace call fail with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.lock().unavailable = unavailable;
    }

    /// Makes `create_directory` fail with a permission error.
    pub fn reject_directories(&self, reject: bool) {
        self.lock().reject_directories = reject;
    }

    /// Returns `true` if a node exists at `path`.
    pub fn exists(&self, path: &NamespacePath) -> bool {
        path.is_root() || self.lock().nodes.contains_key(path)
    }

    /// Returns the stored status of `path`, if any.
    pub fn status(&self, path: &NamespacePath) -> Option<FileStatus> {
        self.lock().nodes.get(path).cloned()
    }

    /// Every call made so far, formatted as `"<operation> <path>"`.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A test that panicked while holding the lock has already failed.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn record(state: &mut State, operation: &str, path: &NamespacePath) -> Result<(), NamespaceError> {
        state.calls.push(format!("{operation} {path}"));
        if state.unavailable {
            return Err(ConnectionError::Transport {
                message: "in-memory master marked unavailable".into(),
            }
            .into());
        }
        Ok(())
    }

    fn new_status(path: &NamespacePath, folder: bool) -> FileStatus {
        let now = Timestamp::now();
        FileStatus {
            path: path.clone(),
            name: path.name().unwrap_or_default().to_string(),
            folder,
            length: ByteCount::default(),
            owner: "nsbench".into(),
            group: "nsbench".into(),
            mode: if folder { 0o755 } else { 0o644 },
            ufs_path: String::new(),
            pinned: false,
            persisted: false,
            ttl_ms: None,
            creation_time: now,
            last_modification_time: now,
        }
    }

    /// Ensures the parent of `path` exists as a directory, creating missing
    /// ancestors when `recursive`.
    fn prepare_parent(
        state: &mut State,
        path: &NamespacePath,
        recursive: bool,
    ) -> Result<(), NamespaceError> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        if parent.is_root() {
            return Ok(());
        }
        match state.nodes.get(&parent) {
            Some(status) if status.folder => Ok(()),
            Some(_) => Err(NamespaceError::Rejected {
                code: "INVALID_PATH".into(),
                message: format!("{parent} is not a directory"),
            }),
            None if recursive => {
                Self::prepare_parent(state, &parent, true)?;
                let status = Self::new_status(&parent, true);
                state.nodes.insert(parent, status);
                Ok(())
            }
            None => Err(NamespaceError::NotFound { path: parent }),
        }
    }

    fn create_file(
        &self,
        path: &NamespacePath,
        options: &CreateFileOptions,
    ) -> Result<(), NamespaceError> {
        let mut state = self.lock();
        Self::record(&mut state, "create_file", path)?;
        if path.is_root() || state.nodes.contains_key(path) {
            return Err(NamespaceError::AlreadyExists { path: path.clone() });
        }
        Self::prepare_parent(&mut state, path, options.recursive)?;
        state.nodes.insert(path.clone(), Self::new_status(path, false));
        Ok(())
    }

    fn create_directory(
        &self,
        path: &NamespacePath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), NamespaceError> {
        let mut state = self.lock();
        Self::record(&mut state, "create_directory", path)?;
        if state.reject_directories {
            return Err(NamespaceError::PermissionDenied {
                path: path.clone(),
                message: "directory creation rejected".into(),
            });
        }
        if let Some(existing) = state.nodes.get(path) {
            if options.allow_exists && existing.folder {
                return Ok(());
            }
            return Err(NamespaceError::AlreadyExists { path: path.clone() });
        }
        if path.is_root() {
            return Err(NamespaceError::AlreadyExists { path: path.clone() });
        }
        Self::prepare_parent(&mut state, path, options.recursive)?;
        state.nodes.insert(path.clone(), Self::new_status(path, true));
        Ok(())
    }

    fn delete(&self, path: &NamespacePath, options: &DeleteOptions) -> Result<(), NamespaceError> {
        let mut state = self.lock();
        Self::record(&mut state, "delete", path)?;
        if !state.nodes.contains_key(path) {
            return Err(NamespaceError::NotFound { path: path.clone() });
        }
        let has_children = state.nodes.keys().any(|p| p.is_descendant_of(path));
        if has_children && !options.recursive {
            return Err(NamespaceError::Rejected {
                code: "DIRECTORY_NOT_EMPTY".into(),
                message: format!("{path} is not empty"),
            });
        }
        state
            .nodes
            .retain(|p, _| p != path && !p.is_descendant_of(path));
        Ok(())
    }

    fn get_status(&self, path: &NamespacePath) -> Result<FileStatus, NamespaceError> {
        let mut state = self.lock();
        Self::record(&mut state, "get_status", path)?;
        state
            .nodes
            .get(path)
            .cloned()
            .ok_or_else(|| NamespaceError::NotFound { path: path.clone() })
    }

    fn set_attribute(
        &self,
        path: &NamespacePath,
        options: &SetAttributeOptions,
    ) -> Result<(), NamespaceError> {
        let mut state = self.lock();
        Self::record(&mut state, "set_attribute", path)?;
        let status = state
            .nodes
            .get_mut(path)
            .ok_or_else(|| NamespaceError::NotFound { path: path.clone() })?;
        if let Some(pinned) = options.pinned {
            status.pinned = pinned;
        }
        if let Some(persisted) = options.persisted {
            status.persisted = persisted;
        }
        if options.ttl_ms.is_some() {
            status.ttl_ms = options.ttl_ms;
        }
        status.last_modification_time = Timestamp::now();
        Ok(())
    }

    fn used_bytes(&self) -> ByteCount {
        self.lock()
            .nodes
            .values()
            .fold(ByteCount::default(), |acc, s| acc + s.length)
    }
}

// ---------------------------------------------------------------------------
// Client handles
// ---------------------------------------------------------------------------

/// Client handle bound to an [`InMemoryNamespace`].
pub struct InMemoryClient {
    namespace: InMemoryNamespace,
    closed: AtomicBool,
    fail_close: bool,
}

impl InMemoryClient {
    pub fn new(namespace: InMemoryNamespace) -> Self {
        Self {
            namespace,
            closed: AtomicBool::new(false),
            fail_close: false,
        }
    }

    /// Returns `true` once [`close`](FileSystemMasterClient::close) succeeded.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<(), NamespaceError> {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }
        Ok(())
    }

    fn release(&self, kind: &str) -> Result<(), NamespaceError> {
        self.namespace
            .lock()
            .calls
            .push(format!("close {kind}"));
        if self.fail_close {
            return Err(ConnectionError::Transport {
                message: format!("{kind} client refused to close"),
            }
            .into());
        }
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl FileSystemMasterClient for InMemoryClient {
    async fn create_file(
        &self,
        path: &NamespacePath,
        options: &CreateFileOptions,
    ) -> Result<(), NamespaceError> {
        self.ensure_open()?;
        self.namespace.create_file(path, options)
    }

    async fn create_directory(
        &self,
        path: &NamespacePath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), NamespaceError> {
        self.ensure_open()?;
        self.namespace.create_directory(path, options)
    }

    async fn delete(
        &self,
        path: &NamespacePath,
        options: &DeleteOptions,
    ) -> Result<(), NamespaceError> {
        self.ensure_open()?;
        self.namespace.delete(path, options)
    }

    async fn get_status(&self, path: &NamespacePath) -> Result<FileStatus, NamespaceError> {
        self.ensure_open()?;
        self.namespace.get_status(path)
    }

    async fn set_attribute(
        &self,
        path: &NamespacePath,
        options: &SetAttributeOptions,
    ) -> Result<(), NamespaceError> {
        self.ensure_open()?;
        self.namespace.set_attribute(path, options)
    }

    async fn close(&self) -> Result<(), NamespaceError> {
        if self.is_closed() {
            return Ok(());
        }
        self.release("file_system")
    }
}

#[async_trait]
impl BlockMasterClient for InMemoryClient {
    async fn capacity_bytes(&self) -> Result<ByteCount, NamespaceError> {
        self.ensure_open()?;
        Ok(ByteCount::new(CAPACITY_BYTES))
    }

    async fn used_bytes(&self) -> Result<ByteCount, NamespaceError> {
        self.ensure_open()?;
        Ok(self.namespace.used_bytes())
    }

    async fn worker_info_list(&self) -> Result<Vec<WorkerInfo>, NamespaceError> {
        self.ensure_open()?;
        Ok(vec![WorkerInfo {
            id: WorkerId::new(1),
            address: "localhost:29998".into(),
            state: WorkerState::Live,
            capacity_bytes: ByteCount::new(CAPACITY_BYTES),
            used_bytes: self.namespace.used_bytes(),
            last_contact_sec: 0,
        }])
    }

    async fn close(&self) -> Result<(), NamespaceError> {
        if self.is_closed() {
            return Ok(());
        }
        self.release("block")
    }
}

// ---------------------------------------------------------------------------
// Factory
// ---------------------------------------------------------------------------

/// Hands out [`InMemoryClient`]s, optionally failing like a real deployment.
#[derive(Default)]
pub struct InMemoryClientFactory {
    namespace: InMemoryNamespace,
    unreachable: bool,
    block_unavailable: bool,
    fail_close: bool,
    acquired: AtomicUsize,
}

impl InMemoryClientFactory {
    pub fn new(namespace: InMemoryNamespace) -> Self {
        Self {
            namespace,
            ..Self::default()
        }
    }

    /// Every acquisition fails as if the master could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Block client acquisition fails; namespace clients still work.
    pub fn without_block_master(mut self) -> Self {
        self.block_unavailable = true;
        self
    }

    /// Clients handed out refuse to close.
    pub fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    pub fn namespace(&self) -> &InMemoryNamespace {
        &self.namespace
    }

    /// Number of clients handed out so far.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    fn client(&self, endpoint: &MasterEndpoint) -> Result<InMemoryClient, ConnectionError> {
        if self.unreachable {
            return Err(ConnectionError::Unreachable {
                address: endpoint.authority(),
                message: "connection refused".into(),
            });
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        let mut client = InMemoryClient::new(self.namespace.clone());
        client.fail_close = self.fail_close;
        Ok(client)
    }
}

#[async_trait]
impl MasterClientFactory for InMemoryClientFactory {
    async fn acquire_file_system_master_client(
        &self,
        endpoint: &MasterEndpoint,
        _security: &SecurityConfig,
    ) -> Result<Arc<dyn FileSystemMasterClient>, ConnectionError> {
        Ok(Arc::new(self.client(endpoint)?))
    }

    async fn acquire_block_master_client(
        &self,
        endpoint: &MasterEndpoint,
        _security: &SecurityConfig,
    ) -> Result<Arc<dyn BlockMasterClient>, ConnectionError> {
        if self.block_unavailable {
            return Err(ConnectionError::Handshake {
                address: endpoint.authority(),
                message: "block master service not registered".into(),
            });
        }
        Ok(Arc::new(self.client(endpoint)?))
    }
}
