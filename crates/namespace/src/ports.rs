//! Port traits through which the namespace master is reached.
//!
//! The binding sees only these traits; the transport behind them lives in an
//! infrastructure crate. All methods are `async` so one shared runtime can drive
//! every client in the process; callers that need blocking semantics wrap the
//! futures themselves.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    ByteCount, ConnectionError, CreateDirectoryOptions, CreateFileOptions, DeleteOptions,
    FileStatus, MasterEndpoint, NamespaceError, NamespacePath, SecurityConfig,
    SetAttributeOptions, WorkerInfo,
};

/// Namespace (metadata) operations of the master.
#[async_trait]
pub trait FileSystemMasterClient: Send + Sync {
    async fn create_file(
        &self,
        path: &NamespacePath,
        options: &CreateFileOptions,
    ) -> Result<(), NamespaceError>;

    async fn create_directory(
        &self,
        path: &NamespacePath,
        options: &CreateDirectoryOptions,
    ) -> Result<(), NamespaceError>;

    async fn delete(&self, path: &NamespacePath, options: &DeleteOptions)
        -> Result<(), NamespaceError>;

    async fn get_status(&self, path: &NamespacePath) -> Result<FileStatus, NamespaceError>;

    async fn set_attribute(
        &self,
        path: &NamespacePath,
        options: &SetAttributeOptions,
    ) -> Result<(), NamespaceError>;

    /// Releases the handle. Later calls fail with [`ConnectionError::Closed`];
    /// closing twice is a no-op.
    async fn close(&self) -> Result<(), NamespaceError>;
}

/// Read-only block/storage introspection of the master.
#[async_trait]
pub trait BlockMasterClient: Send + Sync {
    async fn capacity_bytes(&self) -> Result<ByteCount, NamespaceError>;

    async fn used_bytes(&self) -> Result<ByteCount, NamespaceError>;

    async fn worker_info_list(&self) -> Result<Vec<WorkerInfo>, NamespaceError>;

    /// Releases the handle. Same contract as [`FileSystemMasterClient::close`].
    async fn close(&self) -> Result<(), NamespaceError>;
}

/// Process-wide source of master clients.
///
/// Implementations own whatever is shared between sessions (connection pools,
/// TLS state) and hand out cheap per-session handles.
#[async_trait]
pub trait MasterClientFactory: Send + Sync {
    /// Acquires a namespace client, completing the handshake with the master.
    ///
    /// Failure here is fatal to session establishment.
    async fn acquire_file_system_master_client(
        &self,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
    ) -> Result<Arc<dyn FileSystemMasterClient>, ConnectionError>;

    /// Acquires a block introspection client.
    async fn acquire_block_master_client(
        &self,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
    ) -> Result<Arc<dyn BlockMasterClient>, ConnectionError>;
}
