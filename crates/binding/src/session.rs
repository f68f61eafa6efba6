//! Session lifecycle: connect, prepare the default directory, tear down.

use std::future::Future;
use std::net::ToSocketAddrs;
use std::sync::Arc;

use namespace::{
    AdapterConfig, BlockMasterClient, ConnectionError, CreateDirectoryOptions, DeleteOptions,
    FileSystemMasterClient, MasterEndpoint, NamespaceError, NamespacePath, SecurityConfig,
    SessionId,
};
use serde::Serialize;
use tracing::{debug, info, info_span, warn, Span};

use crate::diagnostics::{check_connectivity, ConnectivityReport};
use crate::{ClientContext, InitError};

// ---------------------------------------------------------------------------
// Cleanup report
// ---------------------------------------------------------------------------

/// One teardown step of [`Session::close`], in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CleanupStep {
    /// Recursive delete of the default working directory.
    DefaultDirectory,
    /// Release of the block introspection client.
    BlockClient,
    /// Release of the namespace client.
    FileSystemClient,
}

impl std::fmt::Display for CleanupStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DefaultDirectory => f.write_str("default directory"),
            Self::BlockClient => f.write_str("block client"),
            Self::FileSystemClient => f.write_str("file system client"),
        }
    }
}

/// A teardown step that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CleanupFailure {
    pub step: CleanupStep,
    pub error: String,
}

/// Failures collected while closing a session.
///
/// The session is closed regardless of its content.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    /// Returns `true` if every attempted step succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[CleanupFailure] {
        &self.failures
    }

    fn record(&mut self, step: CleanupStep, outcome: Result<(), NamespaceError>) {
        match outcome {
            Ok(()) => debug!(%step, "cleanup step succeeded"),
            Err(error) => {
                warn!(%step, %error, "cleanup step failed");
                self.failures.push(CleanupFailure {
                    step,
                    error: error.to_string(),
                });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// Live connection of one adapter instance to the namespace master.
///
/// Created by [`Session::open`]; immutable afterwards except for the client
/// handles, which [`Session::close`] releases.
pub struct Session {
    id: SessionId,
    endpoint: MasterEndpoint,
    context: ClientContext,
    file_system: Option<Arc<dyn FileSystemMasterClient>>,
    block: Option<Arc<dyn BlockMasterClient>>,
    default_directory: NamespacePath,
    connectivity: Option<ConnectivityReport>,
    span: Span,
}

impl Session {
    /// Opens a session against the master named in `config`.
    ///
    /// Fails only when the configuration is invalid, the master address does
    /// not resolve, or the namespace client cannot be acquired. A missing block
    /// client, a default directory that could not be created and a failing
    /// self-check are reported and tolerated.
    pub fn open(config: &AdapterConfig, context: ClientContext) -> Result<Self, InitError> {
        config.validate()?;

        let id = SessionId::new_random();
        let span = info_span!("session", session = %id, master = %config.master);
        let _entered = span.enter();

        resolve(&config.master)?;
        info!(
            authentication = %config.security.authentication,
            authorization_permission_enabled = config.security.authorization_permission_enabled,
            "opening session"
        );

        let file_system = context.block_on(
            context
                .factory()
                .acquire_file_system_master_client(&config.master, &config.security),
        )?;
        let block = acquire_block_client(&context, &config.master, &config.security);

        let mut session = Self {
            id,
            endpoint: config.master.clone(),
            context,
            file_system: Some(file_system),
            block,
            default_directory: NamespacePath::default_directory(),
            connectivity: None,
            span: span.clone(),
        };
        session.create_default_directory();

        if config.self_check {
            session.connectivity = Some(check_connectivity(&session));
        }

        info!("session open");
        Ok(session)
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn endpoint(&self) -> &MasterEndpoint {
        &self.endpoint
    }

    pub fn default_directory(&self) -> &NamespacePath {
        &self.default_directory
    }

    /// Returns `true` until [`Session::close`] has run.
    pub fn is_open(&self) -> bool {
        self.file_system.is_some()
    }

    /// Result of the self-check run at open, if one was requested.
    pub fn connectivity(&self) -> Option<&ConnectivityReport> {
        self.connectivity.as_ref()
    }

    pub(crate) fn has_block_client(&self) -> bool {
        self.block.is_some()
    }

    /// Runs `call` against the namespace client, blocking until it completes.
    ///
    /// Fails with [`ConnectionError::Closed`] once the session is closed.
    pub fn run<T, F, Fut>(&self, call: F) -> Result<T, NamespaceError>
    where
        F: FnOnce(Arc<dyn FileSystemMasterClient>) -> Fut,
        Fut: Future<Output = Result<T, NamespaceError>>,
    {
        let client = self
            .file_system
            .clone()
            .ok_or(NamespaceError::Connection(ConnectionError::Closed))?;
        self.context.block_on(call(client))
    }

    /// Runs `call` against the block client, if one was acquired.
    pub fn run_block<T, F, Fut>(&self, call: F) -> Option<Result<T, NamespaceError>>
    where
        F: FnOnce(Arc<dyn BlockMasterClient>) -> Fut,
        Fut: Future<Output = Result<T, NamespaceError>>,
    {
        let client = self.block.clone()?;
        Some(self.context.block_on(call(client)))
    }

    /// Tears the session down, best-effort.
    ///
    /// Runs, in order and independently of each other: recursive delete of the
    /// default directory, release of the block client, release of the namespace
    /// client. Handles are cleared whether or not their release succeeded, so a
    /// second call does nothing.
    pub fn close(&mut self) -> CleanupReport {
        let span = self.span.clone();
        let _entered = span.enter();
        let mut report = CleanupReport::default();

        if let Some(client) = self.file_system.clone() {
            let directory = &self.default_directory;
            let outcome = self.context.block_on(async {
                match client.delete(directory, &DeleteOptions::recursive()).await {
                    // Another instance sharing the directory removed it first.
                    Err(NamespaceError::NotFound { .. }) => Ok(()),
                    other => other,
                }
            });
            report.record(CleanupStep::DefaultDirectory, outcome);
        }

        if let Some(client) = self.block.take() {
            let outcome = self.context.block_on(client.close());
            report.record(CleanupStep::BlockClient, outcome);
        }

        if let Some(client) = self.file_system.take() {
            let outcome = self.context.block_on(client.close());
            report.record(CleanupStep::FileSystemClient, outcome);
        }

        if report.is_clean() {
            info!("session closed");
        } else {
            warn!(failed_steps = report.failures().len(), "session closed with failures");
        }
        report
    }

    fn create_default_directory(&self) {
        let directory = &self.default_directory;
        let outcome = self.run(|client| async move {
            client
                .create_directory(directory, &CreateDirectoryOptions::default())
                .await
        });
        match outcome {
            Ok(()) => debug!(%directory, "default directory created"),
            Err(NamespaceError::AlreadyExists { .. }) => {
                debug!(%directory, "default directory already exists")
            }
            Err(error) => warn!(%directory, %error, "could not create default directory"),
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.is_open() {
            let _entered = self.span.enter();
            warn!("session dropped without close; remote state left in place");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("endpoint", &self.endpoint)
            .field("open", &self.is_open())
            .field("block_client", &self.block.is_some())
            .field("default_directory", &self.default_directory)
            .finish_non_exhaustive()
    }
}

fn resolve(endpoint: &MasterEndpoint) -> Result<(), ConnectionError> {
    let unresolvable = |reason: String| ConnectionError::Unresolvable {
        address: endpoint.authority(),
        reason,
    };
    let mut addresses = (endpoint.host.as_str(), endpoint.port)
        .to_socket_addrs()
        .map_err(|e| unresolvable(e.to_string()))?;
    let first = addresses
        .next()
        .ok_or_else(|| unresolvable("no addresses returned".into()))?;
    debug!(address = %first, "master address resolved");
    Ok(())
}

fn acquire_block_client(
    context: &ClientContext,
    endpoint: &MasterEndpoint,
    security: &SecurityConfig,
) -> Option<Arc<dyn BlockMasterClient>> {
    match context.block_on(
        context
            .factory()
            .acquire_block_master_client(endpoint, security),
    ) {
        Ok(client) => Some(client),
        Err(error) => {
            warn!(%error, "block master client unavailable; introspection disabled");
            None
        }
    }
}
