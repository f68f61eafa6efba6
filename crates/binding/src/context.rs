use std::future::Future;
use std::sync::Arc;

use namespace::{ConnectionError, MasterClientFactory};
use tokio::runtime::{Builder, Runtime};

/// Process-wide client resources shared by every session.
///
/// Holds the runtime that drives master calls and the factory that hands out
/// clients. Cloning is cheap; build one per process and clone it into each
/// [`crate::NamespaceDb`].
///
/// Must not be dropped (for the last time) from inside an async context.
#[derive(Clone)]
pub struct ClientContext {
    runtime: Arc<Runtime>,
    factory: Arc<dyn MasterClientFactory>,
}

impl ClientContext {
    /// Starts the client runtime with `worker_threads` threads.
    pub fn new(
        factory: Arc<dyn MasterClientFactory>,
        worker_threads: usize,
    ) -> Result<Self, ConnectionError> {
        let runtime = Builder::new_multi_thread()
            .worker_threads(worker_threads.max(1))
            .thread_name("nsbench-client")
            .enable_all()
            .build()
            .map_err(|e| ConnectionError::Transport {
                message: format!("Failed to start client runtime: {e}"),
            })?;
        Ok(Self {
            runtime: Arc::new(runtime),
            factory,
        })
    }

    pub fn factory(&self) -> &dyn MasterClientFactory {
        self.factory.as_ref()
    }

    /// Runs `future` to completion, blocking the calling thread.
    pub fn block_on<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }
}

impl std::fmt::Debug for ClientContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientContext")
            .field("references", &Arc::strong_count(&self.runtime))
            .finish_non_exhaustive()
    }
}
