//! Connectivity self-check.
//!
//! Exercises each read-only introspection call once against a throwaway probe
//! file and records what came back. Nothing here affects verb results.

use namespace::{
    ByteCount, CreateDirectoryOptions, CreateFileOptions, DeleteOptions, FileStatus,
    NamespaceError, NamespacePath, ResultCode, WorkerInfo,
};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::Session;

/// A probe call that failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeFailure {
    pub probe: &'static str,
    pub error: String,
}

/// Outcome of [`check_connectivity`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConnectivityReport {
    pub capacity: Option<ByteCount>,
    pub used: Option<ByteCount>,
    pub workers: Option<Vec<WorkerInfo>>,
    pub probe_status: Option<FileStatus>,
    pub failures: Vec<ProbeFailure>,
}

impl ConnectivityReport {
    /// `OK` when every probe succeeded, `ERROR` otherwise.
    pub fn result_code(&self) -> ResultCode {
        if self.failures.is_empty() {
            ResultCode::Ok
        } else {
            ResultCode::Error
        }
    }

    fn capture<T>(&mut self, probe: &'static str, outcome: Result<T, NamespaceError>) -> Option<T> {
        match outcome {
            Ok(value) => Some(value),
            Err(error) => {
                warn!(probe, %error, "connectivity probe failed");
                self.failures.push(ProbeFailure {
                    probe,
                    error: error.to_string(),
                });
                None
            }
        }
    }
}

/// Runs the self-check against an open session.
///
/// Prepares `/nsbench_probe/status_probe`, queries block capacity, used bytes
/// and the worker list, reads the probe's status, then removes the probe
/// directory. Failures are collected in the report, never returned.
pub fn check_connectivity(session: &Session) -> ConnectivityReport {
    let mut report = ConnectivityReport::default();
    let directory = NamespacePath::probe_directory();
    let file = NamespacePath::probe_file();

    let prepared = session.run(|client| {
        let (directory, file) = (&directory, &file);
        async move {
            // Leftovers from an earlier run.
            discard_leftover(file, client.delete(file, &DeleteOptions::default()).await);
            discard_leftover(
                directory,
                client.delete(directory, &DeleteOptions::recursive()).await,
            );
            client
                .create_directory(directory, &CreateDirectoryOptions::default())
                .await?;
            client.create_file(file, &CreateFileOptions::default()).await
        }
    });
    report.capture("prepare_probe", prepared);

    if session.has_block_client() {
        if let Some(outcome) = session.run_block(|c| async move { c.capacity_bytes().await }) {
            report.capacity = report.capture("capacity_bytes", outcome);
        }
        if let Some(outcome) = session.run_block(|c| async move { c.used_bytes().await }) {
            report.used = report.capture("used_bytes", outcome);
        }
        if let Some(outcome) = session.run_block(|c| async move { c.worker_info_list().await }) {
            report.workers = report.capture("worker_info_list", outcome);
        }
    } else {
        report.failures.push(ProbeFailure {
            probe: "block_master",
            error: "no block master client".into(),
        });
    }

    let status = session.run(|client| {
        let file = &file;
        async move { client.get_status(file).await }
    });
    report.probe_status = report.capture("get_status", status);

    if let Some(capacity) = report.capacity {
        info!(%capacity, "block capacity");
    }
    if let Some(used) = report.used {
        info!(%used, "block used");
    }
    if let Some(workers) = &report.workers {
        for worker in workers {
            info!(
                worker = %worker.id,
                address = %worker.address,
                state = %worker.state,
                "worker"
            );
        }
    }
    if let Some(status) = &report.probe_status {
        info!(path = %status.path, folder = status.folder, owner = %status.owner, "probe status");
    }

    let removed = session.run(|client| {
        let directory = &directory;
        async move { client.delete(directory, &DeleteOptions::recursive()).await }
    });
    if let Err(error) = removed {
        debug!(%error, "probe directory left behind");
    }

    info!(result = %report.result_code(), failures = report.failures.len(), "self-check finished");
    report
}

/// `NotFound` is the expected outcome; other failures are traced and the
/// preparation continues.
fn discard_leftover(path: &NamespacePath, outcome: Result<(), NamespaceError>) {
    match outcome {
        Ok(()) | Err(NamespaceError::NotFound { .. }) => {}
        Err(error) => debug!(%path, %error, "could not remove leftover probe"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use namespace::testing::{InMemoryClientFactory, InMemoryNamespace, CAPACITY_BYTES};
    use namespace::{map_path, AdapterConfig};

    use super::*;
    use crate::ClientContext;

    fn session(factory: InMemoryClientFactory) -> Session {
        let context = ClientContext::new(Arc::new(factory), 1).unwrap();
        Session::open(&AdapterConfig::default(), context).unwrap()
    }

    #[test]
    fn healthy_master_passes_every_probe() {
        let namespace = InMemoryNamespace::new();
        let mut session = session(InMemoryClientFactory::new(namespace.clone()));

        let report = check_connectivity(&session);
        assert_eq!(report.result_code(), ResultCode::Ok, "{:?}", report.failures);
        assert_eq!(report.capacity, Some(ByteCount::new(CAPACITY_BYTES)));
        assert_eq!(report.workers.as_ref().map(Vec::len), Some(1));
        let status = report.probe_status.unwrap();
        assert_eq!(status.path, NamespacePath::probe_file());
        assert!(!status.folder);

        assert!(!namespace.exists(&NamespacePath::probe_directory()));
        session.close();
    }

    #[test]
    fn stale_probe_is_replaced() {
        let namespace = InMemoryNamespace::new();
        let mut session = session(InMemoryClientFactory::new(namespace.clone()));
        let _ = check_connectivity(&session);
        let report = check_connectivity(&session);
        assert!(report.failures.is_empty());
        session.close();
    }

    #[test]
    fn leftover_self_check_node_from_interrupted_run_is_cleared() {
        let namespace = InMemoryNamespace::new();
        let mut session = session(InMemoryClientFactory::new(namespace.clone()));
        let leftover = map_path("nsbench_probe", "status_probe/stale");
        session
            .run(|client| {
                let leftover = &leftover;
                async move {
                    client
                        .create_file(leftover, &CreateFileOptions::default())
                        .await
                }
            })
            .unwrap();
        namespace.clear_calls();

        let report = check_connectivity(&session);
        assert!(report.failures.is_empty(), "{:?}", report.failures);
        // The file delete is rejected (non-empty), the recursive one clears it.
        assert_eq!(
            &namespace.calls()[..3],
            &[
                "delete /nsbench_probe/status_probe",
                "delete /nsbench_probe",
                "create_directory /nsbench_probe",
            ]
        );
        assert!(!namespace.exists(&leftover));
        session.close();
    }

    #[test]
    fn missing_block_client_is_reported() {
        let mut session = session(InMemoryClientFactory::default().without_block_master());
        let report = check_connectivity(&session);
        assert_eq!(report.result_code(), ResultCode::Error);
        assert_eq!(report.failures[0].probe, "block_master");
        assert!(report.probe_status.is_some());
        session.close();
    }

    #[test]
    fn unavailable_master_fails_without_panicking() {
        let namespace = InMemoryNamespace::new();
        let mut session = session(InMemoryClientFactory::new(namespace.clone()));
        namespace.set_unavailable(true);

        let report = check_connectivity(&session);
        let probes: Vec<_> = report.failures.iter().map(|f| f.probe).collect();
        assert_eq!(probes, vec!["prepare_probe", "get_status"]);
        assert!(report.probe_status.is_none());

        namespace.set_unavailable(false);
        session.close();
    }

    #[test]
    fn self_check_runs_at_open_when_enabled() {
        let context = ClientContext::new(Arc::new(InMemoryClientFactory::default()), 1).unwrap();
        let config = AdapterConfig {
            self_check: true,
            ..AdapterConfig::default()
        };
        let mut session = Session::open(&config, context).unwrap();
        let report = session.connectivity().expect("self-check report");
        assert_eq!(report.result_code(), ResultCode::Ok);
        session.close();
    }
}
