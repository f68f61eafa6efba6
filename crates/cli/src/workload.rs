//! Multi-threaded workload driver for `nsbench run`.
//!
//! Each worker thread owns one [`NamespaceDb`] and drives, per record,
//! `insert → read → update → read → delete`. All workers wait on a barrier
//! before `cleanup`, since the first instance to clean up removes the shared
//! default directory.

use std::collections::BTreeMap;
use std::sync::Barrier;
use std::time::{Duration, Instant};

use binding::{CleanupFailure, ClientContext, Db, NamespaceDb, Record};
use namespace::{AdapterConfig, ResultCode, Verb};
use serde::Serialize;
use tracing::{error, info, info_span};

#[derive(Debug, Clone)]
pub struct WorkloadOptions {
    pub threads: usize,
    pub records: usize,
    pub table: String,
    pub scan: bool,
}

/// Result counts and mean latency of one verb across all workers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VerbSummary {
    pub ok: u64,
    pub error: u64,
    pub not_implemented: u64,
    pub mean_latency_us: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkloadReport {
    pub threads: usize,
    pub records_per_thread: usize,
    pub init_failures: Vec<String>,
    pub verbs: BTreeMap<Verb, VerbSummary>,
    pub cleanup_failures: Vec<CleanupFailure>,
}

impl WorkloadReport {
    /// `true` when every worker opened its session.
    pub fn all_sessions_opened(&self) -> bool {
        self.init_failures.is_empty()
    }
}

#[derive(Debug, Default)]
struct VerbTally {
    ok: u64,
    error: u64,
    not_implemented: u64,
    elapsed: Duration,
}

impl VerbTally {
    fn record(&mut self, code: ResultCode, elapsed: Duration) {
        match code {
            ResultCode::Ok => self.ok += 1,
            ResultCode::Error => self.error += 1,
            ResultCode::NotImplemented => self.not_implemented += 1,
        }
        self.elapsed += elapsed;
    }

    fn merge(&mut self, other: &VerbTally) {
        self.ok += other.ok;
        self.error += other.error;
        self.not_implemented += other.not_implemented;
        self.elapsed += other.elapsed;
    }

    fn summary(&self) -> VerbSummary {
        let calls = self.ok + self.error + self.not_implemented;
        let mean_latency_us = match calls {
            0 => 0,
            n => (self.elapsed.as_micros() / u128::from(n)).try_into().unwrap_or(u64::MAX),
        };
        VerbSummary {
            ok: self.ok,
            error: self.error,
            not_implemented: self.not_implemented,
            mean_latency_us,
        }
    }
}

struct WorkerOutcome {
    tally: BTreeMap<Verb, VerbTally>,
    init_error: Option<String>,
    cleanup_failures: Vec<CleanupFailure>,
}

/// Runs the workload on `options.threads` threads sharing `context`.
pub fn run(
    config: &AdapterConfig,
    context: &ClientContext,
    options: &WorkloadOptions,
) -> WorkloadReport {
    let threads = options.threads.max(1);
    let barrier = Barrier::new(threads);
    info!(threads, records = options.records, table = %options.table, "starting workload");

    let outcomes: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..threads)
            .map(|worker| {
                let barrier = &barrier;
                scope.spawn(move || run_worker(worker, config, context, options, barrier))
            })
            .collect();
        handles.into_iter().map(|h| h.join()).collect()
    });

    let mut tally: BTreeMap<Verb, VerbTally> = BTreeMap::new();
    let mut init_failures = Vec::new();
    let mut cleanup_failures = Vec::new();
    for (worker, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(outcome) => {
                for (verb, counts) in &outcome.tally {
                    tally.entry(*verb).or_default().merge(counts);
                }
                if let Some(error) = outcome.init_error {
                    init_failures.push(format!("worker {worker}: {error}"));
                }
                cleanup_failures.extend(outcome.cleanup_failures);
            }
            Err(_) => init_failures.push(format!("worker {worker}: panicked")),
        }
    }

    let report = WorkloadReport {
        threads,
        records_per_thread: options.records,
        init_failures,
        verbs: tally
            .iter()
            .map(|(verb, counts)| (*verb, counts.summary()))
            .collect(),
        cleanup_failures,
    };
    info!(
        init_failures = report.init_failures.len(),
        cleanup_failures = report.cleanup_failures.len(),
        "workload finished"
    );
    report
}

fn run_worker(
    worker: usize,
    config: &AdapterConfig,
    context: &ClientContext,
    options: &WorkloadOptions,
    barrier: &Barrier,
) -> WorkerOutcome {
    let span = info_span!("worker", worker);
    let _entered = span.enter();

    let mut db = NamespaceDb::new(config.clone(), context.clone());
    let mut tally: BTreeMap<Verb, VerbTally> = BTreeMap::new();

    let init_error = match db.init() {
        Ok(()) => {
            let table = options.table.as_str();
            let values = Record::new();
            for record in 0..options.records {
                let key = format!("user{worker}-{record}");
                timed(&mut tally, Verb::Insert, || db.insert(table, &key, &values));
                timed(&mut tally, Verb::Read, || db.read(table, &key, None, &mut Record::new()));
                timed(&mut tally, Verb::Update, || db.update(table, &key, &values));
                timed(&mut tally, Verb::Read, || db.read(table, &key, None, &mut Record::new()));
                timed(&mut tally, Verb::Delete, || db.delete(table, &key));
            }
            if options.scan {
                let start = format!("user{worker}-0");
                timed(&mut tally, Verb::Scan, || {
                    db.scan(table, &start, options.records, None, &mut Vec::new())
                });
            }
            None
        }
        Err(err) => {
            error!(error = %err, "worker could not open a session");
            Some(err.to_string())
        }
    };

    barrier.wait();
    let cleanup = db.cleanup();

    WorkerOutcome {
        tally,
        init_error,
        cleanup_failures: cleanup.failures().to_vec(),
    }
}

fn timed(tally: &mut BTreeMap<Verb, VerbTally>, verb: Verb, call: impl FnOnce() -> ResultCode) {
    let started = Instant::now();
    let code = call();
    tally.entry(verb).or_default().record(code, started.elapsed());
}
