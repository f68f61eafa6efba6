//! nsbench entry point.
//!
//! This binary is the composition root for the workspace. Responsibilities:
//!
//! 1. **Parse configuration**: layer defaults, an optional TOML file, the
//!    environment and command-line flags into one
//!    [`namespace::AdapterConfig`] (see [`config`]).
//! 2. **Wire observability**: install a `tracing-subscriber` with an
//!    `EnvFilter` and a text or JSON formatter. Every span and event emitted by
//!    the workspace crates flows through it.
//! 3. **Construct infrastructure**: build one
//!    [`master_client::HttpClientFactory`] and one [`binding::ClientContext`]
//!    per process and hand clones to every adapter instance.
//! 4. **Dispatch the command**:
//!    - `check` opens a session with the self-check forced on and prints the
//!      connectivity report.
//!    - `run` drives the multi-threaded workload and prints per-verb tallies.
//!
//! Reports go to stdout as JSON; logs go to stderr.

mod config;
mod observability;
mod workload;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use binding::{ClientContext, Session};
use clap::{Args, Parser, Subcommand};
use master_client::HttpClientFactory;
use namespace::{AdapterConfig, ResultCode};
use tracing::{error, warn};

use crate::config::Overrides;
use crate::observability::LogFormat;
use crate::workload::WorkloadOptions;

#[derive(Debug, Parser)]
#[command(name = "nsbench", version, about = "Key/value benchmark binding for a namespace master")]
struct Cli {
    /// TOML configuration file.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Master address, e.g. `nsmaster://localhost:19998`.
    #[arg(long, global = true, value_name = "URI")]
    master: Option<String>,

    /// Authentication mode: nosasl, simple or custom.
    #[arg(long, global = true, value_name = "MODE")]
    auth: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Open a session, run the connectivity self-check and close again.
    Check,
    /// Drive insert/read/update/delete on several threads.
    Run(RunArgs),
}

#[derive(Debug, Args)]
struct RunArgs {
    /// Worker threads, each with its own session.
    #[arg(long, default_value_t = 4)]
    threads: usize,

    /// Records per thread.
    #[arg(long, default_value_t = 1000)]
    records: usize,

    /// Table name; keys map to `/<table>/<key>`.
    #[arg(long, default_value = DEFAULT_TABLE)]
    table: String,

    /// Also issue one scan per thread.
    #[arg(long)]
    scan: bool,
}

const DEFAULT_TABLE: &str = "usertable";

fn main() -> ExitCode {
    let cli = Cli::parse();
    observability::init(cli.log_format);

    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!("nsbench failed: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let overrides = Overrides {
        master: cli.master,
        auth: cli.auth,
    };
    let config = config::load(cli.config.as_deref(), |name| std::env::var(name).ok(), &overrides)?;

    let factory = HttpClientFactory::new(config.transport.clone())
        .context("Failed to build the master client factory")?;
    let context = ClientContext::new(Arc::new(factory), config.client_threads)
        .context("Failed to start the client runtime")?;

    match cli.command {
        Command::Check => check(config, context),
        Command::Run(args) => {
            let options = WorkloadOptions {
                threads: args.threads,
                records: args.records,
                table: args.table,
                scan: args.scan,
            };
            run_workload(&config, &context, &options)
        }
    }
}

fn check(mut config: AdapterConfig, context: ClientContext) -> Result<ExitCode> {
    config.self_check = true;
    let mut session = Session::open(&config, context).context("Failed to open a session")?;

    let report = session.connectivity().cloned().unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&report)?);

    let cleanup = session.close();
    for failure in cleanup.failures() {
        warn!(step = %failure.step, error = %failure.error, "cleanup step failed");
    }

    Ok(match report.result_code() {
        ResultCode::Ok => ExitCode::SUCCESS,
        _ => ExitCode::FAILURE,
    })
}

fn run_workload(
    config: &AdapterConfig,
    context: &ClientContext,
    options: &WorkloadOptions,
) -> Result<ExitCode> {
    let report = workload::run(config, context, options);
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if report.all_sessions_opened() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse_with_globals_after_subcommand() {
        let cli = Cli::parse_from([
            "nsbench",
            "run",
            "--threads",
            "8",
            "--scan",
            "--master",
            "nsmaster://m:1",
            "--log-format",
            "json",
        ]);
        assert_eq!(cli.master.as_deref(), Some("nsmaster://m:1"));
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.threads, 8);
                assert_eq!(args.records, 1000);
                assert_eq!(args.table, "usertable");
                assert!(args.scan);
            }
            Command::Check => panic!("expected run"),
        }
    }
}
