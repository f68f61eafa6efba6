//! Configuration layering for the `nsbench` binary.
//!
//! Precedence, lowest first: built-in defaults, the TOML file given with
//! `--config`, the `NSBENCH_MASTER` / `NSBENCH_AUTH` environment variables,
//! and finally the `--master` / `--auth` flags.

use std::path::Path;

use anyhow::{Context, Result};
use namespace::{AdapterConfig, AuthType, MasterEndpoint};
use tracing::debug;

pub const MASTER_ENV: &str = "NSBENCH_MASTER";
pub const AUTH_ENV: &str = "NSBENCH_AUTH";

/// Values given on the command line; they win over every other source.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub master: Option<String>,
    pub auth: Option<String>,
}

/// Builds the adapter configuration from every source.
///
/// `env` looks up environment variables; the binary passes
/// `|name| std::env::var(name).ok()`.
pub fn load(
    file: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
    overrides: &Overrides,
) -> Result<AdapterConfig> {
    let mut config = match file {
        Some(path) => read_file(path)?,
        None => AdapterConfig::default(),
    };

    if let Some(master) = env(MASTER_ENV) {
        config.master = MasterEndpoint::parse(&master)
            .with_context(|| format!("Invalid {MASTER_ENV}"))?;
    }
    if let Some(auth) = env(AUTH_ENV) {
        config.security.authentication = auth
            .parse::<AuthType>()
            .with_context(|| format!("Invalid {AUTH_ENV}"))?;
    }

    if let Some(master) = &overrides.master {
        config.master = MasterEndpoint::parse(master).context("Invalid --master")?;
    }
    if let Some(auth) = &overrides.auth {
        config.security.authentication = auth.parse::<AuthType>().context("Invalid --auth")?;
    }

    // Login-name modes fall back to the invoking OS user.
    if config.security.authentication.sends_user() && config.security.user.is_none() {
        config.security.user = env("USER");
    }

    config.validate().context("Invalid configuration")?;
    debug!(master = %config.master, authentication = %config.security.authentication, "configuration loaded");
    Ok(config)
}

fn read_file(path: &Path) -> Result<AdapterConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config file {}", path.display()))
}
