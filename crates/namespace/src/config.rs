//! Adapter configuration.
//!
//! These are plain serde records; reading them from files or the environment is
//! the composition root's job. Every section has defaults, so an empty document
//! yields a usable configuration pointing at `localhost:19998`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

pub const DEFAULT_MASTER_HOST: &str = "localhost";
pub const DEFAULT_MASTER_PORT: u16 = 19998;

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// Host and RPC port of the namespace master.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MasterEndpoint {
    pub host: String,
    pub port: u16,
}

impl Default for MasterEndpoint {
    fn default() -> Self {
        Self {
            host: DEFAULT_MASTER_HOST.to_string(),
            port: DEFAULT_MASTER_PORT,
        }
    }
}

impl MasterEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parses the operator URI form `scheme://host:port` (scheme optional).
    ///
    /// The scheme is informational only. Host and port are mandatory.
    pub fn parse(address: &str) -> Result<Self, ConfigError> {
        let authority = match address.split_once("://") {
            Some((_, rest)) => rest,
            None => address,
        };
        let authority = authority.trim_end_matches('/');
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| ConfigError::invalid("master", format!("'{address}' has no port")))?;
        if host.is_empty() {
            return Err(ConfigError::invalid(
                "master",
                format!("'{address}' has no host"),
            ));
        }
        let port = port.parse::<u16>().map_err(|e| {
            ConfigError::invalid("master", format!("'{address}' has an invalid port: {e}"))
        })?;
        Ok(Self::new(host, port))
    }

    /// `host:port`, as used for address resolution and logging.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl std::fmt::Display for MasterEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

// ---------------------------------------------------------------------------
// Security
// ---------------------------------------------------------------------------

/// Authentication mode announced to the master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthType {
    /// No authentication; compatible with masters in any security configuration.
    #[default]
    Nosasl,
    /// Plain login name, unverified.
    Simple,
    /// Login name verified by a master-side plug-in.
    Custom,
}

impl AuthType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nosasl => "NOSASL",
            Self::Simple => "SIMPLE",
            Self::Custom => "CUSTOM",
        }
    }

    /// Returns `true` when the mode sends a login name.
    pub fn sends_user(self) -> bool {
        !matches!(self, Self::Nosasl)
    }
}

impl std::fmt::Display for AuthType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuthType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NOSASL" => Ok(Self::Nosasl),
            "SIMPLE" => Ok(Self::Simple),
            "CUSTOM" => Ok(Self::Custom),
            other => Err(ConfigError::invalid(
                "security.authentication",
                format!("unknown mode '{other}'"),
            )),
        }
    }
}

/// Client-side security settings.
///
/// Mutual authentication and permission checks are off by default so the
/// benchmark client works against masters in varied security configurations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityConfig {
    pub authentication: AuthType,
    pub authorization_permission_enabled: bool,
    /// Login name for [`AuthType::Simple`] and [`AuthType::Custom`].
    pub user: Option<String>,
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// Timeout and retry behaviour of the master client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub request_timeout_ms: u64,
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles on every further attempt.
    pub initial_backoff_ms: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 30_000,
            max_attempts: 3,
            initial_backoff_ms: 100,
        }
    }
}

impl TransportConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Back-off to wait before attempt number `attempt` (1-based).
    pub fn backoff_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        let factor = 1u64 << (attempt - 2).min(16);
        Duration::from_millis(self.initial_backoff_ms.saturating_mul(factor))
    }
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Complete configuration of one adapter instance.
///
/// The default working directory is deliberately absent: it is the fixed
/// [`crate::DEFAULT_DIRECTORY`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    pub master: MasterEndpoint,
    pub security: SecurityConfig,
    pub transport: TransportConfig,
    /// Sizing hint for the client runtime's worker threads.
    pub client_threads: usize,
    /// Run the connectivity self-check when a session opens.
    pub self_check: bool,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            master: MasterEndpoint::default(),
            security: SecurityConfig::default(),
            transport: TransportConfig::default(),
            client_threads: 4,
            self_check: false,
        }
    }
}

impl AdapterConfig {
    /// Checks every field that would make a session unusable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.master.host.trim().is_empty() {
            return Err(ConfigError::invalid("master.host", "must not be empty"));
        }
        if self.master.port == 0 {
            return Err(ConfigError::invalid("master.port", "must not be zero"));
        }
        if self.client_threads == 0 {
            return Err(ConfigError::invalid("client_threads", "must be at least 1"));
        }
        if self.transport.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "transport.max_attempts",
                "must be at least 1",
            ));
        }
        if self.security.authentication.sends_user() && self.security.user.is_none() {
            return Err(ConfigError::invalid(
                "security.user",
                format!(
                    "is required with {} authentication",
                    self.security.authentication
                ),
            ));
        }
        Ok(())
    }
}
