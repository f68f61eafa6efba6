//! One client's connection state: base URL, security headers, retry settings
//! and the shared `reqwest` pool.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use namespace::{
    ConnectionError, MasterEndpoint, NamespaceError, NamespacePath, RetryPolicy, SecurityConfig,
    TransportConfig,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, RequestBuilder, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::wire::{self, VersionBody};

pub(crate) const HEADER_AUTH_TYPE: &str = "x-authentication-type";
pub(crate) const HEADER_PERMISSION_ENABLED: &str = "x-authorization-permission-enabled";
pub(crate) const HEADER_LOGIN_USER: &str = "x-login-user";

/// Query parameter carrying the node path of a namespace call.
pub(crate) const PATH_PARAM: &str = "path";

/// Whether a request may be sent again after it possibly reached the master.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Idempotency {
    Idempotent,
    /// Repeating a request the master already applied changes its answer
    /// (a second `delete` reports `NOT_FOUND`).
    NonIdempotent,
}

/// Connection to one namespace master, shared by the typed clients.
///
/// Dropping or closing it never tears down the underlying connection pool; that
/// belongs to the factory.
#[derive(Debug)]
pub struct MasterConnection {
    http: Client,
    base_url: Url,
    endpoint: MasterEndpoint,
    headers: HeaderMap,
    transport: TransportConfig,
    closed: AtomicBool,
}

impl MasterConnection {
    /// Builds the connection without contacting the master.
    pub fn new(
        http: Client,
        endpoint: &MasterEndpoint,
        security: &SecurityConfig,
        transport: TransportConfig,
    ) -> Result<Self, ConnectionError> {
        let raw = format!("http://{}:{}/api/v1/", endpoint.host, endpoint.port);
        let base_url = Url::parse(&raw).map_err(|e| ConnectionError::InvalidAddress {
            address: endpoint.authority(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConnectionError::InvalidAddress {
                address: endpoint.authority(),
                reason: "not a hierarchical URL".into(),
            });
        }

        Ok(Self {
            http,
            base_url,
            endpoint: endpoint.clone(),
            headers: security_headers(endpoint, security)?,
            transport,
            closed: AtomicBool::new(false),
        })
    }

    pub fn endpoint(&self) -> &MasterEndpoint {
        &self.endpoint
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Checks that the master answers and returns its version string.
    pub async fn handshake(&self) -> Result<String, ConnectionError> {
        let url = self.master_url("version");
        let body = self
            .execute("handshake", None, Idempotency::Idempotent, || {
                self.http.get(url.clone())
            })
            .await
            .map_err(|e| match e {
                NamespaceError::Connection(inner) => inner,
                other => ConnectionError::Handshake {
                    address: self.endpoint.authority(),
                    message: other.to_string(),
                },
            })?;
        let version: VersionBody =
            serde_json::from_str(&body).map_err(|e| ConnectionError::Handshake {
                address: self.endpoint.authority(),
                message: format!("unexpected version payload: {e}"),
            })?;
        Ok(version.version)
    }

    /// Marks the connection closed. Returns `false` if it already was.
    pub(crate) fn close(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }

    // -----------------------------------------------------------------------
    // Request helpers
    // -----------------------------------------------------------------------

    /// `POST paths/{action}?path={path}` with `options` as body.
    pub(crate) async fn post_path<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        path: &NamespacePath,
        action: &str,
        idempotency: Idempotency,
        options: &B,
    ) -> Result<String, NamespaceError> {
        let url = self.path_url(path, action);
        self.execute(operation, Some(path), idempotency, || {
            self.http.post(url.clone()).json(options)
        })
        .await
    }

    /// `GET master/{resource}`, decoded as JSON.
    pub(crate) async fn get_master<R: DeserializeOwned>(
        &self,
        operation: &'static str,
        resource: &str,
    ) -> Result<R, NamespaceError> {
        let url = self.master_url(resource);
        let body = self
            .execute(operation, None, Idempotency::Idempotent, || {
                self.http.get(url.clone())
            })
            .await?;
        decode(&body)
    }

    /// The node path travels as a query parameter: URL path segments would
    /// have `.` and `..` resolved away before the request is sent.
    pub(crate) fn path_url(&self, path: &NamespacePath, action: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("paths").push(action);
        }
        url.query_pairs_mut().append_pair(PATH_PARAM, path.as_str());
        url
    }

    pub(crate) fn master_url(&self, resource: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("master").push(resource);
        }
        url
    }

    /// Sends the request built by `request`, retrying while the failure is
    /// retryable and attempts remain. Returns the response body on success.
    async fn execute<F>(
        &self,
        operation: &'static str,
        path: Option<&NamespacePath>,
        idempotency: Idempotency,
        request: F,
    ) -> Result<String, NamespaceError>
    where
        F: Fn() -> RequestBuilder,
    {
        if self.is_closed() {
            return Err(ConnectionError::Closed.into());
        }

        let mut attempt = 1;
        loop {
            match self.attempt(path, request()).await {
                Err(error) if attempt < self.transport.max_attempts => {
                    let Some(delay) = self.retry_delay(idempotency, &error, attempt) else {
                        return Err(error);
                    };
                    debug!(
                        operation,
                        attempt,
                        %error,
                        delay_ms = delay.as_millis() as u64,
                        "retrying master call"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(error) => {
                    if error.retry_policy().is_retryable() {
                        warn!(operation, attempts = attempt, %error, "master call retries exhausted");
                    }
                    return Err(error);
                }
                Ok(body) => return Ok(body),
            }
        }
    }

    /// Delay before the next attempt, or `None` when `error` must be returned.
    ///
    /// A transport failure after the request was sent (timeout, reset) may
    /// hide a request the master applied, so non-idempotent calls only retry
    /// failures where the master certainly did not act: refused connections
    /// and explicit `UNAVAILABLE` answers.
    pub(crate) fn retry_delay(
        &self,
        idempotency: Idempotency,
        error: &NamespaceError,
        attempt: u32,
    ) -> Option<Duration> {
        if idempotency == Idempotency::NonIdempotent
            && matches!(
                error,
                NamespaceError::Connection(ConnectionError::Transport { .. })
            )
        {
            return None;
        }
        match error.retry_policy() {
            RetryPolicy::NonRetryable => None,
            RetryPolicy::Retryable { after: Some(after) } => Some(after),
            RetryPolicy::Retryable { after: None } => {
                Some(self.transport.backoff_before(attempt + 1))
            }
        }
    }

    async fn attempt(
        &self,
        path: Option<&NamespacePath>,
        request: RequestBuilder,
    ) -> Result<String, NamespaceError> {
        let response = request
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(&e))?;
        let status = response.status();
        let body = response.text().await.map_err(|e| self.transport_error(&e))?;
        if status.is_success() {
            Ok(body)
        } else {
            Err(wire::error_from_response(status, &body, path))
        }
    }

    fn transport_error(&self, error: &reqwest::Error) -> NamespaceError {
        let failure = if error.is_connect() {
            ConnectionError::Unreachable {
                address: self.endpoint.authority(),
                message: error.to_string(),
            }
        } else {
            ConnectionError::Transport {
                message: error.to_string(),
            }
        };
        failure.into()
    }
}

pub(crate) fn decode<R: DeserializeOwned>(body: &str) -> Result<R, NamespaceError> {
    serde_json::from_str(body).map_err(|e| NamespaceError::Serialization {
        message: e.to_string(),
    })
}

fn security_headers(
    endpoint: &MasterEndpoint,
    security: &SecurityConfig,
) -> Result<HeaderMap, ConnectionError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        HeaderName::from_static(HEADER_AUTH_TYPE),
        HeaderValue::from_static(security.authentication.as_str()),
    );
    headers.insert(
        HeaderName::from_static(HEADER_PERMISSION_ENABLED),
        HeaderValue::from_static(if security.authorization_permission_enabled {
            "true"
        } else {
            "false"
        }),
    );
    if security.authentication.sends_user() {
        if let Some(user) = &security.user {
            let value = HeaderValue::from_str(user).map_err(|e| ConnectionError::Handshake {
                address: endpoint.authority(),
                message: format!("login user is not a valid header value: {e}"),
            })?;
            headers.insert(HeaderName::from_static(HEADER_LOGIN_USER), value);
        }
    }
    Ok(headers)
}
