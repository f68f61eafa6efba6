//! JSON bodies exchanged with the master and the mapping of failed responses
//! onto [`NamespaceError`].

use namespace::{NamespaceError, NamespacePath};
use reqwest::StatusCode;
use serde::Deserialize;

pub(crate) const ALREADY_EXISTS: &str = "ALREADY_EXISTS";
pub(crate) const NOT_FOUND: &str = "NOT_FOUND";
pub(crate) const PERMISSION_DENIED: &str = "PERMISSION_DENIED";
pub(crate) const UNAVAILABLE: &str = "UNAVAILABLE";

/// Error payload of a failed request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ErrorBody {
    pub status_code: String,
    #[serde(default)]
    pub message: String,
}

/// Payload of `GET /master/version`.
#[derive(Debug, Deserialize)]
pub(crate) struct VersionBody {
    pub version: String,
}

/// Maps a non-success response onto a [`NamespaceError`].
///
/// The `statusCode` of a well-formed error body wins; otherwise the HTTP status
/// decides. Path-specific variants need the path the call targeted; for calls
/// without one (block introspection) they degrade to `Rejected`.
pub(crate) fn error_from_response(
    status: StatusCode,
    body: &str,
    path: Option<&NamespacePath>,
) -> NamespaceError {
    let (code, message) = match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => (parsed.status_code, parsed.message),
        Err(_) => (code_for_status(status), fallback_message(status, body)),
    };

    match (code.as_str(), path) {
        (ALREADY_EXISTS, Some(path)) => NamespaceError::AlreadyExists { path: path.clone() },
        (NOT_FOUND, Some(path)) => NamespaceError::NotFound { path: path.clone() },
        (PERMISSION_DENIED, Some(path)) => NamespaceError::PermissionDenied {
            path: path.clone(),
            message,
        },
        (UNAVAILABLE, _) => NamespaceError::Unavailable { message },
        _ => NamespaceError::Rejected { code, message },
    }
}

fn code_for_status(status: StatusCode) -> String {
    match status {
        StatusCode::CONFLICT => ALREADY_EXISTS.to_string(),
        StatusCode::NOT_FOUND => NOT_FOUND.to_string(),
        StatusCode::FORBIDDEN => PERMISSION_DENIED.to_string(),
        s if s.is_server_error() => UNAVAILABLE.to_string(),
        s => format!("HTTP_{}", s.as_u16()),
    }
}

fn fallback_message(status: StatusCode, body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        status
            .canonical_reason()
            .unwrap_or("no response body")
            .to_string()
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use namespace::map_path;

    use super::*;

    #[test]
    fn status_code_in_body_takes_precedence() {
        let path = map_path("usertable", "user1");
        let err = error_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"statusCode":"ALREADY_EXISTS","message":"exists"}"#,
            Some(&path),
        );
        assert_eq!(err, NamespaceError::AlreadyExists { path });
    }

    #[test]
    fn http_status_decides_without_body() {
        let path = map_path("usertable", "user1");
        assert_eq!(
            error_from_response(StatusCode::NOT_FOUND, "", Some(&path)),
            NamespaceError::NotFound { path: path.clone() }
        );
        assert!(matches!(
            error_from_response(StatusCode::BAD_GATEWAY, "upstream down", Some(&path)),
            NamespaceError::Unavailable { message } if message == "upstream down"
        ));
        assert!(matches!(
            error_from_response(StatusCode::BAD_REQUEST, "", Some(&path)),
            NamespaceError::Rejected { code, .. } if code == "HTTP_400"
        ));
    }

    #[test]
    fn path_variants_degrade_without_a_path() {
        let err = error_from_response(
            StatusCode::NOT_FOUND,
            r#"{"statusCode":"NOT_FOUND","message":"no such resource"}"#,
            None,
        );
        assert_eq!(
            err,
            NamespaceError::Rejected {
                code: "NOT_FOUND".into(),
                message: "no such resource".into()
            }
        );
    }
}
