//! Mapping of Firestore and transport failures onto [`SourceError`].

use reqwest::StatusCode;
use serde::Deserialize;

use fleetwatch_core::ports::{Source, SourceError, SourceErrorKind};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ErrorPayload {
    Single(ErrorBody),
    /// `runQuery` streams its response and wraps errors in an array.
    Batch(Vec<ErrorBody>),
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorStatus,
}

#[derive(Debug, Deserialize)]
struct ErrorStatus {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
}

/// Failure class of a canonical gRPC status name.
pub(crate) fn classify(status: &str) -> SourceErrorKind {
    match status {
        "FAILED_PRECONDITION" => SourceErrorKind::PreconditionFailed,
        "UNAVAILABLE" | "DEADLINE_EXCEEDED" | "RESOURCE_EXHAUSTED" | "ABORTED" | "INTERNAL" => {
            SourceErrorKind::Transient
        }
        _ => SourceErrorKind::Unknown,
    }
}

fn classify_http(status: StatusCode) -> SourceErrorKind {
    match status {
        StatusCode::PRECONDITION_FAILED => SourceErrorKind::PreconditionFailed,
        StatusCode::TOO_MANY_REQUESTS
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => SourceErrorKind::Transient,
        _ => SourceErrorKind::Unknown,
    }
}

/// Status name reported in an error body, if the body is a Firestore error.
pub(crate) fn status_name(body: &str) -> Option<String> {
    parse(body).map(|status| status.status)
}

fn parse(body: &str) -> Option<ErrorStatus> {
    match serde_json::from_str::<ErrorPayload>(body).ok()? {
        ErrorPayload::Single(single) => Some(single.error),
        ErrorPayload::Batch(entries) => entries.into_iter().next().map(|entry| entry.error),
    }
}

/// Error for a non-success HTTP response.
pub(crate) fn from_response(collection: Source, http_status: StatusCode, body: &str) -> SourceError {
    match parse(body) {
        Some(status) if !status.status.is_empty() => {
            let message = if status.message.is_empty() {
                status.status.clone()
            } else {
                status.message
            };
            SourceError::new(collection, classify(&status.status), message)
        }
        _ => SourceError::new(collection, classify_http(http_status), format!("HTTP {http_status}")),
    }
}

/// Error for a request that never produced a usable response.
pub(crate) fn from_transport(collection: Source, err: &reqwest::Error) -> SourceError {
    let kind = if err.is_timeout() || err.is_connect() {
        SourceErrorKind::Transient
    } else {
        SourceErrorKind::Unknown
    };
    SourceError::new(collection, kind, err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_index_is_a_precondition_failure() {
        let body = r#"{"error": {"code": 400, "status": "FAILED_PRECONDITION",
            "message": "The query requires an index. You can create it here: https://console.firebase.google.com/..."}}"#;

        let err = from_response(Source::Checklists, StatusCode::BAD_REQUEST, body);

        assert_eq!(err.kind, SourceErrorKind::PreconditionFailed, "classified from the body");
        assert!(err.message.starts_with("The query requires an index"), "message kept: {err}");
    }

    #[test]
    fn streamed_errors_are_unwrapped() {
        let body = r#"[{"error": {"code": 503, "status": "UNAVAILABLE", "message": "try again"}}]"#;

        let err = from_response(Source::UsageLogs, StatusCode::SERVICE_UNAVAILABLE, body);

        assert_eq!(err.kind, SourceErrorKind::Transient, "array wrapper");
        assert_eq!(err.collection, Source::UsageLogs, "collection carried");
    }

    #[test]
    fn unknown_statuses_and_bodies_fall_back() {
        let denied = r#"{"error": {"status": "PERMISSION_DENIED", "message": "no"}}"#;

        assert_eq!(
            from_response(Source::Users, StatusCode::FORBIDDEN, denied).kind,
            SourceErrorKind::Unknown,
            "permission problems are not retried"
        );
        assert_eq!(
            from_response(Source::Users, StatusCode::GATEWAY_TIMEOUT, "<html>").kind,
            SourceErrorKind::Transient,
            "HTTP status used when the body is not json"
        );
    }

    #[test]
    fn conflict_status_is_readable() {
        let body = r#"{"error": {"code": 409, "status": "ALREADY_EXISTS", "message": "Document already exists"}}"#;

        assert_eq!(status_name(body).as_deref(), Some("ALREADY_EXISTS"), "status extracted");
        assert_eq!(status_name("not json"), None, "non-json body");
    }
}
