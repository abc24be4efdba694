//! Admin endpoint for snapshots.
//!
//! `POST /__admin/recordings/snapshot` takes an optional JSON snapshot spec
//! and answers `{"mappings": [...]}`. Errors use the admin error envelope
//! `{"errors": [{"code": ..., "message": ...}]}`.

use crate::snapshot::{SnapshotError, Snapshotter};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

pub const SNAPSHOT_PATH: &str = "/__admin/recordings/snapshot";

#[derive(Debug, Serialize)]
pub struct SnapshotResponse {
    pub mappings: Vec<Value>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub errors: Vec<ErrorDetail>,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

/// Dispatch an admin request. Only the snapshot endpoint is served here.
pub fn route(
    method: &Method,
    path: &str,
    body: &[u8],
    snapshotter: &Snapshotter,
) -> Response<Full<Bytes>> {
    match (method, path.trim_end_matches('/')) {
        (&Method::POST, SNAPSHOT_PATH) => handle_snapshot(body, snapshotter),
        (_, SNAPSHOT_PATH) => error_response(
            StatusCode::METHOD_NOT_ALLOWED,
            "METHOD_NOT_ALLOWED",
            "Snapshots are taken with POST",
        ),
        _ => error_response(StatusCode::NOT_FOUND, "NOT_FOUND", "Not Found"),
    }
}

/// POST /__admin/recordings/snapshot - Synthesize stubs from recorded traffic
pub fn handle_snapshot(body: &[u8], snapshotter: &Snapshotter) -> Response<Full<Bytes>> {
    match snapshotter.snapshot_from_body(body) {
        Ok(mappings) => {
            info!("Snapshot returned {} mappings", mappings.len());
            json_response(StatusCode::OK, &SnapshotResponse { mappings })
        }
        Err(e) => snapshot_error(&e),
    }
}

fn snapshot_error(error: &SnapshotError) -> Response<Full<Bytes>> {
    let status = if error.is_client_error() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    warn!("Snapshot failed ({}): {}", status, error);
    error_response(status, error.code(), &error.to_string())
}

/// Create a JSON response
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    let json = serde_json::to_string_pretty(body).unwrap_or_else(|_| "{}".to_string());
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(json)))
        .unwrap_or_else(|_| Response::new(Full::new(Bytes::from("Internal Server Error"))))
}

/// Create an error response
pub fn error_response(status: StatusCode, code: &str, message: &str) -> Response<Full<Bytes>> {
    let error = ErrorResponse {
        errors: vec![ErrorDetail {
            code: code.to_string(),
            message: message.to_string(),
        }],
    };
    json_response(status, &error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recording::{InMemoryServeEventLog, LoggedRequest, LoggedResponse, ServeEvent};
    use crate::snapshot::{BodyFileStore, TransformerRegistry};
    use crate::stub::StubRegistry;
    use http_body_util::BodyExt;
    use serde_json::json;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn snapshotter(dir: &TempDir) -> (Snapshotter, Arc<StubRegistry>) {
        let log = Arc::new(InMemoryServeEventLog::new());
        log.append(ServeEvent::new(
            LoggedRequest::new("GET", "/api/users"),
            LoggedResponse::from_proxy(200)
                .with_header("Content-Type", "application/json")
                .with_body("[]"),
        ));
        let registry = Arc::new(StubRegistry::new());
        let snapshotter = Snapshotter::new(
            log,
            registry.clone(),
            TransformerRegistry::default(),
            dir.path(),
        );
        (snapshotter, registry)
    }

    async fn body_json(response: Response<Full<Bytes>>) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_snapshot_with_empty_body() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, registry) = snapshotter(&dir);

        let response = handle_snapshot(b"", &snapshotter);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("Content-Type").unwrap(),
            "application/json"
        );

        let body = body_json(response).await;
        let mappings = body["mappings"].as_array().unwrap();
        assert_eq!(mappings.len(), 1);
        assert_eq!(mappings[0]["request"]["url"], json!("/api/users"));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_transformer_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, registry) = snapshotter(&dir);

        let response = handle_snapshot(br#"{"transformers": ["nope"]}"#, &snapshotter);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], json!("UNKNOWN_TRANSFORMER"));
        assert!(body["errors"][0]["message"]
            .as_str()
            .unwrap()
            .contains("nope"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_malformed_spec_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, _) = snapshotter(&dir);

        let response = handle_snapshot(b"[1, 2", &snapshotter);
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], json!("INVALID_SPEC"));
    }

    #[tokio::test]
    async fn test_transformer_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, _) = snapshotter(&dir);

        // decorate without its script parameter
        let response = handle_snapshot(br#"{"transformers": ["decorate"]}"#, &snapshotter);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], json!("TRANSFORMER_FAILED"));
    }

    struct ReadOnlyFiles;

    impl BodyFileStore for ReadOnlyFiles {
        fn write(&self, _: &str, _: &[u8]) -> Result<(), std::io::Error> {
            Err(std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"))
        }
    }

    #[tokio::test]
    async fn test_body_extraction_failure_is_server_error() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, registry) = snapshotter(&dir);
        let snapshotter = snapshotter.with_body_file_store(Arc::new(ReadOnlyFiles));

        let response = route(
            &Method::POST,
            SNAPSHOT_PATH,
            br#"{"extractBodyCriteria": {"textSizeThreshold": 1}}"#,
            &snapshotter,
        );
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["errors"][0]["code"], json!("BODY_EXTRACTION_FAILED"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_route() {
        let dir = TempDir::new().unwrap();
        let (snapshotter, _) = snapshotter(&dir);

        let ok = route(&Method::POST, "/__admin/recordings/snapshot/", b"", &snapshotter);
        assert_eq!(ok.status(), StatusCode::OK);

        let wrong_method = route(&Method::GET, SNAPSHOT_PATH, b"", &snapshotter);
        assert_eq!(wrong_method.status(), StatusCode::METHOD_NOT_ALLOWED);

        let missing = route(&Method::POST, "/__admin/mappings", b"", &snapshotter);
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);
    }
}
