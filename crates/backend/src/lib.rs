//! pinmap backend: GraphQL document store and write-once blob storage
//! served over axum, persisted in redb.

pub mod config;
mod graphql;
mod storage;

use std::sync::Arc;

use async_graphql_axum::{GraphQLRequest, GraphQLResponse};
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::{routing::get, Router};
use pinmap_shared::keys;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use graphql::Schema;
use storage::PutOutcome;

pub use config::Config;
pub use storage::Storage;

/// Blobs are write-once, so clients may cache them forever.
const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";
const BLOB_CONTENT_TYPE: &str = "image/jpeg";

#[derive(Clone)]
struct AppState {
    schema: Schema,
    storage: Arc<Storage>,
}

async fn graphql_handler(State(state): State<AppState>, req: GraphQLRequest) -> GraphQLResponse {
    state.schema.execute(req.into_inner()).await.into()
}

async fn graphiql() -> Html<String> {
    Html(
        async_graphql::http::GraphiQLSource::build()
            .endpoint("/graphql")
            .finish(),
    )
}

async fn put_blob(
    State(state): State<AppState>,
    Path(key): Path<String>,
    body: Bytes,
) -> StatusCode {
    if !keys::is_valid_segment(&key) {
        return StatusCode::BAD_REQUEST;
    }
    match state.storage.put_blob(&key, &body) {
        Ok(PutOutcome::Created) => {
            tracing::info!(key = %key, size = body.len(), "Blob stored");
            StatusCode::CREATED
        }
        Ok(PutOutcome::AlreadyExists) => {
            tracing::warn!(key = %key, "Rejected overwrite of existing blob");
            StatusCode::CONFLICT
        }
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to store blob");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Serves GET and, through axum's method fallback, HEAD.
async fn get_blob(State(state): State<AppState>, Path(key): Path<String>) -> Response {
    match state.storage.get_blob(&key) {
        Ok(Some(bytes)) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static(BLOB_CONTENT_TYPE))],
            bytes,
        )
            .into_response(),
        Ok(None) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(key = %key, error = %e, "Failed to read blob");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Only successful reads are cacheable; a missing blob may still be uploaded.
fn immutable_if_found(resp: &Response) -> Option<HeaderValue> {
    resp.status()
        .is_success()
        .then(|| HeaderValue::from_static(CACHE_IMMUTABLE))
}

/// Build the full application router.
pub fn build_app(storage: Arc<Storage>, max_blob_bytes: usize) -> Router {
    let state = AppState {
        schema: graphql::build_schema(storage.clone()),
        storage,
    };

    let cache = SetResponseHeaderLayer::overriding(header::CACHE_CONTROL, immutable_if_found);

    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route(
            "/blobs/{key}",
            get(get_blob)
                .layer(cache)
                .put(put_blob)
                .layer(DefaultBodyLimit::max(max_blob_bytes)),
        )
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn test_app() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let storage = Storage::open(&dir.path().join("test.redb")).unwrap();
        (dir, build_app(storage, 1024))
    }

    fn put(uri: &str, body: &'static [u8]) -> Request<Body> {
        Request::builder()
            .method("PUT")
            .uri(uri)
            .body(Body::from(body))
            .unwrap()
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_put_then_get_blob() {
        let (_dir, app) = test_app();

        let resp = app
            .clone()
            .oneshot(put("/blobs/image_1.jpg", b"jpeg-bytes"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = app
            .oneshot(request("GET", "/blobs/image_1.jpg"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers().get("content-type").unwrap(), "image/jpeg");
        assert_eq!(
            resp.headers().get("cache-control").unwrap(),
            "public, max-age=31536000, immutable"
        );
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"jpeg-bytes");
    }

    #[tokio::test]
    async fn test_missing_blob_returns_404() {
        let (_dir, app) = test_app();
        let resp = app
            .clone()
            .oneshot(request("GET", "/blobs/image_404.jpg"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert!(resp.headers().get("cache-control").is_none());

        let resp = app
            .oneshot(request("HEAD", "/blobs/image_404.jpg"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_head_existing_blob() {
        let (_dir, app) = test_app();
        app.clone()
            .oneshot(put("/blobs/image_2.jpg", b"x"))
            .await
            .unwrap();
        let resp = app
            .oneshot(request("HEAD", "/blobs/image_2.jpg"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_blob_overwrite_conflicts() {
        let (_dir, app) = test_app();
        let first = app
            .clone()
            .oneshot(put("/blobs/image_3.jpg", b"a"))
            .await
            .unwrap();
        assert_eq!(first.status(), StatusCode::CREATED);
        assert!(first.headers().get("cache-control").is_none());
        let second = app
            .oneshot(put("/blobs/image_3.jpg", b"b"))
            .await
            .unwrap();
        assert_eq!(second.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_invalid_blob_key_rejected() {
        let (_dir, app) = test_app();
        let resp = app
            .oneshot(put("/blobs/bad%20key", b"a"))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_oversized_blob_rejected() {
        let (_dir, app) = test_app();
        static BIG: [u8; 2048] = [0u8; 2048];
        let resp = app
            .oneshot(put("/blobs/image_4.jpg", &BIG))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_graphql_endpoint_creates_document() {
        let (_dir, app) = test_app();
        let body = serde_json::json!({
            "query": r#"mutation { createDocument(namespace: "Map_Location", input: { title: "x", latitude: 1.0, longitude: 2.0 }) { id } }"#
        });
        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/graphql")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(json["data"]["createDocument"]["id"].is_string());
    }
}
