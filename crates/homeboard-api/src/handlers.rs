//! REST API handlers.
//!
//! Each handler checks the board is ready, makes its store calls and
//! returns JSON. Store failures surface as 500 with the raw message, except
//! on `GET /background`, which always answers 200 with a well-formed body.

use axum::Json;
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use homeboard_store::{RecordList, Row, UploadedFile};
use serde::Serialize;
use tracing::{debug, warn};

use crate::ApiState;
use crate::error::ApiError;

/// Multipart field carrying the upload.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct BackgroundResponse {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub url: String,
}

#[derive(Debug, Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub store: &'static str,
}

// ── Background ─────────────────────────────────────────────────

/// GET /background
pub async fn get_background(State(state): State<ApiState>) -> Json<BackgroundResponse> {
    let result = match state.board() {
        Ok(board) => board.settings.try_get_background().await.map_err(ApiError::from),
        Err(e) => Err(e),
    };
    match result {
        Ok(url) => Json(BackgroundResponse {
            url: url.unwrap_or_default(),
            error: None,
        }),
        Err(e) => {
            warn!(error = %e, "background unavailable, serving empty address");
            Json(BackgroundResponse {
                url: String::new(),
                error: Some(e.to_string()),
            })
        }
    }
}

// ── Upload ─────────────────────────────────────────────────────

/// Pull the `file` part out of a multipart body.
///
/// A `file` field without a filename is not a file part. A file part with
/// an empty filename is what browsers send when nothing was picked.
async fn read_file_field(multipart: &mut Multipart) -> Result<UploadedFile, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        if filename.is_empty() {
            return Err(ApiError::BadRequest("No file selected".to_string()));
        }
        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = field.bytes().await?;
        return Ok(UploadedFile {
            filename,
            content_type,
            data,
        });
    }
    Err(ApiError::BadRequest("No file part".to_string()))
}

/// POST /upload
pub async fn upload(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let board = state.board()?;
    let mut multipart =
        multipart.map_err(|_| ApiError::BadRequest("No file part".to_string()))?;
    let file = read_file_field(&mut multipart).await?;
    debug!(filename = %file.filename, bytes = file.data.len(), "upload received");

    let url = board.uploads.publish(file).await?;
    Ok(Json(UploadResponse { success: true, url }))
}

// ── Lists ──────────────────────────────────────────────────────

async fn list_all(list: &RecordList) -> Result<Json<Vec<Row>>, ApiError> {
    Ok(Json(list.fetch_all().await?))
}

/// A `null` body clears the list, same as `[]`.
async fn replace(
    list: &RecordList,
    body: Result<Json<Option<Vec<Row>>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    let Json(items) = body.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    list.replace_all(items.unwrap_or_default()).await?;
    Ok(Json(SuccessResponse { success: true }))
}

/// GET /todos
pub async fn list_todos(State(state): State<ApiState>) -> Result<Json<Vec<Row>>, ApiError> {
    list_all(&state.board()?.todos).await
}

/// POST /todos
pub async fn replace_todos(
    State(state): State<ApiState>,
    body: Result<Json<Option<Vec<Row>>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    replace(&state.board()?.todos, body).await
}

/// GET /events
pub async fn list_events(State(state): State<ApiState>) -> Result<Json<Vec<Row>>, ApiError> {
    list_all(&state.board()?.events).await
}

/// POST /events
pub async fn replace_events(
    State(state): State<ApiState>,
    body: Result<Json<Option<Vec<Row>>>, JsonRejection>,
) -> Result<Json<SuccessResponse>, ApiError> {
    replace(&state.board()?.events, body).await
}

// ── Health ─────────────────────────────────────────────────────

/// GET /health
pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        store: if state.is_ready() { "ready" } else { "unavailable" },
    })
}

// ── Blobs ──────────────────────────────────────────────────────

/// GET /storage/{bucket}/{name}
///
/// Only the upload bucket is served. Downloads go out with the store's own
/// key, so any other bucket would leak objects the key can read.
pub async fn serve_blob(
    State(state): State<ApiState>,
    Path((bucket, name)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let board = state.board()?;
    if bucket != board.uploads.bucket() {
        debug!(%bucket, "refusing blob outside the upload bucket");
        return Err(ApiError::NotFound(format!("object not found: {bucket}/{name}")));
    }
    match board.store.download(&bucket, &name).await? {
        Some(blob) => Ok((
            StatusCode::OK,
            [(CONTENT_TYPE, blob.content_type)],
            blob.data,
        )
            .into_response()),
        None => Err(ApiError::NotFound(format!("object not found: {bucket}/{name}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use homeboard_core::BoardConfig;
    use axum::body::Bytes;
    use homeboard_store::{Blob, Board, HostedStore, LocalStore};
    use serde_json::{Value, json};

    fn local_state() -> ApiState {
        let store = LocalStore::open_in_memory("http://localhost:5000").unwrap();
        let board = Board::new(Arc::new(store), &BoardConfig::default());
        ApiState::new(Some(board))
    }

    /// A board whose store refuses every connection.
    fn unreachable_state() -> ApiState {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let store = HostedStore::new(&format!("http://{addr}"), "key");
        let board = Board::new(Arc::new(store), &BoardConfig::default());
        ApiState::new(Some(board))
    }

    fn uninitialized_state() -> ApiState {
        ApiState::new(None)
    }

    fn rows(value: Value) -> Vec<Row> {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn background_empty_store_is_empty_url() {
        let Json(body) = get_background(State(local_state())).await;
        assert_eq!(body.url, "");
        assert!(body.error.is_none());
    }

    #[tokio::test]
    async fn background_reports_set_value() {
        let state = local_state();
        state
            .board()
            .unwrap()
            .settings
            .set_background("http://localhost:5000/storage/backgrounds/a.png")
            .await
            .unwrap();

        let Json(body) = get_background(State(state)).await;
        assert_eq!(body.url, "http://localhost:5000/storage/backgrounds/a.png");
    }

    #[tokio::test]
    async fn background_store_failure_is_not_fatal() {
        let Json(body) = get_background(State(unreachable_state())).await;
        assert_eq!(body.url, "");
        assert!(body.error.is_some());
    }

    #[tokio::test]
    async fn background_uninitialized_carries_error() {
        let Json(body) = get_background(State(uninitialized_state())).await;
        assert_eq!(body.url, "");
        assert_eq!(body.error.as_deref(), Some("Database client not initialized"));
    }

    #[tokio::test]
    async fn todos_replace_then_list() {
        let state = local_state();
        let resp = replace_todos(State(state.clone()), Ok(Json(Some(rows(json!([{"text": "a"}]))))))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::OK);

        let Json(items) = list_todos(State(state)).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], json!("a"));
    }

    #[tokio::test]
    async fn null_body_clears_events() {
        let state = local_state();
        replace_events(State(state.clone()), Ok(Json(Some(rows(json!([{"name": "x"}]))))))
            .await
            .unwrap();
        replace_events(State(state.clone()), Ok(Json(None))).await.unwrap();

        let Json(items) = list_events(State(state)).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn lists_are_independent() {
        let state = local_state();
        replace_todos(State(state.clone()), Ok(Json(Some(rows(json!([{"text": "a"}]))))))
            .await
            .unwrap();

        let Json(events) = list_events(State(state)).await.unwrap();
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn store_failure_is_500_with_message() {
        let resp = list_todos(State(unreachable_state())).await.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let resp = replace_todos(State(unreachable_state()), Ok(Json(Some(Vec::new()))))
            .await
            .into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn uninitialized_lists_are_500() {
        let err = list_events(State(uninitialized_state())).await.unwrap_err();
        assert!(matches!(err, ApiError::NotInitialized));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn health_reports_store_readiness() {
        let Json(ready) = health(State(local_state())).await;
        assert_eq!(ready.store, "ready");
        let Json(down) = health(State(uninitialized_state())).await;
        assert_eq!(down.status, "ok");
        assert_eq!(down.store, "unavailable");
    }

    #[tokio::test]
    async fn missing_blob_is_404() {
        let resp = serve_blob(
            State(local_state()),
            Path(("backgrounds".to_string(), "nope.png".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn blob_outside_upload_bucket_is_404() {
        let state = local_state();
        let board = state.board().unwrap();
        board
            .store
            .upload(
                "private",
                "secret.txt",
                Blob {
                    data: Bytes::from_static(b"TOP SECRET"),
                    content_type: "text/plain".to_string(),
                },
            )
            .await
            .unwrap();

        let resp = serve_blob(
            State(state.clone()),
            Path(("private".to_string(), "secret.txt".to_string())),
        )
        .await
        .into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
