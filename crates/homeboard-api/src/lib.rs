//! homeboard-api — REST API for the dashboard.
//!
//! Provides axum route handlers over the store-backed [`Board`] services.
//! The board is an optional dependency: when the store was never
//! configured, every store-backed route answers with a uniform
//! "not initialized" error instead of the process refusing to start.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/background` | Current background address |
//! | POST | `/upload` | Upload an image (multipart field `file`) and make it the background |
//! | GET | `/todos` | List todos |
//! | POST | `/todos` | Replace all todos |
//! | GET | `/events` | List special events |
//! | POST | `/events` | Replace all special events |
//! | GET | `/health` | Liveness and store readiness |
//! | GET | `/storage/{bucket}/{name}` | Serve a stored blob |

pub mod error;
pub mod handlers;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use homeboard_core::config::ServerConfig;
use homeboard_store::Board;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    board: Option<Board>,
}

impl ApiState {
    pub fn new(board: Option<Board>) -> Self {
        Self { board }
    }

    /// The board, or [`ApiError::NotInitialized`] when no store is configured.
    pub fn board(&self) -> Result<&Board, ApiError> {
        self.board.as_ref().ok_or(ApiError::NotInitialized)
    }

    pub fn is_ready(&self) -> bool {
        self.board.is_some()
    }
}

/// Build the complete API router.
pub fn build_router(board: Option<Board>, server: &ServerConfig) -> Router {
    let state = ApiState::new(board);

    Router::new()
        .route("/background", get(handlers::get_background))
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(server.max_upload_bytes)),
        )
        .route("/todos", get(handlers::list_todos).post(handlers::replace_todos))
        .route("/events", get(handlers::list_events).post(handlers::replace_events))
        .route("/health", get(handlers::health))
        .route("/storage/{bucket}/{name}", get(handlers::serve_blob))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
