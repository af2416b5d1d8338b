// src/server/handlers/mod.rs
//! HTTP request handlers for the Installies server

pub mod apps;
pub mod scripts;

use crate::db;
use crate::error::Error;
use crate::registry::DistroRegistry;
use crate::server::ServerState;
use crate::wire::{ErrorResponse, VERSION_MISMATCH_ERROR};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use std::sync::Arc;
use tokio::sync::RwLock;

pub(crate) type SharedState = Arc<RwLock<ServerState>>;

/// A failed request, rendered as a JSON `{"error": ...}` body
#[derive(Debug)]
pub enum ApiError {
    /// A library error, mapped by kind
    App(Error),
    /// The blocking worker panicked or was cancelled
    Worker(String),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError::App(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::App(Error::NotFoundError(what)) => {
                (StatusCode::NOT_FOUND, format!("not found: {}", what))
            }
            // Version rejection is an answer, not a failure
            ApiError::App(Error::VersionMismatch { .. }) => {
                (StatusCode::OK, VERSION_MISMATCH_ERROR.to_string())
            }
            ApiError::App(Error::ValidationError(msg)) => (StatusCode::BAD_REQUEST, msg),
            ApiError::App(Error::ForbiddenError(msg)) => (StatusCode::FORBIDDEN, msg),
            ApiError::App(err) => {
                tracing::error!("Request failed: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            ApiError::Worker(msg) => {
                tracing::error!("Request worker failed: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse::new(message))).into_response()
    }
}

/// Everything a handler needs on its blocking thread
pub(crate) struct RequestContext {
    pub state: ServerState,
    pub registry: DistroRegistry,
}

/// Run `f` on a blocking thread with a fresh connection and registry
///
/// The connection lives for this request only and is dropped with the
/// closure.
pub(crate) async fn with_connection<T, F>(state: &SharedState, f: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut Connection, &RequestContext) -> crate::Result<T> + Send + 'static,
{
    let state = state.read().await.clone();
    let db_path = state.config.db_path.to_string_lossy().to_string();

    tokio::task::spawn_blocking(move || {
        let mut conn = db::open(&db_path)?;
        let registry = DistroRegistry::load(&conn)?;
        let ctx = RequestContext { state, registry };
        f(&mut conn, &ctx)
    })
    .await
    .map_err(|e| ApiError::Worker(e.to_string()))?
    .map_err(ApiError::from)
}
