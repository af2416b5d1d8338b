// src/server/mod.rs
//! Installies HTTP server
//!
//! Serves the two endpoints the client uses:
//! - `GET /api/apps` lists public apps (filtered by the query composer)
//! - `GET /api/apps/:name/scripts` resolves and assembles scripts for a host
//!
//! Each request opens its own database connection on a blocking thread and
//! drops it when the response is built. The only shared state is the
//! immutable configuration and the script store location.

pub mod config;
mod handlers;
mod routes;

pub use config::ServerFileConfig;
pub use handlers::ApiError;
pub use routes::create_router;

use crate::db;
use crate::query::PageLimits;
use crate::store::ScriptStore;
use crate::validate::DEFAULT_MAX_CONTENT_LENGTH;
use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,
    /// Path to the SQLite database
    pub db_path: PathBuf,
    /// Directory holding script bodies
    pub upload_path: PathBuf,
    /// Page sizes for listings
    pub page_limits: PageLimits,
    /// Largest accepted script body, in bytes
    pub max_content_length: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            db_path: PathBuf::from(db::paths::DEFAULT_DB_PATH),
            upload_path: PathBuf::from(db::paths::DEFAULT_UPLOAD_PATH),
            page_limits: PageLimits::default(),
            max_content_length: DEFAULT_MAX_CONTENT_LENGTH,
        }
    }
}

/// Shared server state
#[derive(Debug, Clone)]
pub struct ServerState {
    pub config: ServerConfig,
    pub store: ScriptStore,
}

impl ServerState {
    pub fn new(config: ServerConfig) -> Self {
        let store = ScriptStore::new(config.upload_path.clone());
        Self { config, store }
    }
}

/// Start the Installies server
pub async fn run_server(config: ServerConfig) -> Result<()> {
    tracing::info!("Starting Installies server on {}", config.bind_addr);
    tracing::info!("Database: {:?}", config.db_path);
    tracing::info!("Script bodies: {:?}", config.upload_path);

    let db_path = config.db_path.to_string_lossy().to_string();
    db::init(&db_path).with_context(|| format!("Failed to initialize database {}", db_path))?;

    let state = Arc::new(RwLock::new(ServerState::new(config.clone())));
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    tracing::info!("Installies is ready to serve");

    axum::serve(listener, app).await?;
    Ok(())
}
