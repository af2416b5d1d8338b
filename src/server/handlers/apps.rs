// src/server/handlers/apps.rs
//! App listing endpoint

use super::{ApiError, SharedState, with_connection};
use crate::query::{AppScope, Composer, QueryParams};
use crate::wire::{AppSummary, AppsResponse};
use axum::{
    Json,
    extract::{Query, State},
};
use std::collections::HashMap;

/// GET /api/apps
///
/// Public apps only. Query parameters go straight to the composer, so
/// `name`, `k`, `sort-by`, `page` and friends all work here.
pub async fn list_apps(
    State(state): State<SharedState>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<AppsResponse>, ApiError> {
    let params = QueryParams::from(params);

    let apps = with_connection(&state, move |conn, ctx| {
        Composer::new(&ctx.registry, ctx.state.config.page_limits)
            .apps(&params, AppScope::Public)
            .fetch_apps(conn)
    })
    .await?;

    Ok(Json(AppsResponse {
        apps: apps.iter().map(AppSummary::from_app).collect(),
    }))
}
