// src/server/handlers/scripts.rs
//! Script resolution endpoint

use super::{ApiError, SharedState, with_connection};
use crate::db::models::WILDCARD;
use crate::error::Error;
use crate::query::{QueryParams, parse_supports};
use crate::resolver::{self, ResolveRequest};
use crate::wire::{ScriptPayload, ScriptsResponse};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use std::collections::HashMap;

/// Turn the query string into a resolver request
fn resolve_request(app_name: String, params: &QueryParams) -> Result<ResolveRequest, Error> {
    let action = params
        .get("actions")
        .ok_or_else(|| Error::ValidationError("The actions parameter is required.".to_string()))?;

    let host = params
        .get("supports")
        .and_then(|value| parse_supports(value).into_iter().next())
        .ok_or_else(|| {
            Error::ValidationError("The supports parameter must name a distro.".to_string())
        })?;

    let script_id = params
        .get("id")
        .map(|id| {
            id.parse::<i64>()
                .map_err(|_| Error::ValidationError(format!("Invalid script id: {}", id)))
        })
        .transpose()?;

    Ok(ResolveRequest {
        app_name,
        distro: host.distro,
        architecture: host
            .architectures
            .into_iter()
            .next()
            .unwrap_or_else(|| WILDCARD.to_string()),
        action: action.to_string(),
        target_version: params.get("version").map(str::to_string),
        script_id,
    })
}

/// GET /api/apps/:name/scripts
///
/// Returns every applicable script, most specific first, with `content`
/// already assembled for the requested (or current) version.
pub async fn list_scripts(
    State(state): State<SharedState>,
    Path(name): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<Json<ScriptsResponse>, ApiError> {
    let request = resolve_request(name, &QueryParams::from(params))?;

    let scripts = with_connection(&state, move |conn, ctx| {
        let resolution = resolver::resolve(conn, &ctx.registry, &request, None)?;
        resolution
            .scripts
            .iter()
            .map(|ranked| {
                let content = resolution.render(&ctx.state.store, ranked)?;
                Ok(ScriptPayload::from_ranked(ranked, content))
            })
            .collect::<crate::Result<Vec<_>>>()
    })
    .await?;

    Ok(Json(ScriptsResponse { scripts }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_request_from_params() {
        let params = QueryParams::from_pairs(&[
            ("actions", "install"),
            ("supports", "ubuntu:x86_64"),
            ("version", "1.2"),
            ("id", "7"),
        ]);
        let request = resolve_request("foo".to_string(), &params).unwrap();
        assert_eq!(request.app_name, "foo");
        assert_eq!(request.distro, "ubuntu");
        assert_eq!(request.architecture, "x86_64");
        assert_eq!(request.action, "install");
        assert_eq!(request.target_version.as_deref(), Some("1.2"));
        assert_eq!(request.script_id, Some(7));
    }

    #[test]
    fn test_resolve_request_defaults_and_errors() {
        let params = QueryParams::from_pairs(&[("actions", "install"), ("supports", "debian")]);
        let request = resolve_request("foo".to_string(), &params).unwrap();
        assert_eq!(request.architecture, "*");
        assert_eq!(request.script_id, None);

        let missing_action = QueryParams::from_pairs(&[("supports", "debian")]);
        assert!(matches!(
            resolve_request("foo".to_string(), &missing_action),
            Err(Error::ValidationError(_))
        ));

        let bad_id =
            QueryParams::from_pairs(&[("actions", "install"), ("supports", "debian"), ("id", "x")]);
        assert!(matches!(
            resolve_request("foo".to_string(), &bad_id),
            Err(Error::ValidationError(_))
        ));
    }
}
