// src/server/routes.rs
//! Axum router configuration for the Installies server

use crate::server::ServerState;
use crate::server::handlers::{apps, scripts};
use axum::{Router, routing::get};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the main application router
pub fn create_router(state: Arc<RwLock<ServerState>>) -> Router {
    // The client is a CLI, but browsers may browse the listing too
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route("/api/apps", get(apps::list_apps))
        .route("/api/apps/:name/scripts", get(scripts::list_scripts))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::db::models::{App, User, Visibility};
    use crate::registry::{self, DistroRegistry};
    use crate::server::ServerConfig;
    use crate::store::{ScriptMetadata, ScriptStore};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    /// Public app `foo` with one ubuntu/amd64 install script, private app `secret`
    fn seeded_router() -> (TempDir, Router) {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("installies.db");
        let upload_path = dir.path().join("scripts");
        db::init(db_path.to_str().unwrap()).unwrap();
        let mut conn = db::open(db_path.to_str().unwrap()).unwrap();

        let user_id = User::new("alice".to_string()).insert(&conn).unwrap();
        registry::add_distro(&conn, "debian", None).unwrap();
        registry::add_distro(&conn, "ubuntu", Some("debian")).unwrap();
        registry::add_architecture(&conn, "amd64", &["x86_64".to_string()]).unwrap();

        let mut foo = App::new("foo".to_string(), "Foo tool".to_string(), user_id);
        foo.visibility = Visibility::Public;
        foo.current_version = Some("2.0".to_string());
        foo.version_regex = Some(r"^\d+\.\d+$".to_string());
        let foo_id = foo.insert(&conn).unwrap();
        App::new("secret".to_string(), "Hidden".to_string(), user_id)
            .insert(&conn)
            .unwrap();

        let registry = DistroRegistry::load(&conn).unwrap();
        let store = ScriptStore::new(&upload_path);
        let metadata = ScriptMetadata {
            shell: "bash".to_string(),
            actions: vec!["install".to_string()],
            supported_distros: vec![("ubuntu".to_string(), "x86_64".to_string())],
            maintainer_ids: vec![user_id],
            use_default_action_dispatcher: true,
            ..Default::default()
        };
        store
            .create(
                &mut conn,
                &registry,
                foo_id,
                user_id,
                "install() { echo <version>; }",
                &metadata,
            )
            .unwrap();

        let config = ServerConfig {
            db_path,
            upload_path,
            ..Default::default()
        };
        let state = Arc::new(RwLock::new(ServerState::new(config)));
        (dir, create_router(state))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = Arc::new(RwLock::new(ServerState::new(ServerConfig::default())));
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_apps_public_only() {
        let (_dir, app) = seeded_router();

        let (status, body) = get_json(app.clone(), "/api/apps").await;
        assert_eq!(status, StatusCode::OK);
        let apps = body["apps"].as_array().unwrap();
        assert_eq!(apps.len(), 1);
        assert_eq!(apps[0]["name"], "foo");
        assert_eq!(apps[0]["current_version"], "2.0");
        assert_eq!(apps[0]["submitter"], "alice");

        let (_, body) = get_json(app, "/api/apps?name=secret").await;
        assert!(body["apps"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_scripts_resolve_alias_and_version() {
        let (_dir, app) = seeded_router();

        let (status, body) = get_json(
            app.clone(),
            "/api/apps/foo/scripts?actions=install&supports=ubuntu:x86_64&version=1.2",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let scripts = body["scripts"].as_array().unwrap();
        assert_eq!(scripts.len(), 1);
        let script = &scripts[0];
        assert_eq!(script["shell"], "bash");
        assert_eq!(script["actions"], serde_json::json!(["install"]));
        assert_eq!(script["supported_distros"]["amd64"], serde_json::json!(["ubuntu"]));
        let content = script["content"].as_str().unwrap();
        assert!(content.starts_with("#!/bin/bash\n\n"));
        assert!(content.contains("echo 1.2;"));
        assert!(!content.contains("<version>"));

        // Without a version the app's current version is substituted
        let (_, body) =
            get_json(app, "/api/apps/foo/scripts?actions=install&supports=ubuntu:amd64").await;
        assert!(body["scripts"][0]["content"].as_str().unwrap().contains("echo 2.0;"));
    }

    #[tokio::test]
    async fn test_scripts_version_rejected() {
        let (_dir, app) = seeded_router();

        let (status, body) = get_json(
            app,
            "/api/apps/foo/scripts?actions=install&supports=ubuntu:amd64&version=abc",
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!({"error": "VersionDoesNotMatchRegex"}));
    }

    #[tokio::test]
    async fn test_scripts_filtering_and_errors() {
        let (_dir, app) = seeded_router();

        // Parent distro does not inherit from its child
        let (status, body) =
            get_json(app.clone(), "/api/apps/foo/scripts?actions=install&supports=debian:amd64")
                .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["scripts"].as_array().unwrap().is_empty());

        let (_, body) =
            get_json(app.clone(), "/api/apps/foo/scripts?actions=remove&supports=ubuntu:amd64")
                .await;
        assert!(body["scripts"].as_array().unwrap().is_empty());

        let (status, _) =
            get_json(app.clone(), "/api/apps/secret/scripts?actions=install&supports=ubuntu")
                .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = get_json(app, "/api/apps/foo/scripts?supports=ubuntu").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("actions"));
    }
}
