// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.

#![allow(dead_code)]

use installies::catalog::{AppInput, Catalog, ScriptInput};
use installies::client::{ClientError, ClientResult, ScriptQuery, ScriptSource};
use installies::db;
use installies::db::models::{App, User, Visibility};
use installies::query::{AppScope, Composer, PageLimits, QueryParams};
use installies::registry::{self, DistroRegistry};
use installies::resolver::{self, Resolution, ResolveRequest};
use installies::store::ScriptStore;
use installies::wire::{AppSummary, ScriptPayload};
use installies::Error;
use rusqlite::Connection;
use tempfile::TempDir;

/// A database with users, a distro family tree and two architectures.
///
/// Distros: debian <- ubuntu <- mint, and fedora on its own.
/// Architectures: amd64 (alias x86_64) and arm64 (alias aarch64).
/// Users: `admin` (admin) and `alice`.
pub struct Fixture {
    /// Keep alive to prevent cleanup
    pub dir: TempDir,
    pub db_path: String,
    pub store: ScriptStore,
    pub admin: User,
    pub alice: User,
}

pub fn setup() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir
        .path()
        .join("installies.db")
        .to_str()
        .unwrap()
        .to_string();

    db::init(&db_path).unwrap();
    let mut conn = db::open(&db_path).unwrap();

    let (admin, alice) = db::transaction(&mut conn, |tx| {
        let mut admin = User::new("admin".to_string());
        admin.admin = true;
        admin.insert(tx)?;
        let mut alice = User::new("alice".to_string());
        alice.insert(tx)?;

        registry::add_distro(tx, "debian", None)?;
        registry::add_distro(tx, "ubuntu", Some("debian"))?;
        registry::add_distro(tx, "mint", Some("ubuntu"))?;
        registry::add_distro(tx, "fedora", None)?;
        registry::add_architecture(tx, "amd64", &["x86_64".to_string()])?;
        registry::add_architecture(tx, "arm64", &["aarch64".to_string()])?;
        Ok((admin, alice))
    })
    .unwrap();

    let store = ScriptStore::new(dir.path().join("scripts"));
    Fixture {
        dir,
        db_path,
        store,
        admin,
        alice,
    }
}

impl Fixture {
    pub fn conn(&self) -> Connection {
        db::open(&self.db_path).unwrap()
    }

    pub fn registry(&self, conn: &Connection) -> DistroRegistry {
        DistroRegistry::load(conn).unwrap()
    }

    pub fn catalog(&self) -> Catalog<'_> {
        Catalog::new(&self.store)
    }

    /// Public app owned by alice
    pub fn add_app(
        &self,
        conn: &mut Connection,
        name: &str,
        current_version: Option<&str>,
        version_regex: Option<&str>,
    ) -> App {
        let input = AppInput {
            name: name.to_string(),
            description: format!("The {} tool", name),
            current_version: current_version.map(str::to_string),
            version_regex: version_regex.map(str::to_string),
            visibility: Visibility::Public,
            ..Default::default()
        };
        self.catalog()
            .create_app(conn, Some(&self.alice), &input)
            .unwrap()
    }

    /// Script by alice; `supports` uses the `distro[:arch...]` list format
    pub fn add_script(
        &self,
        conn: &mut Connection,
        app: &str,
        supports: &str,
        actions: &[&str],
        body: &str,
    ) -> i64 {
        let input = ScriptInput {
            content: body.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
            supported_distros: supports.to_string(),
            ..Default::default()
        };
        let registry = self.registry(conn);
        self.catalog()
            .create_script(conn, &registry, Some(&self.alice), app, &input)
            .unwrap()
    }

    pub fn resolve(
        &self,
        conn: &Connection,
        app: &str,
        distro: &str,
        architecture: &str,
        action: &str,
    ) -> installies::Result<Resolution> {
        let request = ResolveRequest {
            app_name: app.to_string(),
            distro: distro.to_string(),
            architecture: architecture.to_string(),
            action: action.to_string(),
            target_version: None,
            script_id: None,
        };
        resolver::resolve(conn, &self.registry(conn), &request, None)
    }
}

/// Script IDs of a resolution, in ranked order
pub fn ids(resolution: &Resolution) -> Vec<i64> {
    resolution
        .scripts
        .iter()
        .map(|ranked| ranked.script.id.unwrap())
        .collect()
}

/// In-process [`ScriptSource`] that answers like the HTTP server would
pub struct LocalSource<'a> {
    pub fixture: &'a Fixture,
}

impl ScriptSource for LocalSource<'_> {
    fn find_app(&self, name: &str) -> ClientResult<Option<AppSummary>> {
        let conn = self.fixture.conn();
        let registry = self.fixture.registry(&conn);
        let params = QueryParams::from_pairs(&[("name", name)]);
        let apps = Composer::new(&registry, PageLimits::default())
            .apps(&params, AppScope::Public)
            .fetch_apps(&conn)
            .map_err(|e| ClientError::Http(e.to_string()))?;
        Ok(apps.iter().map(AppSummary::from_app).find(|a| a.name == name))
    }

    fn scripts(&self, query: &ScriptQuery) -> ClientResult<Vec<ScriptPayload>> {
        let conn = self.fixture.conn();
        let registry = self.fixture.registry(&conn);
        let request = ResolveRequest {
            app_name: query.app_name.clone(),
            distro: query.distro.clone(),
            architecture: query.architecture.clone(),
            action: query.action.clone(),
            target_version: query.version.clone(),
            script_id: query.script_id,
        };

        let resolution = match resolver::resolve(&conn, &registry, &request, None) {
            Ok(resolution) => resolution,
            Err(Error::NotFoundError(_)) => {
                return Err(ClientError::NoMatchingApp(query.app_name.clone()));
            }
            Err(Error::VersionMismatch { version, .. }) => {
                return Err(ClientError::VersionRejected(version));
            }
            Err(e) => return Err(ClientError::Http(e.to_string())),
        };

        resolution
            .scripts
            .iter()
            .map(|ranked| {
                let content = resolution
                    .render(&self.fixture.store, ranked)
                    .map_err(|e| ClientError::Http(e.to_string()))?;
                Ok(ScriptPayload::from_ranked(ranked, content))
            })
            .collect()
    }
}
