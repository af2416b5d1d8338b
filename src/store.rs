// src/store.rs

//! Script store
//!
//! Bodies are opaque text files named `script-<10 random digits>` under the
//! upload directory; everything else about a script lives in SQLite. Each
//! write runs in one transaction and bumps the parent app's `last_modified`
//! with the same timestamp as the script.

use crate::db::{self, models::{App, Script, SupportPair}, paths};
use crate::error::{Error, Result};
use crate::registry::DistroRegistry;
use rand::Rng;
use rusqlite::Connection;
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Attempts at finding an unused body file name before giving up
pub const MAX_NAME_ATTEMPTS: usize = 16;

/// Everything about a script except its body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptMetadata {
    pub shell: String,
    pub actions: Vec<String>,
    /// `(distro, architecture)` pairs; either may be `*`
    pub supported_distros: Vec<(String, String)>,
    pub version: Option<String>,
    pub description: String,
    pub maintainer_ids: Vec<i64>,
    pub use_default_action_dispatcher: bool,
}

/// Body files on disk plus metadata rows
#[derive(Debug, Clone)]
pub struct ScriptStore {
    upload_dir: PathBuf,
}

impl ScriptStore {
    pub fn new(upload_dir: impl Into<PathBuf>) -> Self {
        Self {
            upload_dir: upload_dir.into(),
        }
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Store a new script for `app_id` and return its ID
    pub fn create(
        &self,
        conn: &mut Connection,
        registry: &DistroRegistry,
        app_id: i64,
        submitter_id: i64,
        body: &str,
        metadata: &ScriptMetadata,
    ) -> Result<i64> {
        let metadata = canonical_metadata(registry, metadata)?;
        let path = self.write_body(body)?;
        let filepath = path.to_string_lossy().to_string();

        let result = db::transaction(conn, |tx| {
            let now = db::now();
            let mut script = Script::new(app_id, filepath.clone(), metadata.shell.clone(), submitter_id);
            script.version = metadata.version.clone();
            script.description = metadata.description.clone();
            script.use_default_action_dispatcher = metadata.use_default_action_dispatcher;
            let script_id = script.insert(tx, &now)?;

            write_children(tx, script_id, &metadata)?;
            App::touch(tx, app_id, &now)?;
            Ok(script_id)
        });

        match result {
            Ok(script_id) => {
                info!("Stored script {} for app {} at {}", script_id, app_id, filepath);
                Ok(script_id)
            }
            Err(e) => {
                self.remove_body(&path);
                Err(e)
            }
        }
    }

    /// Replace a script's body and metadata
    ///
    /// The new body is written to a fresh file and swapped in with the
    /// metadata; the old file is unlinked only after the commit.
    pub fn edit(
        &self,
        conn: &mut Connection,
        registry: &DistroRegistry,
        script_id: i64,
        body: &str,
        metadata: &ScriptMetadata,
    ) -> Result<()> {
        let metadata = canonical_metadata(registry, metadata)?;
        let mut script = Script::find_by_id(conn, script_id)?
            .ok_or_else(|| Error::NotFoundError(format!("script {}", script_id)))?;
        let old_path = PathBuf::from(&script.filepath);

        let new_path = self.write_body(body)?;
        script.filepath = new_path.to_string_lossy().to_string();
        script.shell = metadata.shell.clone();
        script.version = metadata.version.clone();
        script.description = metadata.description.clone();
        script.use_default_action_dispatcher = metadata.use_default_action_dispatcher;

        let result = db::transaction(conn, |tx| {
            let now = db::now();
            script.update(tx, &now)?;
            SupportPair::delete_for_script(tx, script_id)?;
            write_children(tx, script_id, &metadata)?;
            App::touch(tx, script.app_id, &now)?;
            Ok(())
        });

        match result {
            Ok(()) => {
                self.remove_body(&old_path);
                info!("Edited script {}", script_id);
                Ok(())
            }
            Err(e) => {
                self.remove_body(&new_path);
                Err(e)
            }
        }
    }

    /// Delete a script: unlink its body, then remove its rows
    pub fn delete(&self, conn: &mut Connection, script_id: i64) -> Result<()> {
        let script = Script::find_by_id(conn, script_id)?
            .ok_or_else(|| Error::NotFoundError(format!("script {}", script_id)))?;

        self.remove_body(Path::new(&script.filepath));

        db::transaction(conn, |tx| {
            Script::delete(tx, script_id)?;
            App::touch(tx, script.app_id, &db::now())?;
            Ok(())
        })?;

        info!("Deleted script {} of app {}", script_id, script.app_id);
        Ok(())
    }

    /// Read the raw body of a script
    pub fn read_body(&self, conn: &Connection, script_id: i64) -> Result<String> {
        let script = Script::find_by_id(conn, script_id)?
            .ok_or_else(|| Error::NotFoundError(format!("script {}", script_id)))?;
        self.read_body_of(&script)
    }

    /// Read the body of an already loaded script
    pub fn read_body_of(&self, script: &Script) -> Result<String> {
        fs::read_to_string(&script.filepath).map_err(|e| {
            Error::StoreError(format!("Failed to read body {}: {}", script.filepath, e))
        })
    }

    /// Write a body to a new, unused file and return its path
    pub fn write_body(&self, body: &str) -> Result<PathBuf> {
        let mut rng = rand::thread_rng();
        self.write_body_with(body, || format!("{:010}", rng.gen_range(0..10_000_000_000u64)))
    }

    fn write_body_with(&self, body: &str, mut next_id: impl FnMut() -> String) -> Result<PathBuf> {
        fs::create_dir_all(&self.upload_dir).map_err(|e| {
            Error::StoreError(format!(
                "Failed to create upload directory {}: {}",
                self.upload_dir.display(),
                e
            ))
        })?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let path = paths::body_path(&self.upload_dir, &next_id());
            let mut file = match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(file) => file,
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("Body file {} exists, retrying", path.display());
                    continue;
                }
                Err(e) => {
                    return Err(Error::StoreError(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    )));
                }
            };

            if let Err(e) = file.write_all(body.as_bytes()).and_then(|_| file.sync_all()) {
                self.remove_body(&path);
                return Err(Error::StoreError(format!(
                    "Failed to write {}: {}",
                    path.display(),
                    e
                )));
            }
            return Ok(path);
        }

        Err(Error::StoreError(format!(
            "No free body file name after {} attempts",
            MAX_NAME_ATTEMPTS
        )))
    }

    /// Unlink a body file; a missing file is tolerated
    pub fn remove_body(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => debug!("Removed body {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove body {}: {}", path.display(), e),
        }
    }
}

/// Rewrite architecture aliases and enforce the non-empty invariants
fn canonical_metadata(registry: &DistroRegistry, metadata: &ScriptMetadata) -> Result<ScriptMetadata> {
    if metadata.actions.is_empty() {
        return Err(Error::ValidationError("A script needs at least one action.".to_string()));
    }
    if metadata.supported_distros.is_empty() {
        return Err(Error::ValidationError(
            "A script needs at least one supported distro.".to_string(),
        ));
    }
    if metadata.maintainer_ids.is_empty() {
        return Err(Error::ValidationError(
            "A script needs at least one maintainer.".to_string(),
        ));
    }

    let mut canonical = metadata.clone();
    canonical.supported_distros = metadata
        .supported_distros
        .iter()
        .map(|(distro, arch)| (distro.clone(), registry.canonicalize(arch)))
        .collect();
    canonical.supported_distros.sort();
    canonical.supported_distros.dedup();
    Ok(canonical)
}

fn write_children(conn: &Connection, script_id: i64, metadata: &ScriptMetadata) -> Result<()> {
    Script::set_actions(conn, script_id, &metadata.actions)?;
    Script::set_maintainers(conn, script_id, &metadata.maintainer_ids)?;
    for (distro, arch) in &metadata.supported_distros {
        SupportPair::new(script_id, distro.clone(), arch.clone()).insert(conn)?;
    }
    Ok(())
}
