// src/client/state.rs

//! Record of what the client has installed
//!
//! Stored as `{"installed_apps": {<app>: {"version": ..., "script_id": ...}}}`.
//! A missing file is created empty. A corrupt file is logged and treated as
//! empty, and is replaced on the next save.

use super::{ClientError, ClientResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstalledApp {
    pub version: Option<String>,
    pub script_id: i64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateFile {
    #[serde(default)]
    installed_apps: BTreeMap<String, InstalledApp>,
}

#[derive(Debug)]
pub struct ClientState {
    path: PathBuf,
    file: StateFile,
}

impl ClientState {
    /// Load the state file at `path`, creating it if absent
    pub fn load(path: &Path) -> ClientResult<Self> {
        if !path.exists() {
            let state = Self {
                path: path.to_path_buf(),
                file: StateFile::default(),
            };
            state.save()?;
            return Ok(state);
        }

        let content = std::fs::read(path)?;
        let file = match serde_json::from_slice::<StateFile>(&content) {
            Ok(file) => file,
            Err(e) => {
                let err = ClientError::StateCorrupt {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                };
                warn!("{}; starting from an empty state", err);
                StateFile::default()
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, app_name: &str) -> Option<&InstalledApp> {
        self.file.installed_apps.get(app_name)
    }

    pub fn contains(&self, app_name: &str) -> bool {
        self.file.installed_apps.contains_key(app_name)
    }

    pub fn installed_apps(&self) -> &BTreeMap<String, InstalledApp> {
        &self.file.installed_apps
    }

    pub fn insert(&mut self, app_name: &str, installed: InstalledApp) {
        self.file
            .installed_apps
            .insert(app_name.to_string(), installed);
    }

    pub fn remove(&mut self, app_name: &str) -> Option<InstalledApp> {
        self.file.installed_apps.remove(app_name)
    }

    /// Write the whole file via a temporary file and rename
    pub fn save(&self) -> ClientResult<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir)?;

        let json = serde_json::to_string_pretty(&self.file)
            .map_err(|e| ClientError::Io(std::io::Error::other(e)))?;
        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.write_all(b"\n")?;
        tmp.persist(&self.path).map_err(|e| ClientError::Io(e.error))?;

        info!("Saved client state to {}", self.path.display());
        Ok(())
    }
}
