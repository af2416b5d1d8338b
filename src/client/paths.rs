// src/client/paths.rs

//! Where the client keeps its state file and rendered scripts

use super::{ClientError, ClientResult};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "installies";
const STATE_FILE: &str = "installed.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientPaths {
    config_dir: PathBuf,
    cache_dir: PathBuf,
}

impl ClientPaths {
    /// Use explicit roots; `installies/` is appended to each
    pub fn new(config_root: impl AsRef<Path>, cache_root: impl AsRef<Path>) -> Self {
        Self {
            config_dir: config_root.as_ref().join(APP_DIR),
            cache_dir: cache_root.as_ref().join(APP_DIR),
        }
    }

    /// The user's XDG config and cache directories
    pub fn from_dirs() -> ClientResult<Self> {
        let config_root = dirs::config_dir().ok_or_else(|| missing_dir("config"))?;
        let cache_root = dirs::cache_dir().ok_or_else(|| missing_dir("cache"))?;
        Ok(Self::new(config_root, cache_root))
    }

    /// `<config>/installies/installed.json`
    pub fn state_file(&self) -> PathBuf {
        self.config_dir.join(STATE_FILE)
    }

    /// `<cache>/installies/<app>/<app>.sh`
    pub fn script_file(&self, app_name: &str) -> PathBuf {
        self.cache_dir
            .join(app_name)
            .join(format!("{}.sh", app_name))
    }
}

fn missing_dir(kind: &str) -> ClientError {
    ClientError::Io(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("Could not determine the user {} directory", kind),
    ))
}
