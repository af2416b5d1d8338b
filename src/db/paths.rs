// src/db/paths.rs
//! Centralized path derivation for server-side Installies directories

use std::path::{Path, PathBuf};

/// Default location of the repository database
pub const DEFAULT_DB_PATH: &str = "/var/lib/installies/installies.db";

/// Default directory holding script bodies
pub const DEFAULT_UPLOAD_PATH: &str = "/var/lib/installies/scripts";

/// Get the upload directory, honouring `INSTALLIES_UPLOAD_PATH` when set
pub fn upload_dir(configured: &str) -> PathBuf {
    std::env::var("INSTALLIES_UPLOAD_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(configured))
}

/// Path of one body file inside the upload directory
pub fn body_path(upload_dir: &Path, file_id: &str) -> PathBuf {
    upload_dir.join(format!("script-{}", file_id))
}
