// src/server/config.rs
//! Configuration file parsing for the Installies server
//!
//! Supports TOML configuration files with the following sections:
//! - [server] - Bind address
//! - [storage] - Database path, script body directory, body size limit
//! - [query] - Listing page sizes

use crate::db::paths;
use crate::query::PageLimits;
use crate::server::ServerConfig;
use crate::validate::DEFAULT_MAX_CONTENT_LENGTH;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default location of the server configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/installies/server.toml";

/// TOML configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSection,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSection,

    /// Listing settings
    #[serde(default)]
    pub query: QuerySection,
}

/// Server configuration section
#[derive(Debug, Deserialize)]
pub struct ServerSection {
    /// Public API bind address
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

/// Storage configuration section
#[derive(Debug, Deserialize)]
pub struct StorageSection {
    /// SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Directory for script bodies
    #[serde(default = "default_upload_path")]
    pub upload_path: PathBuf,

    /// Largest accepted script body in bytes
    #[serde(default = "default_max_content_length")]
    pub max_content_length: usize,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            upload_path: default_upload_path(),
            max_content_length: default_max_content_length(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DB_PATH)
}

fn default_upload_path() -> PathBuf {
    PathBuf::from(paths::DEFAULT_UPLOAD_PATH)
}

fn default_max_content_length() -> usize {
    DEFAULT_MAX_CONTENT_LENGTH
}

/// Listing configuration section
#[derive(Debug, Deserialize)]
pub struct QuerySection {
    #[serde(default = "default_per_page")]
    pub default_per_page: u32,

    #[serde(default = "default_max_per_page")]
    pub max_per_page: u32,
}

impl Default for QuerySection {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            max_per_page: default_max_per_page(),
        }
    }
}

fn default_per_page() -> u32 {
    PageLimits::default().default_per_page
}

fn default_max_per_page() -> u32 {
    PageLimits::default().max_per_page
}

impl ServerFileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: ServerFileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Load `path` if it exists, otherwise use defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.server
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server.bind address: {}", self.server.bind))?;

        if self.query.default_per_page == 0 || self.query.max_per_page == 0 {
            anyhow::bail!("query page sizes must be greater than zero");
        }
        if self.query.default_per_page > self.query.max_per_page {
            anyhow::bail!(
                "query.default_per_page ({}) must be <= query.max_per_page ({})",
                self.query.default_per_page,
                self.query.max_per_page
            );
        }
        if self.storage.max_content_length == 0 {
            anyhow::bail!("storage.max_content_length must be greater than zero");
        }

        Ok(())
    }

    /// Convert to the runtime server configuration
    pub fn to_server_config(&self) -> Result<ServerConfig> {
        let bind_addr = self
            .server
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid server.bind address: {}", self.server.bind))?;

        Ok(ServerConfig {
            bind_addr,
            db_path: self.storage.db_path.clone(),
            upload_path: paths::upload_dir(&self.storage.upload_path.to_string_lossy()),
            page_limits: PageLimits {
                default_per_page: self.query.default_per_page,
                max_per_page: self.query.max_per_page,
            },
            max_content_length: self.storage.max_content_length,
        })
    }
}
