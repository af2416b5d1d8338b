// src/error.rs

//! Error types for the Installies library

use thiserror::Error;

/// Result type used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the repository core (store, resolver, catalog, server)
#[derive(Error, Debug)]
pub enum Error {
    /// App or script does not exist, or the caller may not read it
    #[error("not found: {0}")]
    NotFoundError(String),

    /// Caller lacks write permission
    #[error("forbidden: {0}")]
    ForbiddenError(String),

    /// Input rejected by a validator; the message is meant for the user
    #[error("{0}")]
    ValidationError(String),

    /// Supplied version does not satisfy the app's version regex
    #[error("version '{version}' does not match {regex}")]
    VersionMismatch { version: String, regex: String },

    /// Filesystem or database fault while persisting script bodies
    #[error("store error: {0}")]
    StoreError(String),

    #[error("database error: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("initialization error: {0}")]
    InitError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ParseError(err.to_string())
    }
}

impl From<regex::Error> for Error {
    fn from(err: regex::Error) -> Self {
        Error::ValidationError(format!("Invalid version regex: {err}"))
    }
}
