// src/client/mod.rs

//! Installies command-line client
//!
//! The client asks the server for the scripts that apply to this host,
//! lets the user pick and confirm one, runs it, and records what it
//! installed in a small JSON state file.
//!
//! Everything that touches the outside world sits behind a trait
//! ([`ScriptSource`], [`Prompter`], [`Runner`]) so the driver can be tested
//! without a server, a terminal or a shell.

pub mod api;
pub mod driver;
pub mod host;
pub mod paths;
pub mod prompt;
pub mod state;

pub use api::{HttpSource, ScriptQuery, ScriptSource};
pub use driver::{ActionClasses, ActionDriver, DriveRequest, Runner, ShellRunner};
pub use host::Host;
pub use paths::ClientPaths;
pub use prompt::{Prompter, StdinPrompter};
pub use state::{ClientState, InstalledApp};

use thiserror::Error;

/// Client-side failures; every one of them ends the run with a non-zero exit
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("No app named '{0}' was found")]
    NoMatchingApp(String),

    #[error("No script for {app} supports {distro}/{architecture} with action '{action}'")]
    NoMatchingScript {
        app: String,
        distro: String,
        architecture: String,
        action: String,
    },

    #[error("Script {0} is no longer available for this request")]
    ScriptGone(i64),

    #[error("Aborted")]
    UserAborted,

    #[error("Script failed: {0}")]
    SubprocessFailed(String),

    /// Recovered by treating the state as empty; only ever logged
    #[error("State file {path} is corrupt: {reason}")]
    StateCorrupt { path: String, reason: String },

    #[error("Version '{0}' is not accepted by this app")]
    VersionRejected(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Http(format!("Invalid response: {err}"))
    }
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
