// src/wire.rs

//! JSON payloads exchanged between the server and the client

use crate::db::models::{App, SupportPair};
use crate::resolver::RankedScript;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// `error` value sent when a requested version fails the app's regex
pub const VERSION_MISMATCH_ERROR: &str = "VersionDoesNotMatchRegex";

/// One app in `GET /api/apps`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppSummary {
    pub id: i64,
    pub name: String,
    pub display_name: Option<String>,
    pub description: String,
    pub current_version: Option<String>,
    pub creation_date: Option<String>,
    pub last_modified: Option<String>,
    pub submitter: Option<String>,
}

impl AppSummary {
    pub fn from_app(app: &App) -> Self {
        Self {
            id: app.id.unwrap_or_default(),
            name: app.name.clone(),
            display_name: app.display_name.clone(),
            description: app.description.clone(),
            current_version: app.current_version.clone(),
            creation_date: app.creation_date.clone(),
            last_modified: app.last_modified.clone(),
            submitter: app.submitter.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppsResponse {
    pub apps: Vec<AppSummary>,
}

/// One resolved script in `GET /api/apps/<name>/scripts`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptPayload {
    pub id: i64,
    pub actions: Vec<String>,
    pub shell: String,
    /// architecture -> distros
    pub supported_distros: BTreeMap<String, Vec<String>>,
    pub for_version: Option<String>,
    /// Assembled, ready-to-run content
    pub content: String,
    pub submitter: Option<String>,
    pub description: String,
    pub last_modified: Option<String>,
}

impl ScriptPayload {
    pub fn from_ranked(ranked: &RankedScript, content: String) -> Self {
        Self {
            id: ranked.script.id.unwrap_or_default(),
            actions: ranked.actions.clone(),
            shell: ranked.script.shell.clone(),
            supported_distros: SupportPair::by_architecture(&ranked.supported_distros),
            for_version: ranked.script.version.clone(),
            content,
            submitter: ranked.script.submitter.clone(),
            description: ranked.script.description.clone(),
            last_modified: ranked.script.last_modified.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptsResponse {
    pub scripts: Vec<ScriptPayload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Body of the scripts endpoint as the client sees it
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ScriptsReply {
    Scripts(ScriptsResponse),
    Error(ErrorResponse),
}
