// src/client/api.rs

//! Talking to the Installies server

use super::{ClientError, ClientResult};
use crate::wire::{AppSummary, AppsResponse, ScriptPayload, ScriptsReply, VERSION_MISMATCH_ERROR};
use reqwest::blocking::Client;
use reqwest::{StatusCode, Url};
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable naming the server base URL
pub const SERVER_ENV: &str = "INSTALLIES_SERVER";

/// Server used when `INSTALLIES_SERVER` is unset
pub const DEFAULT_SERVER: &str = "http://localhost:8000";

/// Parameters of one scripts request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptQuery {
    pub app_name: String,
    pub action: String,
    pub distro: String,
    pub architecture: String,
    pub version: Option<String>,
    pub script_id: Option<i64>,
}

impl ScriptQuery {
    /// Query-string pairs in the order the server documents them
    pub fn to_params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("actions", self.action.clone()),
            ("supports", format!("{}:{}", self.distro, self.architecture)),
        ];
        if let Some(version) = &self.version {
            params.push(("version", version.clone()));
        }
        if let Some(id) = self.script_id {
            params.push(("id", id.to_string()));
        }
        params
    }
}

/// Where the driver gets apps and scripts from
pub trait ScriptSource {
    /// Look up a public app by exact name
    fn find_app(&self, name: &str) -> ClientResult<Option<AppSummary>>;

    /// Applicable scripts, most specific first
    fn scripts(&self, query: &ScriptQuery) -> ClientResult<Vec<ScriptPayload>>;
}

/// Blocking HTTP implementation of [`ScriptSource`]
pub struct HttpSource {
    client: Client,
    base_url: String,
}

impl HttpSource {
    pub fn new(base_url: &str) -> ClientResult<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .map_err(|e| ClientError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Use `INSTALLIES_SERVER`, falling back to the local default
    pub fn from_env() -> ClientResult<Self> {
        let base_url = std::env::var(SERVER_ENV).unwrap_or_else(|_| DEFAULT_SERVER.to_string());
        Self::new(&base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `<base>/api/apps/<app>/scripts`, with the app name percent-encoded as one segment
    pub fn scripts_url(&self, app_name: &str) -> ClientResult<Url> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|e| ClientError::Http(format!("Invalid server URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|_| ClientError::Http(format!("Invalid server URL {}", self.base_url)))?
            .pop_if_empty()
            .extend(["api", "apps", app_name, "scripts"]);
        Ok(url)
    }
}

impl ScriptSource for HttpSource {
    fn find_app(&self, name: &str) -> ClientResult<Option<AppSummary>> {
        let url = format!("{}/api/apps", self.base_url);
        debug!("Looking up app {} at {}", name, url);

        let response = self.client.get(&url).query(&[("name", name)]).send()?;
        if !response.status().is_success() {
            return Err(ClientError::Http(format!("HTTP {} from {}", response.status(), url)));
        }

        let apps: AppsResponse = response.json()?;
        Ok(apps.apps.into_iter().find(|app| app.name == name))
    }

    fn scripts(&self, query: &ScriptQuery) -> ClientResult<Vec<ScriptPayload>> {
        let url = self.scripts_url(&query.app_name)?;
        debug!("Fetching scripts from {} with {:?}", url, query.to_params());

        let response = self.client.get(url.clone()).query(&query.to_params()).send()?;
        match response.status() {
            StatusCode::NOT_FOUND => return Err(ClientError::NoMatchingApp(query.app_name.clone())),
            status if !status.is_success() => {
                return Err(ClientError::Http(format!("HTTP {} from {}", status, url)));
            }
            _ => {}
        }

        let body = response.text()?;
        scripts_from_body(&body, query)
    }
}

/// Interpret a scripts response body
pub fn scripts_from_body(body: &str, query: &ScriptQuery) -> ClientResult<Vec<ScriptPayload>> {
    match serde_json::from_str::<ScriptsReply>(body)? {
        ScriptsReply::Scripts(response) => Ok(response.scripts),
        ScriptsReply::Error(error) if error.error == VERSION_MISMATCH_ERROR => Err(
            ClientError::VersionRejected(query.version.clone().unwrap_or_default()),
        ),
        ScriptsReply::Error(error) => Err(ClientError::Http(error.error)),
    }
}
