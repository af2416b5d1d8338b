// src/resolver.rs

//! Script resolution
//!
//! Given an app name and a client's distro, architecture and action, find
//! every script of the app that applies and rank them from most to least
//! specific. The resolver never picks one script for the client; when more
//! than one remains the client asks the user.

use crate::assembler;
use crate::db::models::{App, Script, SupportPair, User, Visibility};
use crate::error::{Error, Result};
use crate::query::{Composer, PageLimits, QueryParams, ScriptScope};
use crate::registry::{DistroRegistry, MatchTier, Specificity};
use crate::store::ScriptStore;
use regex::Regex;
use rusqlite::Connection;
use std::cmp::Reverse;
use tracing::debug;

/// What the client asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub app_name: String,
    pub distro: String,
    pub architecture: String,
    pub action: String,
    pub target_version: Option<String>,
    /// Restrict to one script, used when reusing the script that installed the app
    pub script_id: Option<i64>,
}

/// One applicable script with everything needed to render it
#[derive(Debug, Clone)]
pub struct RankedScript {
    pub script: Script,
    pub actions: Vec<String>,
    pub supported_distros: Vec<SupportPair>,
    pub specificity: Specificity,
}

#[derive(Debug, Clone)]
pub struct Resolution {
    pub app: App,
    pub scripts: Vec<RankedScript>,
    pub requested_version: Option<String>,
}

impl Resolution {
    /// Effective version for one of the resolved scripts
    pub fn effective_version<'a>(&'a self, ranked: &'a RankedScript) -> Option<&'a str> {
        assembler::effective_version(self.requested_version.as_deref(), &self.app, &ranked.script)
    }

    /// Read and assemble the body of one resolved script
    pub fn render(&self, store: &ScriptStore, ranked: &RankedScript) -> Result<String> {
        let body = store.read_body_of(&ranked.script)?;
        assembler::assemble_script(
            &ranked.script,
            &body,
            &ranked.actions,
            self.effective_version(ranked),
        )
    }
}

/// True if `caller` may read `app`
pub fn can_read(app: &App, caller: Option<&User>) -> bool {
    match (app.visibility, caller) {
        (Visibility::Public, _) => true,
        (Visibility::Private, Some(user)) => user.admin || user.id == Some(app.submitter_id),
        (Visibility::Private, None) => false,
    }
}

/// Check a requested version against the app's regex, if it has one
pub fn check_version(app: &App, version: &str) -> Result<()> {
    let Some(pattern) = app.version_regex.as_deref().filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let regex = Regex::new(pattern)?;
    if regex.is_match(version) {
        Ok(())
    } else {
        Err(Error::VersionMismatch {
            version: version.to_string(),
            regex: pattern.to_string(),
        })
    }
}

/// Resolve a request into a ranked list of applicable scripts
pub fn resolve(
    conn: &Connection,
    registry: &DistroRegistry,
    request: &ResolveRequest,
    caller: Option<&User>,
) -> Result<Resolution> {
    let architecture = registry.canonicalize(&request.architecture);

    let app = App::find_by_name(conn, &request.app_name)?
        .filter(|app| can_read(app, caller))
        .ok_or_else(|| Error::NotFoundError(format!("app '{}'", request.app_name)))?;
    let app_id = app
        .id
        .ok_or_else(|| Error::InitError("App loaded without ID".to_string()))?;

    if let Some(version) = &request.target_version {
        check_version(&app, version)?;
    }

    let mut params = QueryParams::new();
    params.insert("actions", request.action.clone());
    params.insert("supports", format!("{}:{}", request.distro, architecture));
    let scope = ScriptScope {
        app_id: Some(app_id),
        script_id: request.script_id,
        compatible_version: request.target_version.clone(),
        paginate: false,
    };
    let candidates = Composer::new(registry, PageLimits::default())
        .scripts(&params, &scope)
        .fetch_scripts(conn)?;

    let mut scripts = Vec::with_capacity(candidates.len());
    for script in candidates {
        let script_id = script
            .id
            .ok_or_else(|| Error::InitError("Script loaded without ID".to_string()))?;
        let supported_distros = SupportPair::find_by_script(conn, script_id)?;
        let specificity = registry
            .best_match(&supported_distros, &request.distro, &architecture)
            .unwrap_or(Specificity {
                tier: MatchTier::AnyDistroAnyArch,
                distance: None,
            });

        scripts.push(RankedScript {
            actions: Script::actions(conn, script_id)?,
            script,
            supported_distros,
            specificity,
        });
    }

    rank(&mut scripts);
    debug!(
        "Resolved {} script(s) for {} on {}/{} ({})",
        scripts.len(),
        request.app_name,
        request.distro,
        architecture,
        request.action
    );

    Ok(Resolution {
        app,
        scripts,
        requested_version: request.target_version.clone(),
    })
}

/// Order by specificity, then ancestor distance, then newest first, then id
pub fn rank(scripts: &mut [RankedScript]) {
    scripts.sort_by(|a, b| {
        let key = |r: &RankedScript| {
            (
                r.specificity.rank_key(),
                Reverse(r.script.last_modified.clone()),
                r.script.id,
            )
        };
        key(a).cmp(&key(b))
    });
}
