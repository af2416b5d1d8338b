// src/assembler.rs

//! Script assembly
//!
//! Turns a stored body into a directly executable file:
//! shebang, body with `<version>` substituted, then (optionally) an action
//! dispatcher built from the shell's templates that routes the first
//! command-line argument to the function of the same name.

use crate::db::models::{App, Script};
use crate::error::{Error, Result};
use crate::shell::{self, ACTION_TOKEN, ACTIONS_TOKEN, Shell};

/// Placeholder replaced by the effective version
pub const VERSION_TOKEN: &str = "<version>";

/// Pick the version substituted into a script.
///
/// Precedence: the requested version, then the app's current version,
/// then the version the script targets. `None` leaves placeholders intact.
pub fn effective_version<'a>(
    requested: Option<&'a str>,
    app: &'a App,
    script: &'a Script,
) -> Option<&'a str> {
    requested
        .or(app.current_version.as_deref())
        .or(script.version.as_deref())
}

/// Assemble a script body for `shell`
pub fn assemble(
    body: &str,
    shell: &Shell,
    actions: &[String],
    use_default_action_dispatcher: bool,
    version: Option<&str>,
) -> String {
    let body = match version {
        Some(v) => body.replace(VERSION_TOKEN, v),
        None => body.to_string(),
    };

    let mut out = String::with_capacity(body.len() + 256);
    out.push_str(&shell.shebang());
    out.push_str("\n\n");
    out.push_str(&body);

    if use_default_action_dispatcher {
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&dispatcher(shell, actions));
    }

    out
}

/// Build the dispatcher footer: prelude, one case per sorted action, fallback
pub fn dispatcher(shell: &Shell, actions: &[String]) -> String {
    let mut sorted: Vec<&str> = actions.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();

    let mut out = String::from(shell.dispatcher_prelude);
    for action in &sorted {
        out.push_str(&shell.dispatcher_case.replace(ACTION_TOKEN, action));
    }
    out.push_str(&shell.dispatcher_fallback.replace(ACTIONS_TOKEN, &sorted.join(" ")));
    out
}

/// Assemble a stored script, looking its shell up by name
pub fn assemble_script(
    script: &Script,
    body: &str,
    actions: &[String],
    version: Option<&str>,
) -> Result<String> {
    let shell = shell::find(&script.shell)
        .ok_or_else(|| Error::ValidationError(format!("Unknown shell '{}'.", script.shell)))?;
    Ok(assemble(
        body,
        shell,
        actions,
        script.use_default_action_dispatcher,
        version,
    ))
}
