// src/catalog.rs

//! App and script lifecycle operations
//!
//! Every operation declares the guards it needs and runs them in order
//! before doing any work:
//!
//! - apps are created by any authenticated user, who becomes the first maintainer
//! - apps are edited by admins or maintainers and deleted by admins only
//! - scripts are created by app maintainers and edited/deleted by their own
//!   maintainers or an admin
//!
//! Authentication happens elsewhere; callers arrive as `Option<&User>`.

use crate::db::{
    self,
    models::{App, Script, SupportPair, Thread, User, Visibility, WILDCARD},
};
use crate::error::{Error, Result};
use crate::query::parse_supports;
use crate::registry::DistroRegistry;
use crate::resolver::can_read;
use crate::store::{ScriptMetadata, ScriptStore};
use crate::validate::{self, check_optional};
use rusqlite::Connection;
use std::collections::BTreeMap;
use tracing::info;

/// Permission checks an operation runs before its body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Guard {
    Authenticated,
    Admin,
    /// Admin or maintainer of the target app
    AppMaintainer,
    /// Admin or maintainer of the target script
    ScriptMaintainer,
}

/// What a guard is checked against
#[derive(Debug, Clone, Copy, Default)]
pub struct Target {
    pub app_id: Option<i64>,
    pub script_id: Option<i64>,
}

/// Run `guards` in order and return the authenticated caller
pub fn ensure<'u>(
    conn: &Connection,
    caller: Option<&'u User>,
    guards: &[Guard],
    target: Target,
) -> Result<&'u User> {
    let user = caller.ok_or_else(|| Error::ForbiddenError("login required".to_string()))?;
    let user_id = user
        .id
        .ok_or_else(|| Error::ForbiddenError("unknown user".to_string()))?;

    for guard in guards {
        let allowed = match guard {
            Guard::Authenticated => true,
            Guard::Admin => user.admin,
            Guard::AppMaintainer => {
                user.admin
                    || match target.app_id {
                        Some(app_id) => App::is_maintainer(conn, app_id, user_id)?,
                        None => false,
                    }
            }
            Guard::ScriptMaintainer => {
                user.admin
                    || match target.script_id {
                        Some(script_id) => Script::is_maintainer(conn, script_id, user_id)?,
                        None => false,
                    }
            }
        };
        if !allowed {
            return Err(Error::ForbiddenError(format!(
                "{} may not perform this action",
                user.username
            )));
        }
    }
    Ok(user)
}

/// Fields of a new or edited app
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppInput {
    pub name: String,
    pub display_name: Option<String>,
    pub description: String,
    pub current_version: Option<String>,
    pub version_regex: Option<String>,
    pub visibility: Visibility,
}

impl AppInput {
    fn validate(&self) -> Result<()> {
        validate::APP_NAME.check(&self.name)?;
        check_optional(&validate::APP_DISPLAY_NAME, self.display_name.as_deref())?;
        validate::APP_DESCRIPTION.check(&self.description)?;
        check_optional(&validate::VERSION, self.current_version.as_deref())?;
        check_optional(&validate::VERSION_REGEX, self.version_regex.as_deref())?;
        Ok(())
    }
}

/// Fields of a new or edited script
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptInput {
    pub content: String,
    pub shell: String,
    pub actions: Vec<String>,
    /// `distro[:arch[:arch...]], distro2, ...`
    pub supported_distros: String,
    pub version: Option<String>,
    pub description: String,
    pub use_default_action_dispatcher: bool,
}

impl Default for ScriptInput {
    fn default() -> Self {
        Self {
            content: String::new(),
            shell: "bash".to_string(),
            actions: Vec::new(),
            supported_distros: String::new(),
            version: None,
            description: String::new(),
            use_default_action_dispatcher: true,
        }
    }
}

/// Parse the supported-distro string into `(distro, arch)` pairs.
///
/// A distro listed without architectures supports every architecture.
pub fn parse_supported_distros(value: &str) -> Result<Vec<(String, String)>> {
    let mut pairs = Vec::new();
    for entry in parse_supports(value) {
        validate::SCRIPT_DISTRO.check(&entry.distro)?;
        if entry.architectures.is_empty() {
            pairs.push((entry.distro.clone(), WILDCARD.to_string()));
        }
        for arch in &entry.architectures {
            validate::SCRIPT_ARCHITECTURE.check(arch)?;
            pairs.push((entry.distro.clone(), arch.clone()));
        }
    }
    if pairs.is_empty() {
        return Err(Error::ValidationError(
            "Script supported distros cannot be empty.".to_string(),
        ));
    }
    Ok(pairs)
}

/// Render support pairs back into `distro:arch:arch, distro` form
pub fn render_supported_distros(pairs: &[SupportPair]) -> String {
    let mut by_distro: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
    for pair in pairs {
        by_distro
            .entry(pair.distro_name.as_str())
            .or_default()
            .push(pair.architecture_name.as_str());
    }

    by_distro
        .into_iter()
        .map(|(distro, arches)| {
            if arches.contains(&WILDCARD) {
                distro.to_string()
            } else {
                format!("{}:{}", distro, arches.join(":"))
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// App and script operations with permission guards
#[derive(Debug, Clone)]
pub struct Catalog<'a> {
    store: &'a ScriptStore,
    max_content_length: usize,
}

impl<'a> Catalog<'a> {
    pub fn new(store: &'a ScriptStore) -> Self {
        Self {
            store,
            max_content_length: validate::DEFAULT_MAX_CONTENT_LENGTH,
        }
    }

    pub fn with_max_content_length(mut self, max: usize) -> Self {
        self.max_content_length = max;
        self
    }

    /// Look up an app the caller may read
    pub fn app(&self, conn: &Connection, caller: Option<&User>, name: &str) -> Result<App> {
        App::find_by_name(conn, name)?
            .filter(|app| can_read(app, caller))
            .ok_or_else(|| Error::NotFoundError(format!("app '{}'", name)))
    }

    pub fn create_app(
        &self,
        conn: &mut Connection,
        caller: Option<&User>,
        input: &AppInput,
    ) -> Result<App> {
        let user = ensure(conn, caller, &[Guard::Authenticated], Target::default())?;
        let user_id = user
            .id
            .ok_or_else(|| Error::ForbiddenError("unknown user".to_string()))?;
        input.validate()?;
        if App::find_by_name(conn, &input.name)?.is_some() {
            return Err(Error::ValidationError(format!(
                "App name '{}' is already taken.",
                input.name
            )));
        }

        let mut app = App::new(input.name.clone(), input.description.clone(), user_id);
        app.display_name = input.display_name.clone();
        app.current_version = input.current_version.clone();
        app.version_regex = input.version_regex.clone();
        app.visibility = input.visibility;

        let app = db::transaction(conn, |tx| {
            let app_id = app.insert(tx)?;
            App::add_maintainer(tx, app_id, user_id)?;
            Ok(app)
        })?;

        info!("Created app {} for {}", app.name, user.username);
        self.app(conn, caller, &input.name)
    }

    /// Edit an app's fields; the name cannot change
    pub fn edit_app(
        &self,
        conn: &Connection,
        caller: Option<&User>,
        name: &str,
        input: &AppInput,
    ) -> Result<App> {
        let mut app = self.app(conn, caller, name)?;
        ensure(
            conn,
            caller,
            &[Guard::Authenticated, Guard::AppMaintainer],
            Target {
                app_id: app.id,
                script_id: None,
            },
        )?;
        if input.name != app.name {
            return Err(Error::ValidationError(
                "App name cannot be changed.".to_string(),
            ));
        }
        input.validate()?;

        app.display_name = input.display_name.clone();
        app.description = input.description.clone();
        app.current_version = input.current_version.clone();
        app.version_regex = input.version_regex.clone();
        app.visibility = input.visibility;
        app.update(conn)?;

        info!("Edited app {}", app.name);
        Ok(app)
    }

    /// Delete an app, its scripts, their bodies and its threads
    pub fn delete_app(&self, conn: &mut Connection, caller: Option<&User>, name: &str) -> Result<()> {
        let app = self.app(conn, caller, name)?;
        ensure(conn, caller, &[Guard::Admin], Target::default())?;
        let app_id = app
            .id
            .ok_or_else(|| Error::InitError("App loaded without ID".to_string()))?;

        for script in Script::find_by_app(conn, app_id)? {
            self.store.remove_body(std::path::Path::new(&script.filepath));
        }
        db::transaction(conn, |tx| App::delete(tx, app_id))?;

        info!("Deleted app {}", name);
        Ok(())
    }

    pub fn add_app_maintainer(
        &self,
        conn: &Connection,
        caller: Option<&User>,
        name: &str,
        username: &str,
    ) -> Result<()> {
        let app = self.app(conn, caller, name)?;
        ensure(
            conn,
            caller,
            &[Guard::Authenticated, Guard::AppMaintainer],
            Target {
                app_id: app.id,
                script_id: None,
            },
        )?;
        let user = User::find_by_username(conn, username)?
            .ok_or_else(|| Error::NotFoundError(format!("user '{}'", username)))?;
        let (Some(app_id), Some(user_id)) = (app.id, user.id) else {
            return Err(Error::InitError("Row loaded without ID".to_string()));
        };

        App::add_maintainer(conn, app_id, user_id)?;
        info!("{} now maintains {}", username, name);
        Ok(())
    }

    pub fn create_script(
        &self,
        conn: &mut Connection,
        registry: &DistroRegistry,
        caller: Option<&User>,
        app_name: &str,
        input: &ScriptInput,
    ) -> Result<i64> {
        let app = self.app(conn, caller, app_name)?;
        let user = ensure(
            conn,
            caller,
            &[Guard::Authenticated, Guard::AppMaintainer],
            Target {
                app_id: app.id,
                script_id: None,
            },
        )?;
        let (Some(app_id), Some(user_id)) = (app.id, user.id) else {
            return Err(Error::InitError("Row loaded without ID".to_string()));
        };

        let metadata = self.metadata(input, vec![user_id])?;
        self.store
            .create(conn, registry, app_id, user_id, &input.content, &metadata)
    }

    pub fn edit_script(
        &self,
        conn: &mut Connection,
        registry: &DistroRegistry,
        caller: Option<&User>,
        script_id: i64,
        input: &ScriptInput,
    ) -> Result<()> {
        self.readable_script(conn, caller, script_id)?;
        ensure(
            conn,
            caller,
            &[Guard::Authenticated, Guard::ScriptMaintainer],
            Target {
                app_id: None,
                script_id: Some(script_id),
            },
        )?;

        let maintainers = Script::maintainer_ids(conn, script_id)?;
        let metadata = self.metadata(input, maintainers)?;
        self.store
            .edit(conn, registry, script_id, &input.content, &metadata)
    }

    pub fn delete_script(
        &self,
        conn: &mut Connection,
        caller: Option<&User>,
        script_id: i64,
    ) -> Result<()> {
        self.readable_script(conn, caller, script_id)?;
        ensure(
            conn,
            caller,
            &[Guard::Authenticated, Guard::ScriptMaintainer],
            Target {
                app_id: None,
                script_id: Some(script_id),
            },
        )?;
        self.store.delete(conn, script_id)
    }

    /// Open a discussion thread on an app
    pub fn create_thread(
        &self,
        conn: &Connection,
        caller: Option<&User>,
        app_name: &str,
        title: &str,
    ) -> Result<Thread> {
        let app = self.app(conn, caller, app_name)?;
        let user = ensure(conn, caller, &[Guard::Authenticated], Target::default())?;
        if title.trim().is_empty() {
            return Err(Error::ValidationError(
                "Thread title cannot be empty.".to_string(),
            ));
        }
        let (Some(app_id), Some(user_id)) = (app.id, user.id) else {
            return Err(Error::InitError("Row loaded without ID".to_string()));
        };

        let mut thread = Thread::new(app_id, title.trim().to_string(), user_id);
        thread.insert(conn)?;
        Ok(thread)
    }

    fn readable_script(&self, conn: &Connection, caller: Option<&User>, script_id: i64) -> Result<Script> {
        let script = Script::find_by_id(conn, script_id)?
            .ok_or_else(|| Error::NotFoundError(format!("script {}", script_id)))?;
        let readable = App::find_by_id(conn, script.app_id)?.is_some_and(|app| can_read(&app, caller));
        if !readable {
            return Err(Error::NotFoundError(format!("script {}", script_id)));
        }
        Ok(script)
    }

    fn metadata(&self, input: &ScriptInput, maintainer_ids: Vec<i64>) -> Result<ScriptMetadata> {
        validate::check_content(&input.content, self.max_content_length)?;
        validate::SCRIPT_SHELL.check(&input.shell)?;
        check_optional(&validate::VERSION, input.version.as_deref())?;
        validate::SCRIPT_DESCRIPTION.check(&input.description)?;

        let mut actions = Vec::new();
        for action in &input.actions {
            let action = action.trim();
            validate::SCRIPT_ACTION.check(action)?;
            if !actions.iter().any(|a| a == action) {
                actions.push(action.to_string());
            }
        }
        if actions.is_empty() {
            return Err(Error::ValidationError(
                "Script actions cannot be empty.".to_string(),
            ));
        }

        Ok(ScriptMetadata {
            shell: input.shell.clone(),
            actions,
            supported_distros: parse_supported_distros(&input.supported_distros)?,
            version: input.version.clone(),
            description: input.description.clone(),
            maintainer_ids,
            use_default_action_dispatcher: input.use_default_action_dispatcher,
        })
    }
}
