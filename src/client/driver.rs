// src/client/driver.rs

//! The client's action state machine
//!
//! One run handles one `(app, action)` request:
//!
//! 1. install guard: installing something already installed needs a yes
//! 2. reuse: a modify action may reuse the script that installed the app
//! 3. otherwise fetch applicable scripts and let the user pick one
//! 4. write the script to the cache and make it executable
//! 5. an extra confirmation when running as root
//! 6. `:: Continue with <action>?`
//! 7. run the script with the action as its first argument
//! 8. record the outcome in the client state
//!
//! The state is only touched after the script exits successfully.

use super::api::{ScriptQuery, ScriptSource};
use super::{ClientError, ClientPaths, ClientResult, ClientState, Host, InstalledApp, Prompter};
use crate::wire::{AppSummary, ScriptPayload};
use std::collections::BTreeSet;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info};

/// Which actions install, modify or remove an app; the sets may overlap
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionClasses {
    pub install: BTreeSet<String>,
    pub modify: BTreeSet<String>,
    pub remove: BTreeSet<String>,
}

impl Default for ActionClasses {
    fn default() -> Self {
        let set = |names: &[&str]| names.iter().map(|n| n.to_string()).collect();
        Self {
            install: set(&["install", "compile"]),
            modify: set(&["update", "remove"]),
            remove: set(&["remove"]),
        }
    }
}

impl ActionClasses {
    pub fn is_install(&self, action: &str) -> bool {
        self.install.contains(action)
    }

    pub fn is_modify(&self, action: &str) -> bool {
        self.modify.contains(action)
    }

    pub fn is_remove(&self, action: &str) -> bool {
        self.remove.contains(action)
    }
}

/// Executes a materialised script
pub trait Runner {
    fn run(&mut self, script: &Path, action: &str) -> ClientResult<()>;

    /// True when running with root privileges
    fn is_privileged(&self) -> bool;
}

/// Runs scripts as child processes
#[derive(Debug, Default)]
pub struct ShellRunner;

impl Runner for ShellRunner {
    fn run(&mut self, script: &Path, action: &str) -> ClientResult<()> {
        info!("Running {} {}", script.display(), action);
        let status = Command::new(script).arg(action).status()?;
        if status.success() {
            Ok(())
        } else {
            Err(ClientError::SubprocessFailed(status.to_string()))
        }
    }

    fn is_privileged(&self) -> bool {
        nix::unistd::geteuid().is_root()
    }
}

/// One request from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveRequest {
    pub app_name: String,
    pub action: String,
    pub version: Option<String>,
    /// Print the rendered script before running it
    pub output_script: bool,
}

impl DriveRequest {
    /// Build from an `app[==version]` argument
    pub fn parse(action: &str, app_spec: &str, output_script: bool) -> Self {
        let (app_name, version) = match app_spec.split_once("==") {
            Some((name, version)) if !version.is_empty() => (name, Some(version.to_string())),
            Some((name, _)) => (name, None),
            None => (app_spec, None),
        };
        Self {
            app_name: app_name.to_string(),
            action: action.to_string(),
            version,
            output_script,
        }
    }
}

pub struct ActionDriver<'a, S, P, R> {
    source: &'a S,
    prompter: &'a mut P,
    runner: &'a mut R,
    host: Host,
    paths: ClientPaths,
    classes: ActionClasses,
}

impl<'a, S: ScriptSource, P: Prompter, R: Runner> ActionDriver<'a, S, P, R> {
    pub fn new(
        source: &'a S,
        prompter: &'a mut P,
        runner: &'a mut R,
        host: Host,
        paths: ClientPaths,
    ) -> Self {
        Self {
            source,
            prompter,
            runner,
            host,
            paths,
            classes: ActionClasses::default(),
        }
    }

    pub fn with_classes(mut self, classes: ActionClasses) -> Self {
        self.classes = classes;
        self
    }

    /// Carry out `request`, updating `state` on success
    pub fn run(&mut self, request: &DriveRequest, state: &mut ClientState) -> ClientResult<()> {
        let app = self
            .source
            .find_app(&request.app_name)?
            .ok_or_else(|| ClientError::NoMatchingApp(request.app_name.clone()))?;
        let action = request.action.as_str();

        if self.classes.is_install(action) && state.contains(&app.name) {
            self.require(":: App already installed. Do you want to continue anyway?")?;
        }

        let reused = match state.get(&app.name) {
            Some(installed) if self.classes.is_modify(action) => {
                self.reuse(request, &app, installed.script_id)?
            }
            _ => None,
        };
        let script = match reused {
            Some(script) => script,
            None => self.select(request)?,
        };

        let script_path = self.materialise(&app.name, &script.content)?;
        if request.output_script {
            self.prompter.say(":: Script Content Start")?;
            self.prompter.say(&script.content)?;
            self.prompter.say(":: Script Content End")?;
        }

        if self.runner.is_privileged() {
            self.require(":: You are running as root. Scripts may change your whole system. Continue?")?;
        }
        self.require(&format!(":: Continue with {}?", action))?;

        self.runner.run(&script_path, action)?;
        self.record(request, &app, &script, state)
    }

    fn require(&mut self, question: &str) -> ClientResult<()> {
        if self.prompter.confirm(question)? {
            Ok(())
        } else {
            Err(ClientError::UserAborted)
        }
    }

    fn query(&self, request: &DriveRequest, script_id: Option<i64>) -> ScriptQuery {
        ScriptQuery {
            app_name: request.app_name.clone(),
            action: request.action.clone(),
            distro: self.host.distro.clone(),
            architecture: self.host.architecture.clone(),
            version: request.version.clone(),
            script_id,
        }
    }

    /// Offer the script that installed the app; None if declined
    fn reuse(
        &mut self,
        request: &DriveRequest,
        app: &AppSummary,
        script_id: i64,
    ) -> ClientResult<Option<ScriptPayload>> {
        let question = format!(
            ":: {} was installed with script {}. Use the same script?",
            app.name, script_id
        );
        if !self.prompter.confirm(&question)? {
            return Ok(None);
        }

        let scripts = self.source.scripts(&self.query(request, Some(script_id)))?;
        debug!("Reuse of script {} returned {} match(es)", script_id, scripts.len());
        scripts
            .into_iter()
            .next()
            .map(Some)
            .ok_or(ClientError::ScriptGone(script_id))
    }

    fn select(&mut self, request: &DriveRequest) -> ClientResult<ScriptPayload> {
        let mut scripts = self.source.scripts(&self.query(request, None))?;
        match scripts.len() {
            0 => Err(ClientError::NoMatchingScript {
                app: request.app_name.clone(),
                distro: self.host.distro.clone(),
                architecture: self.host.architecture.clone(),
                action: request.action.clone(),
            }),
            1 => Ok(scripts.remove(0)),
            _ => {
                let options: Vec<String> = scripts.iter().map(describe).collect();
                let index = self.prompter.choose(
                    &format!(":: {} scripts match this system:", scripts.len()),
                    &options,
                )?;
                if index >= scripts.len() {
                    return Err(ClientError::UserAborted);
                }
                Ok(scripts.swap_remove(index))
            }
        }
    }

    fn materialise(&self, app_name: &str, content: &str) -> ClientResult<PathBuf> {
        let path = self.paths.script_file(app_name);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)?;
        }
        std::fs::write(&path, content)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        debug!("Wrote script to {}", path.display());
        Ok(path)
    }

    fn record(
        &self,
        request: &DriveRequest,
        app: &AppSummary,
        script: &ScriptPayload,
        state: &mut ClientState,
    ) -> ClientResult<()> {
        let action = request.action.as_str();
        let installed = InstalledApp {
            version: effective_version(request, app, script),
            script_id: script.id,
        };

        if self.classes.is_install(action) {
            state.insert(&app.name, installed);
        } else if self.classes.is_remove(action) {
            state.remove(&app.name);
        } else if self.classes.is_modify(action) && state.contains(&app.name) {
            state.insert(&app.name, installed);
        } else {
            return Ok(());
        }

        info!("Recorded {} of {}", action, app.name);
        state.save()
    }
}

/// Requested version, then the app's current version, then the script's own
fn effective_version(
    request: &DriveRequest,
    app: &AppSummary,
    script: &ScriptPayload,
) -> Option<String> {
    request
        .version
        .clone()
        .or_else(|| app.current_version.clone())
        .or_else(|| script.for_version.clone())
}

fn describe(script: &ScriptPayload) -> String {
    let mut line = format!(
        "script {} [{}] actions: {}",
        script.id,
        script.shell,
        script.actions.join(", ")
    );
    if let Some(submitter) = &script.submitter {
        line.push_str(&format!(" by {}", submitter));
    }
    if !script.description.is_empty() {
        line.push_str(&format!(": {}", script.description));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::{BTreeMap, VecDeque};
    use tempfile::TempDir;

    struct FakeSource {
        app: Option<AppSummary>,
        scripts: Vec<ScriptPayload>,
        queries: RefCell<Vec<ScriptQuery>>,
    }

    impl ScriptSource for FakeSource {
        fn find_app(&self, _name: &str) -> ClientResult<Option<AppSummary>> {
            Ok(self.app.clone())
        }

        fn scripts(&self, query: &ScriptQuery) -> ClientResult<Vec<ScriptPayload>> {
            self.queries.borrow_mut().push(query.clone());
            Ok(self
                .scripts
                .iter()
                .filter(|s| query.script_id.is_none_or(|id| id == s.id))
                .cloned()
                .collect())
        }
    }

    #[derive(Default)]
    struct FakePrompter {
        answers: VecDeque<bool>,
        choice: usize,
        asked: Vec<String>,
        said: Vec<String>,
    }

    impl Prompter for FakePrompter {
        fn confirm(&mut self, question: &str) -> ClientResult<bool> {
            self.asked.push(question.to_string());
            Ok(self.answers.pop_front().unwrap_or(false))
        }

        fn choose(&mut self, question: &str, _options: &[String]) -> ClientResult<usize> {
            self.asked.push(question.to_string());
            Ok(self.choice)
        }

        fn say(&mut self, text: &str) -> ClientResult<()> {
            self.said.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeRunner {
        privileged: bool,
        fail: bool,
        runs: Vec<(PathBuf, String)>,
    }

    impl Runner for FakeRunner {
        fn run(&mut self, script: &Path, action: &str) -> ClientResult<()> {
            self.runs.push((script.to_path_buf(), action.to_string()));
            if self.fail {
                Err(ClientError::SubprocessFailed("exit status: 1".to_string()))
            } else {
                Ok(())
            }
        }

        fn is_privileged(&self) -> bool {
            self.privileged
        }
    }

    fn app() -> AppSummary {
        AppSummary {
            id: 1,
            name: "foo".to_string(),
            display_name: None,
            description: "Foo tool".to_string(),
            current_version: Some("2.0".to_string()),
            creation_date: None,
            last_modified: None,
            submitter: Some("alice".to_string()),
        }
    }

    fn script(id: i64) -> ScriptPayload {
        ScriptPayload {
            id,
            actions: vec!["install".to_string(), "update".to_string(), "remove".to_string()],
            shell: "bash".to_string(),
            supported_distros: BTreeMap::new(),
            for_version: None,
            content: format!("#!/bin/bash\n\necho {}\n", id),
            submitter: Some("alice".to_string()),
            description: String::new(),
            last_modified: None,
        }
    }

    fn source(scripts: Vec<ScriptPayload>) -> FakeSource {
        FakeSource {
            app: Some(app()),
            scripts,
            queries: RefCell::new(Vec::new()),
        }
    }

    fn setup() -> (TempDir, ClientPaths, ClientState) {
        let dir = TempDir::new().unwrap();
        let paths = ClientPaths::new(dir.path().join("config"), dir.path().join("cache"));
        let state = ClientState::load(&paths.state_file()).unwrap();
        (dir, paths, state)
    }

    fn installed(state: &mut ClientState, version: &str, script_id: i64) {
        state.insert(
            "foo",
            InstalledApp {
                version: Some(version.to_string()),
                script_id,
            },
        );
        state.save().unwrap();
    }

    #[test]
    fn test_action_classes() {
        let classes = ActionClasses::default();
        assert!(classes.is_install("install") && classes.is_install("compile"));
        assert!(classes.is_modify("remove") && classes.is_remove("remove"));
        assert!(classes.is_modify("update") && !classes.is_remove("update"));
        assert!(!classes.is_install("run") && !classes.is_modify("run"));
    }

    #[test]
    fn test_parse_request() {
        let request = DriveRequest::parse("install", "foo==1.2", true);
        assert_eq!(request.app_name, "foo");
        assert_eq!(request.version.as_deref(), Some("1.2"));
        assert!(request.output_script);

        let request = DriveRequest::parse("run", "foo", false);
        assert_eq!(request.version, None);
        assert_eq!(DriveRequest::parse("run", "foo==", false).version, None);
    }

    #[test]
    fn test_install_records_state() {
        let (_dir, paths, mut state) = setup();
        let source = source(vec![script(7)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([true]),
            ..Default::default()
        };
        let mut runner = FakeRunner::default();

        let host = Host::new("ubuntu", "x86_64");
        ActionDriver::new(&source, &mut prompter, &mut runner, host, paths.clone())
            .run(&DriveRequest::parse("install", "foo", false), &mut state)
            .unwrap();

        assert_eq!(prompter.asked, vec![":: Continue with install?"]);
        assert_eq!(runner.runs.len(), 1);
        assert_eq!(runner.runs[0].1, "install");

        let script_path = paths.script_file("foo");
        assert_eq!(runner.runs[0].0, script_path);
        assert_eq!(
            std::fs::read_to_string(&script_path).unwrap(),
            "#!/bin/bash\n\necho 7\n"
        );
        let mode = std::fs::metadata(&script_path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);

        let reloaded = ClientState::load(&paths.state_file()).unwrap();
        assert_eq!(
            reloaded.get("foo"),
            Some(&InstalledApp {
                version: Some("2.0".to_string()),
                script_id: 7
            })
        );

        let queries = source.queries.borrow();
        assert_eq!(queries[0].distro, "ubuntu");
        assert_eq!(queries[0].architecture, "x86_64");
    }

    #[test]
    fn test_install_guard_declined() {
        let (_dir, paths, mut state) = setup();
        installed(&mut state, "1.0", 42);
        let source = source(vec![script(7)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([false]),
            ..Default::default()
        };
        let mut runner = FakeRunner::default();

        let result = ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("install", "foo", false), &mut state);

        assert!(matches!(result, Err(ClientError::UserAborted)));
        assert!(prompter.asked[0].starts_with(":: App already installed"));
        assert!(runner.runs.is_empty());
        let reloaded = ClientState::load(&paths.state_file()).unwrap();
        assert_eq!(reloaded.get("foo").unwrap().script_id, 42);
    }

    #[test]
    fn test_update_reuses_stored_script() {
        let (_dir, paths, mut state) = setup();
        installed(&mut state, "1.0", 42);
        let source = source(vec![script(7), script(42)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([true, true]),
            ..Default::default()
        };
        let mut runner = FakeRunner::default();

        ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("update", "foo", false), &mut state)
        .unwrap();

        let queries = source.queries.borrow();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].script_id, Some(42));
        assert_eq!(runner.runs[0].1, "update");

        let reloaded = ClientState::load(&paths.state_file()).unwrap();
        assert_eq!(
            reloaded.get("foo"),
            Some(&InstalledApp {
                version: Some("2.0".to_string()),
                script_id: 42
            })
        );
    }

    #[test]
    fn test_reuse_of_missing_script_fails() {
        let (_dir, paths, mut state) = setup();
        installed(&mut state, "1.0", 99);
        let source = source(vec![script(7)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([true]),
            ..Default::default()
        };
        let mut runner = FakeRunner::default();

        let result = ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths,
        )
        .run(&DriveRequest::parse("update", "foo", false), &mut state);

        assert!(matches!(result, Err(ClientError::ScriptGone(99))));
        assert!(runner.runs.is_empty());
    }

    #[test]
    fn test_remove_clears_state() {
        let (_dir, paths, mut state) = setup();
        installed(&mut state, "1.0", 42);
        let source = source(vec![script(42)]);
        // Decline reuse, then confirm the action
        let mut prompter = FakePrompter {
            answers: VecDeque::from([false, true]),
            ..Default::default()
        };
        let mut runner = FakeRunner::default();

        ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("remove", "foo", false), &mut state)
        .unwrap();

        assert_eq!(source.queries.borrow()[0].script_id, None);
        assert!(!ClientState::load(&paths.state_file()).unwrap().contains("foo"));
    }

    #[test]
    fn test_failed_script_leaves_state_alone() {
        let (_dir, paths, mut state) = setup();
        let source = source(vec![script(7)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([true]),
            ..Default::default()
        };
        let mut runner = FakeRunner {
            fail: true,
            ..Default::default()
        };

        let result = ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("install", "foo", false), &mut state);

        assert!(matches!(result, Err(ClientError::SubprocessFailed(_))));
        assert!(!ClientState::load(&paths.state_file()).unwrap().contains("foo"));
    }

    #[test]
    fn test_selection_root_prompt_and_output() {
        let (_dir, paths, mut state) = setup();
        let source = source(vec![script(7), script(8)]);
        let mut prompter = FakePrompter {
            answers: VecDeque::from([true, true]),
            choice: 1,
            ..Default::default()
        };
        let mut runner = FakeRunner {
            privileged: true,
            ..Default::default()
        };

        ActionDriver::new(
            &source,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("run", "foo==3.1", true), &mut state)
        .unwrap();

        assert!(prompter.asked[0].contains("2 scripts match"));
        assert!(prompter.asked[1].contains("root"));
        assert_eq!(prompter.asked[2], ":: Continue with run?");
        assert_eq!(prompter.said.first().unwrap(), ":: Script Content Start");
        assert_eq!(prompter.said[1], "#!/bin/bash\n\necho 8\n");
        assert_eq!(prompter.said.last().unwrap(), ":: Script Content End");
        assert_eq!(source.queries.borrow()[0].version.as_deref(), Some("3.1"));

        // `run` is in no class, so nothing is recorded
        assert!(state.installed_apps().is_empty());
    }

    #[test]
    fn test_no_app_and_no_script() {
        let (_dir, paths, mut state) = setup();
        let mut prompter = FakePrompter::default();
        let mut runner = FakeRunner::default();

        let missing = FakeSource {
            app: None,
            scripts: Vec::new(),
            queries: RefCell::new(Vec::new()),
        };
        let result = ActionDriver::new(
            &missing,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths.clone(),
        )
        .run(&DriveRequest::parse("install", "foo", false), &mut state);
        assert!(matches!(result, Err(ClientError::NoMatchingApp(_))));

        let empty = source(Vec::new());
        let result = ActionDriver::new(
            &empty,
            &mut prompter,
            &mut runner,
            Host::new("ubuntu", "amd64"),
            paths,
        )
        .run(&DriveRequest::parse("install", "foo", false), &mut state);
        assert!(matches!(result, Err(ClientError::NoMatchingScript { .. })));
    }
}
