// tests/client_flow.rs

//! The client driver against an in-process server backend.

mod common;

use common::{LocalSource, setup};
use installies::client::{
    ActionDriver, ClientError, ClientPaths, ClientResult, ClientState, DriveRequest, Host,
    InstalledApp, Runner, StdinPrompter,
};
use std::io::Cursor;
use std::path::{Path, PathBuf};

/// Records runs and checks the materialised script instead of executing it
#[derive(Default)]
struct RecordingRunner {
    runs: Vec<(String, String)>,
}

impl Runner for RecordingRunner {
    fn run(&mut self, script: &Path, action: &str) -> ClientResult<()> {
        let content = std::fs::read_to_string(script)?;
        self.runs.push((content, action.to_string()));
        Ok(())
    }

    fn is_privileged(&self) -> bool {
        false
    }
}

fn prompter(input: &str) -> StdinPrompter<Cursor<Vec<u8>>, Vec<u8>> {
    StdinPrompter::new(Cursor::new(input.as_bytes().to_vec()), Vec::new())
}

fn client_paths(root: &Path) -> (ClientPaths, PathBuf) {
    let paths = ClientPaths::new(root.join("config"), root.join("cache"));
    let state_file = paths.state_file();
    (paths, state_file)
}

#[test]
fn test_install_then_guarded_reinstall() {
    let fx = setup();
    let mut conn = fx.conn();
    fx.add_app(&mut conn, "foo", Some("2.0"), None);
    let script = fx.add_script(
        &mut conn,
        "foo",
        "ubuntu",
        &["install", "remove"],
        "install() { echo <version>; }\nremove() { echo bye; }",
    );
    let client_dir = tempfile::tempdir().unwrap();
    let (paths, state_file) = client_paths(client_dir.path());
    let source = LocalSource { fixture: &fx };
    let host = Host::new("ubuntu", "x86_64");

    let mut state = ClientState::load(&state_file).unwrap();
    let mut input = prompter("Y\n");
    let mut runner = RecordingRunner::default();
    ActionDriver::new(&source, &mut input, &mut runner, host.clone(), paths.clone())
        .run(&DriveRequest::parse("install", "foo", false), &mut state)
        .unwrap();

    let (content, action) = &runner.runs[0];
    assert_eq!(action, "install");
    assert!(content.starts_with("#!/bin/bash\n\ninstall() { echo 2.0; }\n"));
    assert!(content.contains("if [ \"remove\" = \"$1\" ]; then\n    remove\n    exit\nfi\n"));
    assert_eq!(
        ClientState::load(&state_file).unwrap().get("foo"),
        Some(&InstalledApp {
            version: Some("2.0".to_string()),
            script_id: script
        })
    );

    // Reinstalling asks first; a lowercase answer is a no
    let mut input = prompter("y\n");
    let mut runner = RecordingRunner::default();
    let result = ActionDriver::new(&source, &mut input, &mut runner, host, paths)
        .run(&DriveRequest::parse("install", "foo", false), &mut state);
    assert!(matches!(result, Err(ClientError::UserAborted)));
    assert!(runner.runs.is_empty());
    let output = String::from_utf8(input.into_output()).unwrap();
    assert!(output.starts_with(":: App already installed"));
}

#[test]
fn test_update_reuses_installing_script() {
    let fx = setup();
    let mut conn = fx.conn();
    fx.add_app(&mut conn, "foo", Some("2.0"), None);
    let general = fx.add_script(&mut conn, "foo", "debian", &["install", "update"], "echo general");
    let specific =
        fx.add_script(&mut conn, "foo", "ubuntu:amd64", &["install", "update"], "echo specific");

    let client_dir = tempfile::tempdir().unwrap();
    let (paths, state_file) = client_paths(client_dir.path());
    let mut state = ClientState::load(&state_file).unwrap();
    state.insert(
        "foo",
        InstalledApp {
            version: Some("1.0".to_string()),
            script_id: general,
        },
    );
    state.save().unwrap();

    let source = LocalSource { fixture: &fx };
    let mut input = prompter("Y\nY\n");
    let mut runner = RecordingRunner::default();
    ActionDriver::new(
        &source,
        &mut input,
        &mut runner,
        Host::new("ubuntu", "amd64"),
        paths.clone(),
    )
    .run(&DriveRequest::parse("update", "foo", false), &mut state)
    .unwrap();

    // The less specific script that installed the app is the one that ran
    assert!(runner.runs[0].0.contains("echo general"));
    assert_eq!(runner.runs[0].1, "update");
    let saved = ClientState::load(&state_file).unwrap();
    assert_eq!(
        saved.get("foo"),
        Some(&InstalledApp {
            version: Some("2.0".to_string()),
            script_id: general
        })
    );
    assert_ne!(general, specific);
}

#[test]
fn test_choose_between_scripts_and_version_rejection() {
    let fx = setup();
    let mut conn = fx.conn();
    fx.add_app(&mut conn, "foo", Some("2.0"), Some(r"^\d+\.\d+$"));
    let general = fx.add_script(&mut conn, "foo", "debian", &["install"], "echo general");
    let specific = fx.add_script(&mut conn, "foo", "ubuntu", &["install"], "echo specific");

    let client_dir = tempfile::tempdir().unwrap();
    let (paths, state_file) = client_paths(client_dir.path());
    let source = LocalSource { fixture: &fx };
    let host = Host::new("ubuntu", "amd64");

    // Scripts arrive most specific first; pick the second one
    let mut state = ClientState::load(&state_file).unwrap();
    let mut input = prompter("7\n1\nY\n");
    let mut runner = RecordingRunner::default();
    ActionDriver::new(&source, &mut input, &mut runner, host.clone(), paths.clone())
        .run(&DriveRequest::parse("install", "foo==1.5", true), &mut state)
        .unwrap();
    assert!(runner.runs[0].0.contains("echo general"));
    assert_eq!(state.get("foo").unwrap().script_id, general);
    assert_eq!(state.get("foo").unwrap().version.as_deref(), Some("1.5"));

    let output = String::from_utf8(input.into_output()).unwrap();
    assert!(output.contains(&format!("  0) script {}", specific)));
    assert!(output.contains(":: Script Content Start\n#!/bin/bash\n"));
    assert!(output.contains(":: Script Content End\n"));

    let mut input = prompter("Y\n");
    let mut runner = RecordingRunner::default();
    let result = ActionDriver::new(&source, &mut input, &mut runner, host, paths)
        .run(&DriveRequest::parse("compile", "foo==abc", false), &mut state);
    assert!(matches!(result, Err(ClientError::VersionRejected(v)) if v == "abc"));
    assert!(runner.runs.is_empty());
}
