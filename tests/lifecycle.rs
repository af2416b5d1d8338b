// tests/lifecycle.rs

//! App and script lifecycle: store round trips, guards and cascades.

mod common;

use common::setup;
use installies::catalog::{AppInput, ScriptInput};
use installies::db::models::{App, Script, SupportPair, Thread, User};
use installies::Error;
use std::path::Path;

fn count(conn: &rusqlite::Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}

#[test]
fn test_store_round_trip_leaves_no_residue() {
    let fx = setup();
    let mut conn = fx.conn();
    fx.add_app(&mut conn, "foo", None, None);
    let body = "install() {\n    echo \"hello\"\n}\n";
    let id = fx.add_script(&mut conn, "foo", "ubuntu", &["install"], body);

    assert_eq!(fx.store.read_body(&conn, id).unwrap(), body);
    let script = Script::find_by_id(&conn, id).unwrap().unwrap();
    let file = script.filepath.clone();
    assert!(Path::new(&file).exists());
    assert!(
        Path::new(&file)
            .file_name()
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("script-")
    );

    fx.catalog()
        .delete_script(&mut conn, Some(&fx.alice), id)
        .unwrap();
    assert!(!Path::new(&file).exists());
    assert!(Script::find_by_id(&conn, id).unwrap().is_none());
    assert_eq!(count(&conn, "script_actions"), 0);
    assert_eq!(count(&conn, "supported_distros"), 0);
    assert_eq!(count(&conn, "script_maintainers"), 0);
}

#[test]
fn test_script_writes_bump_app_last_modified() {
    let fx = setup();
    let mut conn = fx.conn();
    let app = fx.add_app(&mut conn, "foo", None, None);
    let created = app.last_modified.clone().unwrap();

    let id = fx.add_script(&mut conn, "foo", "ubuntu", &["install"], "echo one");
    let after_create = App::find_by_name(&conn, "foo").unwrap().unwrap();
    let script = Script::find_by_id(&conn, id).unwrap().unwrap();
    assert!(after_create.last_modified.clone().unwrap() > created);
    assert_eq!(after_create.last_modified, script.last_modified);

    let input = ScriptInput {
        content: "echo two".to_string(),
        actions: vec!["install".to_string(), "remove".to_string()],
        supported_distros: "debian:x86_64".to_string(),
        ..Default::default()
    };
    let registry = fx.registry(&conn);
    fx.catalog()
        .edit_script(&mut conn, &registry, Some(&fx.alice), id, &input)
        .unwrap();

    let after_edit = App::find_by_name(&conn, "foo").unwrap().unwrap();
    assert!(after_edit.last_modified > after_create.last_modified);
    assert_eq!(fx.store.read_body(&conn, id).unwrap(), "echo two");
    assert_eq!(Script::actions(&conn, id).unwrap(), vec!["install", "remove"]);

    let pairs = SupportPair::find_by_script(&conn, id).unwrap();
    assert_eq!(pairs.len(), 1);
    assert_eq!(pairs[0].distro_name, "debian");
    assert_eq!(pairs[0].architecture_name, "amd64");

    // The old body file is gone, only the new one remains
    let files = std::fs::read_dir(fx.store.upload_dir()).unwrap().count();
    assert_eq!(files, 1);
}

#[test]
fn test_delete_app_cascades() {
    let fx = setup();
    let mut conn = fx.conn();
    let app = fx.add_app(&mut conn, "foo", None, None);
    let app_id = app.id.unwrap();
    let first = fx.add_script(&mut conn, "foo", "ubuntu:amd64:arm64", &["install"], "echo a");
    fx.add_script(&mut conn, "foo", "fedora", &["install", "remove"], "echo b");
    fx.catalog()
        .create_thread(&conn, Some(&fx.alice), "foo", "Does it work on mint?")
        .unwrap();
    let first_file = Script::find_by_id(&conn, first).unwrap().unwrap().filepath;

    // Only admins delete apps, even the owner may not
    assert!(matches!(
        fx.catalog().delete_app(&mut conn, Some(&fx.alice), "foo"),
        Err(Error::ForbiddenError(_))
    ));

    fx.catalog()
        .delete_app(&mut conn, Some(&fx.admin), "foo")
        .unwrap();

    assert!(App::find_by_id(&conn, app_id).unwrap().is_none());
    assert!(Script::find_by_app(&conn, app_id).unwrap().is_empty());
    assert!(Thread::find_by_app(&conn, app_id).unwrap().is_empty());
    for table in [
        "scripts",
        "script_actions",
        "script_maintainers",
        "supported_distros",
        "threads",
        "app_maintainers",
    ] {
        assert_eq!(count(&conn, table), 0, "{table} not empty");
    }
    assert!(!Path::new(&first_file).exists());
    assert_eq!(std::fs::read_dir(fx.store.upload_dir()).unwrap().count(), 0);
}

#[test]
fn test_guards() {
    let fx = setup();
    let mut conn = fx.conn();
    fx.add_app(&mut conn, "foo", None, None);
    let script = fx.add_script(&mut conn, "foo", "ubuntu", &["install"], "echo hi");

    let mut bob = User::new("bob".to_string());
    bob.insert(&conn).unwrap();

    let input = ScriptInput {
        content: "echo bob".to_string(),
        actions: vec!["install".to_string()],
        supported_distros: "ubuntu".to_string(),
        ..Default::default()
    };
    let registry = fx.registry(&conn);
    let catalog = fx.catalog();

    assert!(matches!(
        catalog.create_script(&mut conn, &registry, Some(&bob), "foo", &input),
        Err(Error::ForbiddenError(_))
    ));
    assert!(matches!(
        catalog.create_script(&mut conn, &registry, None, "foo", &input),
        Err(Error::ForbiddenError(_))
    ));
    assert!(matches!(
        catalog.delete_script(&mut conn, Some(&bob), script),
        Err(Error::ForbiddenError(_))
    ));

    // Maintainers of the app may add scripts once added
    catalog
        .add_app_maintainer(&conn, Some(&fx.alice), "foo", "bob")
        .unwrap();
    catalog
        .create_script(&mut conn, &registry, Some(&bob), "foo", &input)
        .unwrap();

    // Admins may delete any script
    catalog
        .delete_script(&mut conn, Some(&fx.admin), script)
        .unwrap();
}

#[test]
fn test_validation_messages() {
    let fx = setup();
    let mut conn = fx.conn();
    let catalog = fx.catalog();

    let bad_name = AppInput {
        name: "Foo Bar".to_string(),
        description: "x".to_string(),
        ..Default::default()
    };
    match catalog.create_app(&mut conn, Some(&fx.alice), &bad_name) {
        Err(Error::ValidationError(msg)) => assert!(msg.starts_with("App name can only contain")),
        other => panic!("unexpected {other:?}"),
    }

    fx.add_app(&mut conn, "foo", None, None);
    let duplicate = AppInput {
        name: "foo".to_string(),
        description: "again".to_string(),
        ..Default::default()
    };
    assert!(matches!(
        catalog.create_app(&mut conn, Some(&fx.alice), &duplicate),
        Err(Error::ValidationError(_))
    ));

    let registry = fx.registry(&conn);
    let bad_shell = ScriptInput {
        content: "echo hi".to_string(),
        shell: "zsh".to_string(),
        actions: vec!["install".to_string()],
        supported_distros: "ubuntu".to_string(),
        ..Default::default()
    };
    match catalog.create_script(&mut conn, &registry, Some(&fx.alice), "foo", &bad_shell) {
        Err(Error::ValidationError(msg)) => {
            assert_eq!(msg, "Script shell must be one of: sh, bash, python.")
        }
        other => panic!("unexpected {other:?}"),
    }

    let no_distros = ScriptInput {
        content: "echo hi".to_string(),
        actions: vec!["install".to_string()],
        ..Default::default()
    };
    assert!(matches!(
        catalog.create_script(&mut conn, &registry, Some(&fx.alice), "foo", &no_distros),
        Err(Error::ValidationError(_))
    ));
    // Nothing was written for the rejected scripts
    assert!(
        !fx.store.upload_dir().exists()
            || std::fs::read_dir(fx.store.upload_dir()).unwrap().count() == 0
    );
}
