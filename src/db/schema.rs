// src/db/schema.rs

//! Database schema definitions and migrations for Installies
//!
//! Every child table references its parent with `ON DELETE CASCADE` so that
//! removing an app removes its scripts, support pairs, maintainers and threads.

use crate::error::{Error, Result};
use rusqlite::Connection;
use tracing::{debug, info};

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the schema version tracking table
fn init_schema_version(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
        )",
        [],
    )?;
    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> Result<i32> {
    init_schema_version(conn)?;

    let version: Option<i32> = conn.query_row(
        "SELECT MAX(version) FROM schema_version",
        [],
        |row| row.get(0),
    )?;

    Ok(version.unwrap_or(0))
}

/// Set the schema version
fn set_schema_version(conn: &Connection, version: i32) -> Result<()> {
    conn.execute(
        "INSERT INTO schema_version (version) VALUES (?1)",
        [version],
    )?;
    Ok(())
}

/// Apply all pending migrations to bring the database up to date
pub fn migrate(conn: &Connection) -> Result<()> {
    let current_version = get_schema_version(conn)?;
    debug!("Current schema version: {}", current_version);

    if current_version >= SCHEMA_VERSION {
        return Ok(());
    }

    for version in (current_version + 1)..=SCHEMA_VERSION {
        info!("Applying migration to version {}", version);
        apply_migration(conn, version)?;
        set_schema_version(conn, version)?;
    }

    info!("Schema migration complete. Now at version {}", SCHEMA_VERSION);
    Ok(())
}

/// Apply a specific migration version
fn apply_migration(conn: &Connection, version: i32) -> Result<()> {
    match version {
        1 => migrate_v1(conn),
        2 => migrate_v2(conn),
        _ => Err(Error::InitError(format!(
            "Unknown migration version: {}",
            version
        ))),
    }
}

/// Initial schema - Version 1
///
/// - users: submitters and maintainers
/// - distros / architectures: the registry used by resolution
/// - apps / scripts: the catalog, with actions, maintainers and support pairs
fn migrate_v1(conn: &Connection) -> Result<()> {
    debug!("Creating schema version 1");

    conn.execute_batch(
        "
        CREATE TABLE users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            admin INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        -- Distros form a forest through based_on_id
        CREATE TABLE distros (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            slug TEXT NOT NULL UNIQUE,
            based_on_id INTEGER REFERENCES distros(id) ON DELETE SET NULL
        );

        CREATE TABLE architectures (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE
        );

        -- Alternative names, rewritten to the canonical name on ingest
        CREATE TABLE architecture_aliases (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            architecture_id INTEGER NOT NULL REFERENCES architectures(id) ON DELETE CASCADE,
            name TEXT NOT NULL UNIQUE
        );

        CREATE TABLE apps (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL UNIQUE,
            display_name TEXT,
            description TEXT NOT NULL,
            current_version TEXT,
            version_regex TEXT,
            visibility TEXT NOT NULL DEFAULT 'private' CHECK(visibility IN ('public', 'private')),
            creation_date TEXT NOT NULL,
            last_modified TEXT NOT NULL,
            submitter_id INTEGER NOT NULL REFERENCES users(id)
        );

        CREATE INDEX idx_apps_last_modified ON apps(last_modified);

        CREATE TABLE app_maintainers (
            app_id INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (app_id, user_id)
        );

        CREATE TABLE scripts (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app_id INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
            filepath TEXT NOT NULL,
            shell TEXT NOT NULL,
            version TEXT,
            description TEXT NOT NULL DEFAULT '',
            use_default_action_dispatcher INTEGER NOT NULL DEFAULT 1,
            creation_date TEXT NOT NULL,
            last_modified TEXT NOT NULL,
            submitter_id INTEGER NOT NULL REFERENCES users(id)
        );

        CREATE INDEX idx_scripts_app ON scripts(app_id);

        CREATE TABLE script_actions (
            script_id INTEGER NOT NULL REFERENCES scripts(id) ON DELETE CASCADE,
            action TEXT NOT NULL,
            PRIMARY KEY (script_id, action)
        );

        CREATE TABLE script_maintainers (
            script_id INTEGER NOT NULL REFERENCES scripts(id) ON DELETE CASCADE,
            user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (script_id, user_id)
        );

        -- Support pairs; either side may be the wildcard '*'
        CREATE TABLE supported_distros (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            script_id INTEGER NOT NULL REFERENCES scripts(id) ON DELETE CASCADE,
            distro_name TEXT NOT NULL,
            architecture_name TEXT NOT NULL,
            UNIQUE(script_id, distro_name, architecture_name)
        );

        CREATE INDEX idx_supported_distros_script ON supported_distros(script_id);
        CREATE INDEX idx_supported_distros_pair ON supported_distros(distro_name, architecture_name);
        ",
    )?;

    info!("Schema version 1 created successfully");
    Ok(())
}

/// Version 2 - discussion threads attached to apps
fn migrate_v2(conn: &Connection) -> Result<()> {
    debug!("Migrating to schema version 2");

    conn.execute_batch(
        "
        CREATE TABLE threads (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            app_id INTEGER NOT NULL REFERENCES apps(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            creator_id INTEGER NOT NULL REFERENCES users(id),
            creation_date TEXT NOT NULL
        );

        CREATE INDEX idx_threads_app ON threads(app_id);
        ",
    )?;

    info!("Schema version 2 applied successfully");
    Ok(())
}
