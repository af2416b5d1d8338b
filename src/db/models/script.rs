// src/db/models/script.rs

//! Script model - metadata for one stored script body
//!
//! Actions, maintainers and support pairs live in child tables and are
//! loaded separately.

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// Columns selected for a Script, in `from_row` order. Expects `scripts s JOIN users su`.
pub(crate) const SCRIPT_COLUMNS: &str = "s.id, s.app_id, s.filepath, s.shell, s.version, \
     s.description, s.use_default_action_dispatcher, s.creation_date, s.last_modified, \
     s.submitter_id, su.username";

/// FROM clause matching `SCRIPT_COLUMNS`
pub(crate) const SCRIPT_FROM: &str = "scripts s JOIN users su ON su.id = s.submitter_id";

#[derive(Debug, Clone)]
pub struct Script {
    pub id: Option<i64>,
    pub app_id: i64,
    /// Absolute path of the body file
    pub filepath: String,
    pub shell: String,
    /// Target app version; `None` means any version
    pub version: Option<String>,
    pub description: String,
    pub use_default_action_dispatcher: bool,
    pub creation_date: Option<String>,
    pub last_modified: Option<String>,
    pub submitter_id: i64,
    pub submitter: Option<String>,
}

impl Script {
    pub fn new(app_id: i64, filepath: String, shell: String, submitter_id: i64) -> Self {
        Self {
            id: None,
            app_id,
            filepath,
            shell,
            version: None,
            description: String::new(),
            use_default_action_dispatcher: true,
            creation_date: None,
            last_modified: None,
            submitter_id,
            submitter: None,
        }
    }

    /// Insert this script row, stamping its dates with `timestamp`
    pub fn insert(&mut self, conn: &Connection, timestamp: &str) -> Result<i64> {
        conn.execute(
            "INSERT INTO scripts (app_id, filepath, shell, version, description,
                                  use_default_action_dispatcher, creation_date, last_modified,
                                  submitter_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)",
            params![
                self.app_id,
                &self.filepath,
                &self.shell,
                &self.version,
                &self.description,
                self.use_default_action_dispatcher as i32,
                timestamp,
                self.submitter_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.creation_date = Some(timestamp.to_string());
        self.last_modified = Some(timestamp.to_string());
        Ok(id)
    }

    /// Find a script by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM {} WHERE s.id = ?1", SCRIPT_COLUMNS, SCRIPT_FROM);
        let script = conn.query_row(&sql, [id], Self::from_row).optional()?;
        Ok(script)
    }

    /// All scripts belonging to an app
    pub fn find_by_app(conn: &Connection, app_id: i64) -> Result<Vec<Self>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE s.app_id = ?1 ORDER BY s.id",
            SCRIPT_COLUMNS, SCRIPT_FROM
        );
        let mut stmt = conn.prepare(&sql)?;
        let scripts = stmt
            .query_map([app_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scripts)
    }

    /// Rewrite the metadata columns and stamp `last_modified`
    pub fn update(&mut self, conn: &Connection, timestamp: &str) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::InitError("Cannot update script without ID".to_string()))?;

        conn.execute(
            "UPDATE scripts SET filepath = ?1, shell = ?2, version = ?3, description = ?4,
             use_default_action_dispatcher = ?5, last_modified = ?6 WHERE id = ?7",
            params![
                &self.filepath,
                &self.shell,
                &self.version,
                &self.description,
                self.use_default_action_dispatcher as i32,
                timestamp,
                id,
            ],
        )?;

        self.last_modified = Some(timestamp.to_string());
        Ok(())
    }

    /// Delete a script row; actions, maintainers and support pairs cascade
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM scripts WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Actions of a script, sorted
    pub fn actions(conn: &Connection, script_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn
            .prepare("SELECT action FROM script_actions WHERE script_id = ?1 ORDER BY action")?;
        let actions = stmt
            .query_map([script_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(actions)
    }

    /// Replace the action set of a script
    pub fn set_actions(conn: &Connection, script_id: i64, actions: &[String]) -> Result<()> {
        conn.execute("DELETE FROM script_actions WHERE script_id = ?1", [script_id])?;
        for action in actions {
            conn.execute(
                "INSERT OR IGNORE INTO script_actions (script_id, action) VALUES (?1, ?2)",
                params![script_id, action],
            )?;
        }
        Ok(())
    }

    /// Usernames of the script's maintainers
    pub fn maintainers(conn: &Connection, script_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT u.username FROM script_maintainers m JOIN users u ON u.id = m.user_id
             WHERE m.script_id = ?1 ORDER BY u.username",
        )?;
        let names = stmt
            .query_map([script_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    /// User IDs of the script's maintainers
    pub fn maintainer_ids(conn: &Connection, script_id: i64) -> Result<Vec<i64>> {
        let mut stmt = conn.prepare(
            "SELECT user_id FROM script_maintainers WHERE script_id = ?1 ORDER BY user_id",
        )?;
        let ids = stmt
            .query_map([script_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    /// Replace the maintainer set of a script
    pub fn set_maintainers(conn: &Connection, script_id: i64, user_ids: &[i64]) -> Result<()> {
        conn.execute("DELETE FROM script_maintainers WHERE script_id = ?1", [script_id])?;
        for user_id in user_ids {
            conn.execute(
                "INSERT OR IGNORE INTO script_maintainers (script_id, user_id) VALUES (?1, ?2)",
                params![script_id, user_id],
            )?;
        }
        Ok(())
    }

    pub fn is_maintainer(conn: &Connection, script_id: i64, user_id: i64) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM script_maintainers WHERE script_id = ?1 AND user_id = ?2",
                params![script_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            app_id: row.get(1)?,
            filepath: row.get(2)?,
            shell: row.get(3)?,
            version: row.get(4)?,
            description: row.get(5)?,
            use_default_action_dispatcher: row.get::<_, i32>(6)? != 0,
            creation_date: row.get(7)?,
            last_modified: row.get(8)?,
            submitter_id: row.get(9)?,
            submitter: row.get(10)?,
        })
    }
}
