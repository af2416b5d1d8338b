// src/db/models/app.rs

//! App model - a named entry in the catalog owning one or more scripts

use crate::db;
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::str::FromStr;

/// Columns selected for an App, in `from_row` order. Expects `apps a JOIN users u`.
pub(crate) const APP_COLUMNS: &str = "a.id, a.name, a.display_name, a.description, \
     a.current_version, a.version_regex, a.visibility, a.creation_date, a.last_modified, \
     a.submitter_id, u.username";

/// FROM clause matching `APP_COLUMNS`
pub(crate) const APP_FROM: &str = "apps a JOIN users u ON u.id = a.submitter_id";

/// Who may read an app
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Visibility {
    Public,
    #[default]
    Private,
}

impl Visibility {
    pub fn as_str(&self) -> &str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

impl FromStr for Visibility {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "public" => Ok(Visibility::Public),
            "private" => Ok(Visibility::Private),
            _ => Err(Error::ParseError(format!("Invalid visibility: {}", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct App {
    pub id: Option<i64>,
    pub name: String,
    pub display_name: Option<String>,
    pub description: String,
    pub current_version: Option<String>,
    pub version_regex: Option<String>,
    pub visibility: Visibility,
    pub creation_date: Option<String>,
    pub last_modified: Option<String>,
    pub submitter_id: i64,
    /// Submitter username, filled in on reads
    pub submitter: Option<String>,
}

impl App {
    /// Create a new private App
    pub fn new(name: String, description: String, submitter_id: i64) -> Self {
        Self {
            id: None,
            name,
            display_name: None,
            description,
            current_version: None,
            version_regex: None,
            visibility: Visibility::Private,
            creation_date: None,
            last_modified: None,
            submitter_id,
            submitter: None,
        }
    }

    /// Insert this app, stamping creation and modification dates
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let now = db::now();
        conn.execute(
            "INSERT INTO apps (name, display_name, description, current_version, version_regex,
                               visibility, creation_date, last_modified, submitter_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7, ?8)",
            params![
                &self.name,
                &self.display_name,
                &self.description,
                &self.current_version,
                &self.version_regex,
                self.visibility.as_str(),
                &now,
                self.submitter_id,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.creation_date = Some(now.clone());
        self.last_modified = Some(now);
        Ok(id)
    }

    /// Find an app by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM {} WHERE a.id = ?1", APP_COLUMNS, APP_FROM);
        let app = conn.query_row(&sql, [id], Self::from_row).optional()?;
        Ok(app)
    }

    /// Find an app by its canonical name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let sql = format!("SELECT {} FROM {} WHERE a.name = ?1", APP_COLUMNS, APP_FROM);
        let app = conn.query_row(&sql, [name], Self::from_row).optional()?;
        Ok(app)
    }

    /// Update the editable fields; `name` is immutable after creation
    pub fn update(&mut self, conn: &Connection) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::InitError("Cannot update app without ID".to_string()))?;
        let now = db::now();

        conn.execute(
            "UPDATE apps SET display_name = ?1, description = ?2, current_version = ?3,
             version_regex = ?4, visibility = ?5, last_modified = ?6 WHERE id = ?7",
            params![
                &self.display_name,
                &self.description,
                &self.current_version,
                &self.version_regex,
                self.visibility.as_str(),
                &now,
                id,
            ],
        )?;

        self.last_modified = Some(now);
        Ok(())
    }

    /// Set `last_modified` without touching anything else
    pub fn touch(conn: &Connection, id: i64, timestamp: &str) -> Result<()> {
        conn.execute(
            "UPDATE apps SET last_modified = ?1 WHERE id = ?2",
            params![timestamp, id],
        )?;
        Ok(())
    }

    /// Delete an app; scripts, maintainers, support pairs and threads cascade
    pub fn delete(conn: &Connection, id: i64) -> Result<()> {
        conn.execute("DELETE FROM apps WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Usernames of the app's maintainers
    pub fn maintainers(conn: &Connection, app_id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT u.username FROM app_maintainers m JOIN users u ON u.id = m.user_id
             WHERE m.app_id = ?1 ORDER BY u.username",
        )?;
        let names = stmt
            .query_map([app_id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }

    pub fn add_maintainer(conn: &Connection, app_id: i64, user_id: i64) -> Result<()> {
        conn.execute(
            "INSERT OR IGNORE INTO app_maintainers (app_id, user_id) VALUES (?1, ?2)",
            params![app_id, user_id],
        )?;
        Ok(())
    }

    pub fn is_maintainer(conn: &Connection, app_id: i64, user_id: i64) -> Result<bool> {
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM app_maintainers WHERE app_id = ?1 AND user_id = ?2",
                params![app_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub(crate) fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let visibility: String = row.get(6)?;
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            display_name: row.get(2)?,
            description: row.get(3)?,
            current_version: row.get(4)?,
            version_regex: row.get(5)?,
            visibility: visibility.parse::<Visibility>().map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    6,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        e.to_string(),
                    )),
                )
            })?,
            creation_date: row.get(7)?,
            last_modified: row.get(8)?,
            submitter_id: row.get(9)?,
            submitter: row.get(10)?,
        })
    }
}
