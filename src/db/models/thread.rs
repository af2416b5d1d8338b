// src/db/models/thread.rs

//! Thread model - a discussion thread attached to an app

use crate::db;
use crate::error::Result;
use rusqlite::{Connection, Row, params};

#[derive(Debug, Clone)]
pub struct Thread {
    pub id: Option<i64>,
    pub app_id: i64,
    pub title: String,
    pub creator_id: i64,
    pub creation_date: Option<String>,
}

impl Thread {
    pub fn new(app_id: i64, title: String, creator_id: i64) -> Self {
        Self {
            id: None,
            app_id,
            title,
            creator_id,
            creation_date: None,
        }
    }

    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let now = db::now();
        conn.execute(
            "INSERT INTO threads (app_id, title, creator_id, creation_date) VALUES (?1, ?2, ?3, ?4)",
            params![self.app_id, &self.title, self.creator_id, &now],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.creation_date = Some(now);
        Ok(id)
    }

    /// Threads of an app, newest first
    pub fn find_by_app(conn: &Connection, app_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, app_id, title, creator_id, creation_date FROM threads
             WHERE app_id = ?1 ORDER BY creation_date DESC, id DESC",
        )?;
        let threads = stmt
            .query_map([app_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(threads)
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            app_id: row.get(1)?,
            title: row.get(2)?,
            creator_id: row.get(3)?,
            creation_date: row.get(4)?,
        })
    }
}
