// src/db/models/user.rs

//! User model - submitters, maintainers and administrators

use crate::db;
use crate::error::Result;
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A registered user. Authentication is handled outside this crate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Option<i64>,
    pub username: String,
    pub admin: bool,
    pub created_at: Option<String>,
}

impl User {
    /// Create a new non-admin User
    pub fn new(username: String) -> Self {
        Self {
            id: None,
            username,
            admin: false,
            created_at: None,
        }
    }

    /// Insert this user into the database
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let created_at = db::now();
        conn.execute(
            "INSERT INTO users (username, admin, created_at) VALUES (?1, ?2, ?3)",
            params![&self.username, self.admin as i32, &created_at],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        self.created_at = Some(created_at);
        Ok(id)
    }

    /// Find a user by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, username, admin, created_at FROM users WHERE id = ?1")?;
        let user = stmt.query_row([id], Self::from_row).optional()?;
        Ok(user)
    }

    /// Find a user by username
    pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, username, admin, created_at FROM users WHERE username = ?1")?;
        let user = stmt.query_row([username], Self::from_row).optional()?;
        Ok(user)
    }

    /// List all users ordered by username
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, username, admin, created_at FROM users ORDER BY username")?;
        let users = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(users)
    }

    /// Convert a database row to a User
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            username: row.get(1)?,
            admin: row.get::<_, i32>(2)? != 0,
            created_at: row.get(3)?,
        })
    }
}
