// src/db/models/distro.rs

//! Distro and Architecture models
//!
//! Distros form a forest through `based_on_id`. Architectures carry a list
//! of alternative names that are rewritten to the canonical name on ingest.

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A known Linux distribution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Distro {
    pub id: Option<i64>,
    pub name: String,
    pub slug: String,
    pub based_on_id: Option<i64>,
}

impl Distro {
    /// Create a new root Distro; the slug is derived from the name
    pub fn new(name: String) -> Self {
        let slug = slugify(&name);
        Self {
            id: None,
            name,
            slug,
            based_on_id: None,
        }
    }

    /// Insert this distro into the database
    ///
    /// Does not check for cycles; use `DistroRegistry::add_distro` for that.
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO distros (name, slug, based_on_id) VALUES (?1, ?2, ?3)",
            params![&self.name, &self.slug, &self.based_on_id],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a distro by ID
    pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, slug, based_on_id FROM distros WHERE id = ?1")?;
        let distro = stmt.query_row([id], Self::from_row).optional()?;
        Ok(distro)
    }

    /// Find a distro by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, slug, based_on_id FROM distros WHERE name = ?1")?;
        let distro = stmt.query_row([name], Self::from_row).optional()?;
        Ok(distro)
    }

    /// List all distros
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt =
            conn.prepare("SELECT id, name, slug, based_on_id FROM distros ORDER BY name")?;
        let distros = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(distros)
    }

    /// Change the parent of a distro
    pub fn set_based_on(conn: &Connection, id: i64, based_on_id: Option<i64>) -> Result<()> {
        let rows = conn.execute(
            "UPDATE distros SET based_on_id = ?1 WHERE id = ?2",
            params![based_on_id, id],
        )?;
        if rows == 0 {
            return Err(Error::NotFoundError(format!("distro {}", id)));
        }
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            name: row.get(1)?,
            slug: row.get(2)?,
            based_on_id: row.get(3)?,
        })
    }
}

/// A canonical CPU architecture name plus its aliases
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Architecture {
    pub id: Option<i64>,
    pub name: String,
    pub alternative_names: Vec<String>,
}

impl Architecture {
    pub fn new(name: String, alternative_names: Vec<String>) -> Self {
        Self {
            id: None,
            name,
            alternative_names,
        }
    }

    /// Insert the architecture and all of its alternative names
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT INTO architectures (name) VALUES (?1)",
            params![&self.name],
        )?;
        let id = conn.last_insert_rowid();

        for alias in &self.alternative_names {
            conn.execute(
                "INSERT INTO architecture_aliases (architecture_id, name) VALUES (?1, ?2)",
                params![id, alias],
            )?;
        }

        self.id = Some(id);
        Ok(id)
    }

    /// Find an architecture by canonical name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let found = conn
            .query_row(
                "SELECT id, name FROM architectures WHERE name = ?1",
                [name],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )
            .optional()?;

        match found {
            Some((id, name)) => Ok(Some(Self {
                id: Some(id),
                name,
                alternative_names: Self::aliases_for(conn, id)?,
            })),
            None => Ok(None),
        }
    }

    /// List all architectures with their aliases
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT id, name FROM architectures ORDER BY name")?;
        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)))?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        rows.into_iter()
            .map(|(id, name)| {
                Ok(Self {
                    id: Some(id),
                    name,
                    alternative_names: Self::aliases_for(conn, id)?,
                })
            })
            .collect()
    }

    /// Return the canonical name an alias points at, if any
    pub fn canonical_for_alias(conn: &Connection, alias: &str) -> Result<Option<String>> {
        let name = conn
            .query_row(
                "SELECT a.name FROM architecture_aliases al
                 JOIN architectures a ON a.id = al.architecture_id
                 WHERE al.name = ?1",
                [alias],
                |row| row.get(0),
            )
            .optional()?;
        Ok(name)
    }

    fn aliases_for(conn: &Connection, id: i64) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT name FROM architecture_aliases WHERE architecture_id = ?1 ORDER BY name",
        )?;
        let names = stmt
            .query_map([id], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;
        Ok(names)
    }
}

/// Lowercase a name and collapse runs of non-alphanumerics into single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
