// src/db/models/support.rs

//! SupportPair model - one (distro, architecture) a script declares support for

use crate::error::Result;
use rusqlite::{Connection, Row, params};
use std::collections::BTreeMap;

/// Wildcard matching any distro or any architecture
pub const WILDCARD: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportPair {
    pub id: Option<i64>,
    pub script_id: i64,
    pub distro_name: String,
    pub architecture_name: String,
}

impl SupportPair {
    pub fn new(script_id: i64, distro_name: String, architecture_name: String) -> Self {
        Self {
            id: None,
            script_id,
            distro_name,
            architecture_name,
        }
    }

    /// Insert this pair; duplicates for the same script are ignored
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        conn.execute(
            "INSERT OR IGNORE INTO supported_distros (script_id, distro_name, architecture_name)
             VALUES (?1, ?2, ?3)",
            params![self.script_id, &self.distro_name, &self.architecture_name],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// All pairs for a script, ordered by distro then architecture
    pub fn find_by_script(conn: &Connection, script_id: i64) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, script_id, distro_name, architecture_name FROM supported_distros
             WHERE script_id = ?1 ORDER BY distro_name, architecture_name",
        )?;
        let pairs = stmt
            .query_map([script_id], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(pairs)
    }

    pub fn delete_for_script(conn: &Connection, script_id: i64) -> Result<()> {
        conn.execute(
            "DELETE FROM supported_distros WHERE script_id = ?1",
            [script_id],
        )?;
        Ok(())
    }

    /// Group pairs into `architecture -> [distro, ...]`, the shape sent to clients
    pub fn by_architecture(pairs: &[SupportPair]) -> BTreeMap<String, Vec<String>> {
        let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for pair in pairs {
            map.entry(pair.architecture_name.clone())
                .or_default()
                .push(pair.distro_name.clone());
        }
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            script_id: row.get(1)?,
            distro_name: row.get(2)?,
            architecture_name: row.get(3)?,
        })
    }
}
