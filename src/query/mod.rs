// src/query/mod.rs

//! Query composer
//!
//! Turns a declarative parameter bag (usually an HTTP query string) into a
//! filtered, sorted and paginated SELECT over apps or scripts. Stages run in
//! a fixed order: join, filter, search, sort, paginate. Composition is pure:
//! the same parameters and scope always produce the same SQL and values.

pub mod filters;
mod page;

pub use filters::{DateFilter, SupportsEntry, parse_date, parse_supports};
pub use page::{Page, PageLimits};

use crate::db::models::{APP_COLUMNS, APP_FROM, App, SCRIPT_COLUMNS, SCRIPT_FROM, Script};
use crate::error::Result;
use crate::registry::DistroRegistry;
use filters::{APP_SPEC, SCRIPT_SPEC, Sql};
use rusqlite::{Connection, params_from_iter, types::Value};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

/// Parameter bag; blank values are treated as absent
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams(BTreeMap<String, String>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs(pairs: &[(&str, &str)]) -> Self {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.remove(key)
    }

    /// Trimmed value of `key`, or `None` if absent or blank
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

impl FromIterator<(String, String)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl From<HashMap<String, String>> for QueryParams {
    fn from(map: HashMap<String, String>) -> Self {
        map.into_iter().collect()
    }
}

/// Which apps a listing may show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppScope {
    /// Public apps only
    Public,
    /// Public apps plus private apps submitted by this user (admins see all)
    VisibleTo { user_id: i64, admin: bool },
    All,
}

/// Constraints on a script listing that do not come from the parameter bag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScriptScope {
    pub app_id: Option<i64>,
    pub script_id: Option<i64>,
    /// Keep scripts targeting this version or no version at all
    pub compatible_version: Option<String>,
    pub paginate: bool,
}

/// A composed SELECT ready to run
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedQuery {
    pub sql: String,
    /// `SELECT COUNT(*)` over the same filters, without paging
    pub count_sql: String,
    pub values: Vec<Value>,
    pub page: Option<Page>,
}

impl ComposedQuery {
    pub fn fetch_apps(&self, conn: &Connection) -> Result<Vec<App>> {
        debug!("App query: {}", self.sql);
        let mut stmt = conn.prepare(&self.sql)?;
        let apps = stmt
            .query_map(params_from_iter(self.values.iter()), App::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(apps)
    }

    pub fn fetch_scripts(&self, conn: &Connection) -> Result<Vec<Script>> {
        debug!("Script query: {}", self.sql);
        let mut stmt = conn.prepare(&self.sql)?;
        let scripts = stmt
            .query_map(params_from_iter(self.values.iter()), Script::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(scripts)
    }

    /// Total matching rows, ignoring pagination
    pub fn count(&self, conn: &Connection) -> Result<i64> {
        let total = conn.query_row(
            &self.count_sql,
            params_from_iter(self.values.iter()),
            |row| row.get(0),
        )?;
        Ok(total)
    }
}

/// Stateless composer; holds only the registry snapshot and page limits
#[derive(Debug, Clone, Copy)]
pub struct Composer<'a> {
    registry: &'a DistroRegistry,
    limits: PageLimits,
}

impl<'a> Composer<'a> {
    pub fn new(registry: &'a DistroRegistry, limits: PageLimits) -> Self {
        Self { registry, limits }
    }

    /// Compose an app listing
    pub fn apps(&self, params: &QueryParams, scope: AppScope) -> ComposedQuery {
        let mut sql = Sql::default();

        match scope {
            AppScope::Public => sql.push("a.visibility = 'public'", []),
            AppScope::VisibleTo { admin: true, .. } | AppScope::All => {}
            AppScope::VisibleTo { user_id, admin: false } => sql.push(
                "(a.visibility = 'public' OR a.submitter_id = ?)",
                [Value::Integer(user_id)],
            ),
        }
        filters::equality(&APP_SPEC, params, &mut sql);
        filters::search(&APP_SPEC, params, &mut sql);
        filters::sort(&APP_SPEC, params, &mut sql);

        let page = Page::from_params(params, self.limits);
        finish(APP_COLUMNS, APP_FROM, sql, Some(page))
    }

    /// Compose a script listing
    pub fn scripts(&self, params: &QueryParams, scope: &ScriptScope) -> ComposedQuery {
        let mut sql = Sql::default();

        if let Some(app_id) = scope.app_id {
            sql.push("s.app_id = ?", [Value::Integer(app_id)]);
        }
        if let Some(script_id) = scope.script_id {
            sql.push("s.id = ?", [Value::Integer(script_id)]);
        }
        if let Some(version) = &scope.compatible_version {
            sql.push(
                "(s.version = ? OR s.version IS NULL)",
                [Value::Text(version.clone())],
            );
        }
        filters::equality(&SCRIPT_SPEC, params, &mut sql);
        filters::supports(self.registry, params, &mut sql);
        filters::actions(params, &mut sql);
        filters::shell(params, &mut sql);
        filters::search(&SCRIPT_SPEC, params, &mut sql);
        filters::sort(&SCRIPT_SPEC, params, &mut sql);

        let page = scope
            .paginate
            .then(|| Page::from_params(params, self.limits));
        finish(SCRIPT_COLUMNS, SCRIPT_FROM, sql, page)
    }
}

fn finish(columns: &str, from: &str, sql: Sql, page: Option<Page>) -> ComposedQuery {
    let where_clause = sql.where_clause();
    let mut select = format!(
        "SELECT {} FROM {}{}{}",
        columns,
        from,
        where_clause,
        sql.order_clause()
    );
    if let Some(page) = &page {
        select.push_str(&page.sql());
    }

    ComposedQuery {
        sql: select,
        count_sql: format!("SELECT COUNT(*) FROM {}{}", from, where_clause),
        values: sql.values,
        page,
    }
}
