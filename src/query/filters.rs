// src/query/filters.rs

//! Filter, search and sort stages of the query composer
//!
//! Each stage appends SQL fragments and bound values to a `Sql` accumulator.
//! Nothing user-supplied is interpolated into SQL text: column names come
//! from the per-entity allow-lists below and values are bound parameters.

use super::QueryParams;
use crate::db::TIMESTAMP_FORMAT;
use crate::db::models::WILDCARD;
use crate::registry::DistroRegistry;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::types::Value;

/// Accumulated WHERE conditions, bound values and ORDER BY terms
#[derive(Debug, Default)]
pub(super) struct Sql {
    pub wheres: Vec<String>,
    pub values: Vec<Value>,
    pub order: Vec<String>,
}

impl Sql {
    pub fn push(&mut self, condition: impl Into<String>, values: impl IntoIterator<Item = Value>) {
        self.wheres.push(condition.into());
        self.values.extend(values);
    }

    pub fn where_clause(&self) -> String {
        if self.wheres.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.wheres.join(" AND "))
        }
    }

    pub fn order_clause(&self) -> String {
        if self.order.is_empty() {
            String::new()
        } else {
            format!(" ORDER BY {}", self.order.join(", "))
        }
    }
}

/// What an equality parameter compares against
#[derive(Debug, Clone, Copy)]
pub(super) enum Equality {
    Column(&'static str),
    Date(&'static str),
    /// Script has this action
    Action,
}

/// Per-entity allow-lists
pub(super) struct EntitySpec {
    pub alias: &'static str,
    pub sortable: &'static [(&'static str, &'static str)],
    pub default_sort: &'static str,
    pub equality: &'static [(&'static str, Equality)],
    /// Search attribute name and a condition with one `?` for the LIKE pattern
    pub searchable: &'static [(&'static str, &'static str)],
    pub default_search: &'static str,
}

pub(super) const APP_SPEC: EntitySpec = EntitySpec {
    alias: "a",
    sortable: &[
        ("name", "a.name"),
        ("display_name", "a.display_name"),
        ("current_version", "a.current_version"),
        ("creation_date", "a.creation_date"),
        ("last_modified", "a.last_modified"),
    ],
    default_sort: "a.name",
    equality: &[
        ("name", Equality::Column("a.name")),
        ("display_name", Equality::Column("a.display_name")),
        ("slug", Equality::Column("a.name")),
        ("version", Equality::Column("a.current_version")),
        ("last_modified", Equality::Date("a.last_modified")),
        ("creation_date", Equality::Date("a.creation_date")),
    ],
    searchable: &[
        ("name", "a.name LIKE ? ESCAPE '\\'"),
        ("display_name", "a.display_name LIKE ? ESCAPE '\\'"),
        ("description", "a.description LIKE ? ESCAPE '\\'"),
        ("submitter", "u.username LIKE ? ESCAPE '\\'"),
        (
            "maintainers",
            "EXISTS (SELECT 1 FROM app_maintainers am JOIN users mu ON mu.id = am.user_id \
             WHERE am.app_id = a.id AND mu.username LIKE ? ESCAPE '\\')",
        ),
    ],
    default_search: "name",
};

pub(super) const SCRIPT_SPEC: EntitySpec = EntitySpec {
    alias: "s",
    sortable: &[
        ("id", "s.id"),
        ("shell", "s.shell"),
        ("version", "s.version"),
        ("creation_date", "s.creation_date"),
        ("last_modified", "s.last_modified"),
    ],
    default_sort: "s.id",
    equality: &[
        ("action", Equality::Action),
        ("version", Equality::Column("s.version")),
        ("last_modified", Equality::Date("s.last_modified")),
        ("creation_date", Equality::Date("s.creation_date")),
    ],
    searchable: &[
        ("description", "s.description LIKE ? ESCAPE '\\'"),
        ("submitter", "su.username LIKE ? ESCAPE '\\'"),
        ("shell", "s.shell LIKE ? ESCAPE '\\'"),
        (
            "maintainers",
            "EXISTS (SELECT 1 FROM script_maintainers sm JOIN users mu ON mu.id = sm.user_id \
             WHERE sm.script_id = s.id AND mu.username LIKE ? ESCAPE '\\')",
        ),
    ],
    default_search: "description",
};

const ACTION_CONDITION: &str =
    "EXISTS (SELECT 1 FROM script_actions sa WHERE sa.script_id = s.id AND sa.action = ?)";

/// A parsed date filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DateFilter {
    /// Full timestamp with fraction: exact match
    Exact(String),
    /// Date or second-resolution timestamp: match the column prefix
    Prefix(String),
}

/// Parse a date filter value; `None` drops the filter
pub fn parse_date(value: &str) -> Option<DateFilter> {
    let value = value.trim();
    if value.contains('.') {
        return NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S%.f")
            .ok()
            .map(|dt| DateFilter::Exact(dt.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
        return Some(DateFilter::Prefix(dt.format("%Y-%m-%d %H:%M:%S").to_string()));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .map(|d| DateFilter::Prefix(d.format("%Y-%m-%d").to_string()))
}

/// Equality filters on named attributes
pub(super) fn equality(spec: &EntitySpec, params: &QueryParams, sql: &mut Sql) {
    for (name, target) in spec.equality {
        let Some(value) = params.get(name) else {
            continue;
        };
        match target {
            Equality::Column(column) => {
                sql.push(format!("{} = ?", column), [Value::Text(value.to_string())]);
            }
            Equality::Action => {
                sql.push(ACTION_CONDITION, [Value::Text(value.to_string())]);
            }
            Equality::Date(column) => match parse_date(value) {
                Some(DateFilter::Exact(ts)) => {
                    sql.push(format!("{} = ?", column), [Value::Text(ts)]);
                }
                Some(DateFilter::Prefix(prefix)) => {
                    let len = prefix.len();
                    sql.push(
                        format!("substr({}, 1, {}) = ?", column, len),
                        [Value::Text(prefix)],
                    );
                }
                None => {}
            },
        }
    }
}

/// Names from `search-in` that the entity allows, defaulting when none survive
pub(super) fn search_attributes(spec: &EntitySpec, params: &QueryParams) -> Vec<&'static str> {
    let mut selected: Vec<&'static str> = Vec::new();
    if let Some(list) = params.get("search-in") {
        for requested in list.split(',').map(str::trim) {
            if let Some((name, _)) = spec.searchable.iter().find(|(n, _)| *n == requested)
                && !selected.contains(name)
            {
                selected.push(*name);
            }
        }
    }
    if selected.is_empty() {
        selected.push(spec.default_search);
    }
    selected
}

/// Keyword search: every term must appear in at least one selected attribute
pub(super) fn search(spec: &EntitySpec, params: &QueryParams, sql: &mut Sql) {
    let Some(keywords) = params.get("k") else {
        return;
    };
    let attributes = search_attributes(spec, params);
    let conditions: Vec<&str> = attributes
        .iter()
        .filter_map(|a| spec.searchable.iter().find(|(n, _)| n == a).map(|(_, c)| *c))
        .collect();

    for term in keywords.split_whitespace() {
        let pattern = format!("%{}%", escape_like(term));
        sql.push(
            format!("({})", conditions.join(" OR ")),
            conditions.iter().map(|_| Value::Text(pattern.clone())),
        );
    }
}

/// `sort-by` / `order-by`, always finished with an id tiebreaker
pub(super) fn sort(spec: &EntitySpec, params: &QueryParams, sql: &mut Sql) {
    let column = params
        .get("sort-by")
        .and_then(|s| spec.sortable.iter().find(|(n, _)| *n == s))
        .map(|(_, c)| *c)
        .unwrap_or(spec.default_sort);

    let direction = match params.get("order-by") {
        Some(o) if o.eq_ignore_ascii_case("desc") => "DESC",
        _ => "ASC",
    };

    sql.order.push(format!("{} {}", column, direction));
    let id_column = format!("{}.id", spec.alias);
    if column != id_column {
        sql.order.push(format!("{} ASC", id_column));
    }
}

/// One entry of a `supports` list: a distro and optional architectures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportsEntry {
    pub distro: String,
    pub architectures: Vec<String>,
}

/// Parse `distro[:arch[:arch...]], distro2, ...`; blank entries are skipped
pub fn parse_supports(value: &str) -> Vec<SupportsEntry> {
    value
        .split(',')
        .filter_map(|entry| {
            let mut parts = entry.trim().split(':').map(str::trim);
            let distro = parts.next().filter(|d| !d.is_empty())?;
            Some(SupportsEntry {
                distro: distro.to_string(),
                architectures: parts.filter(|a| !a.is_empty()).map(str::to_string).collect(),
            })
        })
        .collect()
}

/// The script must have a support pair applying to each listed distro
pub(super) fn supports(registry: &DistroRegistry, params: &QueryParams, sql: &mut Sql) {
    let Some(value) = params.get("supports") else {
        return;
    };
    for entry in parse_supports(value) {
        supports_entry(registry, &entry, sql);
    }
}

pub(super) fn supports_entry(registry: &DistroRegistry, entry: &SupportsEntry, sql: &mut Sql) {
    let distros = if entry.distro == WILDCARD {
        Vec::new()
    } else {
        registry.applicable_distros(&entry.distro)
    };

    let mut architectures: Vec<String> = entry
        .architectures
        .iter()
        .map(|a| registry.canonicalize(a))
        .collect();
    if architectures.iter().any(|a| a == WILDCARD) {
        architectures.clear();
    } else if !architectures.is_empty() {
        architectures.push(WILDCARD.to_string());
    }
    architectures.sort();
    architectures.dedup();

    let mut condition =
        String::from("EXISTS (SELECT 1 FROM supported_distros sd WHERE sd.script_id = s.id");
    let mut values = Vec::new();
    if !distros.is_empty() {
        condition.push_str(&format!(" AND sd.distro_name IN ({})", placeholders(distros.len())));
        values.extend(distros.into_iter().map(Value::Text));
    }
    if !architectures.is_empty() {
        condition.push_str(&format!(
            " AND sd.architecture_name IN ({})",
            placeholders(architectures.len())
        ));
        values.extend(architectures.into_iter().map(Value::Text));
    }
    condition.push(')');
    sql.push(condition, values);
}

/// Every listed action must be supported by the script
pub(super) fn actions(params: &QueryParams, sql: &mut Sql) {
    let Some(value) = params.get("actions") else {
        return;
    };
    let mut seen = Vec::new();
    for action in value.split(',').map(str::trim).filter(|a| !a.is_empty()) {
        if seen.contains(&action) {
            continue;
        }
        seen.push(action);
        sql.push(ACTION_CONDITION, [Value::Text(action.to_string())]);
    }
}

/// Substring match on the shell name
pub(super) fn shell(params: &QueryParams, sql: &mut Sql) {
    if let Some(value) = params.get("shell") {
        sql.push(
            "s.shell LIKE ? ESCAPE '\\'",
            [Value::Text(format!("%{}%", escape_like(value)))],
        );
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
