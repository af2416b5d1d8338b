// src/registry.rs

//! Distro registry and architecture alias table
//!
//! Distros form a forest through `based_on`. A script that supports a distro
//! also supports every descendant of it, with closer matches ranked higher.
//! Architectures have a canonical name plus aliases that are rewritten to it
//! both on ingest and on lookup.
//!
//! The registry is an immutable snapshot loaded from the database; it is
//! cheap to rebuild and safe to share between threads.

use crate::db::models::{Architecture, Distro, SupportPair, WILDCARD};
use crate::error::{Error, Result};
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use tracing::info;

/// How a support pair matched a client, best first when sorted descending
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MatchTier {
    AnyDistroAnyArch,
    AnyDistroExactArch,
    AncestorAnyArch,
    AncestorExactArch,
    ExactDistroAnyArch,
    ExactDistroExactArch,
}

/// Strength of a match between a support pair and a client
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Specificity {
    pub tier: MatchTier,
    /// 0 for the client's own distro, 1 for its parent, ...; `None` for `*`
    pub distance: Option<usize>,
}

impl Specificity {
    /// True if `self` is a strictly better match than `other`
    pub fn outranks(&self, other: &Specificity) -> bool {
        self.rank_key() < other.rank_key()
    }

    /// Ascending key: smaller sorts first
    pub fn rank_key(&self) -> (std::cmp::Reverse<MatchTier>, usize) {
        (
            std::cmp::Reverse(self.tier),
            self.distance.unwrap_or(usize::MAX),
        )
    }
}

/// Immutable snapshot of known distros and architectures
#[derive(Debug, Clone, Default)]
pub struct DistroRegistry {
    parents: HashMap<String, Option<String>>,
    aliases: HashMap<String, String>,
    architectures: HashSet<String>,
}

impl DistroRegistry {
    /// Load the registry from the database
    pub fn load(conn: &Connection) -> Result<Self> {
        let distros = Distro::list_all(conn)?;
        let by_id: HashMap<i64, String> = distros
            .iter()
            .filter_map(|d| d.id.map(|id| (id, d.name.clone())))
            .collect();

        let parents = distros
            .iter()
            .map(|d| {
                let parent = d.based_on_id.and_then(|id| by_id.get(&id).cloned());
                (d.name.clone(), parent)
            })
            .collect();

        let mut registry = Self {
            parents,
            ..Self::default()
        };
        for arch in Architecture::list_all(conn)? {
            registry.insert_architecture(&arch.name, &arch.alternative_names);
        }
        Ok(registry)
    }

    /// Build a registry in memory from `(name, parent)` and `(arch, aliases)` lists
    pub fn from_parts(distros: &[(&str, Option<&str>)], architectures: &[(&str, &[&str])]) -> Self {
        let mut registry = Self {
            parents: distros
                .iter()
                .map(|(name, parent)| (name.to_string(), parent.map(str::to_string)))
                .collect(),
            ..Self::default()
        };
        for (name, aliases) in architectures {
            let aliases: Vec<String> = aliases.iter().map(|a| a.to_string()).collect();
            registry.insert_architecture(name, &aliases);
        }
        registry
    }

    fn insert_architecture(&mut self, name: &str, aliases: &[String]) {
        self.architectures.insert(name.to_string());
        for alias in aliases {
            self.aliases.insert(alias.clone(), name.to_string());
        }
    }

    pub fn contains_distro(&self, name: &str) -> bool {
        self.parents.contains_key(name)
    }

    pub fn contains_architecture(&self, name: &str) -> bool {
        self.architectures.contains(name)
    }

    pub fn parent(&self, name: &str) -> Option<&str> {
        self.parents.get(name).and_then(|p| p.as_deref())
    }

    /// Parent, grandparent, ... of `name`, nearest first
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut chain = Vec::new();
        let mut seen: HashSet<&str> = HashSet::from([name]);
        let mut current = self.parent(name);

        while let Some(parent) = current {
            if !seen.insert(parent) {
                break;
            }
            chain.push(parent.to_string());
            current = self.parent(parent);
        }
        chain
    }

    /// `name` plus the transitive closure of its children
    pub fn descendants(&self, name: &str) -> Vec<String> {
        let mut result = vec![name.to_string()];
        let mut index = 0;
        while index < result.len() {
            let current = result[index].clone();
            let mut children: Vec<&String> = self
                .parents
                .iter()
                .filter(|(_, parent)| parent.as_deref() == Some(current.as_str()))
                .map(|(child, _)| child)
                .collect();
            children.sort();
            for child in children {
                if !result.contains(child) {
                    result.push(child.clone());
                }
            }
            index += 1;
        }
        result
    }

    /// Distance from `client_distro` up to `script_distro`: 0 when equal,
    /// 1 for the parent, and so on. `None` when unrelated.
    pub fn ancestor_distance(&self, script_distro: &str, client_distro: &str) -> Option<usize> {
        if script_distro == client_distro {
            return Some(0);
        }
        self.ancestors(client_distro)
            .iter()
            .position(|a| a == script_distro)
            .map(|i| i + 1)
    }

    /// True when a script declaring `script_distro` applies to `client_distro`
    pub fn matches(&self, script_distro: &str, client_distro: &str) -> bool {
        script_distro == WILDCARD || self.ancestor_distance(script_distro, client_distro).is_some()
    }

    /// Rewrite an architecture alias to its canonical name
    pub fn canonicalize(&self, arch: &str) -> String {
        self.aliases
            .get(arch)
            .cloned()
            .unwrap_or_else(|| arch.to_string())
    }

    /// Specificity of one support pair for a client, or `None` if it does not apply
    pub fn specificity(
        &self,
        pair_distro: &str,
        pair_arch: &str,
        client_distro: &str,
        client_arch: &str,
    ) -> Option<Specificity> {
        let pair_arch = self.canonicalize(pair_arch);
        let client_arch = self.canonicalize(client_arch);

        let exact_arch = if pair_arch == WILDCARD || client_arch == WILDCARD {
            false
        } else if pair_arch == client_arch {
            true
        } else {
            return None;
        };

        if pair_distro == WILDCARD {
            let tier = if exact_arch {
                MatchTier::AnyDistroExactArch
            } else {
                MatchTier::AnyDistroAnyArch
            };
            return Some(Specificity {
                tier,
                distance: None,
            });
        }

        let distance = self.ancestor_distance(pair_distro, client_distro)?;
        let tier = match (distance == 0, exact_arch) {
            (true, true) => MatchTier::ExactDistroExactArch,
            (true, false) => MatchTier::ExactDistroAnyArch,
            (false, true) => MatchTier::AncestorExactArch,
            (false, false) => MatchTier::AncestorAnyArch,
        };
        Some(Specificity {
            tier,
            distance: Some(distance),
        })
    }

    /// Best specificity over a script's support pairs
    pub fn best_match(
        &self,
        pairs: &[SupportPair],
        client_distro: &str,
        client_arch: &str,
    ) -> Option<Specificity> {
        pairs
            .iter()
            .filter_map(|p| {
                self.specificity(&p.distro_name, &p.architecture_name, client_distro, client_arch)
            })
            .min_by_key(|s| s.rank_key())
    }

    /// Distro names a support pair may carry to apply to `client_distro`
    pub fn applicable_distros(&self, client_distro: &str) -> Vec<String> {
        let mut names = vec![client_distro.to_string()];
        names.extend(self.ancestors(client_distro));
        names.push(WILDCARD.to_string());
        names
    }
}

/// Register a distro, optionally based on an existing one
pub fn add_distro(conn: &Connection, name: &str, based_on: Option<&str>) -> Result<Distro> {
    if Distro::find_by_name(conn, name)?.is_some() {
        return Err(Error::ValidationError(format!(
            "Distro '{}' already exists.",
            name
        )));
    }

    let mut distro = Distro::new(name.to_string());
    distro.based_on_id = resolve_parent(conn, based_on)?;
    distro.insert(conn)?;

    info!("Registered distro {} (based on {:?})", name, based_on);
    Ok(distro)
}

/// Change which distro `name` is based on, refusing to create a cycle
pub fn set_distro_parent(conn: &Connection, name: &str, based_on: Option<&str>) -> Result<()> {
    let distro = Distro::find_by_name(conn, name)?
        .ok_or_else(|| Error::NotFoundError(format!("distro '{}'", name)))?;
    let id = distro
        .id
        .ok_or_else(|| Error::InitError("Distro loaded without ID".to_string()))?;

    if let Some(parent) = based_on {
        let registry = DistroRegistry::load(conn)?;
        if parent == name || registry.ancestors(parent).iter().any(|a| a == name) {
            return Err(Error::ValidationError(format!(
                "Distro '{}' cannot be based on '{}': that would create a cycle.",
                name, parent
            )));
        }
    }

    let parent_id = resolve_parent(conn, based_on)?;
    Distro::set_based_on(conn, id, parent_id)?;
    info!("Distro {} is now based on {:?}", name, based_on);
    Ok(())
}

fn resolve_parent(conn: &Connection, based_on: Option<&str>) -> Result<Option<i64>> {
    match based_on {
        None => Ok(None),
        Some(parent) => {
            let parent = Distro::find_by_name(conn, parent)?.ok_or_else(|| {
                Error::ValidationError(format!("Unknown parent distro '{}'.", parent))
            })?;
            Ok(parent.id)
        }
    }
}

/// Register an architecture with its alternative names
pub fn add_architecture(
    conn: &Connection,
    name: &str,
    alternative_names: &[String],
) -> Result<Architecture> {
    let registry = DistroRegistry::load(conn)?;
    let taken = |n: &str| registry.contains_architecture(n) || registry.aliases.contains_key(n);

    if taken(name) {
        return Err(Error::ValidationError(format!(
            "Architecture name '{}' is already in use.",
            name
        )));
    }
    let mut seen = HashSet::new();
    for alias in alternative_names {
        if alias == name || taken(alias) || !seen.insert(alias.as_str()) {
            return Err(Error::ValidationError(format!(
                "Alternative architecture name '{}' is already in use.",
                alias
            )));
        }
    }

    let mut arch = Architecture::new(name.to_string(), alternative_names.to_vec());
    arch.insert(conn)?;
    info!("Registered architecture {} (aliases {:?})", name, alternative_names);
    Ok(arch)
}
