// src/lib.rs

//! Installies
//!
//! A community repository of install scripts. Maintainers upload shell or
//! Python scripts for an app, each declaring the actions it handles and the
//! distro/architecture pairs it supports. Clients ask for the scripts that
//! apply to their host and run the one they pick.
//!
//! # Architecture
//!
//! - Storage: SQLite metadata plus one body file per script
//! - Distro registry: `based_on` inheritance and architecture aliases
//! - Query composer: declarative filters, search, sort and pagination
//! - Resolver and assembler: rank applicable scripts, render them runnable
//! - Server: two read-only JSON endpoints over axum
//! - Client: an interactive driver with a small JSON state file

pub mod assembler;
pub mod catalog;
pub mod cli;
pub mod client;
pub mod db;
mod error;
pub mod query;
pub mod registry;
pub mod resolver;
pub mod shell;
pub mod store;
pub mod validate;
pub mod wire;

#[cfg(feature = "server")]
pub mod server;

pub use error::{Error, Result};
pub use registry::{DistroRegistry, MatchTier, Specificity};
pub use resolver::{RankedScript, Resolution, ResolveRequest};
pub use store::{ScriptMetadata, ScriptStore};
