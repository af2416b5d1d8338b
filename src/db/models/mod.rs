// src/db/models/mod.rs

//! Data models for Installies database entities
//!
//! This module defines Rust structs that correspond to database tables
//! and provides methods for creating, reading, updating, and deleting records.

mod app;
mod distro;
mod script;
mod support;
mod thread;
mod user;

pub use app::{App, Visibility};
pub(crate) use app::{APP_COLUMNS, APP_FROM};
pub use distro::{Architecture, Distro, slugify};
pub use script::Script;
pub(crate) use script::{SCRIPT_COLUMNS, SCRIPT_FROM};
pub use support::{SupportPair, WILDCARD};
pub use thread::Thread;
pub use user::User;
