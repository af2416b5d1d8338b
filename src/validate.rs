// src/validate.rs

//! Field validators
//!
//! A validator is a data name plus an ordered list of rules. The first rule
//! that fails produces a user-facing message formatted with the data name,
//! e.g. `App name cannot be empty.`

use crate::error::{Error, Result};
use crate::shell;

/// Default maximum script body length in bytes
pub const DEFAULT_MAX_CONTENT_LENGTH: usize = 65536;

#[derive(Debug, Clone, Copy)]
pub enum Rule {
    NotEmpty,
    MaxLen(usize),
    /// Every character must satisfy the predicate; the text describes what is allowed
    Charset(fn(char) -> bool, &'static str),
    KnownShell,
    Regex,
}

#[derive(Debug, Clone, Copy)]
pub struct Validator {
    pub data_name: &'static str,
    pub rules: &'static [Rule],
}

impl Validator {
    pub fn check(&self, value: &str) -> Result<()> {
        for rule in self.rules {
            if let Some(message) = self.violation(rule, value) {
                return Err(Error::ValidationError(message));
            }
        }
        Ok(())
    }

    fn violation(&self, rule: &Rule, value: &str) -> Option<String> {
        let name = self.data_name;
        match rule {
            Rule::NotEmpty if value.trim().is_empty() => Some(format!("{name} cannot be empty.")),
            Rule::MaxLen(max) if value.chars().count() > *max => {
                Some(format!("{name} must be {max} characters or less."))
            }
            Rule::Charset(allowed, description) if !value.chars().all(allowed) => {
                Some(format!("{name} can only contain {description}."))
            }
            Rule::KnownShell if shell::find(value).is_none() => Some(format!(
                "{name} must be one of: {}.",
                shell::names().join(", ")
            )),
            Rule::Regex if regex::Regex::new(value).is_err() => {
                Some(format!("{name} is not a valid regular expression."))
            }
            _ => None,
        }
    }
}

fn slug_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'
}

fn display_char(c: char) -> bool {
    c.is_alphanumeric() || c == ' ' || c == '-' || c == '_'
}

fn version_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '.' || c == '-'
}

fn action_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'
}

fn distro_char(c: char) -> bool {
    slug_char(c) || c == '!' || c == '*'
}

fn arch_char(c: char) -> bool {
    slug_char(c) || c == '*'
}

fn description_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ' ' | '_' | '-' | ',' | '.')
}

pub const APP_NAME: Validator = Validator {
    data_name: "App name",
    rules: &[
        Rule::NotEmpty,
        Rule::MaxLen(64),
        Rule::Charset(slug_char, "lowercase letters, digits, dashes and underscores"),
    ],
};

pub const APP_DISPLAY_NAME: Validator = Validator {
    data_name: "App display name",
    rules: &[
        Rule::MaxLen(64),
        Rule::Charset(display_char, "letters, digits, spaces, dashes and underscores"),
    ],
};

pub const APP_DESCRIPTION: Validator = Validator {
    data_name: "App description",
    rules: &[Rule::NotEmpty, Rule::MaxLen(1000)],
};

pub const VERSION: Validator = Validator {
    data_name: "Version",
    rules: &[
        Rule::MaxLen(64),
        Rule::Charset(version_char, "letters, digits, dots and dashes"),
    ],
};

pub const VERSION_REGEX: Validator = Validator {
    data_name: "Version regex",
    rules: &[Rule::MaxLen(255), Rule::Regex],
};

pub const SCRIPT_ACTION: Validator = Validator {
    data_name: "Script action",
    rules: &[
        Rule::NotEmpty,
        Rule::MaxLen(32),
        Rule::Charset(action_char, "lowercase letters, digits and dashes"),
    ],
};

pub const SCRIPT_SHELL: Validator = Validator {
    data_name: "Script shell",
    rules: &[Rule::KnownShell],
};

pub const SCRIPT_DISTRO: Validator = Validator {
    data_name: "Script distro",
    rules: &[
        Rule::NotEmpty,
        Rule::MaxLen(255),
        Rule::Charset(distro_char, "lowercase letters, digits, '-', '_', '!' and '*'"),
    ],
};

pub const SCRIPT_ARCHITECTURE: Validator = Validator {
    data_name: "Script architecture",
    rules: &[
        Rule::NotEmpty,
        Rule::MaxLen(255),
        Rule::Charset(arch_char, "lowercase letters, digits, '-', '_' and '*'"),
    ],
};

pub const SCRIPT_DESCRIPTION: Validator = Validator {
    data_name: "Script description",
    rules: &[
        Rule::MaxLen(255),
        Rule::Charset(
            description_char,
            "letters, digits, spaces and the characters _ - , .",
        ),
    ],
};

/// Script bodies have a configurable limit, so they get their own check
pub fn check_content(value: &str, max_len: usize) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::ValidationError(
            "Script content cannot be empty.".to_string(),
        ));
    }
    if value.len() > max_len {
        return Err(Error::ValidationError(format!(
            "Script content must be {max_len} characters or less."
        )));
    }
    Ok(())
}

/// Run a validator only when a value is present
pub fn check_optional(validator: &Validator, value: Option<&str>) -> Result<()> {
    value.map_or(Ok(()), |v| validator.check(v))
}
