// src/shell.rs

//! Shell descriptors
//!
//! The set of shells a script may be written for is fixed. Each entry
//! carries the interpreter used in the shebang, the file type served to
//! browsers, and the three fragments the assembler uses to build the
//! action dispatcher appended to a script body.

use serde::Serialize;

/// Token in `dispatcher_case` replaced by one action name
pub const ACTION_TOKEN: &str = "<action>";

/// Token in `dispatcher_fallback` replaced by the space-separated action list
pub const ACTIONS_TOKEN: &str = "<actions>";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Shell {
    pub name: &'static str,
    pub file_extension: &'static str,
    pub file_mimetype: &'static str,
    pub interpreter_path: &'static str,
    /// Optional argument placed after the interpreter in the shebang
    pub interpreter_arg: &'static str,
    pub dispatcher_prelude: &'static str,
    pub dispatcher_case: &'static str,
    pub dispatcher_fallback: &'static str,
}

const POSIX_CASE: &str = "if [ \"<action>\" = \"$1\" ]; then\n    <action>\n    exit\nfi\n";

const POSIX_FALLBACK: &str = "echo \"Please re-run the script with one of the following actions \
     as the first argument: <actions>.\"\nexit 1\n";

/// Every supported shell
pub const SHELLS: &[Shell] = &[
    Shell {
        name: "sh",
        file_extension: "sh",
        file_mimetype: "application/x-shellscript",
        interpreter_path: "/bin/sh",
        interpreter_arg: "",
        dispatcher_prelude: "",
        dispatcher_case: POSIX_CASE,
        dispatcher_fallback: POSIX_FALLBACK,
    },
    Shell {
        name: "bash",
        file_extension: "sh",
        file_mimetype: "application/x-shellscript",
        interpreter_path: "/bin/bash",
        interpreter_arg: "",
        dispatcher_prelude: "",
        dispatcher_case: POSIX_CASE,
        dispatcher_fallback: POSIX_FALLBACK,
    },
    Shell {
        name: "python",
        file_extension: "py",
        file_mimetype: "text/x-python",
        interpreter_path: "/usr/bin/env",
        interpreter_arg: "python3",
        dispatcher_prelude: "import sys\n\n",
        dispatcher_case: "if len(sys.argv) > 1 and sys.argv[1] == '<action>':\n    <action>()\n    sys.exit()\n",
        dispatcher_fallback: "print('Please re-run the script with one of the following actions \
             as the first argument: <actions>.')\nsys.exit(1)\n",
    },
];

/// Look up a shell by name
pub fn find(name: &str) -> Option<&'static Shell> {
    SHELLS.iter().find(|s| s.name == name)
}

/// Names of all supported shells
pub fn names() -> Vec<&'static str> {
    SHELLS.iter().map(|s| s.name).collect()
}

impl Shell {
    /// The `#!` line, without trailing newline
    pub fn shebang(&self) -> String {
        if self.interpreter_arg.is_empty() {
            format!("#!{}", self.interpreter_path)
        } else {
            format!("#!{} {}", self.interpreter_path, self.interpreter_arg)
        }
    }
}
