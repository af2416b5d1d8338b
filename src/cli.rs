// src/cli.rs
//! CLI definitions for the Installies binaries
//!
//! `installies` is the end-user client. `installies-server` runs the HTTP
//! API and carries the offline administration commands.

use clap::{Args, Parser, Subcommand};
#[cfg(feature = "server")]
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "installies")]
#[command(about = "Install apps with community-maintained scripts", long_about = None)]
#[command(disable_version_flag = true)]
pub struct ClientCli {
    /// Print the client version
    #[arg(short = 'v', long = "version")]
    pub version: bool,

    #[command(subcommand)]
    pub command: Option<ClientCommand>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ClientCommand {
    /// Install an app
    Install(ActionArgs),
    /// Remove an installed app
    Remove(ActionArgs),
    /// Update an installed app
    Update(ActionArgs),
    /// Build and install an app from source
    Compile(ActionArgs),
    /// Run an app without recording it
    Run(ActionArgs),
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct ActionArgs {
    /// Print the script before running it
    #[arg(short = 'o', long = "output-script")]
    pub output_script: bool,

    /// App name, optionally pinned as `name==version`
    pub app: String,
}

impl ClientCommand {
    /// Action name passed to the script
    pub fn action(&self) -> &'static str {
        match self {
            ClientCommand::Install(_) => "install",
            ClientCommand::Remove(_) => "remove",
            ClientCommand::Update(_) => "update",
            ClientCommand::Compile(_) => "compile",
            ClientCommand::Run(_) => "run",
        }
    }

    pub fn args(&self) -> &ActionArgs {
        match self {
            ClientCommand::Install(args)
            | ClientCommand::Remove(args)
            | ClientCommand::Update(args)
            | ClientCommand::Compile(args)
            | ClientCommand::Run(args) => args,
        }
    }
}

#[cfg(feature = "server")]
#[derive(Parser, Debug)]
#[command(name = "installies-server")]
#[command(version)]
#[command(about = "Installies script repository server", long_about = None)]
pub struct ServerCli {
    /// Path to the server configuration file
    #[arg(short, long, default_value = crate::server::config::DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: ServerCommand,
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum ServerCommand {
    /// Run the HTTP API
    Serve {
        /// Override the configured bind address
        #[arg(long)]
        bind: Option<String>,
    },

    /// Create the database and script directory
    Init,

    /// Manage users
    User {
        #[command(subcommand)]
        command: UserCommand,
    },

    /// Manage distros
    Distro {
        #[command(subcommand)]
        command: DistroCommand,
    },

    /// Manage architectures
    Arch {
        #[command(subcommand)]
        command: ArchCommand,
    },

    /// Manage apps
    App {
        #[command(subcommand)]
        command: AppCommand,
    },

    /// Manage scripts
    Script {
        #[command(subcommand)]
        command: ScriptCommand,
    },
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum UserCommand {
    /// Create a user
    Add {
        username: String,

        /// Grant administrator rights
        #[arg(long)]
        admin: bool,
    },
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum DistroCommand {
    /// Create a distro
    Add {
        name: String,

        /// Parent distro this one is based on
        #[arg(long)]
        based_on: Option<String>,
    },

    /// Change (or clear) the parent of a distro
    SetParent {
        name: String,

        /// New parent; omit to make the distro a root
        #[arg(long)]
        based_on: Option<String>,
    },

    /// List distros with their parents
    List,
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum ArchCommand {
    /// Create an architecture
    Add {
        name: String,

        /// Alternative name, may be repeated
        #[arg(long = "alias")]
        aliases: Vec<String>,
    },
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum AppCommand {
    /// Create an app
    Add {
        name: String,

        #[arg(short, long)]
        description: String,

        #[arg(long)]
        display_name: Option<String>,

        #[arg(long)]
        current_version: Option<String>,

        /// Regex every requested version must match
        #[arg(long)]
        version_regex: Option<String>,

        /// List the app publicly
        #[arg(long)]
        public: bool,

        /// Acting user
        #[arg(long = "as")]
        as_user: String,
    },

    /// Delete an app with all of its scripts
    Delete {
        name: String,

        /// Acting user
        #[arg(long = "as")]
        as_user: String,
    },
}

#[cfg(feature = "server")]
#[derive(Subcommand, Debug)]
pub enum ScriptCommand {
    /// Add a script to an app, reading the body from a file
    Add {
        app: String,

        /// File holding the script body
        file: PathBuf,

        #[arg(long, default_value = "bash")]
        shell: String,

        /// Comma-separated actions, e.g. `install,remove`
        #[arg(long, value_delimiter = ',', required = true)]
        actions: Vec<String>,

        /// Supported distros, e.g. `ubuntu:amd64:arm64, fedora`
        #[arg(long)]
        supports: String,

        #[arg(long)]
        version: Option<String>,

        #[arg(long, default_value = "")]
        description: String,

        /// Do not append the action dispatcher
        #[arg(long)]
        no_dispatcher: bool,

        /// Acting user
        #[arg(long = "as")]
        as_user: String,
    },

    /// Delete a script
    Delete {
        id: i64,

        /// Acting user
        #[arg(long = "as")]
        as_user: String,
    },
}
