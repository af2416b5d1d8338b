// src/bin/installies-server.rs

use anyhow::{Context, Result};
use clap::Parser;
use installies::catalog::{AppInput, Catalog, ScriptInput};
use installies::cli::{
    AppCommand, ArchCommand, DistroCommand, ScriptCommand, ServerCli, ServerCommand, UserCommand,
};
use installies::db::{self, models::Distro, models::User, models::Visibility};
use installies::registry::{self, DistroRegistry};
use installies::server::{self, ServerConfig, ServerFileConfig};
use installies::store::ScriptStore;
use rusqlite::Connection;
use tracing::info;

fn open_db(config: &ServerConfig) -> Result<Connection> {
    let db_path = config.db_path.to_string_lossy();
    db::open(&db_path).with_context(|| format!("Failed to open database {}", db_path))
}

fn find_user(conn: &Connection, username: &str) -> Result<User> {
    User::find_by_username(conn, username)?
        .with_context(|| format!("No user named '{}'", username))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = ServerCli::parse();
    let file_config = ServerFileConfig::load_or_default(&cli.config)?;
    let mut config = file_config.to_server_config()?;
    let store = ScriptStore::new(config.upload_path.clone());
    let catalog = Catalog::new(&store).with_max_content_length(config.max_content_length);

    match cli.command {
        ServerCommand::Serve { bind } => {
            if let Some(bind) = bind {
                config.bind_addr = bind
                    .parse()
                    .with_context(|| format!("Invalid bind address: {}", bind))?;
            }
            server::run_server(config).await
        }
        ServerCommand::Init => {
            let db_path = config.db_path.to_string_lossy().to_string();
            db::init(&db_path)?;
            std::fs::create_dir_all(&config.upload_path).with_context(|| {
                format!("Failed to create {}", config.upload_path.display())
            })?;
            println!("Database initialized at: {}", db_path);
            println!("Script bodies stored in: {}", config.upload_path.display());
            Ok(())
        }
        ServerCommand::User {
            command: UserCommand::Add { username, admin },
        } => {
            let conn = open_db(&config)?;
            let mut user = User::new(username);
            user.admin = admin;
            let id = user.insert(&conn)?;
            info!("Created user {} ({})", user.username, id);
            println!("Created user {} with ID {}", user.username, id);
            Ok(())
        }
        ServerCommand::Distro { command } => {
            let conn = open_db(&config)?;
            match command {
                DistroCommand::Add { name, based_on } => {
                    let distro = registry::add_distro(&conn, &name, based_on.as_deref())?;
                    println!("Created distro {} ({})", distro.name, distro.slug);
                }
                DistroCommand::SetParent { name, based_on } => {
                    registry::set_distro_parent(&conn, &name, based_on.as_deref())?;
                    match based_on {
                        Some(parent) => println!("{} is now based on {}", name, parent),
                        None => println!("{} no longer has a parent", name),
                    }
                }
                DistroCommand::List => {
                    let registry = DistroRegistry::load(&conn)?;
                    for distro in Distro::list_all(&conn)? {
                        match registry.parent(&distro.name) {
                            Some(parent) => println!("{} (based on {})", distro.name, parent),
                            None => println!("{}", distro.name),
                        }
                    }
                }
            }
            Ok(())
        }
        ServerCommand::Arch {
            command: ArchCommand::Add { name, aliases },
        } => {
            let conn = open_db(&config)?;
            let arch = registry::add_architecture(&conn, &name, &aliases)?;
            println!(
                "Created architecture {} (aliases: {})",
                arch.name,
                arch.alternative_names.join(", ")
            );
            Ok(())
        }
        ServerCommand::App { command } => {
            let mut conn = open_db(&config)?;
            match command {
                AppCommand::Add {
                    name,
                    description,
                    display_name,
                    current_version,
                    version_regex,
                    public,
                    as_user,
                } => {
                    let caller = find_user(&conn, &as_user)?;
                    let input = AppInput {
                        name,
                        display_name,
                        description,
                        current_version,
                        version_regex,
                        visibility: if public {
                            Visibility::Public
                        } else {
                            Visibility::Private
                        },
                    };
                    let app = catalog.create_app(&mut conn, Some(&caller), &input)?;
                    println!("Created app {} ({})", app.name, app.visibility.as_str());
                }
                AppCommand::Delete { name, as_user } => {
                    let caller = find_user(&conn, &as_user)?;
                    catalog.delete_app(&mut conn, Some(&caller), &name)?;
                    println!("Deleted app {}", name);
                }
            }
            Ok(())
        }
        ServerCommand::Script { command } => {
            let mut conn = open_db(&config)?;
            match command {
                ScriptCommand::Add {
                    app,
                    file,
                    shell,
                    actions,
                    supports,
                    version,
                    description,
                    no_dispatcher,
                    as_user,
                } => {
                    let caller = find_user(&conn, &as_user)?;
                    let content = std::fs::read_to_string(&file)
                        .with_context(|| format!("Failed to read {}", file.display()))?;
                    let input = ScriptInput {
                        content,
                        shell,
                        actions,
                        supported_distros: supports,
                        version,
                        description,
                        use_default_action_dispatcher: !no_dispatcher,
                    };
                    let registry = DistroRegistry::load(&conn)?;
                    let id =
                        catalog.create_script(&mut conn, &registry, Some(&caller), &app, &input)?;
                    println!("Created script {} for {}", id, app);
                }
                ScriptCommand::Delete { id, as_user } => {
                    let caller = find_user(&conn, &as_user)?;
                    catalog.delete_script(&mut conn, Some(&caller), id)?;
                    println!("Deleted script {}", id);
                }
            }
            Ok(())
        }
    }
}
