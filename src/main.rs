// src/main.rs

use anyhow::{Context, Result};
use clap::Parser;
use installies::cli::ClientCli;
use installies::client::{
    ActionDriver, ClientPaths, ClientState, DriveRequest, Host, HttpSource, ShellRunner,
    StdinPrompter,
};
use std::process::ExitCode;

fn run(cli: ClientCli) -> Result<()> {
    if cli.version {
        println!("Installies CLI v{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let Some(command) = cli.command else {
        anyhow::bail!("No action given. Try `installies --help`.");
    };
    let args = command.args();
    let request = DriveRequest::parse(command.action(), &args.app, args.output_script);

    let source = HttpSource::from_env().context("Failed to set up the HTTP client")?;
    let host = Host::detect().context("Failed to detect the host distro")?;
    let paths = ClientPaths::from_dirs()?;
    let mut state = ClientState::load(&paths.state_file()).context("Failed to load client state")?;

    let mut prompter = StdinPrompter::stdio();
    let mut runner = ShellRunner;
    ActionDriver::new(&source, &mut prompter, &mut runner, host, paths).run(&request, &mut state)?;
    Ok(())
}

fn main() -> ExitCode {
    // Quiet by default so prompts stay readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(ClientCli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("\x1b[31mError: {:#}\x1b[0m", e);
            ExitCode::FAILURE
        }
    }
}
