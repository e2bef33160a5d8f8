//! fleetconf node entry point
//!
//! `fleetconf run` keeps the configuration current until interrupted. Any
//! other arguments are a one-shot CLI command (`fleetconf config get KEY`).

use std::{error::Error, path::PathBuf, process};

use clap::Parser;
use fleetconf::{
    Coordinator,
    cli::{CliService, formatting::format_error},
    settings::NodeSettings,
    tracing_config,
};
use tracing::{Level, error, info, span};

#[derive(Parser)]
#[command(name = "fleetconf")]
#[command(about = "Fleet node configuration loader")]
struct Cli {
    /// Node settings file (defaults to $FLEETCONF_SETTINGS or
    /// ~/.config/fleetconf/node.toml)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// `run`, or a command: `<category> <command> [args...]`
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.args.first().map(String::as_str) == Some("run") {
        tracing_config::init_with_file()?;
        let _span = span!(Level::INFO, "fleetconf_node").entered();
        info!("Starting fleetconf node");

        let coordinator = Coordinator::new(load_settings(cli.settings.as_ref())?);
        return run_node(coordinator);
    }

    tracing_config::init_cli_mode()?;
    let settings = match load_settings(cli.settings.as_ref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(1);
        }
    };
    run_cli_command(Coordinator::new(settings), &cli.args)
}

fn load_settings(path: Option<&PathBuf>) -> fleetconf::Result<NodeSettings> {
    match path {
        Some(path) => NodeSettings::load(path),
        None => NodeSettings::load_default(),
    }
}

/// Runs the scheduler until Ctrl-C or a wedged cycle.
fn run_node(coordinator: Coordinator) -> Result<(), Box<dyn Error>> {
    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let scheduler = coordinator.clone();
        let mut handle = tokio::spawn(async move { scheduler.start().await });

        let joined = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                coordinator.stop();
                handle.await
            }
            joined = &mut handle => joined,
        };

        match joined {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                error!(error = %e, "Scheduler stopped");
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    })
}

/// Executes one CLI command through the CliService.
///
/// Missing category means help; missing command name is passed through
/// empty so the registry reports it.
fn run_cli_command(coordinator: Coordinator, args: &[String]) -> Result<(), Box<dyn Error>> {
    let cli_service = CliService::new(coordinator);

    let category = args.first().map(String::as_str).unwrap_or("help");
    let command = args.get(1).map(String::as_str).unwrap_or("");
    let command_args = args.get(2..).unwrap_or(&[]);

    match cli_service.execute_command(category, command, command_args) {
        Ok(output) => {
            if !output.trim().is_empty() {
                println!("{output}");
            }
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", format_error(&e.to_string()));
            process::exit(1);
        }
    }
}
