//! envport - Main Entry Point
//!
//! Command line front end for the `envport` library: every command opens the
//! workspace stored in the data directory, runs one operation and flushes
//! pending saves before exiting.

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use envport::platform::{ConsoleNotifier, NativeFiles, PresetDialogs, StdioClipboard};
use envport::{
    AppConfig, ExportOutcome, JsonFileStore, Platform, StoreAction, Workspace,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// envport - manage, import and export mock API environments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory holding the stored documents (overrides the configuration)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List environments and routes, flagging duplicates
    List,
    /// Import a bundle file
    Import { file: PathBuf },
    /// Import a bundle read from standard input
    ImportClipboard,
    /// Export every environment to a bundle file
    ExportAll { file: PathBuf },
    /// Export the active environment to a bundle file
    ExportActive { file: PathBuf },
    /// Print an environment as a bundle on standard output
    ExportEnvironment { uuid: String },
    /// Print a route of the active environment as a bundle on standard output
    ExportRoute { uuid: String },
    /// Make an environment the active one
    Activate { uuid: String },
    /// Show the settings, or change one of them
    Settings {
        /// Setting name, as stored (for example `routeMenuSize`)
        name: Option<String>,
        /// New value
        value: Option<String>,
    },
}

impl Command {
    fn dialogs(&self) -> PresetDialogs {
        match self {
            Command::Import { file } => PresetDialogs {
                open_path: Some(file.clone()),
                save_path: None,
            },
            Command::ExportAll { file } | Command::ExportActive { file } => PresetDialogs {
                open_path: None,
                save_path: Some(file.clone()),
            },
            _ => PresetDialogs::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Check if no arguments were provided (except the program name)
    if std::env::args().len() == 1 {
        let mut cmd = Args::command();
        cmd.print_help().ok();
        println!();
        std::process::exit(2);
    }

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };
    if let Some(data_dir) = args.data_dir {
        config.data_dir = data_dir;
    }

    // Logs go to stderr; stdout carries exported bundles
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();
    info!(
        "Starting {} v{} with data in {}",
        config.app_name,
        config.app_version,
        config.data_dir.display()
    );

    let platform = Platform {
        dialogs: Arc::new(args.command.dialogs()),
        files: Arc::new(NativeFiles),
        clipboard: Arc::new(StdioClipboard),
        notifier: Arc::new(ConsoleNotifier),
    };
    let storage = Arc::new(JsonFileStore::new(&config.data_dir));
    let workspace = Workspace::open(&config, storage, platform).await;

    let succeeded = run(&workspace, args.command).await;
    workspace.close().await;

    if !succeeded {
        std::process::exit(1);
    }
    Ok(())
}

/// Run one command, returning whether it succeeded
async fn run(workspace: &Workspace, command: Command) -> bool {
    let engine = workspace.engine();
    match command {
        Command::List => {
            print_environments(workspace);
            true
        }
        Command::Import { .. } => engine.import_from_file().await.is_some(),
        Command::ImportClipboard => engine.import_from_clipboard().await.is_some(),
        Command::ExportAll { .. } => exported(engine.export_all_environments().await),
        Command::ExportActive { .. } => exported(engine.export_active_environment().await),
        Command::ExportEnvironment { uuid } => {
            exported(engine.export_environment_to_clipboard(&uuid).await)
        }
        Command::ExportRoute { uuid } => exported(engine.export_route_to_clipboard(&uuid).await),
        Command::Activate { uuid } => {
            let activated = workspace
                .store()
                .update(StoreAction::SetActiveEnvironment(uuid.clone()));
            if !activated {
                eprintln!("No environment {} to activate", uuid);
            }
            activated
        }
        Command::Settings { name: None, .. } => {
            match serde_json::to_string_pretty(&workspace.settings()) {
                Ok(text) => {
                    println!("{}", text);
                    true
                }
                Err(e) => {
                    eprintln!("Cannot display settings: {}", e);
                    false
                }
            }
        }
        Command::Settings {
            name: Some(name),
            value,
        } => {
            let Some(value) = value else {
                eprintln!("Missing value for setting {}", name);
                return false;
            };
            let mut settings = workspace.settings();
            match settings.set_field(&name, &value) {
                Ok(()) => {
                    workspace.update_settings(|current| *current = settings);
                    true
                }
                Err(e) => {
                    eprintln!("{}", e);
                    false
                }
            }
        }
    }
}

fn exported(outcome: ExportOutcome) -> bool {
    match outcome {
        ExportOutcome::Exported => true,
        ExportOutcome::NothingToExport => {
            eprintln!("Nothing to export");
            false
        }
        ExportOutcome::Cancelled | ExportOutcome::Failed => false,
    }
}

fn print_environments(workspace: &Workspace) {
    let state = workspace.store().snapshot();
    if state.environments.is_empty() {
        println!("No environments");
        return;
    }

    for environment in &state.environments {
        let active = state.active_environment_uuid.as_deref() == Some(environment.uuid.as_str());
        let duplicated_port = state.duplicated_environments.contains(&environment.uuid);
        println!(
            "{} {} {} (port {}{})",
            if active { "*" } else { " " },
            environment.uuid,
            environment.name,
            environment.port,
            if duplicated_port { ", duplicated" } else { "" }
        );

        let duplicated_routes = state.duplicated_routes.get(&environment.uuid);
        for route in &environment.routes {
            let duplicated = duplicated_routes.is_some_and(|uuids| uuids.contains(&route.uuid));
            println!(
                "    {} /{} {}{}",
                route.method,
                route.endpoint,
                route.uuid,
                if duplicated { " (duplicated)" } else { "" }
            );
        }
    }
}
