use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;

use kanban_live::config::LiveConfig;

mod cmd;

#[derive(Parser)]
#[command(name = "kanban-live")]
#[command(version, about = "Live-refresh channel client for kanban boards")]
pub struct Cli {
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Path to live.toml (default: .kanban/live.toml in the project directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(long, global = true)]
    pub project_dir: Option<PathBuf>,

    /// Push-channel URL. Overrides live.toml and KANBAN_WS_URL.
    #[arg(long, global = true)]
    pub endpoint: Option<String>,

    /// Origin of the page hosting the board, e.g. https://example.com:9
    #[arg(long, global = true)]
    pub origin: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the push-channel address that would be used
    Resolve,
    /// Connect and print notifications until Ctrl+C
    Watch {
        /// Print each notification as a JSON line
        #[arg(long)]
        json: bool,
    },
    /// Connect, send one message, and disconnect
    Send {
        /// Message type
        #[arg(long = "type")]
        kind: String,

        /// Message payload as JSON (default: null)
        #[arg(long)]
        data: Option<String>,

        /// How long to wait for the channel to open
        #[arg(long, default_value = "10")]
        timeout_secs: u64,
    },
    /// View, validate, or create live.toml
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,
    /// Check live.toml for problems
    Validate,
    /// Write a default live.toml
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn setup(cli: &Cli, project_dir: &Path) -> Result<LiveConfig> {
    let config = cmd::load_config(cli, project_dir)?;
    kanban_live::logging::init(
        &config.toml.logging.level,
        cli.verbose,
        cli.log_json || config.toml.logging.json,
    )?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let project_dir = match cli.project_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    match &cli.command {
        Commands::Resolve => {
            let config = setup(&cli, &project_dir)?;
            cmd::cmd_resolve(&config)?;
        }
        Commands::Watch { json } => {
            let config = setup(&cli, &project_dir)?;
            cmd::cmd_watch(&config, *json).await?;
        }
        Commands::Send {
            kind,
            data,
            timeout_secs,
        } => {
            let config = setup(&cli, &project_dir)?;
            cmd::cmd_send(
                &config,
                kind,
                data.as_deref(),
                Duration::from_secs(*timeout_secs),
            )
            .await?;
        }
        Commands::Config { command } => {
            // `config init` must work even when the existing file does not parse.
            kanban_live::logging::init("info", cli.verbose, cli.log_json)?;
            cmd::cmd_config(&cli, &project_dir, command.clone())?;
        }
    }

    Ok(())
}
