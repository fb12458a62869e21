//! `kanban-live config`: view, validate, or create live.toml.

use std::path::Path;

use anyhow::{Context, Result};
use kanban_live::config::{ENV_PAGE_ORIGIN, ENV_WS_URL, LiveToml, default_config_path};

use super::super::{Cli, ConfigCommands};
use super::load_config;

pub fn cmd_config(cli: &Cli, project_dir: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| default_config_path(project_dir));

    match command {
        None | Some(ConfigCommands::Show) => {
            let config = load_config(cli, project_dir)?;

            println!();
            println!("Live Channel Configuration");
            println!("==========================");
            println!();

            match &config.source {
                Some(path) => println!("Config file: {}", path.display()),
                None => println!(
                    "No live.toml found at {} (using defaults)",
                    config_path.display()
                ),
            }
            println!();

            let channel = &config.toml.channel;
            println!("[channel]");
            if let Some(endpoint) = &channel.endpoint {
                println!("  endpoint = \"{}\"", endpoint);
            }
            if let Some(origin) = &channel.page_origin {
                println!("  page_origin = \"{}\"", origin);
            }
            println!("  reconnect_delay_ms = {}", channel.reconnect_delay_ms);
            println!("  close_grace_ms = {}", channel.close_grace_ms);
            println!();
            println!("[logging]");
            println!("  level = \"{}\"", config.toml.logging.level);
            println!("  json = {}", config.toml.logging.json);
            println!();

            println!("Effective values (with env/CLI overrides):");
            match config.resolve_endpoint() {
                Ok(endpoint) => println!("  endpoint = \"{}\"", endpoint),
                Err(e) => println!("  endpoint = <error: {}>", e),
            }
            if let Some(origin) = config.page_origin_raw() {
                println!("  page_origin = \"{}\"", origin);
            }
            println!();
            println!("Environment overrides: {}, {}", ENV_WS_URL, ENV_PAGE_ORIGIN);
            println!();
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            let config = load_config(cli, project_dir)?;
            if config.source.is_none() {
                println!("No live.toml found. Using defaults.");
            }

            let warnings = config.validate();
            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init { force }) => {
            if config_path.exists() && !force {
                println!("live.toml already exists at {}", config_path.display());
                println!("Use --force to overwrite it.");
                return Ok(());
            }

            LiveToml::default()
                .save(&config_path)
                .context("Failed to create live.toml")?;

            println!("Created live.toml at {}", config_path.display());
            println!();
            println!("You can now customize:");
            println!("  - [channel] endpoint, page_origin, reconnect_delay_ms");
            println!("  - [logging] level, json");
            println!();
        }
    }

    Ok(())
}
