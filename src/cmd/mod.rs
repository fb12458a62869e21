//! CLI command implementations.
//!
//! | Module    | Commands handled |
//! |-----------|------------------|
//! | `resolve` | `Resolve`        |
//! | `watch`   | `Watch`          |
//! | `send`    | `Send`           |
//! | `config`  | `Config`         |

pub mod config;
pub mod resolve;
pub mod send;
pub mod watch;

pub use config::cmd_config;
pub use resolve::cmd_resolve;
pub use send::cmd_send;
pub use watch::cmd_watch;

use anyhow::{Context, Result};
use kanban_live::config::LiveConfig;
use std::path::Path;

use super::Cli;

/// Load live.toml and layer the environment and CLI flags on top.
pub fn load_config(cli: &Cli, project_dir: &Path) -> Result<LiveConfig> {
    let config = LiveConfig::load(cli.config.as_deref(), project_dir)
        .context("Failed to load configuration")?
        .with_env()
        .with_cli_args(cli.endpoint.clone(), cli.origin.clone());
    Ok(config)
}
