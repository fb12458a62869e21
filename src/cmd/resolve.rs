//! `kanban-live resolve`

use anyhow::{Context, Result};
use kanban_live::config::LiveConfig;

pub fn cmd_resolve(config: &LiveConfig) -> Result<()> {
    let endpoint = config
        .resolve_endpoint()
        .context("Failed to resolve push-channel endpoint")?;
    println!("{}", endpoint);
    Ok(())
}
