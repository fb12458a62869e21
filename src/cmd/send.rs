//! `kanban-live send`: deliver one message over a fresh channel.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use kanban_live::config::LiveConfig;
use kanban_live::{ChannelHandle, Envelope, WsConnector};
use serde_json::Value;

pub async fn cmd_send(
    config: &LiveConfig,
    kind: &str,
    data: Option<&str>,
    timeout: Duration,
) -> Result<()> {
    if kind.is_empty() {
        bail!("--type must not be empty");
    }
    let data = match data {
        Some(raw) => serde_json::from_str(raw)
            .with_context(|| format!("--data is not valid JSON: {}", raw))?,
        None => Value::Null,
    };
    let envelope = Envelope::new(kind, data);

    let options = config
        .channel_options()
        .context("Failed to resolve push-channel endpoint")?;
    let mut channel = ChannelHandle::start(WsConnector, options);
    let endpoint = channel.endpoint().to_string();

    if !channel.wait_until_connected(timeout).await {
        channel.shutdown().await;
        bail!(
            "Channel to {} did not open within {}s",
            endpoint,
            timeout.as_secs()
        );
    }

    let sent = channel.send(&envelope);
    channel.shutdown().await;

    if !sent {
        bail!("Channel to {} closed before '{}' was sent", endpoint, kind);
    }
    println!("Sent {} to {}", kind, endpoint);
    Ok(())
}
