//! `kanban-live watch`: follow the channel until Ctrl+C.
//!
//! Notifications go to stdout; with `--json` each one is a single JSON line
//! and status changes are left to the logs.

use anyhow::{Context, Result};
use kanban_live::config::LiveConfig;
use kanban_common::EnvelopeError;
use kanban_live::{ChannelHandle, ChannelStatus, Envelope, TaskRefresher, WsConnector};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

pub async fn cmd_watch(config: &LiveConfig, json: bool) -> Result<()> {
    for warning in config.validate() {
        warn!("{}", warning);
    }

    let options = config
        .channel_options()
        .context("Failed to resolve push-channel endpoint")?;
    info!(endpoint = %options.endpoint, "Watching realtime channel");

    let mut channel = ChannelHandle::start(WsConnector, options);
    let subscription = channel.subscribe();
    let stop = CancellationToken::new();

    let status_task = (!json).then(|| {
        tokio::spawn(print_status(subscription.status.clone(), stop.clone()))
    });
    let message_task = tokio::spawn(print_messages(
        subscription.last_message.clone(),
        stop.clone(),
        json,
    ));
    let refresher = TaskRefresher::from_subscription(&subscription, stop.clone());
    let refresh_task = tokio::spawn(refresher.run(|change, envelope| async move {
        info!(%change, data = %envelope.data, "Task list refresh triggered");
    }));

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl+C")?;
    info!("Interrupted; closing channel");

    stop.cancel();
    channel.shutdown().await;

    if let Some(task) = status_task {
        let _ = task.await;
    }
    let _ = message_task.await;
    let refreshes = refresh_task.await.unwrap_or_default();
    info!(refreshes, "Watch finished");
    Ok(())
}

async fn print_status(mut status: watch::Receiver<ChannelStatus>, stop: CancellationToken) {
    println!("{}", render_status(*status.borrow_and_update()));
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                println!("{}", render_status(*status.borrow_and_update()));
            }
        }
    }
}

async fn print_messages(
    mut messages: watch::Receiver<Option<Envelope>>,
    stop: CancellationToken,
    json: bool,
) {
    loop {
        tokio::select! {
            biased;
            _ = stop.cancelled() => break,
            changed = messages.changed() => {
                if changed.is_err() {
                    break;
                }
                let Some(envelope) = messages.borrow_and_update().clone() else {
                    continue;
                };
                print_envelope(&envelope, json);
            }
        }
    }
}

fn print_envelope(envelope: &Envelope, json: bool) {
    match render_envelope(envelope, json) {
        Ok(line) => println!("{}", line),
        Err(e) => warn!(error = %e, "Failed to encode notification"),
    }
}

fn render_status(status: ChannelStatus) -> String {
    format!("status: {}", status)
}

/// One stdout line per notification. Task notifications carry a `(refresh)` marker.
fn render_envelope(envelope: &Envelope, json: bool) -> Result<String, EnvelopeError> {
    if json {
        return envelope.encode();
    }
    let marker = if envelope.task_change().is_some() { " (refresh)" } else { "" };
    Ok(format!("{}{} {}", envelope.kind, marker, envelope.data))
}
