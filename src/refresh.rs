//! Task-refresh glue.
//!
//! A board view keeps its task list current by re-fetching whenever the
//! channel announces `task_created`, `task_updated` or `task_deleted`.
//! [`TaskRefresher`] watches the channel's last message and calls back for
//! exactly those notifications.
//!
//! The last message is a single replaceable value, so messages that arrive
//! faster than the callback completes are coalesced to the newest one.

use std::future::Future;

use kanban_common::{Envelope, TaskChange};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::channel::ChannelSubscription;

pub struct TaskRefresher {
    messages: watch::Receiver<Option<Envelope>>,
    cancel: CancellationToken,
}

impl TaskRefresher {
    pub fn new(messages: watch::Receiver<Option<Envelope>>, cancel: CancellationToken) -> Self {
        Self { messages, cancel }
    }

    pub fn from_subscription(subscription: &ChannelSubscription, cancel: CancellationToken) -> Self {
        Self::new(subscription.last_message.clone(), cancel)
    }

    /// Run until cancelled or until the channel is gone.
    ///
    /// Returns how many refreshes were triggered.
    pub async fn run<F, Fut>(mut self, mut on_refresh: F) -> usize
    where
        F: FnMut(TaskChange, Envelope) -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut refreshes = 0;

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                changed = self.messages.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let Some(envelope) = self.messages.borrow_and_update().clone() else {
                        continue;
                    };
                    let Some(change) = envelope.task_change() else {
                        debug!(kind = %envelope.kind, "Not a task notification");
                        continue;
                    };

                    debug!(%change, "Task change received; refreshing");
                    on_refresh(change, envelope).await;
                    refreshes += 1;
                }
            }
        }

        refreshes
    }
}
