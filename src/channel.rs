//! Realtime channel manager.
//!
//! Keeps one logical, always-retrying connection to the board service's push
//! endpoint and exposes its state to consumers.
//!
//! ```text
//! [Idle] --start--> [Connecting] --open--> [Open] --close--> [Closed]
//!                        ^                                     |
//!                        +------------ reconnect delay --------+
//! [Connecting|Open|Closed] --shutdown--> [Idle]   (terminal)
//! ```
//!
//! A single driver task owns the state machine. Each connection attempt runs
//! in its own pump task that reports events tagged with the attempt's
//! generation; the driver drops events whose generation is not current, so a
//! superseded transport can never touch live state. A failed connection
//! attempt is reported as an error followed by a close, which puts it on the
//! same retry path as a dropped connection.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use kanban_common::Envelope;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tokio_util::task::AbortOnDropHandle;
use tracing::{debug, info, warn};

use crate::errors::TransportError;
use crate::transport::{Connector, Frame, Transport};

/// Delay between a close and the next connection attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_millis(3000);

/// How long shutdown waits for an open transport to close before aborting it.
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelStatus {
    Idle,
    Connecting,
    Open,
    Closed,
}

impl ChannelStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Open)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct ChannelOptions {
    pub endpoint: String,
    pub reconnect_delay: Duration,
    pub close_grace: Duration,
}

impl ChannelOptions {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn with_close_grace(mut self, grace: Duration) -> Self {
        self.close_grace = grace;
        self
    }
}

/// Receivers for the observable channel state.
///
/// Both values are replaced wholesale on every change.
#[derive(Debug, Clone)]
pub struct ChannelSubscription {
    pub status: watch::Receiver<ChannelStatus>,
    pub last_message: watch::Receiver<Option<Envelope>>,
}

struct Outbound {
    generation: u64,
    tx: mpsc::UnboundedSender<Frame>,
}

struct Shared {
    status: watch::Sender<ChannelStatus>,
    last_message: watch::Sender<Option<Envelope>>,
    /// Write half of the open transport. Only the driver writes this slot.
    outbound: Mutex<Option<Outbound>>,
}

impl Shared {
    fn new() -> Self {
        let (status, _) = watch::channel(ChannelStatus::Idle);
        let (last_message, _) = watch::channel(None);
        Self {
            status,
            last_message,
            outbound: Mutex::new(None),
        }
    }

    fn outbound(&self) -> MutexGuard<'_, Option<Outbound>> {
        self.outbound.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owning handle to a running channel.
///
/// Dropping the handle cancels the channel; call [`ChannelHandle::shutdown`]
/// to wait for teardown to finish.
pub struct ChannelHandle {
    shared: Arc<Shared>,
    cancel: CancellationToken,
    driver: Option<JoinHandle<()>>,
    endpoint: String,
}

impl ChannelHandle {
    /// Start connecting in the background. Must be called inside a Tokio runtime.
    pub fn start<C: Connector>(connector: C, options: ChannelOptions) -> Self {
        let shared = Arc::new(Shared::new());
        let cancel = CancellationToken::new();
        let endpoint = options.endpoint.clone();
        let driver = Driver::new(Arc::new(connector), options, shared.clone(), cancel.clone());
        let driver = tokio::spawn(driver.run());

        Self {
            shared,
            cancel,
            driver: Some(driver),
            endpoint,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn status(&self) -> ChannelStatus {
        *self.shared.status.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_connected()
    }

    pub fn last_message(&self) -> Option<Envelope> {
        self.shared.last_message.borrow().clone()
    }

    pub fn subscribe(&self) -> ChannelSubscription {
        ChannelSubscription {
            status: self.shared.status.subscribe(),
            last_message: self.shared.last_message.subscribe(),
        }
    }

    /// Hand one envelope to the open transport.
    ///
    /// Returns `false` and drops the envelope when the channel is not open.
    /// Nothing is queued for a later connection.
    pub fn send(&self, envelope: &Envelope) -> bool {
        if !self.is_connected() {
            debug!(kind = %envelope.kind, "Channel not open; dropping outbound message");
            return false;
        }

        let slot = self.shared.outbound();
        let Some(outbound) = slot.as_ref() else {
            debug!(kind = %envelope.kind, "No open transport; dropping outbound message");
            return false;
        };

        let text = match envelope.encode() {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %e, "Failed to encode outbound message");
                return false;
            }
        };

        debug!(generation = outbound.generation, kind = %envelope.kind, "Sending message");
        outbound.tx.send(Frame::Text(text)).is_ok()
    }

    /// Wait until the channel is open, up to `timeout`.
    pub async fn wait_until_connected(&self, timeout: Duration) -> bool {
        let mut status = self.shared.status.subscribe();
        matches!(
            tokio::time::timeout(timeout, status.wait_for(ChannelStatus::is_connected)).await,
            Ok(Ok(_))
        )
    }

    /// Cancel any pending reconnect, close the open transport, and stop the driver.
    ///
    /// Safe to call more than once and when nothing ever connected.
    pub async fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(driver) = self.driver.take() {
            if let Err(e) = driver.await {
                warn!(error = %e, "Realtime channel driver ended abnormally");
            }
        }
    }
}

impl Drop for ChannelHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ── Driver ────────────────────────────────────────────────────────────

#[derive(Debug)]
enum EventKind {
    Open,
    Message(String),
    Error(TransportError),
    Closed,
}

#[derive(Debug)]
struct ConnectionEvent {
    generation: u64,
    kind: EventKind,
}

struct Connection {
    outbound: mpsc::UnboundedSender<Frame>,
    close: CancellationToken,
    task: AbortOnDropHandle<()>,
}

struct Driver<C> {
    connector: Arc<C>,
    options: ChannelOptions,
    shared: Arc<Shared>,
    cancel: CancellationToken,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    events_rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    generation: u64,
    current: Option<Connection>,
    retry_at: Option<Instant>,
}

impl<C: Connector> Driver<C> {
    fn new(
        connector: Arc<C>,
        options: ChannelOptions,
        shared: Arc<Shared>,
        cancel: CancellationToken,
    ) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            connector,
            options,
            shared,
            cancel,
            events_tx,
            events_rx,
            generation: 0,
            current: None,
            retry_at: None,
        }
    }

    async fn run(mut self) {
        self.connect();

        loop {
            tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                Some(event) = self.events_rx.recv() => self.handle_event(event),

                _ = sleep_until(self.retry_at) => {
                    self.retry_at = None;
                    self.connect();
                }
            }
        }

        self.teardown().await;
    }

    fn connect(&mut self) {
        if let Some(previous) = self.current.take() {
            previous.close.cancel();
        }
        self.shared.outbound().take();

        self.generation += 1;
        let generation = self.generation;
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let close = self.cancel.child_token();

        info!(endpoint = %self.options.endpoint, generation, "Connecting to realtime channel");
        self.shared.status.send_replace(ChannelStatus::Connecting);

        let task = tokio::spawn(run_connection(
            self.connector.clone(),
            self.options.endpoint.clone(),
            generation,
            self.events_tx.clone(),
            outbound_rx,
            close.clone(),
        ));

        self.current = Some(Connection {
            outbound: outbound_tx,
            close,
            task: AbortOnDropHandle::new(task),
        });
    }

    fn handle_event(&mut self, event: ConnectionEvent) {
        if event.generation != self.generation {
            debug!(
                stale = event.generation,
                current = self.generation,
                "Ignoring event from superseded transport"
            );
            return;
        }

        match event.kind {
            EventKind::Open => self.on_open(),
            EventKind::Message(text) => self.on_message(&text),
            EventKind::Error(e) => warn!(error = %e, "Realtime channel transport error"),
            EventKind::Closed => self.on_close(),
        }
    }

    fn on_open(&mut self) {
        let Some(current) = &self.current else {
            return;
        };
        *self.shared.outbound() = Some(Outbound {
            generation: self.generation,
            tx: current.outbound.clone(),
        });
        self.shared.status.send_replace(ChannelStatus::Open);
        info!(endpoint = %self.options.endpoint, "Realtime channel connected");
    }

    fn on_message(&mut self, text: &str) {
        match Envelope::decode(text) {
            Ok(envelope) => {
                debug!(kind = %envelope.kind, "Realtime message received");
                self.shared.last_message.send_replace(Some(envelope));
            }
            Err(e) => warn!(error = %e, "Dropping malformed realtime message"),
        }
    }

    fn on_close(&mut self) {
        // A second close for the same transport must not schedule another retry.
        if self.current.is_none() {
            return;
        }
        self.current = None;
        self.shared.outbound().take();
        self.shared.status.send_replace(ChannelStatus::Closed);
        self.retry_at = Some(Instant::now() + self.options.reconnect_delay);
        info!(
            delay = ?self.options.reconnect_delay,
            "Realtime channel disconnected; reconnect scheduled"
        );
    }

    async fn teardown(&mut self) {
        self.retry_at = None;
        self.shared.outbound().take();

        if let Some(connection) = self.current.take() {
            connection.close.cancel();
            drop(connection.outbound);
            if tokio::time::timeout(self.options.close_grace, connection.task)
                .await
                .is_err()
            {
                warn!("Realtime transport did not close in time; aborted");
            }
        }

        self.shared.status.send_replace(ChannelStatus::Idle);
        info!("Realtime channel shut down");
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Pump for one connection attempt: connect, then shuttle frames until either
/// side closes. Always ends with a `Closed` event unless cancelled before the
/// transport was established.
async fn run_connection<C: Connector>(
    connector: Arc<C>,
    endpoint: String,
    generation: u64,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    mut outbound: mpsc::UnboundedReceiver<Frame>,
    close: CancellationToken,
) {
    let emit = |kind: EventKind| {
        let _ = events.send(ConnectionEvent { generation, kind });
    };

    let connected = tokio::select! {
        biased;
        _ = close.cancelled() => return,
        result = connector.connect(&endpoint) => result,
    };

    let Transport {
        mut sink,
        mut stream,
    } = match connected {
        Ok(transport) => transport,
        Err(e) => {
            emit(EventKind::Error(e));
            emit(EventKind::Closed);
            return;
        }
    };
    emit(EventKind::Open);

    loop {
        tokio::select! {
            biased;

            _ = close.cancelled() => {
                // Flush what `send` already accepted before closing.
                while let Ok(frame) = outbound.try_recv() {
                    if sink.send(frame).await.is_err() {
                        break;
                    }
                }
                let _ = sink.close().await;
                break;
            }

            frame = outbound.recv() => match frame {
                Some(frame) => {
                    if let Err(e) = sink.send(frame).await {
                        emit(EventKind::Error(e));
                        break;
                    }
                }
                None => {
                    let _ = sink.close().await;
                    break;
                }
            },

            item = stream.next() => match item {
                Some(Ok(Frame::Text(text))) => emit(EventKind::Message(text)),
                Some(Ok(Frame::Binary(bytes))) => {
                    debug!(len = bytes.len(), "Ignoring binary frame");
                }
                Some(Ok(Frame::Close)) | None => break,
                Some(Err(e)) => {
                    emit(EventKind::Error(e));
                    break;
                }
            },
        }
    }

    emit(EventKind::Closed);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{Attempt, Behavior, MockConnector, MockServer};
    use serde_json::json;

    const ENDPOINT: &str = "ws://board.test/api/v1/ws";

    async fn next_attempt(attempts: &mut mpsc::UnboundedReceiver<Attempt>) -> Attempt {
        attempts.recv().await.expect("connector dropped")
    }

    async fn open_channel() -> (
        ChannelHandle,
        Arc<MockConnector>,
        mpsc::UnboundedReceiver<Attempt>,
        MockServer,
    ) {
        let (connector, mut attempts) = MockConnector::new();
        let channel = ChannelHandle::start(connector.clone(), ChannelOptions::new(ENDPOINT));
        let server = next_attempt(&mut attempts).await.server.unwrap();
        let mut status = channel.subscribe().status;
        status.wait_for(|s| *s == ChannelStatus::Open).await.unwrap();
        (channel, connector, attempts, server)
    }

    #[tokio::test(start_paused = true)]
    async fn test_open_event_sets_connected() {
        let (channel, _connector, _attempts, _server) = open_channel().await;
        assert!(channel.is_connected());
        assert_eq!(channel.status(), ChannelStatus::Open);
        assert!(channel.last_message().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_to_configured_endpoint() {
        let (connector, mut attempts) = MockConnector::new();
        let _channel = ChannelHandle::start(connector, ChannelOptions::new(ENDPOINT));
        let attempt = next_attempt(&mut attempts).await;
        assert_eq!(attempt.endpoint, ENDPOINT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_task_message_replaces_last_message() {
        let (channel, _connector, _attempts, server) = open_channel().await;
        let mut messages = channel.subscribe().last_message;

        server.push_text(r#"{"type":"task_created","data":{"id":5}}"#);
        messages.changed().await.unwrap();

        assert_eq!(
            channel.last_message(),
            Some(Envelope::new("task_created", json!({"id": 5})))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_message_is_dropped_and_connection_stays_open() {
        let (channel, _connector, mut attempts, server) = open_channel().await;
        let mut messages = channel.subscribe().last_message;

        server.push_text(r#"{"type":"task_updated","data":{"id":1}}"#);
        messages.changed().await.unwrap();

        server.push_text("not-json");
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(!messages.has_changed().unwrap());
        assert_eq!(
            channel.last_message(),
            Some(Envelope::new("task_updated", json!({"id": 1})))
        );
        assert!(channel.is_connected());
        assert!(attempts.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_open_transmits_exactly_one_frame() {
        let (channel, _connector, _attempts, mut server) = open_channel().await;
        let envelope = Envelope::new("ping", json!(1));

        assert!(channel.send(&envelope));

        let text = match server.next_frame().await {
            Some(Frame::Text(text)) => text,
            other => panic!("Expected text frame, got {other:?}"),
        };
        assert_eq!(Envelope::decode(&text).unwrap(), envelope);
        assert!(
            tokio::time::timeout(Duration::from_millis(100), server.next_frame())
                .await
                .is_err()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_connecting_is_dropped() {
        let (connector, mut attempts) = MockConnector::new();
        connector.script([Behavior::Hang]);
        let channel = ChannelHandle::start(connector, ChannelOptions::new(ENDPOINT));
        next_attempt(&mut attempts).await;

        assert_eq!(channel.status(), ChannelStatus::Connecting);
        assert!(!channel.send(&Envelope::new("ping", json!(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_after_close_is_not_queued_for_next_connection() {
        let (channel, _connector, mut attempts, mut server) = open_channel().await;
        let mut status = channel.subscribe().status;

        server.hang_up();
        status.wait_for(|s| *s == ChannelStatus::Closed).await.unwrap();
        assert!(!channel.send(&Envelope::new("lost", json!(null))));

        let mut next = next_attempt(&mut attempts).await.server.unwrap();
        status.wait_for(|s| *s == ChannelStatus::Open).await.unwrap();
        assert!(
            tokio::time::timeout(Duration::from_millis(100), next.next_frame())
                .await
                .is_err()
        );
        // The old transport's sink was closed, not handed the dropped message.
        assert_eq!(server.next_frame().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_clears_connected_and_reconnects_after_delay() {
        let (channel, _connector, mut attempts, mut server) = open_channel().await;
        let mut status = channel.subscribe().status;

        let closed_at = Instant::now();
        server.hang_up();
        status.wait_for(|s| *s == ChannelStatus::Closed).await.unwrap();
        assert!(!channel.is_connected());

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY - Duration::from_millis(1)).await;
        assert!(attempts.try_recv().is_err());

        let attempt = next_attempt(&mut attempts).await;
        assert!(attempt.at - closed_at >= DEFAULT_RECONNECT_DELAY);
        status.wait_for(|s| *s == ChannelStatus::Open).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_followed_by_single_reconnect() {
        let (channel, _connector, mut attempts, server) = open_channel().await;
        let mut status = channel.subscribe().status;

        let failed_at = Instant::now();
        server.push_error(TransportError::Receive("reset by peer".to_string()));
        status.wait_for(|s| *s == ChannelStatus::Closed).await.unwrap();

        let attempt = next_attempt(&mut attempts).await;
        assert!(attempt.at - failed_at >= DEFAULT_RECONNECT_DELAY);

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 3).await;
        assert!(attempts.try_recv().is_err());
        assert!(channel.is_connected());
    }

    #[tokio::test(start_paused = true)]
    async fn test_connect_failure_schedules_retry() {
        let (connector, mut attempts) = MockConnector::new();
        connector.script([Behavior::Fail(TransportError::Connect {
            endpoint: ENDPOINT.to_string(),
            reason: "connection refused".to_string(),
        })]);
        let channel = ChannelHandle::start(connector, ChannelOptions::new(ENDPOINT));
        let mut status = channel.subscribe().status;

        let first = next_attempt(&mut attempts).await;
        assert!(first.server.is_none());

        let second = next_attempt(&mut attempts).await;
        assert!(second.at - first.at >= DEFAULT_RECONNECT_DELAY);
        assert!(second.server.is_some());
        status.wait_for(|s| *s == ChannelStatus::Open).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_reconnect_delay_is_fixed() {
        let (connector, mut attempts) = MockConnector::new();
        connector.script((0..3).map(|_| {
            Behavior::Fail(TransportError::Connect {
                endpoint: ENDPOINT.to_string(),
                reason: "refused".to_string(),
            })
        }));
        let delay = Duration::from_millis(250);
        let _channel = ChannelHandle::start(
            connector,
            ChannelOptions::new(ENDPOINT).with_reconnect_delay(delay),
        );

        let mut previous = next_attempt(&mut attempts).await.at;
        for _ in 0..3 {
            let at = next_attempt(&mut attempts).await.at;
            let gap = at - previous;
            assert!(gap >= delay && gap < delay * 2, "gap = {gap:?}");
            previous = at;
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_reconnect() {
        let (mut channel, _connector, mut attempts, mut server) = open_channel().await;
        let mut status = channel.subscribe().status;

        server.hang_up();
        status.wait_for(|s| *s == ChannelStatus::Closed).await.unwrap();
        channel.shutdown().await;

        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 5).await;
        assert!(attempts.try_recv().is_err());
        assert_eq!(channel.status(), ChannelStatus::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_closes_open_transport_and_is_idempotent() {
        let (mut channel, _connector, mut attempts, mut server) = open_channel().await;

        channel.shutdown().await;
        assert_eq!(server.next_frame().await, None);
        assert_eq!(channel.status(), ChannelStatus::Idle);
        assert!(!channel.is_connected());

        channel.shutdown().await;
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 2).await;
        assert!(attempts.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_flushes_accepted_messages() {
        let (mut channel, _connector, _attempts, mut server) = open_channel().await;

        assert!(channel.send(&Envelope::new("bye", json!({"reason": "done"}))));
        channel.shutdown().await;

        let frame = server.next_frame().await.unwrap();
        assert!(matches!(frame, Frame::Text(t) if t.contains("\"bye\"")));
        assert_eq!(server.next_frame().await, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_while_connecting() {
        let (connector, mut attempts) = MockConnector::new();
        connector.script([Behavior::Hang]);
        let mut channel = ChannelHandle::start(connector, ChannelOptions::new(ENDPOINT));
        next_attempt(&mut attempts).await;

        channel.shutdown().await;
        assert_eq!(channel.status(), ChannelStatus::Idle);
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 2).await;
        assert!(attempts.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_channel() {
        let (channel, _connector, mut attempts, mut server) = open_channel().await;
        drop(channel);

        assert_eq!(server.next_frame().await, None);
        tokio::time::sleep(DEFAULT_RECONNECT_DELAY * 2).await;
        assert!(attempts.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_until_connected_times_out() {
        let (connector, mut attempts) = MockConnector::new();
        connector.script([Behavior::Hang]);
        let channel = ChannelHandle::start(connector, ChannelOptions::new(ENDPOINT));
        next_attempt(&mut attempts).await;

        assert!(!channel.wait_until_connected(Duration::from_secs(1)).await);
    }

    // ── Driver-level tests ───────────────────────────────────────────

    fn test_driver() -> (Driver<Arc<MockConnector>>, mpsc::UnboundedReceiver<Attempt>) {
        let (connector, attempts) = MockConnector::new();
        let driver = Driver::new(
            Arc::new(connector),
            ChannelOptions::new(ENDPOINT),
            Arc::new(Shared::new()),
            CancellationToken::new(),
        );
        (driver, attempts)
    }

    fn event(generation: u64, kind: EventKind) -> ConnectionEvent {
        ConnectionEvent { generation, kind }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_generation_events_are_ignored() {
        let (mut driver, _attempts) = test_driver();
        driver.connect();
        driver.handle_event(event(1, EventKind::Closed));
        driver.retry_at = None;
        driver.connect();
        assert_eq!(driver.generation, 2);

        driver.handle_event(event(
            1,
            EventKind::Message(r#"{"type":"task_deleted","data":{"id":9}}"#.to_string()),
        ));
        driver.handle_event(event(1, EventKind::Open));
        driver.handle_event(event(1, EventKind::Closed));

        assert!(driver.shared.last_message.borrow().is_none());
        assert_eq!(*driver.shared.status.borrow(), ChannelStatus::Connecting);
        assert!(driver.retry_at.is_none());
        assert!(driver.current.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_close_events_schedule_one_retry() {
        let (mut driver, _attempts) = test_driver();
        driver.connect();
        driver.handle_event(event(1, EventKind::Open));
        assert_eq!(*driver.shared.status.borrow(), ChannelStatus::Open);

        driver.handle_event(event(1, EventKind::Closed));
        let scheduled = driver.retry_at.unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        driver.handle_event(event(1, EventKind::Closed));
        driver.handle_event(event(1, EventKind::Closed));

        assert_eq!(driver.retry_at, Some(scheduled));
        assert_eq!(driver.generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_event_alone_does_not_change_state() {
        let (mut driver, _attempts) = test_driver();
        driver.connect();
        driver.handle_event(event(1, EventKind::Open));
        driver.handle_event(event(
            1,
            EventKind::Error(TransportError::Receive("boom".to_string())),
        ));

        assert_eq!(*driver.shared.status.borrow(), ChannelStatus::Open);
        assert!(driver.retry_at.is_none());
        assert!(driver.shared.outbound().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_clears_outbound_slot() {
        let (mut driver, _attempts) = test_driver();
        driver.connect();
        driver.handle_event(event(1, EventKind::Open));
        assert!(driver.shared.outbound().is_some());

        driver.handle_event(event(1, EventKind::Closed));
        assert!(driver.shared.outbound().is_none());
        assert_eq!(*driver.shared.status.borrow(), ChannelStatus::Closed);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(ChannelStatus::Open.to_string(), "open");
        assert!(ChannelStatus::Open.is_connected());
        for status in [
            ChannelStatus::Idle,
            ChannelStatus::Connecting,
            ChannelStatus::Closed,
        ] {
            assert!(!status.is_connected());
        }
    }

    #[test]
    fn test_default_timing_constants() {
        assert_eq!(DEFAULT_RECONNECT_DELAY, Duration::from_millis(3000));
        let options = ChannelOptions::new(ENDPOINT);
        assert_eq!(options.reconnect_delay, DEFAULT_RECONNECT_DELAY);
        assert_eq!(options.close_grace, DEFAULT_CLOSE_GRACE);
    }
}
