//! In-process board service exposing `/api/v1/ws` for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use futures::{SinkExt, StreamExt};
use tokio::sync::{broadcast, mpsc};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// What the server does to every connected client.
#[derive(Debug, Clone)]
pub enum ServerCommand {
    Text(String),
    /// Send a close frame and end the socket.
    Close,
    /// End the socket without a close frame.
    Drop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Connected,
    Received(String),
    Disconnected,
}

#[derive(Clone)]
struct ServerState {
    commands: broadcast::Sender<ServerCommand>,
    events: mpsc::UnboundedSender<ServerEvent>,
}

pub struct TestServer {
    pub addr: SocketAddr,
    commands: broadcast::Sender<ServerCommand>,
    events: mpsc::UnboundedReceiver<ServerEvent>,
}

impl TestServer {
    pub async fn spawn() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (commands, _) = broadcast::channel(16);
        let (events_tx, events) = mpsc::unbounded_channel();

        let state = ServerState {
            commands: commands.clone(),
            events: events_tx,
        };
        let app = Router::new()
            .route("/api/v1/ws", get(ws_handler))
            .with_state(state);
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            commands,
            events,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("ws://{}/api/v1/ws", self.addr)
    }

    pub fn send(&self, command: ServerCommand) {
        self.commands.send(command).unwrap();
    }

    pub fn push_text(&self, text: &str) {
        self.send(ServerCommand::Text(text.to_string()));
    }

    pub async fn next_event(&mut self) -> ServerEvent {
        tokio::time::timeout(EVENT_TIMEOUT, self.events.recv())
            .await
            .expect("timed out waiting for server event")
            .expect("server stopped")
    }

    pub async fn expect_event(&mut self, expected: ServerEvent) {
        assert_eq!(self.next_event().await, expected);
    }

    /// True if no event arrives within `window`.
    pub async fn quiet_for(&mut self, window: Duration) -> bool {
        tokio::time::timeout(window, self.events.recv()).await.is_err()
    }
}

/// A local port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ServerState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ServerState) {
    let mut commands = state.commands.subscribe();
    let (mut sender, mut receiver) = socket.split();
    let _ = state.events.send(ServerEvent::Connected);

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Ok(ServerCommand::Text(text)) => {
                    if sender.send(Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                Ok(ServerCommand::Close) => {
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
                Ok(ServerCommand::Drop) | Err(_) => break,
            },

            msg = receiver.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = state.events.send(ServerEvent::Received(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = state.events.send(ServerEvent::Disconnected);
}
