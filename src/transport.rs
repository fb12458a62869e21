//! Transport seam between the channel state machine and the network.
//!
//! The channel only ever sees a [`Transport`]: a sink and a stream of
//! [`Frame`]s produced by a [`Connector`]. [`WsConnector`] is the real
//! implementation over `tokio-tungstenite`.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt, future};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message, client::IntoClientRequest};

use crate::errors::TransportError;

/// The subset of WebSocket frames the channel cares about.
///
/// Ping/pong are answered by the WebSocket layer and never surface here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
    Close,
}

impl Frame {
    fn into_message(self) -> Message {
        match self {
            Frame::Text(text) => Message::Text(text.into()),
            Frame::Binary(bytes) => Message::Binary(bytes.into()),
            Frame::Close => Message::Close(None),
        }
    }
}

pub type FrameSink = Pin<Box<dyn Sink<Frame, Error = TransportError> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<Frame, TransportError>> + Send>>;

/// One established connection, split into its write and read halves.
pub struct Transport {
    pub sink: FrameSink,
    pub stream: FrameStream,
}

impl Transport {
    pub fn new(sink: FrameSink, stream: FrameStream) -> Self {
        Self { sink, stream }
    }
}

/// Opens transports to a push endpoint.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    async fn connect(&self, endpoint: &str) -> Result<Transport, TransportError>;
}

/// WebSocket connector (`ws://` and `wss://`).
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Transport, TransportError> {
        let request =
            endpoint
                .into_client_request()
                .map_err(|e| TransportError::InvalidEndpoint {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let (ws, _response) =
            connect_async(request)
                .await
                .map_err(|e| TransportError::Connect {
                    endpoint: endpoint.to_string(),
                    reason: e.to_string(),
                })?;

        let (sink, stream) = ws.split();
        let sink = sink
            .with(|frame: Frame| future::ready(Ok::<_, tungstenite::Error>(frame.into_message())))
            .sink_map_err(|e| TransportError::Send(e.to_string()));
        let stream = stream.filter_map(|msg| future::ready(frame_from_message(msg)));

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

fn frame_from_message(
    msg: Result<Message, tungstenite::Error>,
) -> Option<Result<Frame, TransportError>> {
    match msg {
        Ok(Message::Text(text)) => Some(Ok(Frame::Text(text.as_str().to_owned()))),
        Ok(Message::Binary(bytes)) => Some(Ok(Frame::Binary(bytes.to_vec()))),
        Ok(Message::Close(_)) => Some(Ok(Frame::Close)),
        Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)) => None,
        Err(e) => Some(Err(TransportError::Receive(e.to_string()))),
    }
}
