//! Live-refresh client for kanban boards.
//!
//! Maintains a self-healing WebSocket connection to the board service's push
//! endpoint, exposes connection status and the most recent notification, and
//! lets board views re-fetch tasks when a task changes.

pub mod channel;
pub mod config;
pub mod errors;
pub mod logging;
pub mod refresh;
pub mod transport;

pub use channel::{ChannelHandle, ChannelOptions, ChannelStatus, ChannelSubscription};
pub use kanban_common::{Envelope, TaskChange};
pub use refresh::TaskRefresher;
pub use transport::{Connector, WsConnector};
