//! Shared types for the kanban live-refresh channel.
//!
//! Everything here is free of I/O so it can be reused by the channel client,
//! its tests, and any server-side code that needs to speak the same envelope.

pub mod endpoint;
pub mod envelope;
pub mod errors;

pub use endpoint::{
    DEFAULT_WS_PATH, FALLBACK_ENDPOINT, Headless, Origin, PlatformContext, resolve_endpoint,
};
pub use envelope::{Envelope, TaskChange};
pub use errors::{EnvelopeError, OriginError};
