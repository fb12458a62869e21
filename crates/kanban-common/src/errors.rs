//! Error types shared by the envelope codec and the endpoint resolver.

use thiserror::Error;

/// Errors from decoding or encoding a wire envelope.
#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Malformed envelope: {0}")]
    Malformed(#[source] serde_json::Error),

    #[error("Failed to encode envelope of type '{kind}': {source}")]
    Encode {
        kind: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors from parsing a page origin such as `https://example.com:9`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum OriginError {
    #[error("Origin '{0}' is missing a scheme (expected e.g. https://host)")]
    MissingScheme(String),

    #[error("Origin '{0}' has an empty host")]
    EmptyHost(String),
}
