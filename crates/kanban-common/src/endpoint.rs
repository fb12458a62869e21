//! Push-channel address resolution.
//!
//! The channel address is either given explicitly or derived from the origin
//! of the page the board client runs in. The page is an injected
//! [`PlatformContext`] so the resolver stays a pure function.

use crate::errors::OriginError;

/// Path of the push endpoint on the board service.
pub const DEFAULT_WS_PATH: &str = "/api/v1/ws";

/// Used when there is neither an explicit address nor a page to derive one from.
pub const FALLBACK_ENDPOINT: &str = "ws://localhost:8080/api/v1/ws";

/// Scheme and host (including port) of the page hosting the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub scheme: String,
    pub host: String,
}

impl Origin {
    pub fn new(scheme: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            host: host.into(),
        }
    }

    /// Parse `scheme://host[:port][/anything]`. Any path is discarded.
    pub fn parse(s: &str) -> Result<Self, OriginError> {
        let trimmed = s.trim();
        let (scheme, rest) = trimmed
            .split_once("://")
            .ok_or_else(|| OriginError::MissingScheme(s.to_string()))?;
        if scheme.is_empty() {
            return Err(OriginError::MissingScheme(s.to_string()));
        }
        let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
        if host.is_empty() {
            return Err(OriginError::EmptyHost(s.to_string()));
        }
        Ok(Self::new(scheme, host))
    }

    /// `wss` for `https` pages, `ws` for everything else.
    ///
    /// Accepts the scheme with or without the trailing `:` that browser
    /// location objects report.
    pub fn websocket_scheme(&self) -> &'static str {
        if self.scheme.trim_end_matches(':').eq_ignore_ascii_case("https") {
            "wss"
        } else {
            "ws"
        }
    }

    pub fn websocket_endpoint(&self) -> String {
        format!("{}://{}{}", self.websocket_scheme(), self.host, DEFAULT_WS_PATH)
    }
}

impl std::fmt::Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}://{}", self.scheme.trim_end_matches(':'), self.host)
    }
}

/// Ambient page information available to the resolver.
pub trait PlatformContext {
    /// The current page origin, or `None` outside a page (CLI, tests, servers).
    fn current_origin(&self) -> Option<Origin>;
}

/// No page context at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct Headless;

impl PlatformContext for Headless {
    fn current_origin(&self) -> Option<Origin> {
        None
    }
}

impl PlatformContext for Origin {
    fn current_origin(&self) -> Option<Origin> {
        Some(self.clone())
    }
}

impl PlatformContext for Option<Origin> {
    fn current_origin(&self) -> Option<Origin> {
        self.clone()
    }
}

/// Compute the push-channel address.
///
/// A non-empty `explicit` address wins verbatim. Without one, the address is
/// derived from the page origin, or [`FALLBACK_ENDPOINT`] when there is no page.
pub fn resolve_endpoint(explicit: Option<&str>, platform: &dyn PlatformContext) -> String {
    if let Some(url) = explicit.filter(|u| !u.is_empty()) {
        return url.to_string();
    }
    match platform.current_origin() {
        Some(origin) => origin.websocket_endpoint(),
        None => FALLBACK_ENDPOINT.to_string(),
    }
}
