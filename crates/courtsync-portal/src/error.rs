use thiserror::Error;

/// Errors returned by the portal API client.
#[derive(Debug, Error)]
pub enum PortalError {
    /// Network or TLS failure from the underlying HTTP client.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The portal answered with a 5xx status. The only retryable class, and
    /// only during availability fetches.
    #[error("portal server error: HTTP {status}")]
    Server { status: u16 },

    /// The transport call succeeded but the portal reported failure, either
    /// via a non-2xx status or a non-success body envelope.
    #[error("portal API error: {0}")]
    Api(String),

    /// No session token is available; the operator has not logged in to the
    /// portal (or the session expired).
    #[error("portal auth token unavailable; log in to the portal dashboard")]
    AuthUnavailable,

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PortalError {
    /// True for 5xx-class failures, whether surfaced as a typed status or as
    /// a transport-level error carrying one.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        match self {
            PortalError::Server { .. } => true,
            PortalError::Http(e) => e.status().is_some_and(|s| s.is_server_error()),
            _ => false,
        }
    }
}
