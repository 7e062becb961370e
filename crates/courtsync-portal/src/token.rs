//! Session token boundary.
//!
//! The real deployment derives the bearer token from the operator's logged-in
//! browser session. That bootstrap lives outside this crate; consumers see
//! only [`TokenProvider`].

use async_trait::async_trait;

use crate::PortalError;

/// Source of the portal bearer token.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Cheap readiness probe, used to skip collection cycles when the
    /// operator is not logged in.
    fn available(&self) -> bool;

    /// The current token.
    ///
    /// # Errors
    ///
    /// Returns [`PortalError::AuthUnavailable`] when no session exists.
    async fn bearer_token(&self) -> Result<String, PortalError>;
}

/// A fixed token handed over at startup (or absent, which fails closed).
#[derive(Debug, Clone)]
pub struct StaticTokenProvider {
    token: Option<String>,
}

impl StaticTokenProvider {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    fn available(&self) -> bool {
        self.token.is_some()
    }

    async fn bearer_token(&self) -> Result<String, PortalError> {
        self.token.clone().ok_or(PortalError::AuthUnavailable)
    }
}
