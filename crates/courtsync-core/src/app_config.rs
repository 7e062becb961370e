use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    /// Optional YAML sport catalog; when unset the built-in catalog is used.
    pub sports_path: Option<PathBuf>,
    pub portal_base_url: String,
    /// Session-derived bearer token for the booking portal. When unset the
    /// portal adapter reports not-ready and write operations fail closed.
    pub portal_auth_token: Option<String>,
    pub portal_timeout_secs: u64,
    /// Bearer token required on the HTTP API. When unset the API is open,
    /// which is only sensible in development.
    pub api_auth_token: Option<String>,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub sync_cooldown_secs: u64,
    pub sync_interval_secs: u64,
    pub sync_jitter_secs: u64,
    pub request_wait_secs: u64,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("sports_path", &self.sports_path)
            .field("database_url", &"[redacted]")
            .field("portal_base_url", &self.portal_base_url)
            .field(
                "portal_auth_token",
                &self.portal_auth_token.as_ref().map(|_| "[redacted]"),
            )
            .field("portal_timeout_secs", &self.portal_timeout_secs)
            .field(
                "api_auth_token",
                &self.api_auth_token.as_ref().map(|_| "[redacted]"),
            )
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field("sync_cooldown_secs", &self.sync_cooldown_secs)
            .field("sync_interval_secs", &self.sync_interval_secs)
            .field("sync_jitter_secs", &self.sync_jitter_secs)
            .field("request_wait_secs", &self.request_wait_secs)
            .finish()
    }
}
