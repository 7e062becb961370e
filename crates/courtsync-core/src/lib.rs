mod app_config;
mod config;
mod sports;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use sports::{load_sports, Sport, SportCatalog, SportsFile};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
    #[error("failed to read sports file {path}: {source}")]
    SportsFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse sports file: {0}")]
    SportsFileParse(#[from] serde_yaml::Error),
    #[error("validation error: {0}")]
    Validation(String),
}
