use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuroraError {
    #[error("API key not found. Set OPENROUTER_API_KEY or configure ~/.config/aurora/config.toml")]
    ApiKeyNotFound,

    #[error("Config error in {path}: {source}")]
    Config {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Config file not found: {0}")]
    ConfigNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Logging setup failed: {0}")]
    Logging(String),
}
