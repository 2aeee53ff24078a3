use std::path::{Path, PathBuf};
use std::time::Duration;

use aurora_core::{DEFAULT_SYSTEM_INSTRUCTION, GenerationParams};
use serde::Deserialize;

use crate::error::AuroraError;

const DEFAULT_TYPING_DELAY_MS: u64 = 1200;
const DEFAULT_TITLE: &str = "Emotion AI Chat App";

#[derive(Debug, Deserialize, Default)]
pub struct Config {
    pub openrouter_api_key: Option<String>,
    pub giphy_api_key: Option<String>,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Deserialize, Default)]
pub struct SpotifyConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub struct ChatConfig {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub typing_delay_ms: Option<u64>,
    /// Sent as `HTTP-Referer` for OpenRouter attribution.
    pub referer: Option<String>,
    /// Sent as `X-Title` for OpenRouter attribution.
    pub title: Option<String>,
    #[serde(default)]
    pub params: GenerationParams,
}

impl Config {
    pub fn system_prompt(&self) -> &str {
        self.chat
            .system_prompt
            .as_deref()
            .unwrap_or(DEFAULT_SYSTEM_INSTRUCTION)
    }

    pub fn typing_delay(&self) -> Duration {
        Duration::from_millis(self.chat.typing_delay_ms.unwrap_or(DEFAULT_TYPING_DELAY_MS))
    }

    pub fn title(&self) -> String {
        self.chat.title.clone().unwrap_or_else(|| DEFAULT_TITLE.to_string())
    }

    /// OpenRouter key: environment first, then config file.
    pub fn api_key(&self) -> Result<String, AuroraError> {
        env_value("OPENROUTER_API_KEY")
            .or_else(|| non_empty(self.openrouter_api_key.as_deref()))
            .ok_or(AuroraError::ApiKeyNotFound)
    }

    /// Giphy key, if image lookups are configured.
    pub fn giphy_key(&self) -> Option<String> {
        env_value("GIPHY_API_KEY").or_else(|| non_empty(self.giphy_api_key.as_deref()))
    }

    /// Spotify client id and secret, if track lookups are configured.
    pub fn spotify_credentials(&self) -> Option<(String, String)> {
        let id = env_value("SPOTIFY_CLIENT_ID").or_else(|| non_empty(self.spotify.client_id.as_deref()))?;
        let secret = env_value("SPOTIFY_CLIENT_SECRET")
            .or_else(|| non_empty(self.spotify.client_secret.as_deref()))?;
        Some((id, secret))
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.filter(|v| !v.is_empty()).map(String::from)
}

fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("aurora").join("config.toml"))
}

/// Loads the config file.
///
/// An explicit path must exist. The default location may be missing, in which
/// case defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config, AuroraError> {
    let path = match explicit {
        Some(path) => {
            if !path.exists() {
                return Err(AuroraError::ConfigNotFound(path.to_path_buf()));
            }
            path.to_path_buf()
        }
        None => match config_path() {
            Some(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let content = std::fs::read_to_string(&path)?;
    parse_config(&content).map_err(|source| AuroraError::Config { path, source })
}

pub fn parse_config(content: &str) -> Result<Config, toml::de::Error> {
    toml::from_str(content)
}
