// config.rs - User configuration.
//
// Read from the OS-standard config directory, e.g.
//      on Linux:   ~/.config/gametracker/config.toml
//      on macOS:   ~/Library/Application Support/gametracker/config.toml
//      on Windows: C:\Users\<user>\AppData\Roaming\gametracker\config.toml
// A missing file is not an error; every field has a default.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::forms::FormTiming;
use crate::stats::DEFAULT_TOP_N;

/// Overrides `api_base_url` when set.
pub const API_URL_ENV: &str = "GAMETRACKER_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Origin of the REST backend; `/api/...` paths are appended to it.
    pub api_base_url:         String,
    pub request_timeout_secs: u64,
    /// Lifetime of inline messages on the game forms.
    pub game_message_secs:    u64,
    /// Lifetime of inline messages on the review form and review list.
    pub review_message_secs:  u64,
    /// Delay between a successful edit and its overlay closing.
    pub close_delay_ms:       u64,
    /// Entries shown per dashboard chart.
    pub top_n:                usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_base_url:         "http://localhost:3000".to_string(),
            request_timeout_secs: 10,
            game_message_secs:    4,
            review_message_secs:  3,
            close_delay_ms:       1000,
            top_n:                DEFAULT_TOP_N,
        }
    }
}

impl Config {
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("gametracker").join("config.toml"))
    }

    /// Load from the default location, then apply the environment override.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_from(&path)?,
            _ => Config::default(),
        };
        Ok(config.with_api_url_override(std::env::var(API_URL_ENV).ok()))
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&contents)?;
        log::debug!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    pub fn with_api_url_override(mut self, url: Option<String>) -> Self {
        if let Some(url) = url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn game_form_timing(&self) -> FormTiming {
        FormTiming {
            message_ttl: Duration::from_secs(self.game_message_secs),
            close_delay: Duration::from_millis(self.close_delay_ms),
        }
    }

    pub fn review_form_timing(&self) -> FormTiming {
        FormTiming {
            message_ttl: Duration::from_secs(self.review_message_secs),
            close_delay: Duration::from_millis(self.close_delay_ms),
        }
    }
}
