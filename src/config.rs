//! Configuration persistence
//!
//! Stores connections, AI settings, key bindings and editor preferences in
//! `~/.config/sqdesk/config.yaml` (or `$XDG_CONFIG_HOME/sqdesk/config.yaml`).
//! Every field has a default, so a partial file is valid.

use crate::editor::keymap::KeyMap;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};
use thiserror::Error;

const APP_DIR: &str = "sqdesk";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("no config directory available")]
    NoConfigDir,
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] serde_yaml::Error),
}

/// `$XDG_CONFIG_HOME/sqdesk`, else `~/.config/sqdesk`
pub fn config_dir() -> Option<PathBuf> {
    env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .map(|config| config.join(APP_DIR))
}

pub fn config_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.yaml"))
}

pub fn logs_dir() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("logs"))
}

/// Line-mode REPL history file
pub fn history_file() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("history.txt"))
}

/// A saved database connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    pub name: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: Option<String>,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            host: "localhost".to_string(),
            port: 3306,
            user: String::new(),
            password: String::new(),
            database: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// `none` or `openai`
    pub provider: String,
    pub api_key: String,
    pub model: String,
    /// Override for OpenAI-compatible endpoints
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorSettings {
    pub show_line_numbers: bool,
    pub soft_wrap: bool,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            show_line_numbers: true,
            soft_wrap: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionSettings {
    pub max_items: usize,
    pub ai_enabled: bool,
    pub ai_timeout_ms: u64,
    pub ai_min_word_len: usize,
    pub history_capacity: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            max_items: 20,
            ai_enabled: true,
            ai_timeout_ms: 3000,
            ai_min_word_len: 3,
            history_capacity: 100,
        }
    }
}

impl CompletionSettings {
    pub fn ai_timeout(&self) -> Duration {
        Duration::from_millis(self.ai_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub connections: Vec<ConnectionConfig>,
    /// Index into `connections`
    pub active_connection: Option<usize>,
    pub ai: AiConfig,
    pub keymap: KeyMap,
    pub editor: EditorSettings,
    pub completion: CompletionSettings,
}

impl Config {
    /// Load config from `path` (or the default location), falling back to
    /// defaults when the file is missing or unreadable
    pub fn load(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(config_file) {
            Some(path) => path,
            None => {
                tracing::debug!("No config directory available, using defaults");
                return Self::default();
            }
        };

        if !path.exists() {
            tracing::debug!("Config file not found at {}, using defaults", path.display());
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                tracing::warn!("{}, using defaults", e);
                Self::default()
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save to the default location
    pub fn save(&self) -> Result<(), ConfigError> {
        let path = config_file().ok_or(ConfigError::NoConfigDir)?;
        self.save_to(&path)
    }

    /// Save to `path`, creating its directory if needed
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_yaml::to_string(self)?;
        fs::write(path, content).map_err(io_error)?;

        tracing::info!("Saved config to {}", path.display());
        Ok(())
    }

    pub fn active_connection(&self) -> Option<&ConnectionConfig> {
        self.active_connection
            .and_then(|index| self.connections.get(index))
    }
}
