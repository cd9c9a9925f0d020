//! Configuration file handling for the tror host.
//!
//! The configuration file is located at `~/.tror/config.toml`:
//!
//! ```toml
//! [terminal]
//! width = 51
//! height = 19
//!
//! [session]
//! id = 0
//!
//! [protocol]
//! # Prepended to every outbound line (for shared streams)
//! prefix = ""
//! # Emit the legacy SP capability record on first attach
//! announce_capabilities = false
//! capabilities = ["tror"]
//! ```
//!
//! A missing or unreadable file falls back to defaults; a partial file fills
//! in the missing fields.

use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Terminal geometry
    pub terminal: TerminalConfig,
    /// Session identity
    pub session: SessionConfig,
    /// Wire protocol settings
    pub protocol: ProtocolConfig,
}

/// Terminal geometry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TerminalConfig {
    pub width: u16,
    pub height: u16,
}

impl Default for TerminalConfig {
    fn default() -> Self {
        Self {
            width: 51,
            height: 19,
        }
    }
}

/// Session configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub id: i32,
}

/// Protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolConfig {
    /// Prefix prepended to every outbound line
    pub prefix: String,
    /// Whether to announce capabilities with a legacy `SP` record
    pub announce_capabilities: bool,
    /// Capability names announced when enabled
    pub capabilities: Vec<String>,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            announce_capabilities: false,
            capabilities: vec!["tror".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load() -> Self {
        if let Some(path) = Self::get_config_path() {
            if path.exists() {
                if let Ok(content) = fs::read_to_string(&path) {
                    if let Ok(config) = toml::from_str(&content) {
                        return config;
                    }
                }
            }
        }
        Self::default()
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<(), String> {
        if let Some(path) = Self::get_config_path() {
            let content = toml::to_string_pretty(self)
                .map_err(|e| format!("Failed to serialize config: {}", e))?;
            fs::write(&path, content).map_err(|e| format!("Failed to write config: {}", e))?;
            Ok(())
        } else {
            Err("Could not determine config path".to_string())
        }
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        if let Some(home) = home_dir() {
            let tror_dir = home.join(".tror");
            if !tror_dir.exists() {
                let _ = fs::create_dir_all(&tror_dir);
            }
            return Some(tror_dir.join("config.toml"));
        }
        None
    }

    /// Capabilities to announce, or empty when announcement is disabled.
    pub fn announced_capabilities(&self) -> Vec<String> {
        if self.protocol.announce_capabilities {
            self.protocol.capabilities.clone()
        } else {
            Vec::new()
        }
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
