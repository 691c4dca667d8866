//! Configuration and color scheme management for tinyterm.
//!
//! This module provides:
//! - TOML configuration file loading from `~/.tinyterm/config.toml`
//! - Engine export names for the WebAssembly interpreter
//! - Built-in color schemes (default, solarized-dark, monokai, nord, etc.)
//!
//! # Configuration File
//!
//! ```toml
//! # Path to the compiled interpreter
//! engine = "zig-out/bin/tinylisp.wasm"
//!
//! banner = "Welcome to TINYLISP!"
//! docs_url = "https://github.com/daneelsan/tinylisp/blob/main/README.md"
//! prompt = "λ "
//! tab_width = 4
//!
//! # Color scheme: default, solarized-dark, monokai, nord, dracula,
//! #               gruvbox-dark, tokyo-night
//! color_scheme = "tokyo-night"
//!
//! [exports]
//! init = "tinylisp_init"
//! run = "tinylisp_run"
//!
//! [history]
//! persist = true
//! limit = 1000
//!
//! [keys]
//! submit = ["shift+enter"]
//! newline = ["enter"]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

use crate::history::HISTORY_LIMIT;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to the interpreter module
    pub engine: PathBuf,
    /// Engine export names
    pub exports: ExportNames,
    /// First line of the output, restored by `?clear`
    pub banner: String,
    /// Opened by `?help`
    pub docs_url: String,
    /// Printed before echoed commands and the input line
    pub prompt: String,
    /// Spaces per tab when displaying output
    pub tab_width: usize,
    /// Color scheme name
    pub color_scheme: String,
    pub history: HistoryConfig,
    pub keys: KeysConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            engine: PathBuf::from("tinylisp.wasm"),
            exports: ExportNames::default(),
            banner: "Welcome to TINYLISP!".to_string(),
            docs_url: "https://github.com/daneelsan/tinylisp/blob/main/README.md".to_string(),
            prompt: "λ ".to_string(),
            tab_width: 4,
            color_scheme: "default".to_string(),
            history: HistoryConfig::default(),
            keys: KeysConfig::default(),
        }
    }
}

/// Names the interpreter module exports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportNames {
    pub init: String,
    pub run: String,
    pub alloc: String,
    pub free: String,
    pub memory: String,
}

impl Default for ExportNames {
    fn default() -> Self {
        Self {
            init: "tinylisp_init".to_string(),
            run: "tinylisp_run".to_string(),
            alloc: "_wasm_alloc".to_string(),
            free: "_wasm_free".to_string(),
            memory: "memory".to_string(),
        }
    }
}

/// History settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Keep history across sessions
    pub persist: bool,
    /// Entries kept on disk
    pub limit: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            persist: false,
            limit: HISTORY_LIMIT,
        }
    }
}

/// Key bindings for the two Enter gestures.
///
/// Empty lists mean "pick defaults for this terminal".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub submit: Vec<String>,
    pub newline: Vec<String>,
}

impl Config {
    /// Load configuration from the default location, falling back to
    /// defaults when it is missing or broken
    pub fn load() -> Self {
        let Some(path) = Self::get_config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{}; using defaults", e);
                Self::default()
            }
        }
    }

    /// Load configuration from a specific file
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Get config file path
    fn get_config_path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get the color scheme
    pub fn get_color_scheme(&self) -> ColorScheme {
        ColorScheme::by_name(&self.color_scheme)
    }
}

/// `~/.tinyterm`, created on first use
pub fn config_dir() -> Option<PathBuf> {
    let dir = home_dir()?.join(".tinyterm");
    if !dir.exists() {
        let _ = fs::create_dir_all(&dir);
    }
    Some(dir)
}

/// Color definition (RGB)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Convert to crossterm Color
    pub fn to_crossterm(&self) -> crossterm::style::Color {
        crossterm::style::Color::Rgb {
            r: self.r,
            g: self.g,
            b: self.b,
        }
    }
}

/// Color scheme definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColorScheme {
    pub name: String,
    pub banner: Color,
    pub prompt: Color,
    pub command: Color,
    pub result: Color,
    pub input: Color,
    pub notice: Color,
}

impl Default for ColorScheme {
    fn default() -> Self {
        Self::default_scheme()
    }
}

impl ColorScheme {
    /// Default color scheme
    pub fn default_scheme() -> Self {
        Self {
            name: "default".to_string(),
            banner: Color::new(255, 255, 255),
            prompt: Color::new(0, 200, 0),
            // Echoed commands in green, results in light gray
            command: Color::new(0, 200, 0),
            result: Color::new(200, 200, 200),
            input: Color::new(255, 255, 255),
            notice: Color::new(200, 200, 0),
        }
    }

    /// Solarized Dark scheme
    pub fn solarized_dark() -> Self {
        Self {
            name: "solarized-dark".to_string(),
            banner: Color::new(253, 246, 227),
            prompt: Color::new(133, 153, 0),
            command: Color::new(133, 153, 0),
            result: Color::new(147, 161, 161),
            input: Color::new(238, 232, 213),
            notice: Color::new(181, 137, 0),
        }
    }

    /// Monokai scheme
    pub fn monokai() -> Self {
        Self {
            name: "monokai".to_string(),
            banner: Color::new(248, 248, 242),
            prompt: Color::new(166, 226, 46),
            command: Color::new(166, 226, 46),
            result: Color::new(248, 248, 242),
            input: Color::new(248, 248, 242),
            notice: Color::new(249, 38, 114),
        }
    }

    /// Nord scheme
    pub fn nord() -> Self {
        Self {
            name: "nord".to_string(),
            banner: Color::new(236, 239, 244),
            prompt: Color::new(163, 190, 140),
            command: Color::new(163, 190, 140),
            result: Color::new(216, 222, 233),
            input: Color::new(236, 239, 244),
            notice: Color::new(235, 203, 139),
        }
    }

    /// Dracula scheme
    pub fn dracula() -> Self {
        Self {
            name: "dracula".to_string(),
            banner: Color::new(248, 248, 242),
            prompt: Color::new(80, 250, 123),
            command: Color::new(80, 250, 123),
            result: Color::new(248, 248, 242),
            input: Color::new(248, 248, 242),
            notice: Color::new(255, 184, 108),
        }
    }

    /// Gruvbox Dark scheme
    pub fn gruvbox_dark() -> Self {
        Self {
            name: "gruvbox-dark".to_string(),
            banner: Color::new(235, 219, 178),
            prompt: Color::new(152, 151, 26),
            command: Color::new(152, 151, 26),
            result: Color::new(235, 219, 178),
            input: Color::new(251, 241, 199),
            notice: Color::new(215, 153, 33),
        }
    }

    /// Tokyo Night scheme
    pub fn tokyo_night() -> Self {
        Self {
            name: "tokyo-night".to_string(),
            banner: Color::new(192, 202, 245),
            prompt: Color::new(158, 206, 106),
            command: Color::new(158, 206, 106),
            result: Color::new(169, 177, 214),
            input: Color::new(192, 202, 245),
            notice: Color::new(224, 175, 104),
        }
    }

    /// Get scheme by name
    pub fn by_name(name: &str) -> Self {
        match name.to_lowercase().as_str() {
            "solarized-dark" | "solarized_dark" => Self::solarized_dark(),
            "monokai" => Self::monokai(),
            "nord" => Self::nord(),
            "dracula" => Self::dracula(),
            "gruvbox-dark" | "gruvbox_dark" | "gruvbox" => Self::gruvbox_dark(),
            "tokyo-night" | "tokyo_night" | "tokyonight" => Self::tokyo_night(),
            _ => Self::default_scheme(),
        }
    }

    /// List available schemes
    pub fn list() -> Vec<&'static str> {
        vec![
            "default",
            "solarized-dark",
            "monokai",
            "nord",
            "dracula",
            "gruvbox-dark",
            "tokyo-night",
        ]
    }
}

// Get home directory
fn home_dir() -> Option<PathBuf> {
    std::env::var_os("USERPROFILE")
        .or_else(|| std::env::var_os("HOME"))
        .map(PathBuf::from)
}
