//! TOML-based configuration persistence for the agent.
//!
//! Reads and writes [`AgentConfig`] to the platform-appropriate config file:
//! - Windows:  `%APPDATA%\PrintWatch\config.toml`
//! - Linux:    `~/.config/printwatch/config.toml`
//! - macOS:    `~/Library/Application Support/PrintWatch/config.toml`
//!
//! The file holds the agent-wide settings plus one `[[printers]]` table per
//! onboarded record:
//!
//! ```toml
//! [agent]
//! log_level = "info"
//!
//! [[printers]]
//! name = "Workbench"
//! address = "192.168.1.30"
//! serial_number = "SN-100"
//! check_code = "c0de"
//! poll_interval_secs = 10
//! ```
//!
//! Fields annotated with `#[serde(default = "...")]` fall back to their
//! defaults when absent, so the agent works on first run and when reading
//! config files written by older versions.

use std::path::PathBuf;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use printwatch_core::PrinterRecord;

use super::RecordStore;
use crate::infrastructure::device::http::DEFAULT_HTTP_PORT;
use printwatch_core::DISCOVERY_PORT;

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level agent configuration stored on disk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent: AgentSettings,
    #[serde(default)]
    pub printers: Vec<PrinterRecord>,
}

/// Agent-wide behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AgentSettings {
    /// `tracing` log level: `"error"`, `"warn"`, `"info"`, `"debug"`, `"trace"`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// UDP port printers answer discovery probes on.
    #[serde(default = "default_discovery_port")]
    pub discovery_port: u16,
    /// TCP port of the printers' HTTP control endpoint.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_log_level() -> String {
    "info".to_string()
}
fn default_discovery_port() -> u16 {
    DISCOVERY_PORT
}
fn default_http_port() -> u16 {
    DEFAULT_HTTP_PORT
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            discovery_port: default_discovery_port(),
            http_port: default_http_port(),
        }
    }
}

// ── TOML record store ─────────────────────────────────────────────────────────

/// [`RecordStore`] backed by the agent's TOML config file.
///
/// The file is read once at open and held in memory; every `put` rewrites
/// the file so a crash never loses a committed record.
pub struct TomlRecordStore {
    path: PathBuf,
    state: Mutex<AgentConfig>,
}

impl TomlRecordStore {
    /// Opens the store at the platform config path, creating defaults when
    /// no file exists yet.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NoPlatformConfigDir`] when the base directory
    /// cannot be determined, [`StoreError::Io`] / [`StoreError::Parse`]
    /// when an existing file cannot be read.
    pub fn open_default() -> Result<Self, StoreError> {
        Self::open(config_file_path()?)
    }

    /// Opens the store at an explicit path.
    pub fn open(path: PathBuf) -> Result<Self, StoreError> {
        let config = match std::fs::read_to_string(&path) {
            Ok(content) => toml::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => AgentConfig::default(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(
            "opened record store at {} with {} printer(s)",
            path.display(),
            config.printers.len()
        );
        Ok(Self {
            path,
            state: Mutex::new(config),
        })
    }

    /// Agent-wide settings as loaded from disk.
    pub fn settings(&self) -> AgentSettings {
        self.state
            .lock()
            .expect("config lock poisoned")
            .agent
            .clone()
    }

    fn persist(&self, config: &AgentConfig) -> Result<(), StoreError> {
        // Ensure directory exists before writing.
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })
    }
}

impl RecordStore for TomlRecordStore {
    fn get(&self, serial: &str) -> Option<PrinterRecord> {
        self.state
            .lock()
            .expect("config lock poisoned")
            .printers
            .iter()
            .find(|r| r.serial_number == serial)
            .cloned()
    }

    fn put(&self, record: PrinterRecord) -> Result<(), StoreError> {
        let mut state = self.state.lock().expect("config lock poisoned");
        if let Some(existing) = state
            .printers
            .iter_mut()
            .find(|r| r.serial_number == record.serial_number)
        {
            *existing = record;
        } else {
            state.printers.push(record);
        }
        self.persist(&state)
    }

    fn all(&self) -> Vec<PrinterRecord> {
        self.state
            .lock()
            .expect("config lock poisoned")
            .printers
            .clone()
    }
}

/// Resolves the full path to the config file.
fn config_file_path() -> Result<PathBuf, StoreError> {
    platform_config_dir()
        .map(|dir| dir.join("config.toml"))
        .ok_or(StoreError::NoPlatformConfigDir)
}

/// Resolves the platform config base directory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("PrintWatch"))
    }

    #[cfg(target_os = "linux")]
    {
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("printwatch"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("PrintWatch")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
