//! Configuration system for wsdrop.
//!
//! Resolution order: environment variables → config file → defaults.
//!
//! Config file location:
//!   1. $WSDROP_CONFIG (explicit override)
//!   2. $XDG_CONFIG_HOME/wsdrop/config.toml
//!   3. ~/.config/wsdrop/config.toml

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::chunk::{
    ReassemblyLimits, SplitPolicy, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MAX_INBOUND_BYTES,
    DEFAULT_MAX_INBOUND_TRANSFERS,
};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WsdropConfig {
    pub server: ServerConfig,
    pub identity: IdentityConfig,
    pub transfer: TransferConfig,
    pub receive: ReceiveConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// WebSocket endpoint. Only plain ws:// is supported.
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Sent in the INITIAL envelope, followed by a random suffix.
    pub client_name: String,
    /// Random suffixes are drawn from 0..suffix_range. 0 = no suffix.
    pub suffix_range: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransferConfig {
    /// Local file to send.
    pub file_path: PathBuf,
    /// Name the peer stores the file under. Empty = derive from file_path.
    pub remote_name: String,
    /// Max bytes per chunk. 0 = fixed two-way split.
    pub max_chunk_bytes: usize,
    /// Close the session once the handshake and the file are sent.
    pub close_when_done: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiveConfig {
    /// Write files the peer sends us to storage_path.
    pub save_files: bool,
    pub storage_path: PathBuf,
    /// Inbound files assembled at the same time.
    pub max_inbound_transfers: usize,
    /// Largest inbound file accepted, in bytes.
    pub max_inbound_bytes: usize,
}

// ── Defaults ──────────────────────────────────────────────────────────────────

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8080/ws".to_string(),
        }
    }
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            client_name: "wsdrop client".to_string(),
            suffix_range: 100,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            file_path: PathBuf::from("test.txt"),
            remote_name: String::new(),
            max_chunk_bytes: DEFAULT_MAX_CHUNK_SIZE,
            close_when_done: false,
        }
    }
}

impl Default for ReceiveConfig {
    fn default() -> Self {
        Self {
            save_files: false,
            storage_path: data_dir().join("incoming"),
            max_inbound_transfers: DEFAULT_MAX_INBOUND_TRANSFERS,
            max_inbound_bytes: DEFAULT_MAX_INBOUND_BYTES,
        }
    }
}

impl TransferConfig {
    pub fn split_policy(&self) -> SplitPolicy {
        SplitPolicy::from_max_bytes(self.max_chunk_bytes)
    }
}

impl ReceiveConfig {
    pub fn reassembly_limits(&self) -> ReassemblyLimits {
        ReassemblyLimits {
            max_transfers: self.max_inbound_transfers,
            max_bytes: self.max_inbound_bytes,
        }
    }
}

// ── Path helpers ──────────────────────────────────────────────────────────────

fn config_dir() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".config"))
        .join("wsdrop")
}

pub fn data_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| dirs_or_home().join(".local").join("share"))
        .join("wsdrop")
}

fn dirs_or_home() -> PathBuf {
    std::env::var("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("/tmp"))
}

// ── Errors ────────────────────────────────────────────────────────────────────

/// The config file could not be read, parsed, or written.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("cannot write config {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot render default config: {0}")]
    Render(#[from] toml::ser::Error),
}

// ── Loading ───────────────────────────────────────────────────────────────────

impl WsdropConfig {
    /// Load config: env vars → file → defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::file_path();
        let mut config = if path.exists() {
            Self::from_file(&path)?
        } else {
            WsdropConfig::default()
        };
        config.apply_env_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// `$WSDROP_CONFIG`, else `<config dir>/wsdrop/config.toml`.
    pub fn file_path() -> PathBuf {
        std::env::var("WSDROP_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| config_dir().join("config.toml"))
    }

    /// Create the config file with defaults unless one is already there.
    pub fn write_default_if_missing() -> Result<PathBuf, ConfigError> {
        let path = Self::file_path();
        if path.exists() {
            return Ok(path);
        }
        let write_err = |source| ConfigError::Write {
            path: path.clone(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let text = toml::to_string_pretty(&WsdropConfig::default())?;
        std::fs::write(&path, text).map_err(write_err)?;
        Ok(path)
    }

    /// Apply WSDROP_* overrides. `lookup` is `std::env::var` outside tests.
    pub fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("WSDROP_SERVER__URL") {
            self.server.url = v;
        }
        if let Some(v) = lookup("WSDROP_IDENTITY__CLIENT_NAME") {
            self.identity.client_name = v;
        }
        if let Some(v) = lookup("WSDROP_TRANSFER__FILE_PATH") {
            self.transfer.file_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("WSDROP_TRANSFER__REMOTE_NAME") {
            self.transfer.remote_name = v;
        }
        if let Some(v) = lookup("WSDROP_TRANSFER__MAX_CHUNK_BYTES") {
            if let Ok(n) = v.parse() {
                self.transfer.max_chunk_bytes = n;
            }
        }
        if let Some(v) = lookup("WSDROP_TRANSFER__CLOSE_WHEN_DONE") {
            self.transfer.close_when_done = v == "true" || v == "1";
        }
        if let Some(v) = lookup("WSDROP_RECEIVE__SAVE_FILES") {
            self.receive.save_files = v == "true" || v == "1";
        }
        if let Some(v) = lookup("WSDROP_RECEIVE__MAX_INBOUND_TRANSFERS") {
            if let Ok(n) = v.parse() {
                self.receive.max_inbound_transfers = n;
            }
        }
        if let Some(v) = lookup("WSDROP_RECEIVE__MAX_INBOUND_BYTES") {
            if let Ok(n) = v.parse() {
                self.receive.max_inbound_bytes = n;
            }
        }
    }
}
