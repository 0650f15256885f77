//! Configuration file management.
//!
//! Read from `$YIELDGATE_DATA_DIR/config.toml`; every section and field
//! falls back to its default when absent.

use std::path::PathBuf;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use yieldgate_attestor::SlashPolicy;
use yieldgate_types::AccountId;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "YIELDGATE_DATA_DIR";

/// Complete daemon configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Protocol roles and policies.
    #[serde(default)]
    pub protocol: ProtocolConfig,
    /// RPC server settings.
    #[serde(default)]
    pub rpc: RpcConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Storage configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Data directory. Empty = platform default.
    #[serde(default)]
    pub data_dir: String,
}

/// Protocol configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProtocolConfig {
    /// Hex Ed25519 public key allowed to slash and reject claims.
    #[serde(default)]
    pub authority: String,
    /// Destination of slashed stake.
    #[serde(default)]
    pub slash_policy: SlashPolicy,
}

/// RPC configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcConfig {
    /// Socket file name inside the data directory.
    #[serde(default = "default_socket_name")]
    pub socket_name: String,
    /// Per-subscriber event buffer.
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: "trace" | "debug" | "info" | "warn" | "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_socket_name() -> String {
    "yieldgate.sock".to_string()
}

fn default_event_buffer() -> usize {
    1000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            socket_name: default_socket_name(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ProtocolConfig {
    /// Parse the configured authority key.
    pub fn authority(&self) -> anyhow::Result<AccountId> {
        if self.authority.is_empty() {
            anyhow::bail!("[protocol] authority is not set");
        }
        AccountId::from_hex(&self.authority).context("[protocol] authority")
    }
}

impl DaemonConfig {
    /// Load configuration from the default config file location.
    ///
    /// Falls back to defaults if file does not exist.
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();
        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading {}", config_path.display()))?;
            Self::parse(&content)
        } else {
            Ok(Self::default())
        }
    }

    /// Parse a TOML document.
    pub fn parse(content: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Get the data directory path.
    pub fn data_dir(&self) -> PathBuf {
        if self.storage.data_dir.is_empty() {
            Self::default_data_dir()
        } else {
            PathBuf::from(&self.storage.data_dir)
        }
    }

    /// Socket path inside the data directory.
    pub fn socket_path(&self) -> PathBuf {
        self.data_dir().join(&self.rpc.socket_name)
    }

    fn config_path() -> PathBuf {
        Self::default_data_dir().join("config.toml")
    }

    fn default_data_dir() -> PathBuf {
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            return PathBuf::from(dir);
        }
        std::env::var("HOME")
            .map(|h| PathBuf::from(h).join(".yieldgate"))
            .unwrap_or_else(|_| PathBuf::from("/tmp/yieldgate"))
    }
}
