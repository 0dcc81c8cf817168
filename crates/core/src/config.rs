//! Configuration via `vaultscan.toml`
//!
//! A single file carries the network selection plus scanner and key
//! derivation tuning. Every field has a default, so an empty file (or no
//! file at all) is a valid configuration.

use crate::error::{CoreError, Result};
use crate::network::{Network, NetworkParams};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "vaultscan.toml";

/// Scanner tuning, persisted under `[scanner]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScannerSettings {
    /// Coarse pass block size in bytes (default: 64 KiB)
    #[serde(default = "default_coarse_block_size")]
    pub coarse_block_size: usize,
    /// Refinement pass block size in bytes (default: 4 KiB)
    #[serde(default = "default_refine_block_size")]
    pub refine_block_size: usize,
    /// First byte offset to scan (default: 0)
    #[serde(default)]
    pub start_offset: u64,
    /// Number of bytes to scan; omitted means "until end of source"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scan_len: Option<u64>,
}

fn default_coarse_block_size() -> usize {
    64 * 1024
}

fn default_refine_block_size() -> usize {
    4 * 1024
}

impl Default for ScannerSettings {
    fn default() -> Self {
        ScannerSettings {
            coarse_block_size: default_coarse_block_size(),
            refine_block_size: default_refine_block_size(),
            start_offset: 0,
            scan_len: None,
        }
    }
}

/// Key derivation tuning, persisted under `[kdf]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KdfSettings {
    /// Derived key length in bytes, 48 to 1024 (default: 64; key 32 + IV 16 + spare)
    #[serde(default = "default_key_length")]
    pub key_length: usize,
}

fn default_key_length() -> usize {
    64
}

impl Default for KdfSettings {
    fn default() -> Self {
        KdfSettings {
            key_length: default_key_length(),
        }
    }
}

/// Configuration loaded from `vaultscan.toml`.
///
/// # Example
///
/// ```toml
/// network = "bitcoin"
///
/// [scanner]
/// coarse_block_size = 65536
/// refine_block_size = 4096
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultscanConfig {
    /// Network name: `"bitcoin"`, `"testnet"` or `"namecoin"`.
    #[serde(default = "default_network")]
    pub network: String,
    /// Disk scanner settings.
    #[serde(default)]
    pub scanner: ScannerSettings,
    /// Master-key derivation settings.
    #[serde(default)]
    pub kdf: KdfSettings,
}

fn default_network() -> String {
    "bitcoin".to_string()
}

impl Default for VaultscanConfig {
    fn default() -> Self {
        VaultscanConfig {
            network: default_network(),
            scanner: ScannerSettings::default(),
            kdf: KdfSettings::default(),
        }
    }
}

impl VaultscanConfig {
    /// Resolve the configured network name.
    pub fn network(&self) -> Result<Network> {
        self.network.parse()
    }

    /// Version bytes for the configured network.
    pub fn network_params(&self) -> Result<NetworkParams> {
        Ok(self.network()?.params())
    }

    /// Returns the default config file content with comments.
    pub fn default_toml() -> &'static str {
        r#"# Vaultscan configuration
#
# Network: "bitcoin" (default), "testnet" or "namecoin"
network = "bitcoin"

[scanner]
# Coarse pass block size in bytes (512 to 64 MiB). Larger blocks mean
# fewer reads but wider intervals for the refinement pass.
coarse_block_size = 65536
# Refinement pass block size in bytes. Must not exceed the coarse size.
refine_block_size = 4096
# Byte offset where scanning starts.
start_offset = 0
# Number of bytes to scan. Omit to scan to the end of the device.
# scan_len = 1073741824

[kdf]
# Derived key length in bytes (AES key + IV), 48 to 1024.
key_length = 64
"#
    }

    /// Parse config from TOML text and validate the network eagerly.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: VaultscanConfig = toml::from_str(content)
            .map_err(|e| CoreError::Config(format!("Failed to parse config: {}", e)))?;
        config.network()?;
        Ok(config)
    }

    /// Read and parse config from a file path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CoreError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Load `path` if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::from_file(path)
        } else {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Write the default config file if it does not already exist.
    pub fn write_default_if_missing(path: &Path) -> Result<()> {
        if !path.exists() {
            std::fs::write(path, Self::default_toml()).map_err(|e| {
                CoreError::Config(format!(
                    "Failed to write default config file '{}': {}",
                    path.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }

    /// Serialize this config to TOML and write it to the given path.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| CoreError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content).map_err(|e| {
            CoreError::Config(format!(
                "Failed to write config file '{}': {}",
                path.display(),
                e
            ))
        })
    }
}
