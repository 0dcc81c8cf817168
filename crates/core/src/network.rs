//! Network parameters.
//!
//! Version bytes are passed explicitly into every encoding call; nothing
//! in the crate keeps a process-wide "current network".

use crate::error::CoreError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Known networks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    /// Bitcoin mainnet
    Bitcoin,
    /// Bitcoin testnet
    Testnet,
    /// Namecoin mainnet
    Namecoin,
}

impl Network {
    /// Version bytes and prefixes for this network.
    pub fn params(self) -> NetworkParams {
        match self {
            Network::Bitcoin => NetworkParams::BITCOIN,
            Network::Testnet => NetworkParams::TESTNET,
            Network::Namecoin => NetworkParams::NAMECOIN,
        }
    }

    /// Lowercase name, as used in `vaultscan.toml`.
    pub fn as_str(self) -> &'static str {
        match self {
            Network::Bitcoin => "bitcoin",
            Network::Testnet => "testnet",
            Network::Namecoin => "namecoin",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Network {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "bitcoin" | "mainnet" => Ok(Network::Bitcoin),
            "testnet" => Ok(Network::Testnet),
            "namecoin" => Ok(Network::Namecoin),
            other => Err(CoreError::UnknownNetwork(other.to_string())),
        }
    }
}

/// Version bytes and address prefixes for one network.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkParams {
    /// Display name
    pub name: &'static str,
    /// P2PKH address version byte
    pub address_version: u8,
    /// WIF private key version byte
    pub private_key_version: u8,
    /// P2SH address version byte
    pub script_version: u8,
    /// Bech32 human-readable part, if the network has segwit addresses
    pub bech32_prefix: Option<&'static str>,
}

impl NetworkParams {
    /// Bitcoin mainnet
    pub const BITCOIN: NetworkParams = NetworkParams {
        name: "Bitcoin",
        address_version: 0x00,
        private_key_version: 0x80,
        script_version: 0x05,
        bech32_prefix: Some("bc"),
    };

    /// Bitcoin testnet
    pub const TESTNET: NetworkParams = NetworkParams {
        name: "Bitcoin Testnet",
        address_version: 0x6f,
        private_key_version: 0xef,
        script_version: 0xc4,
        bech32_prefix: Some("tb"),
    };

    /// Namecoin
    pub const NAMECOIN: NetworkParams = NetworkParams {
        name: "Namecoin",
        address_version: 0x34,
        private_key_version: 0xb4,
        script_version: 0x0d,
        bech32_prefix: None,
    };

    /// Ad-hoc altcoin parameters from a bare address version byte.
    ///
    /// Follows the legacy convention of private key version = address
    /// version + 128. Script version and bech32 prefix are unknown.
    pub fn from_address_version(address_version: u8) -> Self {
        NetworkParams {
            name: "custom",
            address_version,
            private_key_version: address_version.wrapping_add(128),
            script_version: 0x05,
            bech32_prefix: None,
        }
    }
}

impl Default for NetworkParams {
    fn default() -> Self {
        NetworkParams::BITCOIN
    }
}
