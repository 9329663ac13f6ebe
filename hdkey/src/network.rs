use std::{fmt, str::FromStr};

use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::HdKeyError;

// Version bytes for serialization
pub const LIVENET_XPRIVKEY: u32 = 0x0488_ADE4;
pub const LIVENET_XPUBKEY: u32 = 0x0488_B21E;
pub const TESTNET_XPRIVKEY: u32 = 0x0435_8394;
pub const TESTNET_XPUBKEY: u32 = 0x0435_87CF;

static DEFAULT_NETWORK: RwLock<Network> = parking_lot::const_rwlock(Network::Livenet);

/// Networks known to the registry, each with its own extended key versions.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum Network {
    #[default]
    Livenet,
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Livenet, Network::Testnet];

    /// Canonical registry name.
    pub fn name(self) -> &'static str {
        match self {
            Network::Livenet => "livenet",
            Network::Testnet => "testnet",
        }
    }

    pub fn xprivkey_version(self) -> u32 {
        match self {
            Network::Livenet => LIVENET_XPRIVKEY,
            Network::Testnet => TESTNET_XPRIVKEY,
        }
    }

    pub fn xpubkey_version(self) -> u32 {
        match self {
            Network::Livenet => LIVENET_XPUBKEY,
            Network::Testnet => TESTNET_XPUBKEY,
        }
    }

    pub fn from_xprv_version(version: u32) -> Option<Network> {
        Self::ALL
            .into_iter()
            .find(|n| n.xprivkey_version() == version)
    }

    pub fn from_xpub_version(version: u32) -> Option<Network> {
        Self::ALL.into_iter().find(|n| n.xpubkey_version() == version)
    }

    /// Network used when a caller does not name one.
    pub fn default_network() -> Network {
        *DEFAULT_NETWORK.read()
    }

    pub fn set_default_network(network: Network) {
        *DEFAULT_NETWORK.write() = network;
    }
}

impl FromStr for Network {
    type Err = HdKeyError;

    fn from_str(s: &str) -> Result<Self, HdKeyError> {
        match s.to_ascii_lowercase().as_str() {
            "livenet" | "mainnet" | "bitcoin" => Ok(Network::Livenet),
            "testnet" | "testnet3" | "regtest" => Ok(Network::Testnet),
            _ => Err(HdKeyError::InvalidNetworkArgument(s.to_owned())),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for Network {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Network {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
