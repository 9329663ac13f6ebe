use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{DerivationCache, HdKeyError, Network};

/// Entries kept by the process-wide cache unless configured otherwise.
pub const DEFAULT_CACHE_CAPACITY: usize = 5000;

/// How the derivation cache retains entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "lowercase")]
pub enum CachePolicy {
    /// Keep at most `capacity` entries, evicting the least recently used.
    Lru { capacity: usize },
    /// Never evict.
    Unbounded,
    /// Store nothing; every derivation is recomputed.
    Disabled,
}

impl Default for CachePolicy {
    fn default() -> Self {
        CachePolicy::Lru {
            capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl CachePolicy {
    pub(crate) fn capacity(self) -> Option<usize> {
        match self {
            CachePolicy::Lru { capacity } => Some(capacity),
            CachePolicy::Unbounded => None,
            CachePolicy::Disabled => Some(0),
        }
    }
}

/// Process-level settings.
///
/// ```json
/// { "default_network": "testnet", "cache": { "policy": "lru", "capacity": 1000 } }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HdKeyConfig {
    pub default_network: Network,
    pub cache: CachePolicy,
}

impl HdKeyConfig {
    pub fn from_json_str(s: &str) -> Result<Self, HdKeyError> {
        serde_json::from_str(s)
            .map_err(|e| HdKeyError::InvalidArgument(format!("invalid configuration: {e}")))
    }
}

/// Applies `config` to the default network and the process-wide cache.
pub fn configure(config: &HdKeyConfig) {
    debug!(network = %config.default_network, cache = ?config.cache, "applying configuration");
    Network::set_default_network(config.default_network);
    DerivationCache::global().set_policy(config.cache);
}
