//! Memoization of child derivations.
//!
//! Entries are keyed by the parent's serialized form rather than by object
//! identity, so any two equal parents share their cached children.

use std::collections::{BTreeMap, HashMap};

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use tracing::trace;

use crate::{CachePolicy, ExtendedPrivateKey};

static GLOBAL: Lazy<DerivationCache> = Lazy::new(|| DerivationCache::new(CachePolicy::default()));

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct CacheKey {
    parent: String,
    index: u32,
    hardened: bool,
}

#[derive(Debug)]
struct Entry {
    child: ExtendedPrivateKey,
    last_used: u64,
}

#[derive(Debug)]
struct CacheState {
    policy: CachePolicy,
    entries: HashMap<CacheKey, Entry>,
    // last_used tick -> key, oldest first
    recency: BTreeMap<u64, CacheKey>,
    tick: u64,
}

impl CacheState {
    fn touch(&mut self, key: &CacheKey) -> Option<ExtendedPrivateKey> {
        self.tick += 1;
        let tick = self.tick;
        let entry = self.entries.get_mut(key)?;
        self.recency.remove(&entry.last_used);
        entry.last_used = tick;
        self.recency.insert(tick, key.clone());
        Some(entry.child.clone())
    }

    fn evict_to(&mut self, capacity: usize) {
        while self.entries.len() > capacity {
            let Some((_, key)) = self.recency.pop_first() else {
                break;
            };
            trace!(index = key.index, hardened = key.hardened, "evicting cached derivation");
            self.entries.remove(&key);
        }
    }
}

/// Thread-safe cache from (parent, index, hardened) to the derived child.
///
/// Lookups and inserts hold the lock only for the map operation; derivation
/// itself runs outside it, so two threads racing on the same child may both
/// compute it. The first insert wins and both callers get that key.
#[derive(Debug)]
pub struct DerivationCache {
    state: Mutex<CacheState>,
}

impl DerivationCache {
    pub fn new(policy: CachePolicy) -> Self {
        DerivationCache {
            state: Mutex::new(CacheState {
                policy,
                entries: HashMap::new(),
                recency: BTreeMap::new(),
                tick: 0,
            }),
        }
    }

    /// The process-wide cache used by `ExtendedPrivateKey::derive`.
    pub fn global() -> &'static DerivationCache {
        &GLOBAL
    }

    pub fn policy(&self) -> CachePolicy {
        self.state.lock().policy
    }

    /// Switches policy, evicting down to the new capacity.
    pub fn set_policy(&self, policy: CachePolicy) {
        let mut state = self.state.lock();
        state.policy = policy;
        if let Some(capacity) = policy.capacity() {
            state.evict_to(capacity);
        }
    }

    pub fn get(&self, parent: &str, index: u32, hardened: bool) -> Option<ExtendedPrivateKey> {
        let key = CacheKey {
            parent: parent.to_owned(),
            index,
            hardened,
        };
        let mut state = self.state.lock();
        if state.policy == CachePolicy::Disabled {
            return None;
        }
        let hit = state.touch(&key);
        trace!(index, hardened, hit = hit.is_some(), "derivation cache lookup");
        hit
    }

    /// Stores `child` unless an entry already exists, and returns whichever
    /// key is now cached.
    pub fn insert(
        &self,
        parent: &str,
        index: u32,
        hardened: bool,
        child: ExtendedPrivateKey,
    ) -> ExtendedPrivateKey {
        let key = CacheKey {
            parent: parent.to_owned(),
            index,
            hardened,
        };
        let mut state = self.state.lock();
        let capacity = state.policy.capacity();
        if capacity == Some(0) {
            return child;
        }
        if let Some(existing) = state.touch(&key) {
            return existing;
        }
        let tick = state.tick;
        state.recency.insert(tick, key.clone());
        state.entries.insert(
            key,
            Entry {
                child: child.clone(),
                last_used: tick,
            },
        );
        if let Some(capacity) = capacity {
            state.evict_to(capacity);
        }
        child
    }

    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.recency.clear();
    }
}
