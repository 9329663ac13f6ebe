//! BIP32 hierarchical deterministic private keys.
//!
//! An [`ExtendedPrivateKey`] is built from a seed, from its Base58Check
//! serialization, from JSON or from a plain field bag, and derives children
//! by index or by path (`m/0/1/2'`). Derivations are memoized in a
//! [`DerivationCache`].
//!
//! ```rust,ignore
//! use hdkey::{ExtendedPrivateKey, Network};
//!
//! let master = ExtendedPrivateKey::from_seed("000102030405060708090a0b0c0d0e0f", None)?;
//! let account = master.derive("m/44'/0'/0'", false)?;
//! let xpub = account.extended_public_key().to_serialized_string();
//! ```

pub mod cache;
pub mod config;
pub mod derivation;
pub mod error;
pub mod extended_key;
pub mod extended_pub;
pub mod fields;
pub mod layout;
pub mod network;

pub use cache::DerivationCache;
pub use config::{CachePolicy, HdKeyConfig, configure};
pub use derivation::{DerivationPath, DeriveArg, HARDENED_OFFSET, is_valid_path};
pub use error::{ErrorKind, HdKeyError};
pub use extended_key::{Entropy, ExtendedPrivateKey, KeySource};
pub use extended_pub::ExtendedPublicKey;
pub use fields::{FieldValue, KeyFields, KeyObject};
pub use layout::{SerializedData, is_valid_serialized, serialized_error};
pub use network::Network;
