use std::{fmt, str::FromStr};

use crypto_utils::{hash::hash160, hmac::hmac_sha512};
use rand::{RngCore, rngs::OsRng};
use secp256k1::{PublicKey, SECP256K1, Scalar, SecretKey};
use serde_json::Value;
use tracing::{debug, warn};

use crate::{
    DerivationCache, ExtendedPublicKey, HdKeyError, Network,
    derivation::{DerivationPath, DeriveArg, HARDENED_OFFSET, next_index, normalize_index},
    fields::{KeyFields, KeyObject},
    layout::{self, KeyBuffers, SerializedData},
};

/// Seed length bounds in bytes (128 to 512 bits).
pub const MIN_ENTROPY_BYTES: usize = 16;
pub const MAX_ENTROPY_BYTES: usize = 64;
/// Length of the seed drawn from the OS when no seed is given.
pub const RANDOM_SEED_BYTES: usize = 64;

const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

/// Seed material for `ExtendedPrivateKey::from_seed`.
#[derive(Clone, Copy, Debug)]
pub enum Entropy<'a> {
    Bytes(&'a [u8]),
    Hex(&'a str),
}

impl<'a> From<&'a [u8]> for Entropy<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Entropy::Bytes(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for Entropy<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Entropy::Bytes(bytes)
    }
}

impl<'a> From<&'a Vec<u8>> for Entropy<'a> {
    fn from(bytes: &'a Vec<u8>) -> Self {
        Entropy::Bytes(bytes)
    }
}

impl<'a> From<&'a str> for Entropy<'a> {
    fn from(hex: &'a str) -> Self {
        Entropy::Hex(hex)
    }
}

/// Everything an extended private key can be built from.
#[derive(Clone, Debug)]
pub enum KeySource<'a> {
    /// Fresh key from OS randomness on the default network.
    Random,
    /// Serialized text or JSON text.
    Text(&'a str),
    /// Serialized text or JSON text, as bytes.
    Bytes(&'a [u8]),
    Fields(KeyFields),
    /// An already built key, returned as is.
    Existing(ExtendedPrivateKey),
}

/// Extended private key (xprv)
///
/// Immutable once built; every derivation returns a new key. All derived
/// values (public key, fingerprint, checksum, serialized text) are computed
/// at construction.
#[derive(Clone, PartialEq, Eq)]
pub struct ExtendedPrivateKey {
    network: Network,
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_index: u32,
    chain_code: [u8; 32],
    private_key: SecretKey,
    public_key: PublicKey,
    fingerprint: [u8; 4],
    checksum: [u8; 4],
    xprivkey: String,
}

/// First four bytes of hash160 of the compressed public key.
pub(crate) fn fingerprint(pubkey: &PublicKey) -> [u8; 4] {
    layout::array_at(&hash160(&pubkey.serialize()), 0)
}

impl ExtendedPrivateKey {
    /// Builds a key from any accepted source.
    pub fn build(source: KeySource<'_>) -> Result<Self, HdKeyError> {
        match source {
            KeySource::Random => Self::random(Network::default_network()),
            KeySource::Text(text) => Self::from_text(SerializedData::Text(text), text.as_bytes()),
            KeySource::Bytes(bytes) => Self::from_text(SerializedData::Bytes(bytes), bytes),
            KeySource::Fields(fields) => Self::from_fields(fields),
            KeySource::Existing(key) => Ok(Self::from_existing(key)),
        }
    }

    /// Identity: an existing key is already fully built.
    pub fn from_existing(key: ExtendedPrivateKey) -> Self {
        key
    }

    fn from_text(data: SerializedData<'_>, raw: &[u8]) -> Result<Self, HdKeyError> {
        if layout::is_valid_serialized(data, None) {
            return Self::from_serialized(data);
        }
        match serde_json::from_slice::<Value>(raw) {
            Ok(value @ Value::Object(_)) => Self::from_json_value(value),
            _ => Err(HdKeyError::UnrecognizedArgument(format!(
                "expected a serialized extended private key or a JSON object, got {:?}",
                String::from_utf8_lossy(raw)
            ))),
        }
    }

    /// Decodes the Base58Check text form.
    pub fn from_serialized<'a>(data: impl Into<SerializedData<'a>>) -> Result<Self, HdKeyError> {
        let (payload, text) = layout::decode_serialized(data.into(), None)?;
        let (buffers, padding) = KeyBuffers::from_payload(&payload, None)?;
        let key = Self::from_buffers(buffers, padding, Some(text.into_owned()))?;
        debug!(
            fingerprint = %hex::encode(key.fingerprint),
            depth = key.depth,
            "decoded extended private key"
        );
        Ok(key)
    }

    /// Decodes the raw 82-byte form.
    pub fn from_buffer(bytes: &[u8]) -> Result<Self, HdKeyError> {
        let (buffers, padding) = KeyBuffers::from_bytes(bytes)?;
        Self::from_buffers(buffers, padding, None)
    }

    /// Builds from a JSON object with the `KeyFields` shape.
    pub fn from_json(json: &str) -> Result<Self, HdKeyError> {
        match serde_json::from_str::<Value>(json) {
            Ok(value @ Value::Object(_)) => Self::from_json_value(value),
            Ok(_) => Err(HdKeyError::InvalidArgument(
                "expected a JSON object".to_owned(),
            )),
            Err(e) => Err(HdKeyError::InvalidArgument(format!("invalid JSON: {e}"))),
        }
    }

    fn from_json_value(value: Value) -> Result<Self, HdKeyError> {
        let fields: KeyFields = serde_json::from_value(value)
            .map_err(|e| HdKeyError::InvalidArgument(format!("invalid key fields: {e}")))?;
        Self::from_fields(fields)
    }

    pub fn from_fields(fields: KeyFields) -> Result<Self, HdKeyError> {
        Self::from_buffers(fields.to_buffers()?, 0, None)
    }

    /// Validates byte-form fields and computes every derived value.
    fn from_buffers(
        buffers: KeyBuffers,
        padding: u8,
        xprivkey: Option<String>,
    ) -> Result<Self, HdKeyError> {
        let checksum = buffers.verified_checksum()?;
        let version = buffers.version_u32();
        let network =
            Network::from_xprv_version(version).ok_or(HdKeyError::InvalidNetwork { version })?;
        if padding != 0 {
            return Err(HdKeyError::InvalidArgument(format!(
                "key data must start with 0x00, found 0x{padding:02x}"
            )));
        }
        let child_index = buffers.child_index_u32();
        if buffers.depth == 0 && (buffers.parent_fingerprint != [0u8; 4] || child_index != 0) {
            return Err(HdKeyError::InvalidArgument(
                "master key must have zero parent fingerprint and child index".to_owned(),
            ));
        }
        let private_key = SecretKey::from_slice(&buffers.private_key).map_err(|_| {
            HdKeyError::InvalidArgument("private key must be in 1..n-1".to_owned())
        })?;
        let public_key = PublicKey::from_secret_key(SECP256K1, &private_key);
        let xprivkey = match xprivkey {
            Some(text) => text,
            None => buffers.encode()?,
        };
        Ok(ExtendedPrivateKey {
            network,
            depth: buffers.depth,
            parent_fingerprint: buffers.parent_fingerprint,
            child_index,
            chain_code: buffers.chain_code,
            private_key,
            public_key,
            fingerprint: fingerprint(&public_key),
            checksum,
            xprivkey,
        })
    }

    /// Master key from a seed of 16 to 64 bytes, given raw or as hex.
    pub fn from_seed<'a>(
        entropy: impl Into<Entropy<'a>>,
        network: Option<Network>,
    ) -> Result<Self, HdKeyError> {
        let decoded;
        let seed: &[u8] = match entropy.into() {
            Entropy::Bytes(bytes) => bytes,
            Entropy::Hex(text) => {
                decoded = hex::decode(text).map_err(|e| {
                    HdKeyError::InvalidEntropyArgument(format!("{text:?} is not hex: {e}"))
                })?;
                &decoded
            }
        };
        if seed.len() < MIN_ENTROPY_BYTES {
            return Err(HdKeyError::NotEnoughEntropy {
                bits: seed.len() * 8,
            });
        }
        if seed.len() > MAX_ENTROPY_BYTES {
            return Err(HdKeyError::TooMuchEntropy {
                bits: seed.len() * 8,
            });
        }

        let i = hmac_sha512(MASTER_HMAC_KEY, seed);
        let network = network.unwrap_or_else(Network::default_network);
        let key = Self::from_buffers(
            KeyBuffers {
                version: network.xprivkey_version().to_be_bytes(),
                depth: 0,
                parent_fingerprint: [0u8; 4],
                child_index: [0u8; 4],
                chain_code: layout::array_at(&i, 32),
                private_key: layout::array_at(&i, 0),
                checksum: None,
            },
            0,
            None,
        )?;
        debug!(
            %network,
            fingerprint = %hex::encode(key.fingerprint),
            seed_bits = seed.len() * 8,
            "generated master key from seed"
        );
        Ok(key)
    }

    /// Master key from 64 bytes of OS randomness.
    pub fn random(network: Network) -> Result<Self, HdKeyError> {
        let mut seed = [0u8; RANDOM_SEED_BYTES];
        OsRng
            .try_fill_bytes(&mut seed)
            .map_err(|e| HdKeyError::EntropySource(e.to_string()))?;
        Self::from_seed(&seed, Some(network))
    }

    /// Derives by index (with `hardened` applied) or by path string (where
    /// `hardened` is ignored), using the process-wide cache.
    pub fn derive<'a>(
        &self,
        arg: impl Into<DeriveArg<'a>>,
        hardened: bool,
    ) -> Result<Self, HdKeyError> {
        self.derive_with_cache(DerivationCache::global(), arg, hardened)
    }

    pub fn derive_with_cache<'a>(
        &self,
        cache: &DerivationCache,
        arg: impl Into<DeriveArg<'a>>,
        hardened: bool,
    ) -> Result<Self, HdKeyError> {
        match arg.into() {
            DeriveArg::Index(index) => self.derive_child_with_cache(cache, index, hardened),
            DeriveArg::Path(path) => path.parse::<DerivationPath>()?.derive_private(self, cache),
        }
    }

    /// Child key derivation for private keys (CKDpriv).
    pub fn derive_child(&self, index: u32, hardened: bool) -> Result<Self, HdKeyError> {
        self.derive_child_with_cache(DerivationCache::global(), index, hardened)
    }

    pub fn derive_child_with_cache(
        &self,
        cache: &DerivationCache,
        index: u32,
        hardened: bool,
    ) -> Result<Self, HdKeyError> {
        let (index, hardened) = normalize_index(index, hardened);
        if let Some(child) = cache.get(&self.xprivkey, index, hardened) {
            return Ok(child);
        }
        let child = self.compute_child(index)?;
        Ok(cache.insert(&self.xprivkey, index, hardened, child))
    }

    fn compute_child(&self, requested: u32) -> Result<Self, HdKeyError> {
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            HdKeyError::InvalidDerivationArgument("cannot derive below depth 255".to_owned())
        })?;

        let mut index = requested;
        loop {
            // Hardened: 0x00 || privkey (32) || index; normal: pubkey (33) || index
            let mut data = Vec::with_capacity(1 + 32 + 4);
            if index >= HARDENED_OFFSET {
                data.push(0u8);
                data.extend_from_slice(&self.private_key.secret_bytes());
            } else {
                data.extend_from_slice(&self.public_key.serialize());
            }
            data.extend_from_slice(&index.to_be_bytes());

            let i = hmac_sha512(&self.chain_code, &data);
            let (il, ir) = i.split_at(32);

            // child = (IL + parent) mod n, invalid if IL >= n or the sum is zero
            let child_key = Scalar::from_be_bytes(layout::array_at(il, 0))
                .ok()
                .and_then(|tweak| self.private_key.add_tweak(&tweak).ok());
            let Some(child_key) = child_key else {
                warn!(index, "derived key is invalid, moving to the next index");
                index = next_index(index).ok_or_else(|| {
                    HdKeyError::InvalidDerivationArgument(format!(
                        "no valid child at or after index {requested}"
                    ))
                })?;
                continue;
            };

            return Self::from_buffers(
                KeyBuffers {
                    version: self.network.xprivkey_version().to_be_bytes(),
                    depth,
                    parent_fingerprint: self.fingerprint,
                    child_index: index.to_be_bytes(),
                    chain_code: layout::array_at(ir, 0),
                    private_key: child_key.secret_bytes(),
                    checksum: None,
                },
                0,
                None,
            );
        }
    }

    /// The public counterpart (xpub) of this key.
    pub fn extended_public_key(&self) -> ExtendedPublicKey {
        ExtendedPublicKey::from_private(self)
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn depth(&self) -> u8 {
        self.depth
    }

    pub fn parent_fingerprint(&self) -> [u8; 4] {
        self.parent_fingerprint
    }

    /// Offset-inclusive: hardened children have the high bit set.
    pub fn child_index(&self) -> u32 {
        self.child_index
    }

    pub fn is_hardened(&self) -> bool {
        self.child_index >= HARDENED_OFFSET
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn private_key(&self) -> &SecretKey {
        &self.private_key
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        self.fingerprint
    }

    pub fn checksum(&self) -> [u8; 4] {
        self.checksum
    }

    pub fn xprivkey(&self) -> &str {
        &self.xprivkey
    }

    pub fn to_serialized_string(&self) -> String {
        self.xprivkey.clone()
    }

    /// The 82-byte binary form, checksum included.
    pub fn to_buffer(&self) -> [u8; layout::SERIALIZED_LEN] {
        let mut out = [0u8; layout::SERIALIZED_LEN];
        out[..layout::PAYLOAD_LEN].copy_from_slice(&self.buffers().payload());
        out[layout::CHECKSUM_START..].copy_from_slice(&self.checksum);
        out
    }

    fn buffers(&self) -> KeyBuffers {
        KeyBuffers {
            version: self.network.xprivkey_version().to_be_bytes(),
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_index: self.child_index.to_be_bytes(),
            chain_code: self.chain_code,
            private_key: self.private_key.secret_bytes(),
            checksum: Some(self.checksum),
        }
    }

    pub fn to_object(&self) -> KeyObject {
        KeyObject {
            network: self.network,
            depth: self.depth,
            fingerprint: u32::from_be_bytes(self.fingerprint),
            parent_fingerprint: u32::from_be_bytes(self.parent_fingerprint),
            child_index: self.child_index,
            chain_code: hex::encode(self.chain_code),
            private_key: hex::encode(self.private_key.secret_bytes()),
            checksum: u32::from_be_bytes(self.checksum),
            xprivkey: self.xprivkey.clone(),
        }
    }

    pub fn to_json_string(&self) -> String {
        serde_json::to_string(&self.to_object())
            .expect("KeyObject has only string and integer fields")
    }
}

impl FromStr for ExtendedPrivateKey {
    type Err = HdKeyError;

    fn from_str(s: &str) -> Result<Self, HdKeyError> {
        Self::from_serialized(s)
    }
}

impl fmt::Display for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xprivkey)
    }
}

impl fmt::Debug for ExtendedPrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<ExtendedPrivateKey: {}>", self.xprivkey)
    }
}
