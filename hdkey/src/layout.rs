//! Fixed-offset layout of the serialized extended private key.
//!
//! ```text
//! version(4) | depth(1) | parent fingerprint(4) | child index(4)
//!   | chain code(32) | 0x00 | private key(32) | checksum(4)
//! ```
//!
//! All integers are big-endian. The first 78 bytes are the payload; the
//! trailing checksum is the Base58Check checksum of that payload.

use std::borrow::Cow;

use crypto_utils::base58::{self, CHECKSUM_LEN};
use serde_json::Value;
use tracing::trace;

use crate::{HdKeyError, Network};

pub const VERSION_START: usize = 0;
pub const VERSION_SIZE: usize = 4;
pub const DEPTH_START: usize = VERSION_START + VERSION_SIZE;
pub const DEPTH_SIZE: usize = 1;
pub const PARENT_FINGERPRINT_START: usize = DEPTH_START + DEPTH_SIZE;
pub const PARENT_FINGERPRINT_SIZE: usize = 4;
pub const CHILD_INDEX_START: usize = PARENT_FINGERPRINT_START + PARENT_FINGERPRINT_SIZE;
pub const CHILD_INDEX_SIZE: usize = 4;
pub const CHAIN_CODE_START: usize = CHILD_INDEX_START + CHILD_INDEX_SIZE;
pub const CHAIN_CODE_SIZE: usize = 32;
pub const PADDING_START: usize = CHAIN_CODE_START + CHAIN_CODE_SIZE;
pub const PRIVATE_KEY_START: usize = PADDING_START + 1;
pub const PRIVATE_KEY_SIZE: usize = 32;
pub const CHECKSUM_START: usize = PRIVATE_KEY_START + PRIVATE_KEY_SIZE;
pub const CHECKSUM_SIZE: usize = CHECKSUM_LEN;

/// Bytes covered by the checksum.
pub const PAYLOAD_LEN: usize = CHECKSUM_START;
/// Payload plus checksum.
pub const SERIALIZED_LEN: usize = CHECKSUM_START + CHECKSUM_SIZE;

/// Offset of the 33-byte compressed point in the public counterpart.
pub const PUBLIC_KEY_START: usize = PADDING_START;
pub const PUBLIC_KEY_SIZE: usize = 33;

const _: () = assert!(DEPTH_START == 4);
const _: () = assert!(CHAIN_CODE_START == 13);
const _: () = assert!(PADDING_START == 45);
const _: () = assert!(PRIVATE_KEY_START == 46);
const _: () = assert!(PAYLOAD_LEN == 78);
const _: () = assert!(SERIALIZED_LEN == 82);
const _: () = assert!(PUBLIC_KEY_START + PUBLIC_KEY_SIZE == PAYLOAD_LEN);

/// The named fields of an extended private key in their byte form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyBuffers {
    pub version: [u8; VERSION_SIZE],
    pub depth: u8,
    pub parent_fingerprint: [u8; PARENT_FINGERPRINT_SIZE],
    pub child_index: [u8; CHILD_INDEX_SIZE],
    pub chain_code: [u8; CHAIN_CODE_SIZE],
    pub private_key: [u8; PRIVATE_KEY_SIZE],
    /// Verified against the payload when present, computed when absent.
    pub checksum: Option<[u8; CHECKSUM_SIZE]>,
}

impl KeyBuffers {
    pub fn version_u32(&self) -> u32 {
        u32::from_be_bytes(self.version)
    }

    pub fn child_index_u32(&self) -> u32 {
        u32::from_be_bytes(self.child_index)
    }

    pub fn payload(&self) -> [u8; PAYLOAD_LEN] {
        let mut out = [0u8; PAYLOAD_LEN];
        out[VERSION_START..DEPTH_START].copy_from_slice(&self.version);
        out[DEPTH_START] = self.depth;
        out[PARENT_FINGERPRINT_START..CHILD_INDEX_START].copy_from_slice(&self.parent_fingerprint);
        out[CHILD_INDEX_START..CHAIN_CODE_START].copy_from_slice(&self.child_index);
        out[CHAIN_CODE_START..PADDING_START].copy_from_slice(&self.chain_code);
        out[PADDING_START] = 0;
        out[PRIVATE_KEY_START..CHECKSUM_START].copy_from_slice(&self.private_key);
        out
    }

    /// Returns the payload checksum, failing if a supplied one disagrees.
    pub fn verified_checksum(&self) -> Result<[u8; CHECKSUM_SIZE], HdKeyError> {
        let payload = self.payload();
        let computed = base58::checksum(&payload);
        match self.checksum {
            Some(given) if given != computed => Err(HdKeyError::InvalidB58Checksum(hex::encode(
                [&payload[..], &given[..]].concat(),
            ))),
            _ => Ok(computed),
        }
    }

    /// The full 82-byte form.
    pub fn to_bytes(&self) -> Result<[u8; SERIALIZED_LEN], HdKeyError> {
        let checksum = self.verified_checksum()?;
        let mut out = [0u8; SERIALIZED_LEN];
        out[..PAYLOAD_LEN].copy_from_slice(&self.payload());
        out[CHECKSUM_START..].copy_from_slice(&checksum);
        Ok(out)
    }

    pub fn encode(&self) -> Result<String, HdKeyError> {
        Ok(base58::base58_encode(&self.to_bytes()?))
    }

    /// Splits a 78-byte payload into fields. The padding byte is kept aside
    /// for the caller to validate.
    pub fn from_payload(payload: &[u8], checksum: Option<[u8; 4]>) -> Result<(Self, u8), HdKeyError> {
        if payload.len() != PAYLOAD_LEN {
            return Err(HdKeyError::InvalidLength {
                expected: PAYLOAD_LEN,
                actual: payload.len(),
            });
        }
        let buffers = KeyBuffers {
            version: array_at(payload, VERSION_START),
            depth: payload[DEPTH_START],
            parent_fingerprint: array_at(payload, PARENT_FINGERPRINT_START),
            child_index: array_at(payload, CHILD_INDEX_START),
            chain_code: array_at(payload, CHAIN_CODE_START),
            private_key: array_at(payload, PRIVATE_KEY_START),
            checksum,
        };
        Ok((buffers, payload[PADDING_START]))
    }

    /// Splits the 82-byte form, verifying its checksum.
    pub fn from_bytes(bytes: &[u8]) -> Result<(Self, u8), HdKeyError> {
        if bytes.len() != SERIALIZED_LEN {
            return Err(HdKeyError::InvalidLength {
                expected: SERIALIZED_LEN,
                actual: bytes.len(),
            });
        }
        let (buffers, padding) =
            Self::from_payload(&bytes[..PAYLOAD_LEN], Some(array_at(bytes, CHECKSUM_START)))?;
        buffers.verified_checksum()?;
        Ok((buffers, padding))
    }
}

/// Copies `N` bytes starting at `start`. Callers check the total length first.
pub(crate) fn array_at<const N: usize>(bytes: &[u8], start: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[start..start + N]);
    out
}

/// Input accepted by the serialized-form validator.
#[derive(Clone, Copy, Debug)]
pub enum SerializedData<'a> {
    Text(&'a str),
    /// The serialized text as raw bytes.
    Bytes(&'a [u8]),
    /// Anything else, named by its shape.
    Unsupported(&'static str),
}

impl<'a> From<&'a str> for SerializedData<'a> {
    fn from(s: &'a str) -> Self {
        SerializedData::Text(s)
    }
}

impl<'a> From<&'a String> for SerializedData<'a> {
    fn from(s: &'a String) -> Self {
        SerializedData::Text(s)
    }
}

impl<'a> From<&'a [u8]> for SerializedData<'a> {
    fn from(b: &'a [u8]) -> Self {
        SerializedData::Bytes(b)
    }
}

impl<'a> From<&'a Value> for SerializedData<'a> {
    fn from(value: &'a Value) -> Self {
        match value {
            Value::String(s) => SerializedData::Text(s),
            Value::Null => SerializedData::Unsupported("null"),
            Value::Bool(_) => SerializedData::Unsupported("boolean"),
            Value::Number(_) => SerializedData::Unsupported("number"),
            Value::Array(_) => SerializedData::Unsupported("array"),
            Value::Object(_) => SerializedData::Unsupported("object"),
        }
    }
}

impl<'a> SerializedData<'a> {
    fn text(self) -> Result<Cow<'a, str>, HdKeyError> {
        match self {
            SerializedData::Text(s) => Ok(Cow::Borrowed(s)),
            SerializedData::Bytes(b) => Ok(String::from_utf8_lossy(b)),
            SerializedData::Unsupported(shape) => Err(HdKeyError::InvalidArgument(format!(
                "expected serialized key text or bytes, got {shape}"
            ))),
        }
    }
}

/// Base58Check-decodes `text` into a 78-byte payload.
pub(crate) fn decode_payload(text: &str) -> Result<Vec<u8>, HdKeyError> {
    if let Some(bad) = text.chars().find(|&c| !base58::is_base58_char(c)) {
        return Err(HdKeyError::InvalidB58Char {
            character: bad,
            input: text.to_owned(),
        });
    }
    let payload =
        base58::base58_check_decode(text).map_err(|e| HdKeyError::from_base58(e, text))?;
    if payload.len() != PAYLOAD_LEN {
        return Err(HdKeyError::InvalidLength {
            expected: PAYLOAD_LEN,
            actual: payload.len(),
        });
    }
    Ok(payload)
}

/// Decodes and checks serialized key data, returning its payload and text.
pub(crate) fn decode_serialized<'a>(
    data: SerializedData<'a>,
    network: Option<&str>,
) -> Result<(Vec<u8>, Cow<'a, str>), HdKeyError> {
    let text = data.text()?;
    let payload = decode_payload(&text)?;
    if let Some(name) = network {
        let network: Network = name.parse()?;
        let version = u32::from_be_bytes(array_at(&payload, VERSION_START));
        if version != network.xprivkey_version() {
            trace!(%network, version, "serialized key version does not match network");
            return Err(HdKeyError::InvalidNetwork { version });
        }
    }
    Ok((payload, text))
}

/// Why `data` is not a serialized extended private key, or `None` if it is.
///
/// When `network` names a network, the version bytes must be that
/// network's xprivkey version.
pub fn serialized_error<'a>(
    data: impl Into<SerializedData<'a>>,
    network: Option<&str>,
) -> Option<HdKeyError> {
    decode_serialized(data.into(), network).err()
}

pub fn is_valid_serialized<'a>(data: impl Into<SerializedData<'a>>, network: Option<&str>) -> bool {
    serialized_error(data, network).is_none()
}
