//! Plain-data shapes of an extended private key: the field bag accepted by
//! construction and the object produced by `to_object`.

use serde::{Deserialize, Serialize};

use crate::{HdKeyError, Network, layout::KeyBuffers};

/// One field value, given as a native integer, hex text or raw bytes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(u64),
    Hex(String),
    Bytes(Vec<u8>),
}

impl FieldValue {
    /// Normalizes to exactly `N` big-endian bytes.
    pub fn to_array<const N: usize>(&self, name: &str) -> Result<[u8; N], HdKeyError> {
        let bytes = match self {
            FieldValue::Number(n) => {
                let wide = n.to_be_bytes();
                let (high, low) = wide.split_at(wide.len().saturating_sub(N));
                if N < wide.len() && high.iter().any(|&b| b != 0) {
                    return Err(HdKeyError::InvalidArgument(format!(
                        "{name} value {n} does not fit in {N} bytes"
                    )));
                }
                let mut out = [0u8; N];
                out[N - low.len()..].copy_from_slice(low);
                return Ok(out);
            }
            FieldValue::Hex(s) => hex::decode(s).map_err(|e| {
                HdKeyError::InvalidArgument(format!("{name} is not valid hex: {e}"))
            })?,
            FieldValue::Bytes(b) => b.clone(),
        };
        <[u8; N]>::try_from(bytes.as_slice()).map_err(|_| {
            HdKeyError::InvalidArgument(format!(
                "{name} has not the expected size: found {}, expected {N}",
                bytes.len()
            ))
        })
    }
}

impl From<u8> for FieldValue {
    fn from(n: u8) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Number(n.into())
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Hex(s.to_owned())
    }
}

impl<const N: usize> From<[u8; N]> for FieldValue {
    fn from(bytes: [u8; N]) -> Self {
        FieldValue::Bytes(bytes.to_vec())
    }
}

impl From<Vec<u8>> for FieldValue {
    fn from(bytes: Vec<u8>) -> Self {
        FieldValue::Bytes(bytes)
    }
}

/// Field bag accepted by `ExtendedPrivateKey::from_fields` and, as JSON, by
/// `ExtendedPrivateKey::from_json`.
///
/// `network` wins over `version`; with neither the default network is used.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<FieldValue>,
    pub depth: FieldValue,
    #[serde(rename = "parentFingerPrint", alias = "parentFingerprint")]
    pub parent_fingerprint: FieldValue,
    pub child_index: FieldValue,
    pub chain_code: FieldValue,
    pub private_key: FieldValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<FieldValue>,
}

impl KeyFields {
    /// Resolves every field to its byte form.
    pub fn to_buffers(&self) -> Result<KeyBuffers, HdKeyError> {
        let version = match (&self.network, &self.version) {
            (Some(name), _) => name.parse::<Network>()?.xprivkey_version().to_be_bytes(),
            (None, Some(version)) => version.to_array("version")?,
            (None, None) => Network::default_network()
                .xprivkey_version()
                .to_be_bytes(),
        };
        let [depth] = self.depth.to_array::<1>("depth")?;
        Ok(KeyBuffers {
            version,
            depth,
            parent_fingerprint: self.parent_fingerprint.to_array("parentFingerPrint")?,
            child_index: self.child_index.to_array("childIndex")?,
            chain_code: self.chain_code.to_array("chainCode")?,
            private_key: self.private_key.to_array("privateKey")?,
            checksum: self
                .checksum
                .as_ref()
                .map(|c| c.to_array("checksum"))
                .transpose()?,
        })
    }
}

/// Human-readable view of a built key, as returned by `to_object`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyObject {
    pub network: Network,
    pub depth: u8,
    #[serde(rename = "fingerPrint")]
    pub fingerprint: u32,
    #[serde(rename = "parentFingerPrint")]
    pub parent_fingerprint: u32,
    pub child_index: u32,
    /// Hex.
    pub chain_code: String,
    /// Hex.
    pub private_key: String,
    pub checksum: u32,
    pub xprivkey: String,
}

impl From<KeyObject> for KeyFields {
    fn from(object: KeyObject) -> Self {
        KeyFields {
            network: Some(object.network.name().to_owned()),
            version: None,
            depth: object.depth.into(),
            parent_fingerprint: object.parent_fingerprint.into(),
            child_index: object.child_index.into(),
            chain_code: FieldValue::Hex(object.chain_code),
            private_key: FieldValue::Hex(object.private_key),
            checksum: Some(object.checksum.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn numbers_are_left_padded() {
        assert_eq!(FieldValue::Number(5).to_array::<4>("childIndex").unwrap(), [0, 0, 0, 5]);
        assert_eq!(
            FieldValue::Number(0x8000_0000).to_array::<4>("childIndex").unwrap(),
            [0x80, 0, 0, 0]
        );
        assert_eq!(FieldValue::Number(255).to_array::<1>("depth").unwrap(), [255]);
    }

    #[test]
    fn numbers_are_never_truncated() {
        let err = FieldValue::Number(256).to_array::<1>("depth").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert!(err.to_string().contains("depth"));
        assert!(FieldValue::Number(1 << 32).to_array::<4>("childIndex").is_err());
    }

    #[test]
    fn hex_and_bytes_must_have_exact_width() {
        assert_eq!(
            FieldValue::from("deadbeef").to_array::<4>("parentFingerPrint").unwrap(),
            [0xde, 0xad, 0xbe, 0xef]
        );
        assert!(FieldValue::from("beef").to_array::<4>("parentFingerPrint").is_err());
        assert!(FieldValue::from("zz").to_array::<1>("depth").is_err());
        assert!(FieldValue::Bytes(vec![1; 31]).to_array::<32>("chainCode").is_err());
    }

    #[test]
    fn json_numbers_and_strings_deserialize() {
        let fields: KeyFields = serde_json::from_str(
            r#"{
                "network": "testnet",
                "depth": 1,
                "parentFingerprint": "3442193e",
                "childIndex": 2147483648,
                "chainCode": "47fdacbd0f1097043b78c63c20c34ef4ed9a111d980047ad16282c7ae6236141",
                "privateKey": "edb2e14f9ee77d26dd93b4ecede8d16ed408ce149b6cd80b0715a2d911a0afea"
            }"#,
        )
        .unwrap();
        assert_eq!(fields.depth, FieldValue::Number(1));
        let buffers = fields.to_buffers().unwrap();
        assert_eq!(buffers.version_u32(), Network::Testnet.xprivkey_version());
        assert_eq!(buffers.parent_fingerprint, [0x34, 0x42, 0x19, 0x3e]);
        assert_eq!(buffers.child_index_u32(), 0x8000_0000);
        assert_eq!(buffers.checksum, None);
    }

    #[test]
    fn unknown_network_name_is_rejected() {
        let fields = KeyFields {
            network: Some("moonnet".into()),
            version: None,
            depth: 0u8.into(),
            parent_fingerprint: 0u32.into(),
            child_index: 0u32.into(),
            chain_code: [0u8; 32].into(),
            private_key: [1u8; 32].into(),
            checksum: None,
        };
        assert_eq!(
            fields.to_buffers().unwrap_err().kind(),
            ErrorKind::InvalidNetworkArgument
        );
    }
}
