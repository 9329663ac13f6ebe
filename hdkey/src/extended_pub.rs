use std::{fmt, str::FromStr};

use crypto_utils::{base58, hmac::hmac_sha512};
use secp256k1::{PublicKey, SECP256K1, Scalar};
use tracing::warn;

use crate::{
    ExtendedPrivateKey, HdKeyError, Network,
    derivation::{HARDENED_OFFSET, next_index},
    extended_key::fingerprint,
    layout::{self, array_at},
};

/// Extended public key (xpub), the counterpart of an [`ExtendedPrivateKey`].
///
/// Shares the private key's metadata and chain code but carries only the
/// compressed public point, so it can be handed out without exposing the
/// private scalar.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtendedPublicKey {
    network: Network,
    depth: u8,
    parent_fingerprint: [u8; 4],
    child_index: u32,
    chain_code: [u8; 32],
    public_key: PublicKey,
    xpubkey: String,
}

impl ExtendedPublicKey {
    pub(crate) fn from_private(key: &ExtendedPrivateKey) -> Self {
        Self::assemble(
            key.network(),
            key.depth(),
            key.parent_fingerprint(),
            key.child_index(),
            *key.chain_code(),
            *key.public_key(),
        )
    }

    fn assemble(
        network: Network,
        depth: u8,
        parent_fingerprint: [u8; 4],
        child_index: u32,
        chain_code: [u8; 32],
        public_key: PublicKey,
    ) -> Self {
        let mut payload = Vec::with_capacity(layout::PAYLOAD_LEN);
        payload.extend_from_slice(&network.xpubkey_version().to_be_bytes());
        payload.push(depth);
        payload.extend_from_slice(&parent_fingerprint);
        payload.extend_from_slice(&child_index.to_be_bytes());
        payload.extend_from_slice(&chain_code);
        payload.extend_from_slice(&public_key.serialize());
        ExtendedPublicKey {
            network,
            depth,
            parent_fingerprint,
            child_index,
            chain_code,
            public_key,
            xpubkey: base58::base58_check_encode(&payload),
        }
    }

    /// Deserialize an xpub from a Base58Check string
    pub fn from_serialized(s: &str) -> Result<Self, HdKeyError> {
        let data = layout::decode_payload(s)?;
        let version = u32::from_be_bytes(array_at(&data, layout::VERSION_START));
        let network =
            Network::from_xpub_version(version).ok_or(HdKeyError::InvalidNetwork { version })?;
        let depth = data[layout::DEPTH_START];
        let parent_fingerprint = array_at(&data, layout::PARENT_FINGERPRINT_START);
        let child_index = u32::from_be_bytes(array_at(&data, layout::CHILD_INDEX_START));
        if depth == 0 && (parent_fingerprint != [0u8; 4] || child_index != 0) {
            return Err(HdKeyError::InvalidArgument(
                "master key must have zero parent fingerprint and child index".to_owned(),
            ));
        }
        let public_key = PublicKey::from_slice(&data[layout::PUBLIC_KEY_START..])
            .map_err(|_| HdKeyError::InvalidArgument("invalid public key data".to_owned()))?;
        Ok(ExtendedPublicKey {
            network,
            depth,
            parent_fingerprint,
            child_index,
            chain_code: array_at(&data, layout::CHAIN_CODE_START),
            public_key,
            xpubkey: s.to_owned(),
        })
    }

    /// Derive a child public key for non-hardened indices (CKDpub)
    pub fn derive_child(&self, index: u32) -> Result<Self, HdKeyError> {
        if index >= HARDENED_OFFSET {
            return Err(HdKeyError::InvalidDerivationArgument(format!(
                "cannot derive hardened index {index} from a public key"
            )));
        }
        let depth = self.depth.checked_add(1).ok_or_else(|| {
            HdKeyError::InvalidDerivationArgument("cannot derive below depth 255".to_owned())
        })?;

        let mut index = index;
        loop {
            let mut data = Vec::with_capacity(33 + 4);
            data.extend_from_slice(&self.public_key.serialize());
            data.extend_from_slice(&index.to_be_bytes());

            let i = hmac_sha512(&self.chain_code, &data);
            let (il, ir) = i.split_at(32);

            // Child public key: G*IL + parent_pub
            let child = Scalar::from_be_bytes(array_at(il, 0))
                .ok()
                .and_then(|tweak| self.public_key.add_exp_tweak(SECP256K1, &tweak).ok());
            match child {
                Some(public_key) => {
                    return Ok(Self::assemble(
                        self.network,
                        depth,
                        self.fingerprint(),
                        index,
                        array_at(ir, 0),
                        public_key,
                    ));
                }
                None => {
                    warn!(index, "derived public key is invalid, moving to the next index");
                    index = next_index(index).ok_or_else(|| {
                        HdKeyError::InvalidDerivationArgument(
                            "no valid non-hardened child left".to_owned(),
                        )
                    })?;
                }
            }
        }
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

    pub fn child_index(&self) -> u32 {
        self.child_index
    }

    pub fn chain_code(&self) -> &[u8; 32] {
        &self.chain_code
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn fingerprint(&self) -> [u8; 4] {
        fingerprint(&self.public_key)
    }

    pub fn xpubkey(&self) -> &str {
        &self.xpubkey
    }

    pub fn to_serialized_string(&self) -> String {
        self.xpubkey.clone()
    }
}

impl FromStr for ExtendedPublicKey {
    type Err = HdKeyError;

    fn from_str(s: &str) -> Result<Self, HdKeyError> {
        Self::from_serialized(s)
    }
}

impl fmt::Display for ExtendedPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.xpubkey)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    const V1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    struct Case<'a> {
        key: &'a str,
        expected: ErrorKind,
    }

    #[test]
    fn public_derivation_matches_private() {
        let m = ExtendedPrivateKey::from_seed(V1_SEED, None).unwrap();
        let m0h1 = m.derive("m/0'/1", false).unwrap();
        assert_eq!(
            m0h1.extended_public_key().to_serialized_string(),
            "xpub6ASuArnXKPbfEwhqN6e3mwBcDTgzisQN1wXN9BJcM47sSikHjJf3UFHKkNAWbWMiGj7Wf5uMash7SyYq527Hqck2AxYysAA7xmALppuCkwQ"
        );
        let m0h = m.derive("m/0'", false).unwrap().extended_public_key();
        assert_eq!(m0h.derive_child(1).unwrap(), m0h1.extended_public_key());
        assert_eq!(m0h.fingerprint(), m0h1.parent_fingerprint());
    }

    #[test]
    fn serialized_round_trip() {
        let xpub = "xpub6D4BDPcP2GT577Vvch3R8wDkScZWzQzMMUm3PWbmWvVJrZwQY4VUNgqFJPMM3No2dFDFGTsxxpG5uJh7n7epu4trkrX7x7DogT5Uv6fcLW5";
        let key: ExtendedPublicKey = xpub.parse().unwrap();
        assert_eq!(key.depth(), 3);
        assert_eq!(key.child_index(), HARDENED_OFFSET + 2);
        assert_eq!(key.network(), Network::Livenet);
        assert_eq!(key.to_string(), xpub);
    }

    #[test]
    fn hardened_on_xpub() {
        let xpub = ExtendedPrivateKey::from_seed(V1_SEED, None)
            .unwrap()
            .extended_public_key();
        assert_eq!(
            xpub.derive_child(HARDENED_OFFSET).unwrap_err().kind(),
            ErrorKind::InvalidDerivationArgument
        );
    }

    /// BIP32 test vector 5, public keys
    #[test]
    fn invalid_xpubs() {
        let cases = [
            // pubkey version / prvkey mismatch
            Case {
                key: "xpub661MyMwAqRbcEYS8w7XLSVeEsBXy79zSzH1J8vCdxAZningWLdN3zgtU6LBpB85b3D2yc8sfvZU521AAwdZafEz7mnzBBsz4wKY5fTtTQBm",
                expected: ErrorKind::InvalidArgument,
            },
            // invalid pubkey prefix 04
            Case {
                key: "xpub661MyMwAqRbcEYS8w7XLSVeEsBXy79zSzH1J8vCdxAZningWLdN3zgtU6Txnt3siSujt9RCVYsx4qHZGc62TG4McvMGcAUjeuwZdduYEvFn",
                expected: ErrorKind::InvalidArgument,
            },
            // zero depth with non-zero parent fingerprint
            Case {
                key: "xpub661no6RGEX3uJkY4bNnPcw4URcQTrSibUZ4NqJEw5eBkv7ovTwgiT91XX27VbEXGENhYRCf7hyEbWrR3FewATdCEebj6znwMfQkhRYHRLpJ",
                expected: ErrorKind::InvalidArgument,
            },
            // zero depth with non-zero index
            Case {
                key: "xpub661MyMwAuDcm6CRQ5N4qiHKrJ39Xe1R1NyfouMKTTWcguwVcfrZJaNvhpebzGerh7gucBvzEQWRugZDuDXjNDRmXzSZe4c7mnTK97pTvGS8",
                expected: ErrorKind::InvalidArgument,
            },
            // unknown extended key version
            Case {
                key: "DMwo58pR1QLEFihHiXPVykYB6fJmsTeHvyTp7hRThAtCX8CvYzgPcn8XnmdfHGMQzT7ayAmfo4z3gY5KfbrZWZ6St24UVf2Qgo6oujFktLHdHY4",
                expected: ErrorKind::InvalidNetwork,
            },
            // private key under an xpub version is rejected by version
            Case {
                key: "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi",
                expected: ErrorKind::InvalidNetwork,
            },
        ];

        for case in &cases {
            let err = ExtendedPublicKey::from_serialized(case.key).unwrap_err();
            assert_eq!(
                err.kind(),
                case.expected,
                "xpub=\"{}\" returned {:?}, expected {:?}",
                case.key,
                err,
                case.expected
            );
        }
    }
}
