use std::fmt;

use crypto_utils::base58::Base58Error;

/// Errors raised while building, decoding or deriving extended keys.
///
/// Every variant carries enough context to tell the caller what was
/// rejected. Use [`HdKeyError::kind`] to match on a family of failures
/// without caring about the payload.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HdKeyError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("invalid base58 character {character:?} in {input:?}")]
    InvalidB58Char { character: char, input: String },
    #[error("invalid base58 checksum for {0:?}")]
    InvalidB58Checksum(String),
    #[error("invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("invalid network: unexpected version 0x{version:08x}")]
    InvalidNetwork { version: u32 },
    #[error("invalid network argument {0:?}")]
    InvalidNetworkArgument(String),
    #[error("invalid derivation argument: {0}")]
    InvalidDerivationArgument(String),
    #[error("invalid derivation path {0:?}")]
    InvalidPath(String),
    #[error("invalid entropy argument: {0}")]
    InvalidEntropyArgument(String),
    #[error("not enough entropy: {bits} bits, need at least 128")]
    NotEnoughEntropy { bits: usize },
    #[error("too much entropy: {bits} bits, at most 512 allowed")]
    TooMuchEntropy { bits: usize },
    #[error("unrecognized argument: {0}")]
    UnrecognizedArgument(String),
    #[error("secure random source unavailable: {0}")]
    EntropySource(String),
}

/// Payload-free discriminant of [`HdKeyError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    InvalidB58Char,
    InvalidB58Checksum,
    InvalidLength,
    InvalidNetwork,
    InvalidNetworkArgument,
    InvalidDerivationArgument,
    InvalidPath,
    InvalidEntropyArgument,
    NotEnoughEntropy,
    TooMuchEntropy,
    UnrecognizedArgument,
    EntropySource,
}

impl ErrorKind {
    /// The kind this one specializes, `None` for the roots.
    pub fn parent(self) -> Option<ErrorKind> {
        use ErrorKind::*;
        match self {
            InvalidArgument | EntropySource => None,
            NotEnoughEntropy | TooMuchEntropy => Some(InvalidEntropyArgument),
            InvalidB58Char
            | InvalidB58Checksum
            | InvalidLength
            | InvalidNetwork
            | InvalidNetworkArgument
            | InvalidDerivationArgument
            | InvalidPath
            | InvalidEntropyArgument
            | UnrecognizedArgument => Some(InvalidArgument),
        }
    }

    /// True if `self` is `ancestor` or descends from it.
    pub fn is_a(self, ancestor: ErrorKind) -> bool {
        let mut current = Some(self);
        while let Some(kind) = current {
            if kind == ancestor {
                return true;
            }
            current = kind.parent();
        }
        false
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl HdKeyError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            HdKeyError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            HdKeyError::InvalidB58Char { .. } => ErrorKind::InvalidB58Char,
            HdKeyError::InvalidB58Checksum(_) => ErrorKind::InvalidB58Checksum,
            HdKeyError::InvalidLength { .. } => ErrorKind::InvalidLength,
            HdKeyError::InvalidNetwork { .. } => ErrorKind::InvalidNetwork,
            HdKeyError::InvalidNetworkArgument(_) => ErrorKind::InvalidNetworkArgument,
            HdKeyError::InvalidDerivationArgument(_) => ErrorKind::InvalidDerivationArgument,
            HdKeyError::InvalidPath(_) => ErrorKind::InvalidPath,
            HdKeyError::InvalidEntropyArgument(_) => ErrorKind::InvalidEntropyArgument,
            HdKeyError::NotEnoughEntropy { .. } => ErrorKind::NotEnoughEntropy,
            HdKeyError::TooMuchEntropy { .. } => ErrorKind::TooMuchEntropy,
            HdKeyError::UnrecognizedArgument(_) => ErrorKind::UnrecognizedArgument,
            HdKeyError::EntropySource(_) => ErrorKind::EntropySource,
        }
    }

    /// Shorthand for `self.kind().is_a(ancestor)`.
    pub fn is_a(&self, ancestor: ErrorKind) -> bool {
        self.kind().is_a(ancestor)
    }

    /// Maps a Base58Check failure on `input` into this taxonomy.
    pub(crate) fn from_base58(err: Base58Error, input: &str) -> Self {
        match err {
            Base58Error::InvalidCharacter(character, _) => HdKeyError::InvalidB58Char {
                character,
                input: input.to_owned(),
            },
            Base58Error::InvalidChecksum => HdKeyError::InvalidB58Checksum(input.to_owned()),
            Base58Error::TooShort(actual) => HdKeyError::InvalidB58Checksum(format!(
                "{input} ({actual} bytes, too short to carry a checksum)"
            )),
        }
    }
}
