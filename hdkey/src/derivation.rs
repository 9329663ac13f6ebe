use std::{fmt, str::FromStr};

use crate::{DerivationCache, ExtendedPrivateKey, HdKeyError};

/// Index offset for hardened children, 2³¹.
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// Spellings of the root element of a path.
pub const ROOT_ALIASES: [&str; 4] = ["m", "M", "m'", "M'"];

/// Argument of `ExtendedPrivateKey::derive`: a child index or a path string.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeriveArg<'a> {
    Index(u32),
    Path(&'a str),
}

impl From<u32> for DeriveArg<'_> {
    fn from(index: u32) -> Self {
        DeriveArg::Index(index)
    }
}

impl<'a> From<&'a str> for DeriveArg<'a> {
    fn from(path: &'a str) -> Self {
        DeriveArg::Path(path)
    }
}

impl<'a> From<&'a String> for DeriveArg<'a> {
    fn from(path: &'a String) -> Self {
        DeriveArg::Path(path)
    }
}

impl TryFrom<i64> for DeriveArg<'_> {
    type Error = HdKeyError;

    fn try_from(index: i64) -> Result<Self, HdKeyError> {
        u32::try_from(index).map(DeriveArg::Index).map_err(|_| {
            HdKeyError::InvalidDerivationArgument(format!("index {index} is outside 0..2^32"))
        })
    }
}

/// Applies the hardening rules: indices at or above 2³¹ are always hardened,
/// and a hardened index below 2³¹ is shifted up by the offset.
pub fn normalize_index(index: u32, hardened: bool) -> (u32, bool) {
    if index >= HARDENED_OFFSET {
        (index, true)
    } else if hardened {
        (index + HARDENED_OFFSET, true)
    } else {
        (index, false)
    }
}

/// The index tried after `index` yields an invalid key, staying on the same
/// side of the hardened boundary.
pub(crate) fn next_index(index: u32) -> Option<u32> {
    let next = index.checked_add(1)?;
    ((next >= HARDENED_OFFSET) == (index >= HARDENED_OFFSET)).then_some(next)
}

/// A parsed derivation path such as `m/44'/0'/0'/0/1`, stored as
/// offset-inclusive child indices.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DerivationPath(pub Vec<u32>);

impl FromStr for DerivationPath {
    type Err = HdKeyError;

    fn from_str(s: &str) -> Result<Self, HdKeyError> {
        let invalid = || HdKeyError::InvalidPath(s.to_owned());
        if ROOT_ALIASES.contains(&s) {
            return Ok(DerivationPath::default());
        }
        let mut steps = s.split('/');
        match steps.next() {
            Some(root) if ROOT_ALIASES.contains(&root) => {}
            _ => return Err(invalid()),
        }

        let mut indices = Vec::new();
        for step in steps {
            let (digits, marked) = match step.strip_suffix(['\'', 'h', 'H']) {
                Some(digits) => (digits, true),
                None => (step, false),
            };
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(invalid());
            }
            let index: u32 = digits.parse().map_err(|_| invalid())?;
            // Any spelling other than the plain decimal form is hardened.
            let hardened = marked || digits != index.to_string();
            indices.push(normalize_index(index, hardened).0);
        }
        Ok(DerivationPath(indices))
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("m")?;
        for &index in &self.0 {
            if index >= HARDENED_OFFSET {
                write!(f, "/{}'", index - HARDENED_OFFSET)?;
            } else {
                write!(f, "/{index}")?;
            }
        }
        Ok(())
    }
}

impl DerivationPath {
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// Derive a private extended key along this path.
    pub fn derive_private(
        &self,
        root: &ExtendedPrivateKey,
        cache: &DerivationCache,
    ) -> Result<ExtendedPrivateKey, HdKeyError> {
        let mut key = root.clone();
        for &index in &self.0 {
            key = key.derive_child_with_cache(cache, index, false)?;
        }
        Ok(key)
    }
}

/// Whether `arg` would be accepted by `derive`.
pub fn is_valid_path<'a>(arg: impl Into<DeriveArg<'a>>) -> bool {
    match arg.into() {
        DeriveArg::Index(_) => true,
        DeriveArg::Path(path) => path.parse::<DerivationPath>().is_ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ErrorKind;

    #[test]
    fn parse_and_display() {
        let dp: DerivationPath = "m/0'/1/2'/2/1000000000".parse().unwrap();
        let seq = vec![HARDENED_OFFSET, 1, HARDENED_OFFSET + 2, 2, 1000000000];
        assert_eq!(dp.0, seq);
        assert_eq!(dp.to_string(), "m/0'/1/2'/2/1000000000");
    }

    #[test]
    fn root_aliases_are_empty_paths() {
        for alias in ROOT_ALIASES {
            assert!(alias.parse::<DerivationPath>().unwrap().is_root());
        }
        assert_eq!("M/44h/0H".parse::<DerivationPath>().unwrap().0, vec![
            HARDENED_OFFSET + 44,
            HARDENED_OFFSET
        ]);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        for path in [
            "", "0/1", "x/1", "m/", "m//1", "m/abc", "m/-1", "m/+1", "m/ 1", "m/1''",
            "m/4294967296", "m/1/",
        ] {
            let err = path.parse::<DerivationPath>().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidPath, "{path:?}");
            assert!(!is_valid_path(path));
        }
        assert!(is_valid_path("m/2147483647'"));
        assert!(is_valid_path(u32::MAX));
    }

    #[test]
    fn high_and_non_canonical_segments_are_hardened() {
        let dp: DerivationPath = "m/2147483648/01/007h/4294967295".parse().unwrap();
        assert_eq!(dp.0, vec![
            HARDENED_OFFSET,
            HARDENED_OFFSET + 1,
            HARDENED_OFFSET + 7,
            u32::MAX
        ]);
        assert_eq!(dp.to_string(), "m/0'/1'/7'/2147483647'");
        assert_eq!("m/0/10".parse::<DerivationPath>().unwrap().0, vec![0, 10]);
    }

    #[test]
    fn retries_stay_on_their_side_of_the_boundary() {
        assert_eq!(next_index(0), Some(1));
        assert_eq!(next_index(HARDENED_OFFSET - 2), Some(HARDENED_OFFSET - 1));
        assert_eq!(next_index(HARDENED_OFFSET - 1), None);
        assert_eq!(next_index(HARDENED_OFFSET), Some(HARDENED_OFFSET + 1));
        assert_eq!(next_index(u32::MAX), None);
    }

    #[test]
    fn normalization_offsets_hardened_indices() {
        assert_eq!(normalize_index(5, true), (HARDENED_OFFSET + 5, true));
        assert_eq!(normalize_index(HARDENED_OFFSET + 5, false), (HARDENED_OFFSET + 5, true));
        assert_eq!(normalize_index(HARDENED_OFFSET + 5, true), (HARDENED_OFFSET + 5, true));
        assert_eq!(normalize_index(5, false), (5, false));
    }

    #[test]
    fn negative_indices_are_bad_arguments() {
        assert_eq!(
            DeriveArg::try_from(-1i64).unwrap_err().kind(),
            ErrorKind::InvalidDerivationArgument
        );
        assert_eq!(DeriveArg::try_from(7i64).unwrap(), DeriveArg::Index(7));
        assert!(DeriveArg::try_from(1i64 << 32).is_err());
    }
}
