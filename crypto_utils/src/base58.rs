use crate::hash::sha256d;

/// Length of the Base58Check checksum suffix.
pub const CHECKSUM_LEN: usize = 4;

pub const BASE58_ALPHABET: &[u8; 58] =
    b"123456789ABCDEFGHJKLMNPQRSTUVWXYZabcdefghijkmnopqrstuvwxyz";

// Reverse lookup: ASCII byte -> digit value, 0xFF for bytes outside the alphabet.
const DIGIT_TABLE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < BASE58_ALPHABET.len() {
        table[BASE58_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Base58Error {
    #[error("invalid base58 character {0:?} at position {1}")]
    InvalidCharacter(char, usize),
    #[error("base58check data too short: {0} bytes")]
    TooShort(usize),
    #[error("base58check checksum mismatch")]
    InvalidChecksum,
}

fn digit_value(c: char) -> Option<u8> {
    let code = c as u32;
    if code >= 128 {
        return None;
    }
    match DIGIT_TABLE[code as usize] {
        0xFF => None,
        d => Some(d),
    }
}

pub fn is_base58_char(c: char) -> bool {
    digit_value(c).is_some()
}

/// Returns true when every character of `s` belongs to the Base58 alphabet.
pub fn is_base58(s: &str) -> bool {
    s.chars().all(is_base58_char)
}

pub fn base58_encode(data: &[u8]) -> String {
    let zeros = data.iter().take_while(|&&b| b == 0).count();

    // Little-endian base-58 digits of the big-endian input.
    let mut digits: Vec<u8> = Vec::with_capacity(data.len() * 138 / 100 + 1);
    for &byte in &data[zeros..] {
        let mut carry = byte as u32;
        for digit in digits.iter_mut() {
            carry += (*digit as u32) << 8;
            *digit = (carry % 58) as u8;
            carry /= 58;
        }
        while carry > 0 {
            digits.push((carry % 58) as u8);
            carry /= 58;
        }
    }

    let mut out = String::with_capacity(zeros + digits.len());
    out.extend(std::iter::repeat_n('1', zeros));
    out.extend(
        digits
            .iter()
            .rev()
            .map(|&d| BASE58_ALPHABET[d as usize] as char),
    );
    out
}

pub fn base58_decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let zeros = s.chars().take_while(|&c| c == '1').count();

    // Little-endian base-256 bytes, accumulated one digit at a time.
    let mut bytes: Vec<u8> = Vec::with_capacity(s.len() * 733 / 1000 + 1);
    for (pos, c) in s.chars().enumerate().skip(zeros) {
        let mut carry = digit_value(c).ok_or(Base58Error::InvalidCharacter(c, pos))? as u32;
        for byte in bytes.iter_mut() {
            carry += (*byte as u32) * 58;
            *byte = (carry & 0xFF) as u8;
            carry >>= 8;
        }
        while carry > 0 {
            bytes.push((carry & 0xFF) as u8);
            carry >>= 8;
        }
    }

    let mut out = vec![0u8; zeros];
    out.extend(bytes.iter().rev());
    Ok(out)
}

/// First four bytes of the double SHA256 of `payload`.
pub fn checksum(payload: &[u8]) -> [u8; CHECKSUM_LEN] {
    let digest = sha256d(payload);
    [digest[0], digest[1], digest[2], digest[3]]
}

pub fn base58_check_encode(payload: &[u8]) -> String {
    let mut buf = Vec::with_capacity(payload.len() + CHECKSUM_LEN);
    buf.extend_from_slice(payload);
    buf.extend_from_slice(&checksum(payload));
    base58_encode(&buf)
}

pub fn base58_check_decode(s: &str) -> Result<Vec<u8>, Base58Error> {
    let mut raw = base58_decode(s)?;
    if raw.len() < CHECKSUM_LEN {
        return Err(Base58Error::TooShort(raw.len()));
    }
    let suffix = raw.split_off(raw.len() - CHECKSUM_LEN);
    if checksum(&raw)[..] != suffix[..] {
        return Err(Base58Error::InvalidChecksum);
    }
    Ok(raw)
}
