use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// Errors that can occur when parsing an EVM address string.
#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address must be {expected} hex characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
    #[error("address payload is not valid hexadecimal")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Number of raw bytes contained in an address.
pub const ADDRESS_BYTES: usize = 20;

/// A 20-byte EVM account address.
///
/// Parsing accepts hex with or without the `0x` prefix in any letter case;
/// display always renders the EIP-55 checksummed form. Equality and ordering
/// are byte-wise, so two spellings of the same account always compare equal.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(pub [u8; ADDRESS_BYTES]);

impl Address {
    pub const ZERO: Address = Address([0u8; ADDRESS_BYTES]);

    pub fn as_bytes(&self) -> &[u8; ADDRESS_BYTES] {
        &self.0
    }

    /// Render the EIP-55 mixed-case checksum encoding, `0x`-prefixed.
    pub fn to_checksum_string(&self) -> String {
        let lower = hex::encode(self.0);
        let digest = Keccak256::digest(lower.as_bytes());

        let mut out = String::with_capacity(2 + ADDRESS_BYTES * 2);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (digest[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_checksum_string())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_checksum_string())
    }
}

impl From<[u8; ADDRESS_BYTES]> for Address {
    fn from(value: [u8; ADDRESS_BYTES]) -> Self {
        Address(value)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix("0x").unwrap_or(s);
        if payload.len() != ADDRESS_BYTES * 2 {
            return Err(AddressError::InvalidLength {
                expected: ADDRESS_BYTES * 2,
                actual: payload.len(),
            });
        }
        let mut bytes = [0u8; ADDRESS_BYTES];
        hex::decode_to_slice(payload, &mut bytes)?;
        Ok(Address(bytes))
    }
}

impl From<Address> for String {
    fn from(value: Address) -> Self {
        value.to_checksum_string()
    }
}

impl TryFrom<String> for Address {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_checksum_roundtrip() {
        // EIP-55 reference vector.
        let checksummed = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
        let addr: Address = checksummed.parse().expect("address should parse");
        assert_eq!(addr.to_checksum_string(), checksummed);

        // Lowercase and unprefixed spellings hit the same bytes.
        let lower: Address = checksummed.to_lowercase().parse().unwrap();
        let unprefixed: Address = checksummed[2..].parse().unwrap();
        assert_eq!(addr, lower);
        assert_eq!(addr, unprefixed);
    }

    #[test]
    fn more_checksum_vectors() {
        for s in [
            "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359",
            "0xdbF03B407c01E7cD3CBea99509d93f8DDDC8C6FB",
            "0xD1220A0cf47c7B9Be7A2E6BA89F429762e7b9aDb",
        ] {
            let addr: Address = s.parse().unwrap();
            assert_eq!(addr.to_checksum_string(), s);
        }
    }

    #[test]
    fn invalid_length_rejected() {
        let err = "0x1234".parse::<Address>().unwrap_err();
        assert!(matches!(err, AddressError::InvalidLength { .. }));
    }

    #[test]
    fn invalid_hex_rejected() {
        let bad = format!("0x{}", "zz".repeat(ADDRESS_BYTES));
        let err = bad.parse::<Address>().unwrap_err();
        assert!(matches!(err, AddressError::InvalidHex(_)));
    }
}
