use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::address::AddressError;

/// A 32-byte EVM word: merkle roots, commit hashes, seeds, key halves.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Word(pub [u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word(0x{})", hex::encode(self.0))
    }
}

impl From<[u8; 32]> for Word {
    fn from(value: [u8; 32]) -> Self {
        Word(value)
    }
}

impl FromStr for Word {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let payload = s.strip_prefix("0x").unwrap_or(s);
        if payload.len() != 64 {
            return Err(AddressError::InvalidLength {
                expected: 64,
                actual: payload.len(),
            });
        }
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(payload, &mut bytes)?;
        Ok(Word(bytes))
    }
}

impl From<Word> for String {
    fn from(value: Word) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for Word {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
