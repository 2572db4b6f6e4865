//! A small ABI word reader covering exactly what the monitored events need:
//! static words, addresses, dynamic `bytes` and dynamic arrays of static
//! element types.

use fsp_types::{Address, Word};

#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    #[error("abi data ended early (wanted word {index})")]
    OutOfBounds { index: usize },
    #[error("abi offset or length does not fit in usize")]
    Oversized,
    #[error("abi word is not a valid {kind}")]
    BadScalar { kind: &'static str },
    #[error("log is missing topic {index}")]
    MissingTopic { index: usize },
}

/// Cursor over 32-byte words of an event's data section.
pub struct WordReader<'a> {
    data: &'a [u8],
}

impl<'a> WordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    pub fn word(&self, index: usize) -> Result<[u8; 32], AbiError> {
        let start = index * 32;
        let end = start + 32;
        if end > self.data.len() {
            return Err(AbiError::OutOfBounds { index });
        }
        let mut word = [0u8; 32];
        word.copy_from_slice(&self.data[start..end]);
        Ok(word)
    }

    pub fn address(&self, index: usize) -> Result<Address, AbiError> {
        Ok(word_to_address(&self.word(index)?))
    }

    pub fn u64(&self, index: usize) -> Result<u64, AbiError> {
        word_to_u64(&self.word(index)?)
    }

    pub fn u128(&self, index: usize) -> Result<u128, AbiError> {
        word_to_u128(&self.word(index)?)
    }

    pub fn u16(&self, index: usize) -> Result<u16, AbiError> {
        let value = self.u64(index)?;
        u16::try_from(value).map_err(|_| AbiError::BadScalar { kind: "uint16" })
    }

    pub fn u8(&self, index: usize) -> Result<u8, AbiError> {
        let value = self.u64(index)?;
        u8::try_from(value).map_err(|_| AbiError::BadScalar { kind: "uint8" })
    }

    pub fn bool(&self, index: usize) -> Result<bool, AbiError> {
        match self.u64(index)? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(AbiError::BadScalar { kind: "bool" }),
        }
    }

    fn usize_at(&self, index: usize) -> Result<usize, AbiError> {
        let value = self.u64(index)?;
        usize::try_from(value).map_err(|_| AbiError::Oversized)
    }

    /// Dynamic `bytes` whose head word sits at `head_index`.
    pub fn bytes(&self, head_index: usize) -> Result<Vec<u8>, AbiError> {
        let offset = self.usize_at(head_index)?;
        if offset % 32 != 0 {
            return Err(AbiError::BadScalar { kind: "offset" });
        }
        let len_index = offset / 32;
        let len = self.usize_at(len_index)?;
        let start = offset + 32;
        let end = start + len;
        if end > self.data.len() {
            return Err(AbiError::OutOfBounds { index: len_index });
        }
        Ok(self.data[start..end].to_vec())
    }

    /// Dynamic array of static one-word elements, mapped through `f`.
    pub fn array<T>(
        &self,
        head_index: usize,
        f: impl Fn(&[u8; 32]) -> Result<T, AbiError>,
    ) -> Result<Vec<T>, AbiError> {
        let offset = self.usize_at(head_index)?;
        if offset % 32 != 0 {
            return Err(AbiError::BadScalar { kind: "offset" });
        }
        let len_index = offset / 32;
        let len = self.usize_at(len_index)?;
        let mut out = Vec::with_capacity(len);
        for i in 0..len {
            out.push(f(&self.word(len_index + 1 + i)?)?);
        }
        Ok(out)
    }
}

pub fn word_to_address(word: &[u8; 32]) -> Address {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[12..]);
    Address(bytes)
}

pub fn word_to_u64(word: &[u8; 32]) -> Result<u64, AbiError> {
    if word[..24].iter().any(|b| *b != 0) {
        return Err(AbiError::BadScalar { kind: "uint64" });
    }
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&word[24..]);
    Ok(u64::from_be_bytes(bytes))
}

pub fn word_to_u128(word: &[u8; 32]) -> Result<u128, AbiError> {
    if word[..16].iter().any(|b| *b != 0) {
        return Err(AbiError::BadScalar { kind: "uint128" });
    }
    let mut bytes = [0u8; 16];
    bytes.copy_from_slice(&word[16..]);
    Ok(u128::from_be_bytes(bytes))
}

/// `bytes20` elements are left-aligned within their word.
pub fn word_to_bytes20(word: &[u8; 32]) -> [u8; 20] {
    let mut bytes = [0u8; 20];
    bytes.copy_from_slice(&word[..20]);
    bytes
}

pub fn topic(topics: &[Word], index: usize) -> Result<[u8; 32], AbiError> {
    topics
        .get(index)
        .map(|w| w.0)
        .ok_or(AbiError::MissingTopic { index })
}

/// Left-pad a value into a 32-byte ABI word.
pub fn encode_word(value: &[u8]) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[32 - value.len()..].copy_from_slice(value);
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(ws: &[[u8; 32]]) -> Vec<u8> {
        ws.iter().flatten().copied().collect()
    }

    #[test]
    fn static_words_decode() {
        let data = words(&[
            encode_word(&[0x12, 0x34]),
            encode_word(&[0x01]),
            encode_word(&[0xAB; 20]),
        ]);
        let reader = WordReader::new(&data);
        assert_eq!(reader.u64(0).unwrap(), 0x1234);
        assert!(reader.bool(1).unwrap());
        assert_eq!(reader.address(2).unwrap(), Address([0xAB; 20]));
    }

    #[test]
    fn dynamic_bytes_decode() {
        // head word -> offset 0x20, then length 3, then payload.
        let mut data = words(&[encode_word(&[0x20]), encode_word(&[3])]);
        let mut tail = [0u8; 32];
        tail[..3].copy_from_slice(&[0xDE, 0xAD, 0xBE]);
        data.extend_from_slice(&tail);

        let reader = WordReader::new(&data);
        assert_eq!(reader.bytes(0).unwrap(), vec![0xDE, 0xAD, 0xBE]);
    }

    #[test]
    fn dynamic_array_decodes_elements() {
        let data = words(&[
            encode_word(&[0x20]),
            encode_word(&[2]),
            encode_word(&[0x0A]),
            encode_word(&[0x0B]),
        ]);
        let reader = WordReader::new(&data);
        let values = reader.array(0, |w| word_to_u64(w)).unwrap();
        assert_eq!(values, vec![0x0A, 0x0B]);
    }

    #[test]
    fn truncated_data_errors() {
        let reader = WordReader::new(&[0u8; 16]);
        assert!(matches!(
            reader.word(0),
            Err(AbiError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn overflowing_scalar_errors() {
        let data = words(&[[0xFF; 32]]);
        let reader = WordReader::new(&data);
        assert!(reader.u64(0).is_err());
        assert!(reader.u128(0).is_err());
    }
}
