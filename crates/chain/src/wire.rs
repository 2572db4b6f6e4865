//! Wire representations of the JSON-RPC payloads the observer consumes.

use serde::Deserialize;

use fsp_types::{Address, WTxData, Word};

/// Hex-quantity and hex-bytes decoding helpers shared by the wire types.
pub(crate) mod hex_serde {
    use serde::{Deserialize, Deserializer};

    pub fn strip(s: &str) -> &str {
        s.strip_prefix("0x").unwrap_or(s)
    }

    pub fn parse_u64(s: &str) -> Result<u64, std::num::ParseIntError> {
        u64::from_str_radix(strip(s), 16)
    }

    /// Parses a hex quantity, saturating at `u128::MAX` for oversized values.
    pub fn parse_u128_saturating(s: &str) -> u128 {
        u128::from_str_radix(strip(s), 16).unwrap_or(u128::MAX)
    }

    pub fn quantity<'de, D: Deserializer<'de>>(de: D) -> Result<u64, D::Error> {
        let s = String::deserialize(de)?;
        parse_u64(&s).map_err(serde::de::Error::custom)
    }

    pub fn quantity_u128<'de, D: Deserializer<'de>>(de: D) -> Result<u128, D::Error> {
        let s = String::deserialize(de)?;
        Ok(parse_u128_saturating(&s))
    }

    pub fn bytes<'de, D: Deserializer<'de>>(de: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(de)?;
        hex::decode(strip(&s)).map_err(serde::de::Error::custom)
    }
}

/// `eth_getBlockByNumber` header fields the observer needs.
#[derive(Clone, Debug, Deserialize)]
pub struct BlockHeader {
    #[serde(deserialize_with = "hex_serde::quantity")]
    pub number: u64,
    #[serde(deserialize_with = "hex_serde::quantity")]
    pub timestamp: u64,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawTx {
    pub hash: Word,
    pub from: Address,
    #[serde(default)]
    pub to: Option<Address>,
    #[serde(deserialize_with = "hex_serde::bytes")]
    pub input: Vec<u8>,
    #[serde(rename = "blockNumber", deserialize_with = "hex_serde::quantity")]
    pub block_number: u64,
    #[serde(rename = "transactionIndex", deserialize_with = "hex_serde::quantity")]
    pub transaction_index: u64,
    #[serde(deserialize_with = "hex_serde::quantity_u128")]
    pub value: u128,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawBlock {
    #[serde(deserialize_with = "hex_serde::quantity")]
    pub number: u64,
    #[serde(deserialize_with = "hex_serde::quantity")]
    pub timestamp: u64,
    #[serde(default)]
    pub transactions: Vec<RawTx>,
}

/// A block with fully materialised transactions, block timestamp attached
/// to every transaction.
#[derive(Clone, Debug)]
pub struct Block {
    pub number: u64,
    pub timestamp: u64,
    pub transactions: Vec<WTxData>,
}

impl From<RawBlock> for Block {
    fn from(raw: RawBlock) -> Self {
        let timestamp = raw.timestamp;
        Block {
            number: raw.number,
            timestamp,
            transactions: raw
                .transactions
                .into_iter()
                .map(|tx| WTxData {
                    hash: tx.hash,
                    from: tx.from,
                    to: tx.to,
                    input: tx.input,
                    block_number: tx.block_number,
                    transaction_index: tx.transaction_index,
                    value: tx.value,
                    timestamp,
                })
                .collect(),
        }
    }
}

/// One `eth_getLogs` entry.
#[derive(Clone, Debug, Deserialize)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<Word>,
    #[serde(deserialize_with = "hex_serde::bytes")]
    pub data: Vec<u8>,
    #[serde(rename = "blockNumber", deserialize_with = "hex_serde::quantity")]
    pub block_number: u64,
}
