use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::word::Word;

/// Transaction data as witnessed in a block, with the block timestamp
/// attached.
///
/// The timestamp is the ordering key for all deadline logic; wall-clock time
/// never enters round judgement.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WTxData {
    pub hash: Word,
    pub from: Address,
    pub to: Option<Address>,
    pub input: Vec<u8>,
    pub block_number: u64,
    pub transaction_index: u64,
    pub value: u128,
    pub timestamp: u64,
}
