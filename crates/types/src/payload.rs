//! Parsed bodies of `submit1`/`submit2`/`submitSignatures` transactions.

use serde::{Deserialize, Serialize};

use crate::word::Word;

/// Envelope around one protocol's chunk of a submission transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPayload<T> {
    pub protocol_id: u8,
    pub voting_round_id: u32,
    /// Declared payload size in bytes.
    pub size: u16,
    pub payload: T,
}

/// FTSO commit: a single keccak commit hash.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtsoSubmit1 {
    pub commit_hash: Word,
}

/// FTSO reveal: the committed random plus the encoded feed values.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FtsoSubmit2 {
    pub random: Word,
    /// Decoded feed values; `None` marks the empty sentinel.
    pub values: Vec<Option<i32>>,
    /// Raw value bytes as submitted, used for the commit-hash check.
    pub feed_bytes: Vec<u8>,
}

/// FDC has no commit; the slot exists but carries nothing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdcSubmit1;

/// FDC bitvote over the round's attestation requests.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FdcSubmit2 {
    pub number_of_requests: u16,
    pub bit_vector: Vec<u8>,
}

/// An ECDSA signature in `(v, r, s)` wire order; `v` is the raw byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EcdsaSignature {
    pub v: u8,
    pub r: Word,
    pub s: Word,
}

/// The 38-byte message body a signature transaction signs over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedMessage {
    pub protocol_id: u8,
    pub voting_round_id: u32,
    pub is_secure_random: bool,
    pub merkle_root: Word,
}

/// Parsed `submitSignatures` chunk.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitSignatures {
    /// Encoding discriminator; kind 0 carries the signed message inline.
    pub kind: u8,
    pub message: Option<SignedMessage>,
    pub signature: EcdsaSignature,
    /// Trailing bytes not covered by the signature.
    pub unsigned_message: Vec<u8>,
}
