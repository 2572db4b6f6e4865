//! Parsers for the bodies of `submit1`, `submit2` and `submitSignatures`
//! transactions.
//!
//! The Submission contract's functions take no arguments; everything after
//! the 4-byte selector is an opaque concatenation of per-protocol chunks:
//! `protocol_id:u8 ‖ voting_round_id:u32_be ‖ size:u16_be ‖ payload[size]`.
//! Unrelated transactions share the selectors via proxies and collisions,
//! so parse failures are expected and the caller discards them silently.

use once_cell::sync::Lazy;

use fsp_crypto::keccak256;
use fsp_types::{
    EcdsaSignature, FdcSubmit1, FdcSubmit2, FtsoSubmit1, FtsoSubmit2, ParsedPayload,
    SignedMessage, SubmitSignatures, Word, PROTOCOL_FDC, PROTOCOL_FTSO,
};

/// Sentinel encoding of an empty FTSO feed value.
const EMPTY_FEED_SENTINEL: i32 = i32::MIN;

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("submission body ended early")]
    UnexpectedEnd,
    #[error("protocol {0} occurs twice in one submission")]
    DuplicateProtocol(u8),
    #[error("payload length {actual} is invalid for {what}")]
    BadPayload { what: &'static str, actual: usize },
    #[error("unknown submit signatures kind {0}")]
    UnknownKind(u8),
}

/// First 4 bytes of Keccak-256 over the canonical function names.
pub struct SubmissionSelectors {
    pub submit1: [u8; 4],
    pub submit2: [u8; 4],
    pub submit_signatures: [u8; 4],
}

impl SubmissionSelectors {
    fn compute() -> Self {
        Self {
            submit1: selector("submit1()"),
            submit2: selector("submit2()"),
            submit_signatures: selector("submitSignatures()"),
        }
    }

    pub fn get() -> &'static SubmissionSelectors {
        static SELECTORS: Lazy<SubmissionSelectors> = Lazy::new(SubmissionSelectors::compute);
        &SELECTORS
    }
}

fn selector(name: &str) -> [u8; 4] {
    let digest = keccak256(name.as_bytes());
    [digest[0], digest[1], digest[2], digest[3]]
}

/// The FTSO and FDC chunks of one submission transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubmitTx<F, D> {
    pub ftso: Option<ParsedPayload<F>>,
    pub fdc: Option<ParsedPayload<D>>,
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ParseError> {
        if self.buf.len() < n {
            return Err(ParseError::UnexpectedEnd);
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8, ParseError> {
        Ok(self.take(1)?[0])
    }

    fn u16_be(&mut self) -> Result<u16, ParseError> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    fn u32_be(&mut self) -> Result<u32, ParseError> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn word(&mut self) -> Result<Word, ParseError> {
        let bytes = self.take(32)?;
        let mut word = [0u8; 32];
        word.copy_from_slice(bytes);
        Ok(Word(word))
    }
}

fn parse_chunks<F, D>(
    body: &[u8],
    parse_ftso: impl Fn(&[u8]) -> Result<F, ParseError>,
    parse_fdc: impl Fn(&[u8]) -> Result<D, ParseError>,
) -> Result<SubmitTx<F, D>, ParseError> {
    let mut reader = Reader::new(body);
    let mut out = SubmitTx {
        ftso: None,
        fdc: None,
    };

    while !reader.is_empty() {
        let protocol_id = reader.u8()?;
        let voting_round_id = reader.u32_be()?;
        let size = reader.u16_be()?;
        let payload = reader.take(usize::from(size))?;

        match protocol_id {
            PROTOCOL_FTSO => {
                if out.ftso.is_some() {
                    return Err(ParseError::DuplicateProtocol(protocol_id));
                }
                out.ftso = Some(ParsedPayload {
                    protocol_id,
                    voting_round_id,
                    size,
                    payload: parse_ftso(payload)?,
                });
            }
            PROTOCOL_FDC => {
                if out.fdc.is_some() {
                    return Err(ParseError::DuplicateProtocol(protocol_id));
                }
                out.fdc = Some(ParsedPayload {
                    protocol_id,
                    voting_round_id,
                    size,
                    payload: parse_fdc(payload)?,
                });
            }
            // Other protocol ids ride the same transactions; skip them.
            _ => {}
        }
    }

    Ok(out)
}

pub fn parse_submit1(body: &[u8]) -> Result<SubmitTx<FtsoSubmit1, FdcSubmit1>, ParseError> {
    parse_chunks(
        body,
        |payload| {
            if payload.len() != 32 {
                return Err(ParseError::BadPayload {
                    what: "ftso commit hash",
                    actual: payload.len(),
                });
            }
            let mut hash = [0u8; 32];
            hash.copy_from_slice(payload);
            Ok(FtsoSubmit1 {
                commit_hash: Word(hash),
            })
        },
        // FDC rounds carry no commit; any stray bytes are ignored.
        |_payload| Ok(FdcSubmit1),
    )
}

pub fn parse_submit2(body: &[u8]) -> Result<SubmitTx<FtsoSubmit2, FdcSubmit2>, ParseError> {
    parse_chunks(
        body,
        |payload| {
            let mut reader = Reader::new(payload);
            let random = reader.word()?;
            let feed_bytes = reader.buf.to_vec();
            if feed_bytes.len() % 4 != 0 {
                return Err(ParseError::BadPayload {
                    what: "ftso feed values",
                    actual: feed_bytes.len(),
                });
            }
            let values = feed_bytes
                .chunks_exact(4)
                .map(|c| {
                    let value = i32::from_be_bytes([c[0], c[1], c[2], c[3]]);
                    (value != EMPTY_FEED_SENTINEL).then_some(value)
                })
                .collect();
            Ok(FtsoSubmit2 {
                random,
                values,
                feed_bytes,
            })
        },
        |payload| {
            let mut reader = Reader::new(payload);
            let number_of_requests = reader.u16_be()?;
            Ok(FdcSubmit2 {
                number_of_requests,
                bit_vector: reader.buf.to_vec(),
            })
        },
    )
}

fn parse_signatures_payload(payload: &[u8]) -> Result<SubmitSignatures, ParseError> {
    let mut reader = Reader::new(payload);
    let kind = reader.u8()?;

    let message = match kind {
        0 => {
            let protocol_id = reader.u8()?;
            let voting_round_id = reader.u32_be()?;
            let is_secure_random = reader.u8()? != 0;
            let merkle_root = reader.word()?;
            Some(SignedMessage {
                protocol_id,
                voting_round_id,
                is_secure_random,
                merkle_root,
            })
        }
        1 => None,
        other => return Err(ParseError::UnknownKind(other)),
    };

    let v = reader.u8()?;
    let r = reader.word()?;
    let s = reader.word()?;

    Ok(SubmitSignatures {
        kind,
        message,
        signature: EcdsaSignature { v, r, s },
        unsigned_message: reader.buf.to_vec(),
    })
}

pub fn parse_submit_signatures(
    body: &[u8],
) -> Result<SubmitTx<SubmitSignatures, SubmitSignatures>, ParseError> {
    parse_chunks(body, parse_signatures_payload, parse_signatures_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(protocol_id: u8, round: u32, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![protocol_id];
        out.extend_from_slice(&round.to_be_bytes());
        out.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    #[test]
    fn selectors_match_the_deployed_contract() {
        let selectors = SubmissionSelectors::get();
        assert_eq!(hex::encode(selectors.submit1), "6c532fae");
        assert_eq!(hex::encode(selectors.submit2), "9d00c9fd");
        assert_eq!(hex::encode(selectors.submit_signatures), "57eed580");
    }

    #[test]
    fn submit1_carries_both_protocols() {
        let commit = [0x5Au8; 32];
        let mut body = chunk(100, 42, &commit);
        body.extend_from_slice(&chunk(200, 42, &[]));

        let parsed = parse_submit1(&body).unwrap();
        let ftso = parsed.ftso.unwrap();
        assert_eq!(ftso.voting_round_id, 42);
        assert_eq!(ftso.payload.commit_hash, Word(commit));
        assert!(parsed.fdc.is_some());
    }

    #[test]
    fn submit2_decodes_values_and_sentinel() {
        let mut payload = vec![0x11u8; 32];
        payload.extend_from_slice(&100i32.to_be_bytes());
        payload.extend_from_slice(&i32::MIN.to_be_bytes());
        payload.extend_from_slice(&(-7i32).to_be_bytes());
        let body = chunk(100, 7, &payload);

        let parsed = parse_submit2(&body).unwrap();
        let ftso = parsed.ftso.unwrap();
        assert_eq!(ftso.payload.random, Word([0x11; 32]));
        assert_eq!(ftso.payload.values, vec![Some(100), None, Some(-7)]);
        assert_eq!(ftso.payload.feed_bytes.len(), 12);
        assert!(parsed.fdc.is_none());
    }

    #[test]
    fn submit2_fdc_bitvote() {
        let mut payload = 3u16.to_be_bytes().to_vec();
        payload.push(0b0000_0101);
        let body = chunk(200, 9, &payload);

        let parsed = parse_submit2(&body).unwrap();
        let fdc = parsed.fdc.unwrap();
        assert_eq!(fdc.payload.number_of_requests, 3);
        assert_eq!(fdc.payload.bit_vector, vec![0b0000_0101]);
    }

    #[test]
    fn submit_signatures_kind_zero() {
        let mut payload = vec![0u8];
        payload.push(100);
        payload.extend_from_slice(&55u32.to_be_bytes());
        payload.push(1);
        payload.extend_from_slice(&[0xAB; 32]);
        payload.push(27);
        payload.extend_from_slice(&[0x01; 32]);
        payload.extend_from_slice(&[0x02; 32]);
        payload.extend_from_slice(&[0xFF, 0xEE]);
        let body = chunk(100, 55, &payload);

        let parsed = parse_submit_signatures(&body).unwrap();
        let ss = parsed.ftso.unwrap();
        let message = ss.payload.message.unwrap();
        assert_eq!(message.protocol_id, 100);
        assert_eq!(message.voting_round_id, 55);
        assert!(message.is_secure_random);
        assert_eq!(message.merkle_root, Word([0xAB; 32]));
        assert_eq!(ss.payload.signature.v, 27);
        assert_eq!(ss.payload.unsigned_message, vec![0xFF, 0xEE]);
    }

    #[test]
    fn unknown_protocols_are_skipped() {
        let mut body = chunk(1, 3, &[0xAA, 0xBB]);
        body.extend_from_slice(&chunk(100, 3, &[0x5A; 32]));

        let parsed = parse_submit1(&body).unwrap();
        assert!(parsed.ftso.is_some());
        assert!(parsed.fdc.is_none());
    }

    #[test]
    fn duplicate_protocol_rejected() {
        let mut body = chunk(100, 3, &[0x5A; 32]);
        body.extend_from_slice(&chunk(100, 3, &[0x5B; 32]));
        assert!(matches!(
            parse_submit1(&body),
            Err(ParseError::DuplicateProtocol(100))
        ));
    }

    #[test]
    fn truncated_body_rejected() {
        let body = chunk(100, 3, &[0x5A; 32]);
        assert!(matches!(
            parse_submit1(&body[..body.len() - 1]),
            Err(ParseError::UnexpectedEnd)
        ));
    }

    #[test]
    fn wrong_commit_length_rejected() {
        let body = chunk(100, 3, &[0x5A; 31]);
        assert!(matches!(
            parse_submit1(&body),
            Err(ParseError::BadPayload { .. })
        ));
    }
}
