//! Decoding of the seven monitored contract events.
//!
//! Topic hashes are Keccak-256 of the canonical event signatures, computed
//! once at startup. Logs whose topic0 matches nothing we monitor decode to
//! `None`.

use once_cell::sync::Lazy;

use fsp_chain::Log;
use fsp_crypto::keccak256;
use fsp_types::{
    ProtocolMessageRelayed, RandomAcquisitionStarted, SigningPolicyInitialized, SystemsEvent,
    VotePowerBlockSelected, VoterRegistered, VoterRegistrationInfo, VoterRemoved, Word,
};

use crate::abi::{
    topic, word_to_address, word_to_bytes20, word_to_u128, word_to_u64, AbiError, WordReader,
};

const SIG_PROTOCOL_MESSAGE_RELAYED: &str = "ProtocolMessageRelayed(uint8,uint32,bool,bytes32)";
const SIG_SIGNING_POLICY_INITIALIZED: &str =
    "SigningPolicyInitialized(uint24,uint32,uint16,uint256,address[],uint16[],bytes,uint64)";
const SIG_VOTER_REGISTERED: &str =
    "VoterRegistered(address,uint24,address,address,address,bytes32,bytes32,uint256)";
const SIG_VOTER_REMOVED: &str = "VoterRemoved(address,uint24)";
const SIG_VOTER_REGISTRATION_INFO: &str =
    "VoterRegistrationInfo(address,uint24,address,uint16,uint256,uint256,bytes20[],uint256[])";
const SIG_VOTE_POWER_BLOCK_SELECTED: &str = "VotePowerBlockSelected(uint24,uint64,uint64)";
const SIG_RANDOM_ACQUISITION_STARTED: &str = "RandomAcquisitionStarted(uint24,uint64)";

/// Topic-0 hashes of every monitored event.
pub struct EventTopics {
    pub protocol_message_relayed: [u8; 32],
    pub signing_policy_initialized: [u8; 32],
    pub voter_registered: [u8; 32],
    pub voter_removed: [u8; 32],
    pub voter_registration_info: [u8; 32],
    pub vote_power_block_selected: [u8; 32],
    pub random_acquisition_started: [u8; 32],
}

impl EventTopics {
    fn compute() -> Self {
        Self {
            protocol_message_relayed: keccak256(SIG_PROTOCOL_MESSAGE_RELAYED.as_bytes()),
            signing_policy_initialized: keccak256(SIG_SIGNING_POLICY_INITIALIZED.as_bytes()),
            voter_registered: keccak256(SIG_VOTER_REGISTERED.as_bytes()),
            voter_removed: keccak256(SIG_VOTER_REMOVED.as_bytes()),
            voter_registration_info: keccak256(SIG_VOTER_REGISTRATION_INFO.as_bytes()),
            vote_power_block_selected: keccak256(SIG_VOTE_POWER_BLOCK_SELECTED.as_bytes()),
            random_acquisition_started: keccak256(SIG_RANDOM_ACQUISITION_STARTED.as_bytes()),
        }
    }

    pub fn get() -> &'static EventTopics {
        static TOPICS: Lazy<EventTopics> = Lazy::new(EventTopics::compute);
        &TOPICS
    }
}

/// Decode a log into a typed event.
///
/// `block_timestamp` is stamped onto events that do not carry their own
/// timestamp field. Unmonitored topics return `Ok(None)`.
pub fn decode_event(log: &Log, block_timestamp: u64) -> Result<Option<SystemsEvent>, AbiError> {
    let topics = EventTopics::get();
    let topic0 = topic(&log.topics, 0)?;
    let reader = WordReader::new(&log.data);

    let event = if topic0 == topics.protocol_message_relayed {
        SystemsEvent::ProtocolMessageRelayed(ProtocolMessageRelayed {
            protocol_id: scalar_u8(&topic(&log.topics, 1)?)?,
            voting_round_id: scalar_u32(&topic(&log.topics, 2)?)?,
            is_secure_random: reader.bool(0)?,
            merkle_root: Word(reader.word(1)?),
            timestamp: block_timestamp,
        })
    } else if topic0 == topics.signing_policy_initialized {
        SystemsEvent::SigningPolicyInitialized(SigningPolicyInitialized {
            reward_epoch_id: word_to_u64(&topic(&log.topics, 1)?)?,
            start_voting_round_id: scalar_u32(&reader.word(0)?)?,
            threshold: reader.u16(1)?,
            seed: Word(reader.word(2)?),
            voters: reader.array(3, |w| Ok(word_to_address(w)))?,
            weights: reader.array(4, |w| {
                word_to_u64(w)?
                    .try_into()
                    .map_err(|_| AbiError::BadScalar { kind: "uint16" })
            })?,
            signing_policy_bytes: reader.bytes(5)?,
            timestamp: reader.u64(6)?,
        })
    } else if topic0 == topics.voter_registered {
        SystemsEvent::VoterRegistered(VoterRegistered {
            voter: word_to_address(&topic(&log.topics, 1)?),
            reward_epoch_id: word_to_u64(&topic(&log.topics, 2)?)?,
            signing_policy_address: reader.address(0)?,
            submit_address: reader.address(1)?,
            submit_signatures_address: reader.address(2)?,
            public_key_1: Word(reader.word(3)?),
            public_key_2: Word(reader.word(4)?),
            registration_weight: reader.u128(5)?,
        })
    } else if topic0 == topics.voter_removed {
        SystemsEvent::VoterRemoved(VoterRemoved {
            voter: word_to_address(&topic(&log.topics, 1)?),
            reward_epoch_id: word_to_u64(&topic(&log.topics, 2)?)?,
        })
    } else if topic0 == topics.voter_registration_info {
        SystemsEvent::VoterRegistrationInfo(VoterRegistrationInfo {
            voter: word_to_address(&topic(&log.topics, 1)?),
            reward_epoch_id: word_to_u64(&topic(&log.topics, 2)?)?,
            delegation_address: reader.address(0)?,
            delegation_fee_bips: reader.u16(1)?,
            w_nat_weight: reader.u128(2)?,
            w_nat_capped_weight: reader.u128(3)?,
            node_ids: reader.array(4, |w| Ok(word_to_bytes20(w)))?,
            node_weights: reader.array(5, |w| word_to_u128(w))?,
        })
    } else if topic0 == topics.vote_power_block_selected {
        SystemsEvent::VotePowerBlockSelected(VotePowerBlockSelected {
            reward_epoch_id: word_to_u64(&topic(&log.topics, 1)?)?,
            vote_power_block: reader.u64(0)?,
            timestamp: reader.u64(1)?,
        })
    } else if topic0 == topics.random_acquisition_started {
        SystemsEvent::RandomAcquisitionStarted(RandomAcquisitionStarted {
            reward_epoch_id: word_to_u64(&topic(&log.topics, 1)?)?,
            timestamp: reader.u64(0)?,
        })
    } else {
        return Ok(None);
    };

    Ok(Some(event))
}

fn scalar_u8(word: &[u8; 32]) -> Result<u8, AbiError> {
    word_to_u64(word)?
        .try_into()
        .map_err(|_| AbiError::BadScalar { kind: "uint8" })
}

fn scalar_u32(word: &[u8; 32]) -> Result<u32, AbiError> {
    word_to_u64(word)?
        .try_into()
        .map_err(|_| AbiError::BadScalar { kind: "uint32" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abi::encode_word;
    use fsp_types::Address;

    fn log(topics: Vec<[u8; 32]>, data: Vec<u8>) -> Log {
        serde_json::from_value::<Log>(serde_json::json!({
            "address": format!("0x{}", "aa".repeat(20)),
            "topics": topics.iter().map(|t| format!("0x{}", hex::encode(t))).collect::<Vec<_>>(),
            "data": format!("0x{}", hex::encode(&data)),
            "blockNumber": "0x1",
        }))
        .unwrap()
    }

    fn concat(words: &[[u8; 32]]) -> Vec<u8> {
        words.iter().flatten().copied().collect()
    }

    #[test]
    fn decodes_protocol_message_relayed() {
        let topics = EventTopics::get();
        let root = [0x77u8; 32];
        let log = log(
            vec![
                topics.protocol_message_relayed,
                encode_word(&[100]),
                encode_word(&123u32.to_be_bytes()),
            ],
            concat(&[encode_word(&[1]), root]),
        );

        let event = decode_event(&log, 9_999).unwrap().unwrap();
        match event {
            SystemsEvent::ProtocolMessageRelayed(e) => {
                assert_eq!(e.protocol_id, 100);
                assert_eq!(e.voting_round_id, 123);
                assert!(e.is_secure_random);
                assert_eq!(e.merkle_root, Word(root));
                assert_eq!(e.timestamp, 9_999);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_signing_policy_initialized() {
        let topics = EventTopics::get();
        let voter = Address([0x11; 20]);

        // Head: startVotingRoundId, threshold, seed, off(voters),
        // off(weights), off(bytes), timestamp.
        let head_words = 7;
        let voters_off = head_words * 32;
        let weights_off = voters_off + 2 * 32;
        let bytes_off = weights_off + 2 * 32;

        let mut data = concat(&[
            encode_word(&480u32.to_be_bytes()),
            encode_word(&[0x01, 0x00]),
            [0x05; 32],
            encode_word(&(voters_off as u32).to_be_bytes()),
            encode_word(&(weights_off as u32).to_be_bytes()),
            encode_word(&(bytes_off as u32).to_be_bytes()),
            encode_word(&1_700_000_000u64.to_be_bytes()),
        ]);
        // voters: [voter]
        data.extend_from_slice(&concat(&[encode_word(&[1]), encode_word(&voter.0)]));
        // weights: [7]
        data.extend_from_slice(&concat(&[encode_word(&[1]), encode_word(&[7])]));
        // signingPolicyBytes: 2 raw bytes
        let mut tail = [0u8; 32];
        tail[..2].copy_from_slice(&[0xCA, 0xFE]);
        data.extend_from_slice(&concat(&[encode_word(&[2])]));
        data.extend_from_slice(&tail);

        let log = log(
            vec![topics.signing_policy_initialized, encode_word(&[3])],
            data,
        );
        let event = decode_event(&log, 0).unwrap().unwrap();
        match event {
            SystemsEvent::SigningPolicyInitialized(e) => {
                assert_eq!(e.reward_epoch_id, 3);
                assert_eq!(e.start_voting_round_id, 480);
                assert_eq!(e.threshold, 256);
                assert_eq!(e.voters, vec![voter]);
                assert_eq!(e.weights, vec![7]);
                assert_eq!(e.signing_policy_bytes, vec![0xCA, 0xFE]);
                assert_eq!(e.timestamp, 1_700_000_000);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_voter_registered() {
        let topics = EventTopics::get();
        let log = log(
            vec![
                topics.voter_registered,
                encode_word(&[0xAA; 20]),
                encode_word(&[9]),
            ],
            concat(&[
                encode_word(&[0x01; 20]),
                encode_word(&[0x02; 20]),
                encode_word(&[0x03; 20]),
                [0x04; 32],
                [0x05; 32],
                encode_word(&1_000u32.to_be_bytes()),
            ]),
        );
        let event = decode_event(&log, 0).unwrap().unwrap();
        match event {
            SystemsEvent::VoterRegistered(e) => {
                assert_eq!(e.voter, Address([0xAA; 20]));
                assert_eq!(e.reward_epoch_id, 9);
                assert_eq!(e.signing_policy_address, Address([0x01; 20]));
                assert_eq!(e.submit_address, Address([0x02; 20]));
                assert_eq!(e.submit_signatures_address, Address([0x03; 20]));
                assert_eq!(e.registration_weight, 1_000);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn decodes_voter_registration_info() {
        let topics = EventTopics::get();
        let node = [0x0Fu8; 20];
        let mut node_word = [0u8; 32];
        node_word[..20].copy_from_slice(&node);

        let head_words = 6;
        let ids_off = head_words * 32;
        let weights_off = ids_off + 2 * 32;

        let mut data = concat(&[
            encode_word(&[0x06; 20]),
            encode_word(&[0x00, 0x64]),
            encode_word(&[0x10]),
            encode_word(&[0x0C]),
            encode_word(&(ids_off as u32).to_be_bytes()),
            encode_word(&(weights_off as u32).to_be_bytes()),
        ]);
        data.extend_from_slice(&concat(&[encode_word(&[1]), node_word]));
        data.extend_from_slice(&concat(&[encode_word(&[1]), encode_word(&[0x20])]));

        let log = log(
            vec![
                topics.voter_registration_info,
                encode_word(&[0xAA; 20]),
                encode_word(&[9]),
            ],
            data,
        );
        let event = decode_event(&log, 0).unwrap().unwrap();
        match event {
            SystemsEvent::VoterRegistrationInfo(e) => {
                assert_eq!(e.delegation_address, Address([0x06; 20]));
                assert_eq!(e.delegation_fee_bips, 100);
                assert_eq!(e.w_nat_weight, 0x10);
                assert_eq!(e.w_nat_capped_weight, 0x0C);
                assert_eq!(e.node_ids, vec![node]);
                assert_eq!(e.node_weights, vec![0x20]);
            }
            other => panic!("wrong variant: {other:?}"),
        }
    }

    #[test]
    fn unmonitored_topic_is_none() {
        let log = log(vec![[0xEE; 32]], vec![]);
        assert!(decode_event(&log, 0).unwrap().is_none());
    }
}
