//! Typed events emitted by the Flare systems-protocol contracts.
//!
//! One struct per event; `SystemsEvent` is the tagged union routed by the
//! observer loop. Block timestamps are attached at decode time where the
//! event itself does not carry one.

use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::word::Word;

/// Relay: a protocol's merkle root was accepted for a voting round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolMessageRelayed {
    pub protocol_id: u8,
    pub voting_round_id: u32,
    pub is_secure_random: bool,
    pub merkle_root: Word,
    /// Timestamp of the block the event was emitted in.
    pub timestamp: u64,
}

impl ProtocolMessageRelayed {
    /// The 38-byte message body whose EIP-191 digest voters sign:
    /// `protocol_id:u8 ‖ voting_round_id:u32_be ‖ is_secure_random:u8 ‖ merkle_root:32`.
    pub fn signed_payload(&self) -> [u8; 38] {
        let mut out = [0u8; 38];
        out[0] = self.protocol_id;
        out[1..5].copy_from_slice(&self.voting_round_id.to_be_bytes());
        out[5] = u8::from(self.is_secure_random);
        out[6..38].copy_from_slice(self.merkle_root.as_bytes());
        out
    }
}

/// Relay: the signing policy for a reward epoch was finalised on chain.
///
/// This is always the last of the policy events to appear; observing it
/// means the registration window for the epoch is closed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningPolicyInitialized {
    pub reward_epoch_id: u64,
    pub start_voting_round_id: u32,
    pub threshold: u16,
    pub seed: Word,
    /// Signing-policy addresses, in policy order.
    pub voters: Vec<Address>,
    /// Normalized weights, positionally matching `voters`.
    pub weights: Vec<u16>,
    pub signing_policy_bytes: Vec<u8>,
    pub timestamp: u64,
}

/// VoterRegistry: a voter registered for a reward epoch.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRegistered {
    pub reward_epoch_id: u64,
    /// Identity address of the voter.
    pub voter: Address,
    pub signing_policy_address: Address,
    pub submit_address: Address,
    pub submit_signatures_address: Address,
    pub public_key_1: Word,
    pub public_key_2: Word,
    pub registration_weight: u128,
}

/// VoterRegistry: a previously registered voter was removed again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRemoved {
    pub reward_epoch_id: u64,
    pub voter: Address,
}

/// FlareSystemsCalculator: delegation and node-weight details for a voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterRegistrationInfo {
    pub reward_epoch_id: u64,
    pub voter: Address,
    pub delegation_address: Address,
    pub delegation_fee_bips: u16,
    pub w_nat_weight: u128,
    pub w_nat_capped_weight: u128,
    pub node_ids: Vec<[u8; 20]>,
    pub node_weights: Vec<u128>,
}

/// FlareSystemsManager: the vote-power block for a reward epoch was chosen.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotePowerBlockSelected {
    pub reward_epoch_id: u64,
    pub vote_power_block: u64,
    pub timestamp: u64,
}

/// FlareSystemsManager: random acquisition for a reward epoch began.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomAcquisitionStarted {
    pub reward_epoch_id: u64,
    pub timestamp: u64,
}

/// Union of all monitored contract events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SystemsEvent {
    ProtocolMessageRelayed(ProtocolMessageRelayed),
    SigningPolicyInitialized(SigningPolicyInitialized),
    VoterRegistered(VoterRegistered),
    VoterRemoved(VoterRemoved),
    VoterRegistrationInfo(VoterRegistrationInfo),
    VotePowerBlockSelected(VotePowerBlockSelected),
    RandomAcquisitionStarted(RandomAcquisitionStarted),
}

impl SystemsEvent {
    /// Reward epoch the event belongs to, for the policy-building events.
    pub fn reward_epoch_id(&self) -> Option<u64> {
        match self {
            SystemsEvent::ProtocolMessageRelayed(_) => None,
            SystemsEvent::SigningPolicyInitialized(e) => Some(e.reward_epoch_id),
            SystemsEvent::VoterRegistered(e) => Some(e.reward_epoch_id),
            SystemsEvent::VoterRemoved(e) => Some(e.reward_epoch_id),
            SystemsEvent::VoterRegistrationInfo(e) => Some(e.reward_epoch_id),
            SystemsEvent::VotePowerBlockSelected(e) => Some(e.reward_epoch_id),
            SystemsEvent::RandomAcquisitionStarted(e) => Some(e.reward_epoch_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_payload_layout() {
        let event = ProtocolMessageRelayed {
            protocol_id: 100,
            voting_round_id: 0x01020304,
            is_secure_random: true,
            merkle_root: Word([0xAB; 32]),
            timestamp: 0,
        };
        let payload = event.signed_payload();
        assert_eq!(payload[0], 100);
        assert_eq!(&payload[1..5], &[1, 2, 3, 4]);
        assert_eq!(payload[5], 1);
        assert_eq!(&payload[6..], &[0xAB; 32]);
    }
}
