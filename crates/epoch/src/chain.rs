use serde::{Deserialize, Serialize};

use crate::reward::RewardEpochSettings;
use crate::voting::VotingEpochSettings;
use crate::EpochSettings;

/// Raised when `eth_chainId` reports a network we do not monitor.
#[derive(Debug, thiserror::Error)]
#[error("unknown chain id {0}")]
pub struct UnknownChain(pub u64);

/// The four networks of the Flare family.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainId {
    Flare,
    Coston,
    Songbird,
    Coston2,
}

impl ChainId {
    pub fn all() -> [ChainId; 4] {
        [
            ChainId::Flare,
            ChainId::Coston,
            ChainId::Songbird,
            ChainId::Coston2,
        ]
    }

    pub fn id(&self) -> u64 {
        match self {
            ChainId::Flare => 14,
            ChainId::Coston => 16,
            ChainId::Songbird => 19,
            ChainId::Coston2 => 114,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChainId::Flare => "flare",
            ChainId::Coston => "coston",
            ChainId::Songbird => "songbird",
            ChainId::Coston2 => "coston2",
        }
    }

    /// Production timing constants of the network.
    pub fn epoch_settings(&self) -> EpochSettings {
        let (first_ts, reward_rounds) = match self {
            ChainId::Flare => (1_658_430_000, 3_360),
            ChainId::Songbird => (1_658_429_955, 3_360),
            ChainId::Coston => (1_658_429_955, 240),
            ChainId::Coston2 => (1_658_430_000, 240),
        };
        EpochSettings {
            voting: VotingEpochSettings {
                first_voting_round_start_ts: first_ts,
                voting_epoch_duration_seconds: 90,
                ftso_reveal_deadline_seconds: 45,
            },
            reward: RewardEpochSettings {
                first_reward_epoch_start_voting_round_id: 0,
                reward_epoch_duration_in_voting_epochs: reward_rounds,
            },
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = UnknownChain;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            14 => Ok(ChainId::Flare),
            16 => Ok(ChainId::Coston),
            19 => Ok(ChainId::Songbird),
            114 => Ok(ChainId::Coston2),
            other => Err(UnknownChain(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_roundtrip() {
        for chain in ChainId::all() {
            assert_eq!(ChainId::try_from(chain.id()).unwrap(), chain);
        }
        assert!(ChainId::try_from(1).is_err());
    }

    #[test]
    fn names() {
        assert_eq!(ChainId::Flare.name(), "flare");
        assert_eq!(ChainId::Coston2.name(), "coston2");
    }

    #[test]
    fn songbird_cadence() {
        let settings = ChainId::Songbird.epoch_settings();
        let factory = settings.voting_factory();
        let epoch = factory.from_timestamp(1_658_429_955 + 90);
        assert_eq!(epoch.id, 1);
        assert_eq!(epoch.reveal_deadline() - epoch.start_s(), 45);
    }
}
