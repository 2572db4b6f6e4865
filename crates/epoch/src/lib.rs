//! Voting-round and reward-epoch timing for the Flare family of networks.
//!
//! Both epoch kinds are plain `Copy` value objects carrying the settings
//! they were derived from, so callers can walk `next`/`previous` without a
//! factory handle.

pub mod chain;
pub mod reward;
pub mod voting;

pub use chain::{ChainId, UnknownChain};
pub use reward::{RewardEpoch, RewardEpochFactory, RewardEpochSettings};
pub use voting::{VotingEpoch, VotingEpochFactory, VotingEpochSettings};

/// Combined timing settings of one network.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EpochSettings {
    pub voting: VotingEpochSettings,
    pub reward: RewardEpochSettings,
}

impl EpochSettings {
    pub fn voting_factory(&self) -> VotingEpochFactory {
        VotingEpochFactory::new(self.voting)
    }

    pub fn reward_factory(&self) -> RewardEpochFactory {
        RewardEpochFactory::new(*self)
    }
}
