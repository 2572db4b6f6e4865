use serde::{Deserialize, Serialize};

use crate::voting::{VotingEpoch, VotingEpochFactory};
use crate::EpochSettings;

/// Timing constants tying reward epochs to the voting cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardEpochSettings {
    pub first_reward_epoch_start_voting_round_id: u32,
    pub reward_epoch_duration_in_voting_epochs: u32,
}

/// A contiguous run of voting rounds sharing one signing policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RewardEpoch {
    pub id: u64,
    settings: EpochSettings,
}

impl RewardEpoch {
    /// First voting round of this reward epoch, per the timing schedule.
    ///
    /// The on-chain `start_voting_round_id` of a signing policy may trail
    /// this value when initialisation runs late; deadlines always follow the
    /// policy, not the schedule.
    pub fn start_voting_round_id(&self) -> u32 {
        self.settings.reward.first_reward_epoch_start_voting_round_id
            + (self.id as u32) * self.settings.reward.reward_epoch_duration_in_voting_epochs
    }

    pub fn start_voting_round(&self) -> VotingEpoch {
        VotingEpochFactory::new(self.settings.voting).epoch(self.start_voting_round_id())
    }

    pub fn start_s(&self) -> u64 {
        self.start_voting_round().start_s()
    }

    pub fn end_s(&self) -> u64 {
        self.next().start_s()
    }

    pub fn next(&self) -> RewardEpoch {
        RewardEpoch {
            id: self.id + 1,
            settings: self.settings,
        }
    }

    pub fn previous(&self) -> RewardEpoch {
        RewardEpoch {
            id: self.id.saturating_sub(1),
            settings: self.settings,
        }
    }
}

/// Derives reward epochs from ids or block timestamps.
#[derive(Clone, Copy, Debug)]
pub struct RewardEpochFactory {
    settings: EpochSettings,
}

impl RewardEpochFactory {
    pub fn new(settings: EpochSettings) -> Self {
        Self { settings }
    }

    pub fn epoch(&self, id: u64) -> RewardEpoch {
        RewardEpoch {
            id,
            settings: self.settings,
        }
    }

    pub fn from_timestamp(&self, ts: u64) -> RewardEpoch {
        let voting = VotingEpochFactory::new(self.settings.voting).from_timestamp(ts);
        let offset = voting
            .id
            .saturating_sub(self.settings.reward.first_reward_epoch_start_voting_round_id);
        let id = offset / self.settings.reward.reward_epoch_duration_in_voting_epochs;
        self.epoch(u64::from(id))
    }
}
