use serde::{Deserialize, Serialize};

/// Timing constants of the voting-round cadence.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotingEpochSettings {
    /// Unix timestamp at which voting round 0 started.
    pub first_voting_round_start_ts: u64,
    /// Duration of one voting round in seconds.
    pub voting_epoch_duration_seconds: u64,
    /// Seconds into a round after which reveals are no longer accepted.
    pub ftso_reveal_deadline_seconds: u64,
}

/// One voting round of the shared cadence.
///
/// `end_s` is exclusive and equals `next().start_s()`; the reveal deadline
/// lies strictly between start and end.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VotingEpoch {
    pub id: u32,
    settings: VotingEpochSettings,
}

impl VotingEpoch {
    pub fn start_s(&self) -> u64 {
        self.settings.first_voting_round_start_ts
            + u64::from(self.id) * self.settings.voting_epoch_duration_seconds
    }

    pub fn end_s(&self) -> u64 {
        self.start_s() + self.settings.voting_epoch_duration_seconds
    }

    pub fn reveal_deadline(&self) -> u64 {
        self.start_s() + self.settings.ftso_reveal_deadline_seconds
    }

    pub fn next(&self) -> VotingEpoch {
        VotingEpoch {
            id: self.id + 1,
            settings: self.settings,
        }
    }

    pub fn previous(&self) -> VotingEpoch {
        VotingEpoch {
            id: self.id.saturating_sub(1),
            settings: self.settings,
        }
    }

    /// Whether `ts` falls inside this round's half-open `[start_s, end_s)`.
    pub fn contains(&self, ts: u64) -> bool {
        (self.start_s()..self.end_s()).contains(&ts)
    }
}

/// Derives voting rounds from ids or block timestamps.
#[derive(Clone, Copy, Debug)]
pub struct VotingEpochFactory {
    settings: VotingEpochSettings,
}

impl VotingEpochFactory {
    pub fn new(settings: VotingEpochSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> VotingEpochSettings {
        self.settings
    }

    pub fn epoch(&self, id: u32) -> VotingEpoch {
        VotingEpoch {
            id,
            settings: self.settings,
        }
    }

    /// The voting round whose `[start_s, end_s)` window contains `ts`.
    ///
    /// Timestamps before round 0 clamp to round 0.
    pub fn from_timestamp(&self, ts: u64) -> VotingEpoch {
        let elapsed = ts.saturating_sub(self.settings.first_voting_round_start_ts);
        let id = elapsed / self.settings.voting_epoch_duration_seconds;
        self.epoch(id as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> VotingEpochSettings {
        VotingEpochSettings {
            first_voting_round_start_ts: 1_000,
            voting_epoch_duration_seconds: 90,
            ftso_reveal_deadline_seconds: 45,
        }
    }

    #[test]
    fn bounds_and_deadline() {
        let factory = VotingEpochFactory::new(settings());
        let epoch = factory.epoch(3);
        assert_eq!(epoch.start_s(), 1_270);
        assert_eq!(epoch.end_s(), 1_360);
        assert_eq!(epoch.reveal_deadline(), 1_315);
        assert_eq!(epoch.end_s(), epoch.next().start_s());
    }

    #[test]
    fn from_timestamp_is_half_open() {
        let factory = VotingEpochFactory::new(settings());
        assert_eq!(factory.from_timestamp(1_000).id, 0);
        assert_eq!(factory.from_timestamp(1_089).id, 0);
        assert_eq!(factory.from_timestamp(1_090).id, 1);
        assert!(factory.epoch(1).contains(1_090));
        assert!(!factory.epoch(1).contains(1_180));
    }

    #[test]
    fn walks_both_directions() {
        let factory = VotingEpochFactory::new(settings());
        let epoch = factory.epoch(10);
        assert_eq!(epoch.next().id, 11);
        assert_eq!(epoch.previous().id, 9);
        assert_eq!(epoch.next().previous(), epoch);
    }
}
