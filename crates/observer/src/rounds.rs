//! The rolling window of in-flight voting rounds.

use std::collections::{BTreeMap, HashMap};

use fsp_epoch::VotingEpoch;
use fsp_types::{
    Address, FdcSubmit1, FdcSubmit2, FtsoSubmit1, FtsoSubmit2, ParsedPayload,
    ProtocolMessageRelayed, SubmitSignatures, WTxData,
};

/// One submission as witnessed on chain: the parsed chunk plus the carrying
/// transaction.
#[derive(Clone, Debug)]
pub struct SubmissionRecord<T> {
    pub payload: ParsedPayload<T>,
    pub tx: WTxData,
}

/// Per-identity submission lists, insertion-ordered.
///
/// Lists rather than last-only slots: a voter may replace a transaction
/// within a round, and judgement needs the whole list to pick the latest
/// inside a time window.
#[derive(Clone, Debug)]
pub struct ParsedPayloadMap<T> {
    by_identity: HashMap<Address, Vec<SubmissionRecord<T>>>,
}

impl<T> Default for ParsedPayloadMap<T> {
    fn default() -> Self {
        Self {
            by_identity: HashMap::new(),
        }
    }
}

impl<T> ParsedPayloadMap<T> {
    pub fn insert(&mut self, identity: Address, record: SubmissionRecord<T>) {
        self.by_identity.entry(identity).or_default().push(record);
    }

    pub fn get(&self, identity: &Address) -> &[SubmissionRecord<T>] {
        self.by_identity.get(identity).map_or(&[], Vec::as_slice)
    }
}

/// One protocol's slice of a voting round.
#[derive(Clone, Debug)]
pub struct VotingRoundProtocol<S1, S2> {
    pub submit1: ParsedPayloadMap<S1>,
    pub submit2: ParsedPayloadMap<S2>,
    pub submit_signatures: ParsedPayloadMap<SubmitSignatures>,
    pub finalization: Option<ProtocolMessageRelayed>,
}

impl<S1, S2> Default for VotingRoundProtocol<S1, S2> {
    fn default() -> Self {
        Self {
            submit1: ParsedPayloadMap::default(),
            submit2: ParsedPayloadMap::default(),
            submit_signatures: ParsedPayloadMap::default(),
            finalization: None,
        }
    }
}

impl<S1, S2> VotingRoundProtocol<S1, S2> {
    /// Record the finalization; once per (protocol, round), first one wins.
    pub fn set_finalization(&mut self, event: ProtocolMessageRelayed) {
        if self.finalization.is_none() {
            self.finalization = Some(event);
        }
    }
}

pub type FtsoRoundProtocol = VotingRoundProtocol<FtsoSubmit1, FtsoSubmit2>;
pub type FdcRoundProtocol = VotingRoundProtocol<FdcSubmit1, FdcSubmit2>;

/// Everything witnessed for one voting round across both protocols.
#[derive(Clone, Debug)]
pub struct VotingRound {
    pub voting_epoch: VotingEpoch,
    pub ftso: FtsoRoundProtocol,
    pub fdc: FdcRoundProtocol,
}

impl VotingRound {
    fn new(voting_epoch: VotingEpoch) -> Self {
        Self {
            voting_epoch,
            ftso: FtsoRoundProtocol::default(),
            fdc: FdcRoundProtocol::default(),
        }
    }

    /// A round is judgeable once both protocols finalized, or once the
    /// last deadline has passed regardless.
    fn is_judgeable(&self, block_timestamp: u64) -> bool {
        (self.ftso.finalization.is_some() && self.fdc.finalization.is_some())
            || self.voting_epoch.next().end_s() < block_timestamp
    }
}

/// A voting round earlier than the finalized watermark came back; the only
/// way that happens is a chain reorganisation.
#[derive(Debug, thiserror::Error)]
#[error("voting round {round} re-created at or below finalized watermark {finalized}")]
pub struct ReorgDetected {
    pub round: u32,
    pub finalized: u32,
}

/// Keyed map of in-flight rounds behind a monotone finalized watermark.
#[derive(Debug, Default)]
pub struct VotingRoundStore {
    finalized: u32,
    rounds: BTreeMap<u32, VotingRound>,
}

impl VotingRoundStore {
    pub fn new(finalized: u32) -> Self {
        Self {
            finalized,
            rounds: BTreeMap::new(),
        }
    }

    pub fn finalized(&self) -> u32 {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.rounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rounds.is_empty()
    }

    /// The aggregate for `voting_epoch`, created lazily.
    pub fn get(&mut self, voting_epoch: VotingEpoch) -> Result<&mut VotingRound, ReorgDetected> {
        if voting_epoch.id <= self.finalized {
            return Err(ReorgDetected {
                round: voting_epoch.id,
                finalized: self.finalized,
            });
        }
        Ok(self
            .rounds
            .entry(voting_epoch.id)
            .or_insert_with(|| VotingRound::new(voting_epoch)))
    }

    /// Extract every round that is judgeable as of `block_timestamp`, in
    /// ascending round order, advancing the watermark to the highest id
    /// removed. Stale rounds the watermark has passed are dropped silently.
    pub fn finalize(&mut self, block_timestamp: u64) -> Vec<VotingRound> {
        let judgeable: Vec<u32> = self
            .rounds
            .iter()
            .filter(|(_, round)| round.is_judgeable(block_timestamp))
            .map(|(id, _)| *id)
            .collect();

        let mut extracted = Vec::with_capacity(judgeable.len());
        for id in judgeable {
            if let Some(round) = self.rounds.remove(&id) {
                self.finalized = self.finalized.max(id);
                extracted.push(round);
            }
        }

        self.rounds.retain(|id, _| *id > self.finalized);
        extracted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsp_epoch::{ChainId, VotingEpochFactory};
    use fsp_types::Word;

    fn factory() -> VotingEpochFactory {
        ChainId::Coston.epoch_settings().voting_factory()
    }

    fn finalization(protocol_id: u8, round: u32, timestamp: u64) -> ProtocolMessageRelayed {
        ProtocolMessageRelayed {
            protocol_id,
            voting_round_id: round,
            is_secure_random: true,
            merkle_root: Word([1; 32]),
            timestamp,
        }
    }

    #[test]
    fn get_creates_lazily_and_guards_the_watermark() {
        let mut store = VotingRoundStore::new(100);
        assert!(store.is_empty());

        let round = store.get(factory().epoch(101)).unwrap();
        assert_eq!(round.voting_epoch.id, 101);
        assert_eq!(store.len(), 1);

        let err = store.get(factory().epoch(100)).unwrap_err();
        assert_eq!(err.round, 100);
        assert_eq!(err.finalized, 100);
    }

    #[test]
    fn finalize_on_double_finalization() {
        let mut store = VotingRoundStore::new(100);
        let epoch = factory().epoch(101);

        let round = store.get(epoch).unwrap();
        round.ftso.set_finalization(finalization(100, 101, 1));
        // One protocol finalized is not enough.
        assert!(store.finalize(0).is_empty());

        store
            .get(epoch)
            .unwrap()
            .fdc
            .set_finalization(finalization(200, 101, 2));
        let extracted = store.finalize(0);
        assert_eq!(extracted.len(), 1);
        assert_eq!(extracted[0].voting_epoch.id, 101);
        assert_eq!(store.finalized(), 101);
        assert!(store.is_empty());
    }

    #[test]
    fn finalize_on_deadline_expiry() {
        let mut store = VotingRoundStore::new(100);
        let epoch = factory().epoch(101);
        store.get(epoch).unwrap();

        let deadline = epoch.next().end_s();
        assert!(store.finalize(deadline).is_empty());
        let extracted = store.finalize(deadline + 1);
        assert_eq!(extracted.len(), 1);
        assert_eq!(store.finalized(), 101);
    }

    #[test]
    fn finalize_returns_ascending_and_each_round_once() {
        let mut store = VotingRoundStore::new(100);
        for id in [104, 101, 103, 102] {
            store.get(factory().epoch(id)).unwrap();
        }

        let far_future = factory().epoch(200).end_s();
        let extracted = store.finalize(far_future);
        let ids: Vec<u32> = extracted.iter().map(|r| r.voting_epoch.id).collect();
        assert_eq!(ids, vec![101, 102, 103, 104]);
        assert_eq!(store.finalized(), 104);

        assert!(store.finalize(far_future).is_empty());
        // Re-creating an extracted round is a reorg.
        assert!(store.get(factory().epoch(104)).is_err());
    }

    #[test]
    fn stale_rounds_are_evicted_not_returned() {
        let mut store = VotingRoundStore::new(100);
        let early = factory().epoch(101);
        let late = factory().epoch(105);
        store.get(early).unwrap();
        // The late round finalizes on both protocols while the early one
        // saw neither finalization nor its deadline.
        let round = store.get(late).unwrap();
        round.ftso.set_finalization(finalization(100, 105, 1));
        round.fdc.set_finalization(finalization(200, 105, 2));

        let extracted = store.finalize(early.next().end_s());
        let ids: Vec<u32> = extracted.iter().map(|r| r.voting_epoch.id).collect();
        assert_eq!(ids, vec![105]);
        assert_eq!(store.finalized(), 105);
        // 101 was dropped silently.
        assert!(store.is_empty());
    }

    #[test]
    fn first_finalization_wins() {
        let mut store = VotingRoundStore::new(100);
        let round = store.get(factory().epoch(101)).unwrap();
        round.ftso.set_finalization(finalization(100, 101, 1));
        round.ftso.set_finalization(finalization(100, 101, 99));
        assert_eq!(round.ftso.finalization.as_ref().unwrap().timestamp, 1);
    }
}
