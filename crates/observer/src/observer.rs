//! The driver: bootstraps the current signing policy from a historical
//! block window, then single-steps block-by-block, routing logs to the
//! policy builder or the round store and transactions to the store, rolling
//! the policy at epoch boundaries and judging finalized rounds.

use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, error, info, warn};

use fsp_chain::{find_block_near, Block, RpcClient};
use fsp_contracts::{
    decode_event, parse_submit1, parse_submit2, parse_submit_signatures, Contracts,
    SubmissionSelectors,
};
use fsp_epoch::{ChainId, RewardEpochFactory, VotingEpoch, VotingEpochFactory};
use fsp_types::{Address, SystemsEvent, WTxData, PROTOCOL_FDC, PROTOCOL_FTSO};

use crate::message::{Message, MessageBuilder, MessageLevel};
use crate::metrics;
use crate::notification::Notifier;
use crate::policy::{SigningPolicy, SigningPolicyBuilder};
use crate::rounds::{SubmissionRecord, VotingRound, VotingRoundStore};
use crate::validate::validate_round;

/// Sleep between polls when the head has not advanced.
const IDLE_POLL: Duration = Duration::from_secs(2);

/// The voter-registration window precedes a reward epoch's start by
/// roughly this much; the bootstrap scan brackets it.
const REGISTRATION_WINDOW_BEFORE_START_S: u64 = 9_000;
const REGISTRATION_WINDOW_UNTIL_START_S: u64 = 3_600;

/// Blocks per `eth_getLogs` request during the bootstrap scan.
const LOG_SCAN_CHUNK: u64 = 512;

/// Per-validator liveness and correctness observer for one network.
pub struct Observer {
    client: RpcClient,
    contracts: Contracts,
    chain: ChainId,
    identity_address: Address,
    notifier: Notifier,
    avg_block_time: u64,
    voting_factory: VotingEpochFactory,
    reward_factory: RewardEpochFactory,
}

impl Observer {
    pub fn new(
        client: RpcClient,
        contracts: Contracts,
        chain: ChainId,
        identity_address: Address,
        notifier: Notifier,
        avg_block_time: u64,
    ) -> Self {
        let settings = chain.epoch_settings();
        Self {
            client,
            contracts,
            chain,
            identity_address,
            notifier,
            avg_block_time,
            voting_factory: settings.voting_factory(),
            reward_factory: settings.reward_factory(),
        }
    }

    /// Bootstrap, align and run forever. RPC failures and reorgs bubble
    /// out; the process is expected to run under a supervisor.
    pub async fn run(&self) -> Result<()> {
        let (mut policy, latest_block, latest_ts) = self.bootstrap().await?;
        let mut next_builder = SigningPolicyBuilder::for_epoch(policy.reward_epoch.next());

        let (starting_epoch, aligned_block) = self.align(latest_block, latest_ts).await?;
        let mut store = VotingRoundStore::new(starting_epoch.previous().id);
        let mut current_epoch = starting_epoch;

        metrics::observer_started(
            &self.identity_address.to_checksum_string(),
            self.chain.id(),
        );
        metrics::set_reward_epoch(policy.reward_epoch.id);
        metrics::set_voting_epoch(starting_epoch.id);
        if let Some(entity) = policy.mapper().by_identity(&self.identity_address) {
            metrics::update_entity(entity);
        }

        let (weight, share) = policy.voter_weight(&self.identity_address);
        let startup = MessageBuilder::new().network(self.chain).build(
            MessageLevel::Info,
            &format!(
                "observer initialized, watching {} (weight {weight}, share {share:.4}), \
                 starting in voting round {}",
                self.identity_address, starting_epoch.id
            ),
        );
        self.emit(&startup);

        // The aligned block belongs to the starting round; process it too.
        let mut block_number = aligned_block;
        loop {
            let latest = self.client.block_number().await?;
            if block_number >= latest {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
            while block_number < latest {
                let block = self.client.block_with_transactions(block_number).await?;
                self.process_block(
                    &block,
                    &mut policy,
                    &mut next_builder,
                    &mut store,
                    &mut current_epoch,
                )
                .await?;
                block_number += 1;
            }
        }
    }

    /// Scan the voter-registration window of the reward epoch the chain is
    /// currently in and build its signing policy.
    async fn bootstrap(&self) -> Result<(SigningPolicy, u64, u64)> {
        let latest = self.client.block_number().await?;
        let header = self.client.block_header(latest).await?;
        let reward_epoch = self.reward_factory.from_timestamp(header.timestamp);
        info!(
            chain = self.chain.name(),
            reward_epoch = reward_epoch.id,
            latest_block = latest,
            "bootstrapping signing policy"
        );

        let window_start = reward_epoch
            .start_s()
            .saturating_sub(REGISTRATION_WINDOW_BEFORE_START_S);
        let window_end = reward_epoch
            .start_s()
            .saturating_sub(REGISTRATION_WINDOW_UNTIL_START_S);
        let lower_block = find_block_near(
            &self.client,
            latest,
            header.timestamp,
            window_start,
            self.avg_block_time,
        )
        .await?;
        let end_block = find_block_near(
            &self.client,
            latest,
            header.timestamp,
            window_end,
            self.avg_block_time,
        )
        .await?;

        let mut builder = SigningPolicyBuilder::for_epoch(reward_epoch);
        let sources = self.contracts.monitored_log_sources();
        let mut from = lower_block;
        'scan: while from <= end_block {
            let to = (from + LOG_SCAN_CHUNK - 1).min(end_block);
            for log in self.client.logs(&sources, from, to).await? {
                let event = match decode_event(&log, 0) {
                    Ok(Some(event)) => event,
                    Ok(None) => continue,
                    Err(err) => {
                        debug!(block = log.block_number, "undecodable log: {err}");
                        continue;
                    }
                };
                if event.reward_epoch_id() != Some(reward_epoch.id) {
                    continue;
                }
                if let Err(err) = builder.add(&event) {
                    warn!("bootstrap event rejected: {err}");
                }
                // The policy event is the last one on chain; stop early.
                if builder.signing_policy_initialized().is_some() {
                    break 'scan;
                }
            }
            from = to + 1;
        }

        let policy = builder.build().context("building bootstrap signing policy")?;
        info!(
            reward_epoch = policy.reward_epoch.id,
            voters = policy.entities().len(),
            start_voting_round = policy.start_voting_round_id,
            "signing policy ready"
        );
        Ok((policy, latest, header.timestamp))
    }

    /// Advance block-by-block until a block timestamp lands inside the
    /// voting round after the current one, then adopt it as the start.
    async fn align(&self, mut block_number: u64, latest_ts: u64) -> Result<(VotingEpoch, u64)> {
        let target = self.voting_factory.from_timestamp(latest_ts).next();
        loop {
            let latest = self.client.block_number().await?;
            if block_number >= latest {
                tokio::time::sleep(IDLE_POLL).await;
                continue;
            }
            block_number += 1;
            let header = self.client.block_header(block_number).await?;
            if target.contains(header.timestamp) {
                info!(
                    voting_round = target.id,
                    block = block_number,
                    "aligned to voting round boundary"
                );
                return Ok((target, block_number));
            }
        }
    }

    async fn process_block(
        &self,
        block: &Block,
        policy: &mut SigningPolicy,
        next_builder: &mut SigningPolicyBuilder,
        store: &mut VotingRoundStore,
        current_epoch: &mut VotingEpoch,
    ) -> Result<()> {
        let voting_epoch = self.voting_factory.from_timestamp(block.timestamp);
        if voting_epoch.id != current_epoch.id {
            *current_epoch = voting_epoch;
            metrics::set_voting_epoch(voting_epoch.id);
        }

        self.maybe_roll_policy(policy, next_builder, voting_epoch);
        self.route_logs(block, next_builder, store).await?;
        self.route_transactions(block, policy, store)?;

        for round in store.finalize(block.timestamp) {
            let Some(target) = policy.mapper().by_identity(&self.identity_address).cloned()
            else {
                debug!(
                    round = round.voting_epoch.id,
                    "watched identity not in current signing policy; round not judged"
                );
                continue;
            };
            let mb = MessageBuilder::new()
                .network(self.chain)
                .round(round.voting_epoch.id);
            for message in validate_round(&round, &target, &mb) {
                self.emit(&message);
            }
        }
        Ok(())
    }

    /// Swap in the pending policy at its start voting round.
    fn maybe_roll_policy(
        &self,
        policy: &mut SigningPolicy,
        next_builder: &mut SigningPolicyBuilder,
        voting_epoch: VotingEpoch,
    ) {
        let ready = next_builder
            .signing_policy_initialized()
            .is_some_and(|spi| spi.start_voting_round_id == voting_epoch.id);
        if !ready {
            return;
        }

        let armed_for = next_builder.reward_epoch();
        let finished =
            std::mem::replace(next_builder, SigningPolicyBuilder::for_epoch(armed_for.next()));
        match finished.build() {
            Ok(new_policy) => {
                info!(
                    reward_epoch = new_policy.reward_epoch.id,
                    voters = new_policy.entities().len(),
                    voting_round = voting_epoch.id,
                    "rolled to new signing policy"
                );
                *policy = new_policy;
                metrics::set_reward_epoch(policy.reward_epoch.id);
                if let Some(entity) = policy.mapper().by_identity(&self.identity_address) {
                    metrics::update_entity(entity);
                }
            }
            Err(err) => {
                // The builder has already been re-armed for the following
                // reward epoch; this epoch's policy is lost.
                let message = MessageBuilder::new().network(self.chain).build(
                    MessageLevel::Critical,
                    &format!("failed to build signing policy for reward epoch {}: {err}", armed_for.id),
                );
                self.emit(&message);
            }
        }
    }

    async fn route_logs(
        &self,
        block: &Block,
        next_builder: &mut SigningPolicyBuilder,
        store: &mut VotingRoundStore,
    ) -> Result<()> {
        let logs = self
            .client
            .logs(&self.contracts.monitored_log_sources(), block.number, block.number)
            .await?;

        for log in &logs {
            let event = match decode_event(log, block.timestamp) {
                Ok(Some(event)) => event,
                Ok(None) => continue,
                Err(err) => {
                    debug!(block = block.number, "undecodable log: {err}");
                    continue;
                }
            };
            match event {
                SystemsEvent::ProtocolMessageRelayed(e) => {
                    if e.protocol_id != PROTOCOL_FTSO && e.protocol_id != PROTOCOL_FDC {
                        continue;
                    }
                    let Some(round) = self.open_round(store, e.voting_round_id)? else {
                        continue;
                    };
                    match e.protocol_id {
                        PROTOCOL_FTSO => round.ftso.set_finalization(e),
                        _ => round.fdc.set_finalization(e),
                    }
                }
                other => {
                    // Policy events for epochs we are not collecting are
                    // stale or premature; drop them.
                    if other.reward_epoch_id() != Some(next_builder.reward_epoch().id) {
                        continue;
                    }
                    if let Err(err) = next_builder.add(&other) {
                        let message = MessageBuilder::new().network(self.chain).build(
                            MessageLevel::Critical,
                            &format!("signing policy event rejected: {err}"),
                        );
                        self.emit(&message);
                    }
                }
            }
        }
        Ok(())
    }

    fn route_transactions(
        &self,
        block: &Block,
        policy: &SigningPolicy,
        store: &mut VotingRoundStore,
    ) -> Result<()> {
        let selectors = SubmissionSelectors::get();
        for tx in &block.transactions {
            if tx.input.len() < 4 {
                continue;
            }
            let Some(entity) = policy.mapper().by_omni(&tx.from) else {
                continue;
            };
            let identity = entity.identity_address;
            let target = (identity == self.identity_address)
                .then(|| identity.to_checksum_string());
            let body = &tx.input[4..];

            // Unrelated transactions share these selectors through proxies
            // and collisions; parse failures are discarded silently.
            if tx.input[..4] == selectors.submit1 {
                let Ok(parsed) = parse_submit1(body) else { continue };
                if let Some(payload) = parsed.ftso {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.ftso.submit1.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit1(PROTOCOL_FTSO, label);
                        }
                    }
                }
                if let Some(payload) = parsed.fdc {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.fdc.submit1.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit1(PROTOCOL_FDC, label);
                        }
                    }
                }
            } else if tx.input[..4] == selectors.submit2 {
                let Ok(parsed) = parse_submit2(body) else { continue };
                if let Some(payload) = parsed.ftso {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.ftso.submit2.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit2(PROTOCOL_FTSO, label);
                        }
                    }
                }
                if let Some(payload) = parsed.fdc {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.fdc.submit2.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit2(PROTOCOL_FDC, label);
                        }
                    }
                }
            } else if tx.input[..4] == selectors.submit_signatures {
                let Ok(parsed) = parse_submit_signatures(body) else { continue };
                if let Some(payload) = parsed.ftso {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.ftso.submit_signatures.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit_signatures(PROTOCOL_FTSO, label);
                        }
                    }
                }
                if let Some(payload) = parsed.fdc {
                    if let Some(round) = self.open_round(store, payload.voting_round_id)? {
                        round.fdc.submit_signatures.insert(identity, record(payload, tx));
                        if let Some(label) = &target {
                            metrics::record_submit_signatures(PROTOCOL_FDC, label);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// The open round for `voting_round_id`, or `None` when the round
    /// precedes the observation window: submissions and finalizations for
    /// rounds behind the watermark trail in right after alignment and are
    /// not ours to judge.
    fn open_round<'a>(
        &self,
        store: &'a mut VotingRoundStore,
        voting_round_id: u32,
    ) -> Result<Option<&'a mut VotingRound>> {
        if voting_round_id <= store.finalized() {
            debug!(round = voting_round_id, "round precedes observation window");
            return Ok(None);
        }
        Ok(Some(store.get(self.voting_factory.epoch(voting_round_id))?))
    }

    fn emit(&self, message: &Message) {
        match message.level {
            MessageLevel::Debug => debug!("{}", message.text),
            MessageLevel::Info => info!("{}", message.text),
            MessageLevel::Warning => warn!("{}", message.text),
            MessageLevel::Error | MessageLevel::Critical => error!("{}", message.text),
        }
        metrics::record_message(message.level, &self.identity_address.to_checksum_string());
        self.notifier.dispatch(message);
    }
}

/// One witnessed submission, block timestamp riding on the transaction.
fn record<T>(payload: fsp_types::ParsedPayload<T>, tx: &WTxData) -> SubmissionRecord<T> {
    SubmissionRecord {
        payload,
        tx: tx.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsp_epoch::RewardEpoch;
    use fsp_types::{
        RandomAcquisitionStarted, SigningPolicyInitialized, VotePowerBlockSelected,
        VoterRegistered, VoterRegistrationInfo, Word,
    };

    fn addr(tag: u8, kind: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[0] = tag;
        bytes[1] = kind;
        Address(bytes)
    }

    fn reward_epoch(id: u64) -> RewardEpoch {
        ChainId::Coston.epoch_settings().reward_factory().epoch(id)
    }

    /// A complete builder for `epoch` with a single voter `tag`, whose
    /// policy starts at the epoch's scheduled first voting round.
    fn full_builder(epoch: RewardEpoch, tag: u8) -> SigningPolicyBuilder {
        let id = epoch.id;
        let mut builder = SigningPolicyBuilder::for_epoch(epoch);
        builder
            .add(&SystemsEvent::RandomAcquisitionStarted(
                RandomAcquisitionStarted {
                    reward_epoch_id: id,
                    timestamp: 1,
                },
            ))
            .unwrap();
        builder
            .add(&SystemsEvent::VotePowerBlockSelected(VotePowerBlockSelected {
                reward_epoch_id: id,
                vote_power_block: 5,
                timestamp: 2,
            }))
            .unwrap();
        builder
            .add(&SystemsEvent::VoterRegistered(VoterRegistered {
                reward_epoch_id: id,
                voter: addr(tag, 0),
                signing_policy_address: addr(tag, 3),
                submit_address: addr(tag, 1),
                submit_signatures_address: addr(tag, 2),
                public_key_1: Word([tag; 32]),
                public_key_2: Word([tag; 32]),
                registration_weight: 100,
            }))
            .unwrap();
        builder
            .add(&SystemsEvent::VoterRegistrationInfo(VoterRegistrationInfo {
                reward_epoch_id: id,
                voter: addr(tag, 0),
                delegation_address: addr(tag, 4),
                delegation_fee_bips: 0,
                w_nat_weight: 100,
                w_nat_capped_weight: 100,
                node_ids: Vec::new(),
                node_weights: Vec::new(),
            }))
            .unwrap();
        builder
            .add(&SystemsEvent::SigningPolicyInitialized(
                SigningPolicyInitialized {
                    reward_epoch_id: id,
                    start_voting_round_id: epoch.start_voting_round_id(),
                    threshold: 1,
                    seed: Word([0; 32]),
                    voters: vec![addr(tag, 3)],
                    weights: vec![1],
                    signing_policy_bytes: Vec::new(),
                    timestamp: 3,
                },
            ))
            .unwrap();
        builder
    }

    fn observer() -> Observer {
        let contracts = Contracts {
            voter_registry: addr(0xF0, 0),
            flare_systems_calculator: addr(0xF0, 1),
            flare_systems_manager: addr(0xF0, 2),
            relay: addr(0xF0, 3),
            submission: addr(0xF0, 4),
        };
        Observer::new(
            RpcClient::new("http://localhost:9650").unwrap(),
            contracts,
            ChainId::Coston,
            addr(1, 0),
            Notifier::default(),
            1,
        )
    }

    #[test]
    fn policy_rolls_exactly_at_its_start_voting_round() {
        let observer = observer();
        let mut policy = full_builder(reward_epoch(10), 1).build().unwrap();
        let mut next_builder = full_builder(reward_epoch(11), 2);
        let boundary = reward_epoch(11).start_voting_round_id();

        // One round early: nothing happens.
        observer.maybe_roll_policy(
            &mut policy,
            &mut next_builder,
            observer.voting_factory.epoch(boundary - 1),
        );
        assert_eq!(policy.reward_epoch.id, 10);
        assert!(policy.mapper().by_omni(&addr(2, 1)).is_none());

        // At the boundary round the new policy takes over, and a sender
        // registered only in the new epoch resolves against it.
        observer.maybe_roll_policy(
            &mut policy,
            &mut next_builder,
            observer.voting_factory.epoch(boundary),
        );
        assert_eq!(policy.reward_epoch.id, 11);
        let resolved = policy.mapper().by_omni(&addr(2, 1)).unwrap();
        assert_eq!(resolved.identity_address, addr(2, 0));
        assert!(policy.mapper().by_omni(&addr(1, 1)).is_none());

        // The builder has been re-armed for the epoch after the swap.
        assert_eq!(next_builder.reward_epoch().id, 12);
        assert!(next_builder.signing_policy_initialized().is_none());
    }

    #[test]
    fn failed_roll_is_survivable_and_rearms_the_builder() {
        let observer = observer();
        let original = full_builder(reward_epoch(10), 1).build().unwrap();
        let mut policy = original.clone();

        // Builder saw the policy event but no registrations.
        let mut next_builder = SigningPolicyBuilder::for_epoch(reward_epoch(11));
        next_builder
            .add(&SystemsEvent::SigningPolicyInitialized(
                SigningPolicyInitialized {
                    reward_epoch_id: 11,
                    start_voting_round_id: reward_epoch(11).start_voting_round_id(),
                    threshold: 1,
                    seed: Word([0; 32]),
                    voters: vec![addr(2, 3)],
                    weights: vec![1],
                    signing_policy_bytes: Vec::new(),
                    timestamp: 3,
                },
            ))
            .unwrap();

        let boundary = reward_epoch(11).start_voting_round_id();
        observer.maybe_roll_policy(
            &mut policy,
            &mut next_builder,
            observer.voting_factory.epoch(boundary),
        );

        // The old policy stays in force; the builder moved on.
        assert_eq!(policy.reward_epoch.id, original.reward_epoch.id);
        assert_eq!(next_builder.reward_epoch().id, 12);
    }
}
