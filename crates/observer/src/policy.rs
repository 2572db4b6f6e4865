//! Signing-policy accumulation and the five-way address index.
//!
//! A builder instance walks `Empty → Armed(for_epoch) → Collecting → Built`;
//! the successful [`SigningPolicyBuilder::build`] is the only way to obtain
//! an immutable [`SigningPolicy`].

use std::collections::HashMap;

use fsp_epoch::RewardEpoch;
use fsp_types::{
    Address, Entity, NodeId, RandomAcquisitionStarted, SigningPolicyInitialized, SystemsEvent,
    VotePowerBlockSelected, VoterRegistered, VoterRegistrationInfo, VoterRemoved, Word,
};

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("duplicate {event} event for reward epoch {reward_epoch_id}")]
    DuplicateEvent {
        event: &'static str,
        reward_epoch_id: u64,
    },
    #[error("event for reward epoch {actual} fed to builder armed for {expected}")]
    WrongEpoch { expected: u64, actual: u64 },
    #[error("signing policy for reward epoch {reward_epoch_id} is incomplete: missing {missing}")]
    IncompletePolicy {
        reward_epoch_id: u64,
        missing: &'static str,
    },
    #[error("voter registrations do not match registration infos for reward epoch {0}")]
    RegistrationMismatch(u64),
}

/// Five independent address indices over one policy's entities, plus the
/// omni index used on the hot transaction path.
#[derive(Clone, Debug, Default)]
pub struct EntityMapper {
    entities: Vec<Entity>,
    by_identity: HashMap<Address, usize>,
    by_submit: HashMap<Address, usize>,
    by_submit_signatures: HashMap<Address, usize>,
    by_signing_policy: HashMap<Address, usize>,
    by_delegation: HashMap<Address, usize>,
    omni: HashMap<Address, usize>,
}

impl EntityMapper {
    fn from_entities(entities: Vec<Entity>) -> Self {
        let mut mapper = EntityMapper {
            entities,
            ..Default::default()
        };
        for (i, entity) in mapper.entities.iter().enumerate() {
            mapper.by_identity.insert(entity.identity_address, i);
            mapper.by_submit.insert(entity.submit_address, i);
            mapper
                .by_submit_signatures
                .insert(entity.submit_signatures_address, i);
            mapper
                .by_signing_policy
                .insert(entity.signing_policy_address, i);
            mapper.by_delegation.insert(entity.delegation_address, i);
            for address in [
                entity.identity_address,
                entity.submit_address,
                entity.submit_signatures_address,
                entity.signing_policy_address,
                entity.delegation_address,
            ] {
                mapper.omni.insert(address, i);
            }
        }
        mapper
    }

    /// Entities in signing-policy order.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn by_identity(&self, address: &Address) -> Option<&Entity> {
        self.by_identity.get(address).map(|i| &self.entities[*i])
    }

    pub fn by_submit(&self, address: &Address) -> Option<&Entity> {
        self.by_submit.get(address).map(|i| &self.entities[*i])
    }

    pub fn by_submit_signatures(&self, address: &Address) -> Option<&Entity> {
        self.by_submit_signatures
            .get(address)
            .map(|i| &self.entities[*i])
    }

    pub fn by_signing_policy(&self, address: &Address) -> Option<&Entity> {
        self.by_signing_policy
            .get(address)
            .map(|i| &self.entities[*i])
    }

    pub fn by_delegation(&self, address: &Address) -> Option<&Entity> {
        self.by_delegation.get(address).map(|i| &self.entities[*i])
    }

    /// Resolve any of the five address kinds in one lookup.
    pub fn by_omni(&self, address: &Address) -> Option<&Entity> {
        self.omni.get(address).map(|i| &self.entities[*i])
    }
}

/// Immutable roster of voters, weights and threshold for one reward epoch.
#[derive(Clone, Debug)]
pub struct SigningPolicy {
    pub reward_epoch: RewardEpoch,
    pub vote_power_block: u64,
    pub start_voting_round_id: u32,
    pub threshold: u16,
    pub seed: Word,
    pub raw_policy_bytes: Vec<u8>,
    mapper: EntityMapper,
}

impl SigningPolicy {
    pub fn entities(&self) -> &[Entity] {
        self.mapper.entities()
    }

    pub fn mapper(&self) -> &EntityMapper {
        &self.mapper
    }

    /// The voter's normalized weight and its share of the policy total.
    pub fn voter_weight(&self, identity_address: &Address) -> (u16, f64) {
        let weight = self
            .mapper
            .by_identity(identity_address)
            .map(|e| e.normalized_weight)
            .unwrap_or(0);
        let total: u64 = self
            .entities()
            .iter()
            .map(|e| u64::from(e.normalized_weight))
            .sum();
        if total == 0 {
            return (weight, 0.0);
        }
        (weight, f64::from(weight) / total as f64)
    }
}

/// Accumulates the policy events of one reward epoch.
#[derive(Debug)]
pub struct SigningPolicyBuilder {
    reward_epoch: RewardEpoch,
    random_acquisition_started: Option<RandomAcquisitionStarted>,
    vote_power_block_selected: Option<VotePowerBlockSelected>,
    signing_policy_initialized: Option<SigningPolicyInitialized>,
    registered: Vec<VoterRegistered>,
    registration_info: Vec<VoterRegistrationInfo>,
    removed: Vec<VoterRemoved>,
}

impl SigningPolicyBuilder {
    /// Arm a fresh builder for `reward_epoch`.
    pub fn for_epoch(reward_epoch: RewardEpoch) -> Self {
        Self {
            reward_epoch,
            random_acquisition_started: None,
            vote_power_block_selected: None,
            signing_policy_initialized: None,
            registered: Vec::new(),
            registration_info: Vec::new(),
            removed: Vec::new(),
        }
    }

    pub fn reward_epoch(&self) -> RewardEpoch {
        self.reward_epoch
    }

    /// The policy-closing event, once observed. Scanners stop early on it.
    pub fn signing_policy_initialized(&self) -> Option<&SigningPolicyInitialized> {
        self.signing_policy_initialized.as_ref()
    }

    /// Feed one policy event.
    ///
    /// List-typed events accumulate; the three singleton events fail with
    /// [`PolicyError::DuplicateEvent`] on a second occurrence. Events for
    /// another reward epoch are rejected; the caller filters by epoch.
    pub fn add(&mut self, event: &SystemsEvent) -> Result<(), PolicyError> {
        let Some(reward_epoch_id) = event.reward_epoch_id() else {
            return Ok(());
        };
        if reward_epoch_id != self.reward_epoch.id {
            return Err(PolicyError::WrongEpoch {
                expected: self.reward_epoch.id,
                actual: reward_epoch_id,
            });
        }

        match event {
            SystemsEvent::RandomAcquisitionStarted(e) => {
                if self.random_acquisition_started.is_some() {
                    return Err(self.duplicate("RandomAcquisitionStarted"));
                }
                self.random_acquisition_started = Some(e.clone());
            }
            SystemsEvent::VotePowerBlockSelected(e) => {
                if self.vote_power_block_selected.is_some() {
                    return Err(self.duplicate("VotePowerBlockSelected"));
                }
                self.vote_power_block_selected = Some(e.clone());
            }
            SystemsEvent::SigningPolicyInitialized(e) => {
                if self.signing_policy_initialized.is_some() {
                    return Err(self.duplicate("SigningPolicyInitialized"));
                }
                self.signing_policy_initialized = Some(e.clone());
            }
            SystemsEvent::VoterRegistered(e) => self.registered.push(e.clone()),
            SystemsEvent::VoterRegistrationInfo(e) => self.registration_info.push(e.clone()),
            SystemsEvent::VoterRemoved(e) => self.removed.push(e.clone()),
            SystemsEvent::ProtocolMessageRelayed(_) => {}
        }
        Ok(())
    }

    fn duplicate(&self, event: &'static str) -> PolicyError {
        PolicyError::DuplicateEvent {
            event,
            reward_epoch_id: self.reward_epoch.id,
        }
    }

    /// Produce the immutable policy snapshot.
    ///
    /// The entity order mirrors `SigningPolicyInitialized.voters` (signing
    /// policy addresses); the i-th entity receives `weights[i]` as its
    /// normalized weight.
    pub fn build(self) -> Result<SigningPolicy, PolicyError> {
        let reward_epoch_id = self.reward_epoch.id;
        let missing = |missing| PolicyError::IncompletePolicy {
            reward_epoch_id,
            missing,
        };

        let spi = self
            .signing_policy_initialized
            .ok_or_else(|| missing("SigningPolicyInitialized"))?;
        let vpbs = self
            .vote_power_block_selected
            .ok_or_else(|| missing("VotePowerBlockSelected"))?;
        self.random_acquisition_started
            .as_ref()
            .ok_or_else(|| missing("RandomAcquisitionStarted"))?;

        if self.registered.len() != self.registration_info.len() {
            return Err(PolicyError::RegistrationMismatch(reward_epoch_id));
        }
        if spi.voters.len() != spi.weights.len() {
            return Err(PolicyError::RegistrationMismatch(reward_epoch_id));
        }

        // signing policy address -> registration; identity -> info. Later
        // registrations replace earlier ones for the same address.
        let mut by_spa: HashMap<Address, &VoterRegistered> = HashMap::new();
        for registration in &self.registered {
            by_spa.insert(registration.signing_policy_address, registration);
        }
        let mut info_by_identity: HashMap<Address, &VoterRegistrationInfo> = HashMap::new();
        for info in &self.registration_info {
            info_by_identity.insert(info.voter, info);
        }

        let mut entities = Vec::with_capacity(spi.voters.len());
        for (i, spa) in spi.voters.iter().enumerate() {
            let registration = by_spa
                .get(spa)
                .ok_or(PolicyError::RegistrationMismatch(reward_epoch_id))?;
            let info = info_by_identity
                .get(&registration.voter)
                .ok_or(PolicyError::RegistrationMismatch(reward_epoch_id))?;
            if info.node_ids.len() != info.node_weights.len() {
                return Err(PolicyError::RegistrationMismatch(reward_epoch_id));
            }

            let mut public_key = [0u8; 64];
            public_key[..32].copy_from_slice(registration.public_key_1.as_bytes());
            public_key[32..].copy_from_slice(registration.public_key_2.as_bytes());

            entities.push(Entity {
                identity_address: registration.voter,
                submit_address: registration.submit_address,
                submit_signatures_address: registration.submit_signatures_address,
                signing_policy_address: registration.signing_policy_address,
                delegation_address: info.delegation_address,
                public_key,
                nodes: info
                    .node_ids
                    .iter()
                    .zip(&info.node_weights)
                    .map(|(id, weight)| (NodeId(*id), *weight))
                    .collect(),
                delegation_fee_bips: info.delegation_fee_bips,
                w_nat_weight: info.w_nat_weight,
                w_nat_capped_weight: info.w_nat_capped_weight,
                registration_weight: registration.registration_weight,
                normalized_weight: spi.weights[i],
            });
        }

        Ok(SigningPolicy {
            reward_epoch: self.reward_epoch,
            vote_power_block: vpbs.vote_power_block,
            start_voting_round_id: spi.start_voting_round_id,
            threshold: spi.threshold,
            seed: spi.seed,
            raw_policy_bytes: spi.signing_policy_bytes.clone(),
            mapper: EntityMapper::from_entities(entities),
        })
    }
}
