//! Prometheus metrics, emitted through the `metrics` facade.
//!
//! All counters are monotonic and updated only from the single consumer
//! task; the exporter's HTTP listener serves them read-only.

use metrics::{counter, describe_counter, describe_gauge, gauge};

use fsp_types::{Entity, PROTOCOL_FDC, PROTOCOL_FTSO};

use crate::message::MessageLevel;

/// Register help texts for everything the observer exports.
pub fn describe() {
    describe_gauge!("observer_info", "Observer information");
    describe_gauge!("reward_epoch_info", "Current reward epoch information");
    describe_gauge!("voting_epoch_info", "Current voting epoch information");

    describe_counter!("message_total", "Total messages by level");

    for protocol in ["ftso", "fdc"] {
        describe_counter!(
            format!("{protocol}_submit1_total"),
            "Total submit1 transactions"
        );
        describe_counter!(
            format!("{protocol}_submit2_total"),
            "Total submit2 transactions"
        );
        describe_counter!(
            format!("{protocol}_submit_signatures_total"),
            "Total submit signatures transactions"
        );
        describe_counter!(
            format!("{protocol}_reveal_offence_total"),
            "Total reveal offences"
        );
        describe_counter!(
            format!("{protocol}_signature_mismatch_total"),
            "Total signature mismatches"
        );
    }
    describe_counter!("ftso_none_values_total", "Total empty FTSO values submitted");

    describe_gauge!("entity_wnat_weight", "Entity WNat weight");
    describe_gauge!("entity_wnat_capped_weight", "Entity WNat capped weight");
    describe_gauge!("entity_registration_weight", "Entity registration weight");
    describe_gauge!("entity_normalized_weight", "Entity normalized weight");
}

fn protocol_prefix(protocol_id: u8) -> Option<&'static str> {
    match protocol_id {
        PROTOCOL_FTSO => Some("ftso"),
        PROTOCOL_FDC => Some("fdc"),
        _ => None,
    }
}

pub fn observer_started(identity_address: &str, chain_id: u64) {
    gauge!(
        "observer_info",
        "identity_address" => identity_address.to_string(),
        "chain_id" => chain_id.to_string(),
    )
    .set(1.0);
}

pub fn set_reward_epoch(reward_epoch_id: u64) {
    gauge!("reward_epoch_info", "reward_epoch_id" => reward_epoch_id.to_string()).set(1.0);
}

pub fn set_voting_epoch(voting_epoch_id: u32) {
    gauge!("voting_epoch_info", "voting_epoch_id" => voting_epoch_id.to_string()).set(1.0);
}

pub fn record_message(level: MessageLevel, identity_address: &str) {
    counter!(
        "message_total",
        "level" => level.name(),
        "identity_address" => identity_address.to_string(),
    )
    .increment(1);
}

pub fn record_submit1(protocol_id: u8, identity_address: &str) {
    if let Some(prefix) = protocol_prefix(protocol_id) {
        counter!(
            format!("{prefix}_submit1_total"),
            "identity_address" => identity_address.to_string(),
        )
        .increment(1);
    }
}

pub fn record_submit2(protocol_id: u8, identity_address: &str) {
    if let Some(prefix) = protocol_prefix(protocol_id) {
        counter!(
            format!("{prefix}_submit2_total"),
            "identity_address" => identity_address.to_string(),
        )
        .increment(1);
    }
}

pub fn record_submit_signatures(protocol_id: u8, identity_address: &str) {
    if let Some(prefix) = protocol_prefix(protocol_id) {
        counter!(
            format!("{prefix}_submit_signatures_total"),
            "identity_address" => identity_address.to_string(),
        )
        .increment(1);
    }
}

pub fn record_reveal_offence(protocol_id: u8, identity_address: &str) {
    if let Some(prefix) = protocol_prefix(protocol_id) {
        counter!(
            format!("{prefix}_reveal_offence_total"),
            "identity_address" => identity_address.to_string(),
        )
        .increment(1);
    }
}

pub fn record_signature_mismatch(protocol_id: u8, identity_address: &str) {
    if let Some(prefix) = protocol_prefix(protocol_id) {
        counter!(
            format!("{prefix}_signature_mismatch_total"),
            "identity_address" => identity_address.to_string(),
        )
        .increment(1);
    }
}

pub fn record_none_value(identity_address: &str, index: usize) {
    counter!(
        "ftso_none_values_total",
        "identity_address" => identity_address.to_string(),
        "index" => index.to_string(),
    )
    .increment(1);
}

/// Refresh the weight gauges for one entity; called on every policy swap.
pub fn update_entity(entity: &Entity) {
    let identity = entity.identity_address.to_checksum_string();
    gauge!("entity_wnat_weight", "identity_address" => identity.clone())
        .set(entity.w_nat_weight as f64);
    gauge!("entity_wnat_capped_weight", "identity_address" => identity.clone())
        .set(entity.w_nat_capped_weight as f64);
    gauge!("entity_registration_weight", "identity_address" => identity.clone())
        .set(entity.registration_weight as f64);
    gauge!("entity_normalized_weight", "identity_address" => identity)
        .set(f64::from(entity.normalized_weight));
}
