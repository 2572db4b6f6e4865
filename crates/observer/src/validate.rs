//! Per-round validation of the watched voter, run once a round is judged.
//!
//! Every outcome is a [`Message`], never an error. The predicate order is
//! fixed; messages within a round always appear in that order.

use fsp_crypto::{eip191_digest, ftso_commit_hash, recover_signer};
use fsp_epoch::VotingEpoch;
use fsp_types::{
    Entity, ProtocolMessageRelayed, SubmitSignatures, PROTOCOL_FDC, PROTOCOL_FTSO,
};

use crate::message::{Message, MessageBuilder, MessageLevel};
use crate::metrics;
use crate::rounds::{SubmissionRecord, VotingRound};

/// Seconds after round start within which signatures still earn rewards
/// when no finalization arrived; the bound is half-open.
const SIGNATURE_GRACE_S: u64 = 56;

/// Judge one round for `entity` across both protocols.
///
/// `base` carries the network and round context; the protocol tag is added
/// here.
pub fn validate_round(round: &VotingRound, entity: &Entity, base: &MessageBuilder) -> Vec<Message> {
    let mut messages = validate_ftso(round, entity, base.copy().protocol(PROTOCOL_FTSO));
    messages.extend(validate_fdc(round, entity, base.copy().protocol(PROTOCOL_FDC)));
    messages
}

/// The latest record for this round inside `[start, end)`, by block
/// timestamp with last-insertion as tiebreaker.
fn latest_in_range<'a, T>(
    records: &'a [SubmissionRecord<T>],
    voting_round_id: u32,
    start: u64,
    end: u64,
) -> Option<&'a SubmissionRecord<T>> {
    let mut best: Option<&SubmissionRecord<T>> = None;
    for record in records {
        if record.payload.voting_round_id != voting_round_id {
            continue;
        }
        let ts = record.tx.timestamp;
        if ts < start || ts >= end {
            continue;
        }
        if best.is_none_or(|b| ts >= b.tx.timestamp) {
            best = Some(record);
        }
    }
    best
}

/// Upper bound of the signature grace window: fixed offset into the next
/// round, extended through a finalization's block timestamp inclusive.
fn signature_grace_end(next: &VotingEpoch, finalization: Option<&ProtocolMessageRelayed>) -> u64 {
    let fixed = next.start_s() + SIGNATURE_GRACE_S;
    let extended = finalization.map(|f| f.timestamp + 1).unwrap_or(0);
    fixed.max(extended)
}

/// Whether the signature in `submitted` recovers to the entity's signing
/// policy address over the finalized message. Unrecoverable signatures
/// count as mismatches.
fn signature_matches(
    finalization: &ProtocolMessageRelayed,
    submitted: &SubmitSignatures,
    entity: &Entity,
) -> bool {
    let digest = eip191_digest(&finalization.signed_payload());
    let signature = &submitted.signature;
    match recover_signer(&digest, signature.v, &signature.r.0, &signature.s.0) {
        Ok(address) => address == entity.signing_policy_address.0,
        Err(_) => false,
    }
}

pub fn validate_ftso(round: &VotingRound, entity: &Entity, mb: MessageBuilder) -> Vec<Message> {
    let identity = entity.identity_address.to_checksum_string();
    let v = round.voting_epoch;
    let next = v.next();

    let submit1 = latest_in_range(
        round.ftso.submit1.get(&entity.identity_address),
        v.id,
        v.start_s(),
        v.end_s(),
    );
    let submit2 = latest_in_range(
        round.ftso.submit2.get(&entity.identity_address),
        v.id,
        next.start_s(),
        next.reveal_deadline(),
    );
    let finalization = round.ftso.finalization.as_ref();
    let submit_signatures = latest_in_range(
        round.ftso.submit_signatures.get(&entity.identity_address),
        v.id,
        next.reveal_deadline(),
        signature_grace_end(&next, finalization),
    );

    let mut out = Vec::new();

    if submit1.is_none() {
        out.push(mb.build(MessageLevel::Info, "no submit1 transaction"));
    }

    if submit1.is_some() && submit2.is_none() {
        out.push(mb.build(
            MessageLevel::Critical,
            "no submit2 transaction, causing reveal offence",
        ));
        metrics::record_reveal_offence(PROTOCOL_FTSO, &identity);
    }

    if let Some(reveal) = submit2 {
        let empty: Vec<usize> = reveal
            .payload
            .payload
            .values
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_none())
            .map(|(i, _)| i)
            .collect();
        if !empty.is_empty() {
            for index in &empty {
                metrics::record_none_value(&identity, *index);
            }
            let indices = empty
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.push(mb.build(
                MessageLevel::Warning,
                &format!("submit 2 had 'None' on indices {indices}"),
            ));
        }
    }

    if let (Some(commit), Some(reveal)) = (submit1, submit2) {
        let computed = ftso_commit_hash(
            entity.submit_address.as_bytes(),
            v.id,
            reveal.payload.payload.random.as_bytes(),
            &reveal.payload.payload.feed_bytes,
        );
        if computed != commit.payload.payload.commit_hash.0 {
            out.push(mb.build(
                MessageLevel::Critical,
                "commit hash and reveal didn't match, causing reveal offence",
            ));
            metrics::record_reveal_offence(PROTOCOL_FTSO, &identity);
        }
    }

    if submit_signatures.is_none() {
        out.push(mb.build(MessageLevel::Error, "no submit signatures transaction"));
    }

    if let (Some(finalization), Some(signatures)) = (finalization, submit_signatures) {
        if !signature_matches(finalization, &signatures.payload.payload, entity) {
            out.push(mb.build(
                MessageLevel::Error,
                "submit signatures signature doesn't match finalization",
            ));
            metrics::record_signature_mismatch(PROTOCOL_FTSO, &identity);
        }
    }

    out
}

pub fn validate_fdc(round: &VotingRound, entity: &Entity, mb: MessageBuilder) -> Vec<Message> {
    let identity = entity.identity_address.to_checksum_string();
    let v = round.voting_epoch;
    let next = v.next();

    // FDC has no commit; submit1 is expected-absent and never judged.
    let submit2 = latest_in_range(
        round.fdc.submit2.get(&entity.identity_address),
        v.id,
        next.start_s(),
        next.reveal_deadline(),
    );
    let finalization = round.fdc.finalization.as_ref();
    let signature_records = round.fdc.submit_signatures.get(&entity.identity_address);
    let within_grace = latest_in_range(
        signature_records,
        v.id,
        next.reveal_deadline(),
        signature_grace_end(&next, finalization),
    );
    let within_round = latest_in_range(
        signature_records,
        v.id,
        next.reveal_deadline(),
        next.end_s(),
    );

    let mut out = Vec::new();

    if submit2.is_none() {
        out.push(mb.build(MessageLevel::Error, "no submit2 transaction"));
    }

    if submit2.is_some() && within_round.is_none() {
        out.push(mb.build(
            MessageLevel::Critical,
            "no submit signatures transaction, causing reveal offence",
        ));
        metrics::record_reveal_offence(PROTOCOL_FDC, &identity);
    }

    if submit2.is_some() && within_round.is_some() && within_grace.is_none() {
        out.push(mb.build(
            MessageLevel::Error,
            "no submit signatures transaction during grace period, causing loss of rewards",
        ));
    }

    if submit2.is_none() && within_grace.is_none() {
        out.push(mb.build(MessageLevel::Error, "no submit signatures transaction"));
    }

    if let (Some(finalization), Some(signatures)) = (finalization, within_grace) {
        if !signature_matches(finalization, &signatures.payload.payload, entity) {
            out.push(mb.build(
                MessageLevel::Error,
                "submit signatures signature doesn't match finalization",
            ));
            metrics::record_signature_mismatch(PROTOCOL_FDC, &identity);
        }
    }

    out
}
