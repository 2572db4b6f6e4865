use k256::ecdsa::{RecoveryId, Signature, VerifyingKey};

use crate::hash::keccak256;

/// Errors from recovering a signer address out of a `(v, r, s)` signature.
#[derive(Debug, thiserror::Error)]
pub enum RecoveryError {
    #[error("recovery id {0} is out of range")]
    InvalidRecoveryId(u8),
    #[error("signature scalars are invalid")]
    InvalidSignature,
    #[error("no public key recoverable from signature")]
    Unrecoverable,
}

/// Recover the EVM address that produced `(v, r, s)` over `digest`.
///
/// `v` is the raw wire byte; both the legacy 27/28 encoding and the
/// normalized 0/1 form are accepted.
pub fn recover_signer(
    digest: &[u8; 32],
    v: u8,
    r: &[u8; 32],
    s: &[u8; 32],
) -> Result<[u8; 20], RecoveryError> {
    let standard_v = match v {
        0 | 1 => v,
        27 | 28 => v - 27,
        other => return Err(RecoveryError::InvalidRecoveryId(other)),
    };
    let recovery_id =
        RecoveryId::from_byte(standard_v).ok_or(RecoveryError::InvalidRecoveryId(v))?;

    let signature = Signature::from_scalars(*r, *s)
        .map_err(|_| RecoveryError::InvalidSignature)?;

    let key = VerifyingKey::recover_from_prehash(digest, &signature, recovery_id)
        .map_err(|_| RecoveryError::Unrecoverable)?;

    Ok(address_of(&key))
}

/// Keccak address of an uncompressed secp256k1 public key.
pub fn address_of(key: &VerifyingKey) -> [u8; 20] {
    let point = key.to_encoded_point(false);
    let digest = keccak256(&point.as_bytes()[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&digest[12..]);
    address
}
