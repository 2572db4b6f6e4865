//! Hashing and signature-recovery primitives used by the observer.
//!
//! Everything here operates on raw byte arrays so the crate sits below the
//! domain types.

pub mod hash;
pub mod signature;

pub use hash::{eip191_digest, ftso_commit_hash, keccak256};
pub use signature::{recover_signer, RecoveryError};
