use std::fmt;

use serde::{Deserialize, Serialize};

use crate::address::Address;

/// A 20-byte node identifier as registered on chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(pub [u8; 20]);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId(0x{})", hex::encode(self.0))
    }
}

/// One registered voter of a signing policy, immutable for the lifetime of
/// its reward epoch.
///
/// The five addresses identify the same logical voter on different paths:
/// registration, commit/reveal submission, signature submission, policy
/// signing and delegation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entity {
    pub identity_address: Address,
    pub submit_address: Address,
    pub submit_signatures_address: Address,
    pub signing_policy_address: Address,
    pub delegation_address: Address,
    /// Concatenated secp256k1 public key, x ‖ y.
    #[serde(with = "serde_public_key")]
    pub public_key: [u8; 64],
    /// `(node_id, weight)` pairs in registration order.
    pub nodes: Vec<(NodeId, u128)>,
    pub delegation_fee_bips: u16,
    pub w_nat_weight: u128,
    pub w_nat_capped_weight: u128,
    /// The ¾-power reweighted value used on chain at registration time.
    pub registration_weight: u128,
    /// The integer weight published in the signing policy.
    pub normalized_weight: u16,
}

mod serde_public_key {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &[u8; 64], ser: S) -> Result<S::Ok, S::Error> {
        ser.serialize_str(&hex::encode(key))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(de: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(de)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom("public key must be 64 bytes"))
    }
}
