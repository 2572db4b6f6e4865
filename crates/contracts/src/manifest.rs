//! Contract name → address manifest, resolved at bootstrap.
//!
//! The `FlareContractRegistry` is deployed at the same address on every
//! network of the family, so a single `eth_call` per contract name replaces
//! a shipped address file.

use tracing::info;

use fsp_chain::{RpcClient, RpcError};
use fsp_crypto::keccak256;
use fsp_types::Address;

use crate::abi::word_to_address;

/// Universal registry address, identical on flare, songbird, coston and
/// coston2.
pub const FLARE_CONTRACT_REGISTRY: Address = Address([
    0xad, 0x67, 0xfe, 0x66, 0x66, 0x0f, 0xb8, 0xdf, 0xe9, 0xd6, 0xb1, 0xb4, 0x24, 0x0d, 0x86,
    0x50, 0xe3, 0x0f, 0x60, 0x19,
]);

#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error(transparent)]
    Rpc(#[from] RpcError),
    #[error("registry does not know contract {0}")]
    MissingContract(&'static str),
    #[error("registry returned a malformed address for {0}")]
    BadResponse(&'static str),
}

/// Addresses of the five contracts the observer touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contracts {
    pub voter_registry: Address,
    pub flare_systems_calculator: Address,
    pub flare_systems_manager: Address,
    pub relay: Address,
    pub submission: Address,
}

impl Contracts {
    /// The four contracts whose logs the loop subscribes to.
    pub fn monitored_log_sources(&self) -> [Address; 4] {
        [
            self.relay,
            self.voter_registry,
            self.flare_systems_manager,
            self.flare_systems_calculator,
        ]
    }

    /// Resolve every contract through the on-chain registry.
    pub async fn resolve(client: &RpcClient) -> Result<Self, ManifestError> {
        let registry = FLARE_CONTRACT_REGISTRY;

        let contracts = Contracts {
            voter_registry: lookup(client, registry, "VoterRegistry").await?,
            flare_systems_calculator: lookup(client, registry, "FlareSystemsCalculator").await?,
            flare_systems_manager: lookup(client, registry, "FlareSystemsManager").await?,
            relay: lookup(client, registry, "Relay").await?,
            submission: lookup(client, registry, "Submission").await?,
        };
        info!(
            relay = %contracts.relay,
            voter_registry = %contracts.voter_registry,
            submission = %contracts.submission,
            "resolved contract manifest"
        );
        Ok(contracts)
    }
}

async fn lookup(
    client: &RpcClient,
    registry: Address,
    name: &'static str,
) -> Result<Address, ManifestError> {
    let data = lookup_calldata(name);
    let result = client.call(registry, &data).await?;
    if result.len() < 32 {
        return Err(ManifestError::BadResponse(name));
    }
    let mut word = [0u8; 32];
    word.copy_from_slice(&result[..32]);
    let address = word_to_address(&word);
    if address == Address::ZERO {
        return Err(ManifestError::MissingContract(name));
    }
    Ok(address)
}

/// `getContractAddressByName(string)` calldata for `name`.
fn lookup_calldata(name: &str) -> Vec<u8> {
    let selector = &keccak256(b"getContractAddressByName(string)")[..4];

    let mut data = Vec::with_capacity(4 + 32 * 3 + name.len().div_ceil(32) * 32);
    data.extend_from_slice(selector);
    // Single dynamic argument: offset, length, right-padded bytes.
    data.extend_from_slice(&abi_u256(32));
    data.extend_from_slice(&abi_u256(name.len() as u64));
    data.extend_from_slice(name.as_bytes());
    let padding = name.len().div_ceil(32) * 32 - name.len();
    data.extend_from_slice(&vec![0u8; padding]);
    data
}

fn abi_u256(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn calldata_layout() {
        let data = lookup_calldata("Relay");
        assert_eq!(data.len(), 4 + 32 + 32 + 32);
        // offset word
        assert_eq!(data[4 + 31], 32);
        // length word
        assert_eq!(data[4 + 32 + 31], 5);
        // name bytes, right-padded
        assert_eq!(&data[4 + 64..4 + 64 + 5], b"Relay");
        assert!(data[4 + 64 + 5..].iter().all(|b| *b == 0));
    }

    #[test]
    fn registry_constant_renders_checksummed() {
        assert_eq!(
            FLARE_CONTRACT_REGISTRY.to_checksum_string(),
            "0xaD67FE66660Fb8dFE9d6b1b4240d8650e30F6019"
        );
    }

    #[test]
    fn monitored_sources_exclude_submission() {
        let contracts = Contracts {
            voter_registry: Address([1; 20]),
            flare_systems_calculator: Address([2; 20]),
            flare_systems_manager: Address([3; 20]),
            relay: Address([4; 20]),
            submission: Address([5; 20]),
        };
        let sources = contracts.monitored_log_sources();
        assert_eq!(sources.len(), 4);
        assert!(!sources.contains(&contracts.submission));
    }
}
