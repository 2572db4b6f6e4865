//! Contract-facing layer: event decoding, manifest resolution and
//! submission calldata parsing.
//!
//! Topic hashes and function selectors are derived from the canonical
//! signature strings at startup; nothing is hardcoded.

pub mod abi;
pub mod events;
pub mod manifest;
pub mod submission;

pub use abi::AbiError;
pub use events::{decode_event, EventTopics};
pub use manifest::{Contracts, ManifestError, FLARE_CONTRACT_REGISTRY};
pub use submission::{
    parse_submit1, parse_submit2, parse_submit_signatures, ParseError, SubmissionSelectors,
    SubmitTx,
};
