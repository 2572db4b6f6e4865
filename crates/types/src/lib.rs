//! Shared domain types for the Flare systems-protocol observer.

pub mod address;
pub mod entity;
pub mod events;
pub mod payload;
pub mod tx;
pub mod word;

pub use address::{Address, AddressError};
pub use entity::{Entity, NodeId};
pub use events::{
    ProtocolMessageRelayed, RandomAcquisitionStarted, SigningPolicyInitialized, SystemsEvent,
    VotePowerBlockSelected, VoterRegistered, VoterRegistrationInfo, VoterRemoved,
};
pub use payload::{
    EcdsaSignature, FdcSubmit1, FdcSubmit2, FtsoSubmit1, FtsoSubmit2, ParsedPayload,
    SignedMessage, SubmitSignatures,
};
pub use tx::WTxData;
pub use word::Word;

/// Protocol id of the price-feed protocol.
pub const PROTOCOL_FTSO: u8 = 100;
/// Protocol id of the data-connector protocol.
pub const PROTOCOL_FDC: u8 = 200;
