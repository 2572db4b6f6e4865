//! Round-state reconstruction and per-round validation for one voter on a
//! Flare-family network.
//!
//! The observer rebuilds what the watched identity did in every voting
//! round from blocks, logs and transactions, and emits structured alerts
//! when expected behaviour is missing, late, inconsistent or signed by the
//! wrong key.

pub mod message;
pub mod metrics;
pub mod notification;
pub mod observer;
pub mod policy;
pub mod rounds;
pub mod validate;

pub use message::{Message, MessageBuilder, MessageLevel};
pub use notification::{NotificationSettings, Notifier, TelegramSettings};
pub use observer::Observer;
pub use policy::{EntityMapper, PolicyError, SigningPolicy, SigningPolicyBuilder};
pub use rounds::{ReorgDetected, SubmissionRecord, VotingRound, VotingRoundStore};
pub use validate::validate_round;
