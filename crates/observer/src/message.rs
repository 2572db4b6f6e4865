//! Structured messages with contextual prefixes.

use serde::{Deserialize, Serialize};

use fsp_epoch::ChainId;
use fsp_types::{PROTOCOL_FDC, PROTOCOL_FTSO};

/// Severity of an observation, ordered.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum MessageLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl MessageLevel {
    /// Numeric value used by the generic webhook payload.
    pub fn value(&self) -> u8 {
        match self {
            MessageLevel::Debug => 10,
            MessageLevel::Info => 20,
            MessageLevel::Warning => 30,
            MessageLevel::Error => 40,
            MessageLevel::Critical => 50,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MessageLevel::Debug => "DEBUG",
            MessageLevel::Info => "INFO",
            MessageLevel::Warning => "WARNING",
            MessageLevel::Error => "ERROR",
            MessageLevel::Critical => "CRITICAL",
        }
    }
}

/// One rendered observation about the watched voter.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub level: MessageLevel,
    pub text: String,
}

impl Message {
    /// `"<LEVEL> <text>"`, the form the chat sinks post.
    pub fn rendered(&self) -> String {
        format!("{} {}", self.level.name(), self.text)
    }
}

/// Builds messages with a consistent `network: round: protocol:` prefix.
///
/// Call sites pre-bake a context once per round via [`MessageBuilder::copy`];
/// [`MessageBuilder::build`] never mutates the builder.
#[derive(Clone, Debug, Default)]
pub struct MessageBuilder {
    network: Option<ChainId>,
    round: Option<u32>,
    protocol: Option<u8>,
}

impl MessageBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn network(mut self, chain: ChainId) -> Self {
        self.network = Some(chain);
        self
    }

    pub fn round(mut self, voting_round_id: u32) -> Self {
        self.round = Some(voting_round_id);
        self
    }

    pub fn protocol(mut self, protocol_id: u8) -> Self {
        self.protocol = Some(protocol_id);
        self
    }

    /// An independent builder carrying the same context.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// Render `text` under the builder's context prefix.
    pub fn build(&self, level: MessageLevel, text: &str) -> Message {
        let mut prefix = String::new();
        if let Some(network) = self.network {
            prefix.push_str(&format!("network:{} ", network.name()));
        }
        if let Some(round) = self.round {
            prefix.push_str(&format!("round:{round} "));
        }
        if let Some(protocol) = self.protocol {
            let label = match protocol {
                PROTOCOL_FTSO => "ftso".to_string(),
                PROTOCOL_FDC => "fdc".to_string(),
                other => other.to_string(),
            };
            prefix.push_str(&format!("protocol:{label} "));
        }
        Message {
            level,
            text: format!("{prefix}{text}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prefix_includes_present_context_only() {
        let builder = MessageBuilder::new();
        assert_eq!(
            builder.build(MessageLevel::Info, "hello").text,
            "hello"
        );

        let builder = builder.network(ChainId::Songbird).round(42);
        assert_eq!(
            builder.build(MessageLevel::Info, "hello").text,
            "network:songbird round:42 hello"
        );

        let builder = builder.protocol(PROTOCOL_FDC);
        assert_eq!(
            builder.build(MessageLevel::Error, "hello").text,
            "network:songbird round:42 protocol:fdc hello"
        );
    }

    #[test]
    fn build_is_pure() {
        let builder = MessageBuilder::new().network(ChainId::Flare).round(7);
        let first = builder.build(MessageLevel::Warning, "same");
        let second = builder.build(MessageLevel::Warning, "same");
        assert_eq!(first, second);
    }

    #[test]
    fn copy_is_independent() {
        let base = MessageBuilder::new().network(ChainId::Coston);
        let derived = base.copy().protocol(PROTOCOL_FTSO);

        assert_eq!(base.build(MessageLevel::Info, "m").text, "network:coston m");
        assert_eq!(
            derived.build(MessageLevel::Info, "m").text,
            "network:coston protocol:ftso m"
        );
    }

    #[test]
    fn rendered_prepends_level_name() {
        let message = MessageBuilder::new().build(MessageLevel::Critical, "boom");
        assert_eq!(message.rendered(), "CRITICAL boom");
        assert_eq!(message.level.value(), 50);
    }
}
