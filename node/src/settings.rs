use config::Config;

use fsp_observer::notification::{NotificationSettings, TelegramSettings};
use fsp_types::Address;

/// Fatal configuration problems; the process exits non-zero on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    MissingVar(&'static str),
    #[error("IDENTITY_ADDRESS is not a valid address: {0}")]
    InvalidIdentity(#[from] fsp_types::AddressError),
    #[error("{0} must be a positive integer")]
    InvalidNumber(&'static str),
    #[error("NOTIFICATION_TELEGRAM_BOT_TOKEN and NOTIFICATION_TELEGRAM_CHAT_ID must be set together")]
    TelegramIncomplete,
    #[error("configuration source error: {0}")]
    Source(#[from] config::ConfigError),
}

/// Application configuration, loaded from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub rpc_url: String,
    pub identity_address: Address,
    pub avg_block_time: u64,
    pub metrics_port: u16,
    pub log_level: String,
    pub notifications: NotificationSettings,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let source = Config::builder()
            .add_source(config::Environment::default())
            .build()?;
        Self::from_source(&source)
    }

    fn from_source(source: &Config) -> Result<Self, ConfigError> {
        let get = |key: &str| source.get_string(key).ok();

        let rpc_url = get("RPC_URL").ok_or(ConfigError::MissingVar("RPC_URL"))?;
        let identity_address = get("IDENTITY_ADDRESS")
            .ok_or(ConfigError::MissingVar("IDENTITY_ADDRESS"))?
            .parse()?;

        let avg_block_time = match get("AVG_BLOCK_TIME") {
            Some(raw) => raw
                .parse::<u64>()
                .ok()
                .filter(|v| *v > 0)
                .ok_or(ConfigError::InvalidNumber("AVG_BLOCK_TIME"))?,
            None => 1,
        };
        let metrics_port = match get("METRICS_PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidNumber("METRICS_PORT"))?,
            None => 8_000,
        };

        let telegram = match (
            get("NOTIFICATION_TELEGRAM_BOT_TOKEN"),
            get("NOTIFICATION_TELEGRAM_CHAT_ID"),
        ) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramSettings { bot_token, chat_id }),
            (None, None) => None,
            _ => return Err(ConfigError::TelegramIncomplete),
        };

        Ok(Self {
            rpc_url,
            identity_address,
            avg_block_time,
            metrics_port,
            log_level: get("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            notifications: NotificationSettings {
                discord_webhook: get("NOTIFICATION_DISCORD_WEBHOOK"),
                slack_webhook: get("NOTIFICATION_SLACK_WEBHOOK"),
                telegram,
                generic_webhook: get("NOTIFICATION_GENERIC_WEBHOOK"),
            },
        })
    }
}
