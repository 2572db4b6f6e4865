//! Best-effort message fan-out to chat and webhook sinks.
//!
//! Sinks hold no state shared with the loop and receive already-rendered
//! messages; delivery failures are logged and swallowed.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use crate::message::Message;

/// Optional sink endpoints, straight from the environment.
#[derive(Clone, Debug, Default)]
pub struct NotificationSettings {
    pub discord_webhook: Option<String>,
    pub slack_webhook: Option<String>,
    pub telegram: Option<TelegramSettings>,
    pub generic_webhook: Option<String>,
}

#[derive(Clone, Debug)]
pub struct TelegramSettings {
    pub bot_token: String,
    pub chat_id: String,
}

#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn send(&self, message: &Message);
}

async fn post(http: &reqwest::Client, sink: &str, url: &str, body: serde_json::Value) {
    if let Err(err) = http.post(url).json(&body).send().await {
        debug!(sink, "notification delivery failed: {err}");
    }
}

struct DiscordSink {
    http: reqwest::Client,
    webhook_url: String,
}

#[async_trait]
impl NotificationSink for DiscordSink {
    async fn send(&self, message: &Message) {
        let body = json!({ "content": message.rendered() });
        post(&self.http, "discord", &self.webhook_url, body).await;
    }
}

struct SlackSink {
    http: reqwest::Client,
    webhook_url: String,
}

#[async_trait]
impl NotificationSink for SlackSink {
    async fn send(&self, message: &Message) {
        let body = json!({ "text": message.rendered() });
        post(&self.http, "slack", &self.webhook_url, body).await;
    }
}

struct TelegramSink {
    http: reqwest::Client,
    url: String,
    chat_id: String,
}

#[async_trait]
impl NotificationSink for TelegramSink {
    async fn send(&self, message: &Message) {
        let body = json!({ "chat_id": self.chat_id, "text": message.rendered() });
        post(&self.http, "telegram", &self.url, body).await;
    }
}

struct GenericSink {
    http: reqwest::Client,
    webhook_url: String,
}

#[async_trait]
impl NotificationSink for GenericSink {
    async fn send(&self, message: &Message) {
        let body = json!({
            "level": message.level.value(),
            "message": message.text,
        });
        post(&self.http, "generic", &self.webhook_url, body).await;
    }
}

/// Fans one message out to every configured sink, fire-and-forget.
#[derive(Clone, Default)]
pub struct Notifier {
    sinks: Arc<Vec<Box<dyn NotificationSink>>>,
}

impl Notifier {
    pub fn from_settings(settings: &NotificationSettings) -> Self {
        let http = reqwest::Client::new();
        let mut sinks: Vec<Box<dyn NotificationSink>> = Vec::new();

        if let Some(webhook_url) = settings.discord_webhook.clone() {
            sinks.push(Box::new(DiscordSink {
                http: http.clone(),
                webhook_url,
            }));
        }
        if let Some(webhook_url) = settings.slack_webhook.clone() {
            sinks.push(Box::new(SlackSink {
                http: http.clone(),
                webhook_url,
            }));
        }
        if let Some(telegram) = settings.telegram.clone() {
            sinks.push(Box::new(TelegramSink {
                http: http.clone(),
                url: format!(
                    "https://api.telegram.org/bot{}/sendMessage",
                    telegram.bot_token
                ),
                chat_id: telegram.chat_id,
            }));
        }
        if let Some(webhook_url) = settings.generic_webhook.clone() {
            sinks.push(Box::new(GenericSink {
                http,
                webhook_url,
            }));
        }

        Self {
            sinks: Arc::new(sinks),
        }
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }

    /// Dispatch without waiting; each sink runs on its own task.
    pub fn dispatch(&self, message: &Message) {
        if self.sinks.is_empty() {
            return;
        }
        let sinks = Arc::clone(&self.sinks);
        let message = message.clone();
        tokio::spawn(async move {
            for sink in sinks.iter() {
                sink.send(&message).await;
            }
        });
    }
}
