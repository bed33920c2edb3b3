//! Delivery channels for notification text.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors a channel reports when a message could not be delivered.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// The request never got a response.
    #[error("Channel request failed: {0}")]
    Request(String),

    /// The remote side answered and refused the message.
    #[error("Channel rejected message ({status}): {description}")]
    Rejected { status: u16, description: String },

    /// The channel is switched off or misconfigured.
    #[error("Channel unavailable: {0}")]
    Unavailable(String),
}

/// Somewhere a human-readable message can be sent.
#[async_trait]
pub trait MessagingChannel: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    async fn send(&self, text: &str) -> Result<(), ChannelError>;
}

#[derive(Debug, Default)]
struct InMemoryChannelState {
    sent: Vec<String>,
    fail_on_send: bool,
}

/// Keeps sent messages in memory for inspection in tests.
#[derive(Debug, Clone, Default)]
pub struct InMemoryChannel {
    state: Arc<RwLock<InMemoryChannelState>>,
}

impl InMemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every message sent so far, oldest first.
    pub async fn sent(&self) -> Vec<String> {
        self.state.read().await.sent.clone()
    }

    /// Makes subsequent sends fail.
    pub async fn set_fail_on_send(&self, fail: bool) {
        self.state.write().await.fail_on_send = fail;
    }
}

#[async_trait]
impl MessagingChannel for InMemoryChannel {
    fn name(&self) -> &'static str {
        "in-memory"
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        let mut state = self.state.write().await;
        if state.fail_on_send {
            return Err(ChannelError::Unavailable("send refused".to_string()));
        }
        state.sent.push(text.to_string());
        Ok(())
    }
}

/// Writes notifications to the log. Used when no bot is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl MessagingChannel for LogChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        tracing::info!(channel = "log", %text, "notification");
        Ok(())
    }
}

const TELEGRAM_API_URL: &str = "https://api.telegram.org";
const TELEGRAM_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Sends notifications to a Telegram chat through the Bot API.
#[derive(Clone)]
pub struct TelegramChannel {
    base_url: String,
    token: String,
    chat_id: String,
    client: reqwest::Client,
}

impl TelegramChannel {
    /// Creates a channel for the given bot token and chat.
    pub fn new(token: impl Into<String>, chat_id: impl Into<String>) -> Result<Self, ChannelError> {
        Self::with_base_url(TELEGRAM_API_URL, token, chat_id)
    }

    /// Creates a channel against a different Bot API host.
    pub fn with_base_url(
        base_url: impl Into<String>,
        token: impl Into<String>,
        chat_id: impl Into<String>,
    ) -> Result<Self, ChannelError> {
        let client = reqwest::Client::builder()
            .timeout(TELEGRAM_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ChannelError::Unavailable(format!("http client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            token: token.into(),
            chat_id: chat_id.into(),
            client,
        })
    }

    fn send_message_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url.trim_end_matches('/'),
            self.token
        )
    }
}

impl std::fmt::Debug for TelegramChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramChannel")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl MessagingChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<(), ChannelError> {
        let response = self
            .client
            .post(self.send_message_url())
            .json(&SendMessageRequest {
                chat_id: &self.chat_id,
                text,
            })
            .send()
            .await
            // Strip the URL: it embeds the bot token.
            .map_err(|e| ChannelError::Request(e.without_url().to_string()))?;

        let status = response.status();
        let body: Option<TelegramResponse> = response.json().await.ok();

        match body {
            Some(TelegramResponse { ok: true, .. }) if status.is_success() => Ok(()),
            Some(TelegramResponse { description, .. }) => Err(ChannelError::Rejected {
                status: status.as_u16(),
                description: description.unwrap_or_else(|| "no description".to_string()),
            }),
            None => Err(ChannelError::Rejected {
                status: status.as_u16(),
                description: "unreadable response".to_string(),
            }),
        }
    }
}
