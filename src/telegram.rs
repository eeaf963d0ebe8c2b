//! Minimal Telegram Bot API client: just enough to poll for messages and send
//! replies and alerts.

use anyhow::{Context as _, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tokio::time::Duration;

use crate::alert::{ChatId, Notifier};

const DEFAULT_API_URL: &str = "https://api.telegram.org";

/// Escapes user-supplied text for the legacy `Markdown` parse mode used by
/// [`TelegramClient::send_message`].
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '_' | '*' | '`' | '[') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,

    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,

    pub chat: Chat,

    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,

    #[serde(rename = "type")]
    pub kind: ChatKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatKind {
    Private,
    Group,
    Supergroup,
    Channel,
}

impl ChatKind {
    pub fn is_group(&self) -> bool {
        matches!(self, ChatKind::Group | ChatKind::Supergroup)
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,

    result: Option<T>,

    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: ChatId,
    text: &'a str,
    parse_mode: &'static str,
}

#[derive(Debug, Serialize)]
struct GetUpdatesRequest {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: Client,
    base_url: String,
}

impl TelegramClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_api_url(DEFAULT_API_URL, token)
    }

    pub fn with_api_url(api_url: &str, token: &str) -> Result<Self> {
        if token.is_empty() {
            bail!("bot token is empty");
        }

        let http = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{token}", api_url.trim_end_matches('/')),
        })
    }

    pub async fn send_message(&self, chat_id: ChatId, text: &str) -> Result<()> {
        let _: Message = self
            .call(
                "sendMessage",
                &SendMessageRequest {
                    chat_id,
                    text,
                    parse_mode: "Markdown",
                },
            )
            .await
            .with_context(|| format!("failed to send message to {chat_id}"))?;

        Ok(())
    }

    /// Long-polls for updates newer than `offset`.
    pub async fn get_updates(&self, offset: i64, timeout: Duration) -> Result<Vec<Update>> {
        self.call(
            "getUpdates",
            &GetUpdatesRequest {
                offset,
                timeout: timeout.as_secs(),
                allowed_updates: ["message"],
            },
        )
        .await
        .context("failed to get updates")
    }

    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        // The token is part of the URL, so request errors are logged without it.
        let response = self
            .http
            .post(format!("{}/{method}", self.base_url))
            .json(body)
            .send()
            .await
            .map_err(|err| anyhow!("{method} request failed: {}", err.without_url()))?;

        let status = response.status();
        let response: ApiResponse<T> = response
            .json()
            .await
            .map_err(|err| anyhow!("failed to decode {method} response ({status}): {}", err.without_url()))?;

        if !response.ok {
            bail!(
                "{method} rejected ({status}): {}",
                response.description.as_deref().unwrap_or("no description")
            );
        }

        response
            .result
            .ok_or_else(|| anyhow!("{method} response has no result"))
    }
}

#[async_trait]
impl Notifier for TelegramClient {
    async fn notify(&self, recipient: ChatId, text: &str) -> Result<()> {
        self.send_message(recipient, text).await
    }
}
