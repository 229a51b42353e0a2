//! Telegram Bot API transport.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::{AppError, Result};
use crate::models::{Item, NotifierConfig, SourceConfig};

use super::{Message, Notifier, Renderer};

const API_BASE: &str = "https://api.telegram.org";
const TOKEN_VAR: &str = "TELEGRAM_BOT_TOKEN";
const CHAT_VAR: &str = "TELEGRAM_CHAT_ID";

/// Sends messages through `sendMessage` with HTML parse mode.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
    renderer: Renderer,
    config: NotifierConfig,
}

impl TelegramNotifier {
    /// Build from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    ///
    /// Missing credentials are a configuration error: no source should be
    /// processed when nothing can be delivered.
    pub fn from_env(client: Client, renderer: Renderer, config: NotifierConfig) -> Result<Self> {
        Self::from_credentials(
            std::env::var(TOKEN_VAR).ok(),
            std::env::var(CHAT_VAR).ok(),
            client,
            renderer,
            config,
        )
    }

    fn from_credentials(
        token: Option<String>,
        chat_id: Option<String>,
        client: Client,
        renderer: Renderer,
        config: NotifierConfig,
    ) -> Result<Self> {
        let token = required(token, TOKEN_VAR)?;
        let chat_id = required(chat_id, CHAT_VAR)?;
        Ok(Self {
            client,
            token,
            chat_id,
            renderer,
            config,
        })
    }

    fn payload(&self, message: &Message, topic: Option<&str>) -> Value {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": message.text,
            "parse_mode": "HTML",
        });
        if let Some(topic) = topic {
            // Thread ids are integers; keep anything else verbatim.
            payload["message_thread_id"] = topic
                .parse::<i64>()
                .map(Value::from)
                .unwrap_or_else(|_| Value::from(topic));
        }
        if let Some(url) = &message.preview_url {
            payload["link_preview_options"] = json!({ "url": url });
        }
        payload
    }

    async fn send(&self, payload: &Value) -> Result<()> {
        let url = format!("{API_BASE}/bot{}/sendMessage", self.token);
        let response = self.client.post(&url).json(payload).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::delivery(format!("HTTP {status}: {body}")));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, item: &Item, source: &SourceConfig) -> bool {
        let message = self.renderer.render(item, source);
        let topic = self.config.topic_for(source);
        let payload = self.payload(&message, topic.as_deref());

        match self.send(&payload).await {
            Ok(()) => true,
            Err(e) => {
                log::error!("[{}] Telegram delivery failed: {}", source.name, e);
                false
            }
        }
    }
}

fn required(value: Option<String>, var: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::config(format!("{var} is not set")))
}
