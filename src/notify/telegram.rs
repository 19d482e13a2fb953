//! 📱 Telegram Notification Client
//!
//! Sends the daily risk report to a configured Telegram chat.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use super::{NotificationChannel, NotifyError};

/// Telegram client for sending risk notifications
pub struct TelegramClient {
    client: Client,
    bot_token: String,
    chat_id: String,
}

impl TelegramClient {
    /// Create a new Telegram client from config
    pub fn new(bot_token: String, chat_id: String, timeout_secs: u64) -> reqwest::Result<Self> {
        Ok(TelegramClient {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            bot_token,
            chat_id,
        })
    }
}

#[async_trait]
impl NotificationChannel for TelegramClient {
    fn name(&self) -> &str {
        "telegram"
    }

    /// Send a plain text message to Telegram
    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);

        // Plain text: reasons may contain characters HTML mode would reject
        let payload = json!({
            "chat_id": self.chat_id,
            "text": text,
        });

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::delivery(self.name(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::delivery(
                self.name(),
                format!("Telegram API error {}: {}", status, error_text),
            ));
        }

        Ok(())
    }
}
