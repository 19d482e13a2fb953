//! LINE Messaging API push client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{NotificationChannel, NotifyError};

const PUSH_ENDPOINT: &str = "https://api.line.me/v2/bot/message/push";

pub struct LineClient {
    client: Client,
    channel_token: String,
    user_id: String,
}

impl LineClient {
    pub fn new(channel_token: String, user_id: String, timeout_secs: u64) -> reqwest::Result<Self> {
        Ok(Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .build()?,
            channel_token,
            user_id,
        })
    }

    fn payload(&self, text: &str) -> Value {
        json!({
            "to": self.user_id,
            "messages": [{ "type": "text", "text": text }],
        })
    }
}

#[async_trait]
impl NotificationChannel for LineClient {
    fn name(&self) -> &str {
        "line"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(PUSH_ENDPOINT)
            .bearer_auth(&self.channel_token)
            .json(&self.payload(text))
            .send()
            .await
            .map_err(|e| NotifyError::delivery(self.name(), e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::delivery(
                self.name(),
                format!("LINE API error {}: {}", status, error_text),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_payload() {
        let client = LineClient::new("token".to_string(), "U1234".to_string(), 10).unwrap();
        let payload = client.payload("Risk level: 🟢 Lv.0");

        assert_eq!(payload["to"], "U1234");
        assert_eq!(payload["messages"][0]["type"], "text");
        assert_eq!(payload["messages"][0]["text"], "Risk level: 🟢 Lv.0");
    }
}
