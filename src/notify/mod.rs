//! 📱 Notification channels
//!
//! Delivery is best-effort: a failed send is logged and never changes the
//! outcome of a run.

pub mod line;
pub mod log_channel;
pub mod telegram;

use async_trait::async_trait;
use log::{info, warn};
use thiserror::Error;

use crate::config::{NotificationConfig, NotificationKind};

pub use line::LineClient;
pub use log_channel::LogChannel;
pub use telegram::TelegramClient;

#[derive(Error, Debug)]
pub enum NotifyError {
    #[error("{channel} delivery failed: {reason}")]
    DeliveryFailed { channel: String, reason: String },
}

impl NotifyError {
    pub fn delivery(channel: &str, reason: impl ToString) -> Self {
        NotifyError::DeliveryFailed {
            channel: channel.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Push-message sink
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    fn name(&self) -> &str;

    async fn send(&self, text: &str) -> Result<(), NotifyError>;
}

/// Send and swallow failures; returns whether the message went out
pub async fn deliver(channel: &dyn NotificationChannel, text: &str) -> bool {
    match channel.send(text).await {
        Ok(()) => {
            info!("📱 Notification sent via {}", channel.name());
            true
        }
        Err(e) => {
            warn!("⚠️  {}", e);
            false
        }
    }
}

/// Build the configured channel, degrading to the log channel without credentials
pub fn channel_from_config(
    config: &NotificationConfig,
) -> reqwest::Result<Box<dyn NotificationChannel>> {
    if !config.has_credentials() {
        warn!("⚠️  {:?} credentials missing - notifications will only be logged", config.channel);
        return Ok(Box::new(LogChannel));
    }

    Ok(match config.channel {
        NotificationKind::Line => Box::new(LineClient::new(
            config.line_token.clone(),
            config.line_user_id.clone(),
            config.timeout_secs,
        )?),
        NotificationKind::Telegram => Box::new(TelegramClient::new(
            config.telegram_bot_token.clone(),
            config.telegram_chat_id.clone(),
            config.timeout_secs,
        )?),
        NotificationKind::Log => Box::new(LogChannel),
    })
}
