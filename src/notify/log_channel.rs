//! Channel that only writes to the log; used when no push credentials are set.

use async_trait::async_trait;
use log::info;

use super::{NotificationChannel, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogChannel;

#[async_trait]
impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        "log"
    }

    async fn send(&self, text: &str) -> Result<(), NotifyError> {
        info!("📱 Notification:\n{}", text);
        Ok(())
    }
}
