//! A stand-in transport that pretends to talk to the providers.

use std::time::Duration;
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use tracing::info;
use socialai_common::Error;
use socialai_common::error::ConnectError;
use socialai_common::models::{Platform, RecoveredMessage};
use socialai_common::traits::AccountTransport;

pub struct SimulatedTransport {
    link_delay: Duration,
    scan_delay: Duration,
}

impl Default for SimulatedTransport {
    fn default() -> Self {
        Self {
            link_delay: Duration::from_millis(1500),
            scan_delay: Duration::from_secs(2),
        }
    }
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero delays, for tests.
    pub fn instant() -> Self {
        Self { link_delay: Duration::ZERO, scan_delay: Duration::ZERO }
    }

    fn sample_recovered() -> Vec<RecoveredMessage> {
        let at = |y, mo, d, h, mi| {
            Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).single().unwrap_or_default()
        };
        vec![
            RecoveredMessage {
                from: "John".into(),
                message: "Hey, are we still meeting tomorrow?".into(),
                timestamp: at(2025, 3, 15, 10, 30),
            },
            RecoveredMessage {
                from: "Group: Friends".into(),
                message: "Alice: The party starts at 8pm".into(),
                timestamp: at(2025, 3, 14, 19, 45),
            },
        ]
    }
}

#[async_trait]
impl AccountTransport for SimulatedTransport {
    async fn initiate_link(&self, platform: Platform) -> Result<(), ConnectError> {
        info!("[{}] waiting for the provider to confirm the link", platform);
        tokio::time::sleep(self.link_delay).await;
        Ok(())
    }

    async fn release_link(&self, platform: Platform) -> Result<(), Error> {
        info!("[{}] link released", platform);
        Ok(())
    }

    async fn send(&self, platform: Platform, target: &str, text: &str) -> Result<(), Error> {
        info!("[{}] -> {}: {}", platform, target, text);
        Ok(())
    }

    async fn recover_deleted_messages(&self, platform: Platform) -> Result<Vec<RecoveredMessage>, Error> {
        if platform != Platform::WhatsApp {
            return Ok(Vec::new());
        }
        tokio::time::sleep(self.scan_delay).await;
        Ok(Self::sample_recovered())
    }
}
