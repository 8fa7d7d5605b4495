// socialai-core/src/tasks/status_viewer.rs

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use socialai_common::models::{InboundEvent, Platform};
use crate::services::lanes::LaneRouter;

/// Spawns a background task that periodically queues a `StatusTick` on the
/// platform's lane until `token` is cancelled. The first tick fires one full
/// `interval` after spawning.
pub fn spawn_status_ticker(
    platform: Platform,
    interval: Duration,
    lanes: LaneRouter,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!("[{}] auto status viewing started (every {:?})", platform, interval);
        let mut ticker = interval_at(Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = lanes.submit(InboundEvent::StatusTick { platform }) {
                        debug!("[{}] status ticker stopping: {}", platform, e);
                        break;
                    }
                }
            }
        }
        info!("[{}] auto status viewing stopped", platform);
    })
}
