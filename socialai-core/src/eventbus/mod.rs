//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus from the orchestrator to presentation
//! collaborators (UI, socket bridge, loggers). Each subscriber gets its own
//! unbounded queue so publishing never waits on a slow renderer.

use std::sync::{Arc, Mutex};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use socialai_common::models::{Account, ActivityEntry, FeatureId};

/// Everything a presentation layer may want to mirror.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrchestratorEvent {
    /// A new line was appended to the activity log.
    Activity(ActivityEntry),

    /// An account moved to a new connection state.
    AccountChanged(Account),

    /// A feature flag actually changed value.
    FeatureChanged { feature: FeatureId, enabled: bool },

    /// Non-fatal warning or informational notice (unknown feature ids,
    /// failed settings writes, ...).
    Notice { message: String },
}

impl OrchestratorEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrchestratorEvent::Activity(_) => "activity",
            OrchestratorEvent::AccountChanged(_) => "account_changed",
            OrchestratorEvent::FeatureChanged { .. } => "feature_changed",
            OrchestratorEvent::Notice { .. } => "notice",
        }
    }
}

#[derive(Clone)]
pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::UnboundedSender<OrchestratorEvent>>>>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    pub shutdown_rx: watch::Receiver<bool>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: Arc::new(tx),
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
        if let Ok(mut subs) = self.subscribers.lock() {
            // dropping the senders ends every subscriber stream
            subs.clear();
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which every subsequent event is delivered.
    pub fn subscribe(&self) -> mpsc::UnboundedReceiver<OrchestratorEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        if !self.is_shutdown() {
            if let Ok(mut subs) = self.subscribers.lock() {
                subs.push(tx);
            }
        }
        rx
    }

    /// Publish an event to all subscribers, dropping the ones that went away.
    pub fn publish(&self, event: OrchestratorEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            return;
        };
        subs.retain(|s| s.send(event.clone()).is_ok());
    }

    pub fn notice(&self, text: impl Into<String>) {
        self.publish(OrchestratorEvent::Notice { message: text.into() });
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();

        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.notice("hello");

        let evt1 = rx1.recv().await.expect("rx1 should get event");
        let evt2 = rx2.recv().await.expect("rx2 should get event");

        match evt1 {
            OrchestratorEvent::Notice { message } => assert_eq!(message, "hello"),
            _ => panic!("rx1 got the wrong event type"),
        }
        match evt2 {
            OrchestratorEvent::Notice { message } => assert_eq!(message, "hello"),
            _ => panic!("rx2 got the wrong event type"),
        }
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_pruned() {
        let bus = EventBus::new();
        let rx = bus.subscribe();
        let _keep = bus.subscribe();
        drop(rx);

        bus.notice("ping");
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[tokio::test]
    async fn test_publish_does_not_wait_for_readers() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        for i in 0..1000 {
            bus.notice(format!("msg{}", i));
        }

        let first = rx.recv().await.unwrap();
        if let OrchestratorEvent::Notice { message } = first {
            assert_eq!(message, "msg0");
        } else {
            panic!("first message mismatch");
        }
    }

    #[tokio::test]
    async fn test_shutdown_closes_streams() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        bus.shutdown();
        assert!(bus.is_shutdown());
        assert!(rx.recv().await.is_none());
    }
}
