// File: socialai-core/src/test_utils/helpers.rs

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use socialai_common::Error;
use socialai_common::error::ConnectError;
use socialai_common::models::{Platform, RecoveredMessage};
use socialai_common::traits::{AccountTransport, Clock};

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Default for FixedClock {
    fn default() -> Self {
        Self(Utc.with_ymd_and_hms(2025, 3, 15, 10, 30, 0).single().unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub platform: Platform,
    pub target: String,
    pub text: String,
}

#[derive(Default)]
struct FakeState {
    link_calls: HashMap<Platform, usize>,
    link_failures: HashMap<Platform, Vec<ConnectError>>,
    link_panics: HashSet<Platform>,
    released: Vec<Platform>,
    sent: Vec<SentMessage>,
    fail_sends: bool,
    recovered: Vec<RecoveredMessage>,
    recovery_calls: usize,
}

/// Scriptable transport that records every call.
#[derive(Default)]
pub struct FakeTransport {
    state: Mutex<FakeState>,
    link_delay: Duration,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `initiate_link` sleeps this long (tokio time) before resolving.
    pub fn with_link_delay(mut self, delay: Duration) -> Self {
        self.link_delay = delay;
        self
    }

    pub fn with_recovered(self, messages: Vec<RecoveredMessage>) -> Self {
        self.lock().recovered = messages;
        self
    }

    /// The next link attempt for `platform` fails with `err`.
    pub fn fail_next_link(&self, platform: Platform, err: ConnectError) {
        self.lock().link_failures.entry(platform).or_default().push(err);
    }

    /// The next link attempt for `platform` panics inside the transport.
    pub fn panic_next_link(&self, platform: Platform) {
        self.lock().link_panics.insert(platform);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn link_calls(&self, platform: Platform) -> usize {
        self.lock().link_calls.get(&platform).copied().unwrap_or(0)
    }

    pub fn released(&self) -> Vec<Platform> {
        self.lock().released.clone()
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.lock().sent.clone()
    }

    pub fn recovery_calls(&self) -> usize {
        self.lock().recovery_calls
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AccountTransport for FakeTransport {
    async fn initiate_link(&self, platform: Platform) -> Result<(), ConnectError> {
        let (failure, crash) = {
            let mut state = self.lock();
            *state.link_calls.entry(platform).or_default() += 1;
            let crash = state.link_panics.remove(&platform);
            let failure = state.link_failures.get_mut(&platform).and_then(|queue| {
                if queue.is_empty() { None } else { Some(queue.remove(0)) }
            });
            (failure, crash)
        };
        if crash {
            panic!("{} link provider crashed", platform);
        }
        if !self.link_delay.is_zero() {
            tokio::time::sleep(self.link_delay).await;
        }
        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    async fn release_link(&self, platform: Platform) -> Result<(), Error> {
        self.lock().released.push(platform);
        Ok(())
    }

    async fn send(&self, platform: Platform, target: &str, text: &str) -> Result<(), Error> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(Error::Transport(format!("{} send to {} refused", platform, target)));
        }
        state.sent.push(SentMessage {
            platform,
            target: target.to_string(),
            text: text.to_string(),
        });
        Ok(())
    }

    async fn recover_deleted_messages(&self, _platform: Platform) -> Result<Vec<RecoveredMessage>, Error> {
        let mut state = self.lock();
        state.recovery_calls += 1;
        Ok(state.recovered.clone())
    }
}
