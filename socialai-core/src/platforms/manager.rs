// File: src/platforms/manager.rs

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinError;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use socialai_common::error::ConnectError;
use socialai_common::models::{Account, AccountState, Platform};
use socialai_common::traits::AccountTransport;
use crate::eventbus::{EventBus, OrchestratorEvent};
use crate::platforms::AccountListener;
use crate::services::activity_log::ActivityLog;

type Outcome = Option<Result<Account, ConnectError>>;

struct AccountSlot {
    account: Account,
    /// Present while a connect attempt is running; later callers wait on it.
    in_flight: Option<watch::Receiver<Outcome>>,
}

struct ManagerInner {
    accounts: Mutex<BTreeMap<Platform, AccountSlot>>,
    /// Serialises "state edge + listener notification" so ready/lost
    /// notifications can never be observed out of order.
    transitions: tokio::sync::Mutex<()>,
    transport: Arc<dyn AccountTransport>,
    listener: Arc<dyn AccountListener>,
    activity: Arc<ActivityLog>,
    event_bus: EventBus,
    connect_timeout: Duration,
}

/// ConnectionManager owns one `Account` per platform and drives its
/// Disconnected → Connecting → Connected/Failed lifecycle.
#[derive(Clone)]
pub struct ConnectionManager {
    inner: Arc<ManagerInner>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn AccountTransport>,
        listener: Arc<dyn AccountListener>,
        activity: Arc<ActivityLog>,
        event_bus: EventBus,
        connect_timeout: Duration,
    ) -> Self {
        let accounts = Platform::ALL
            .into_iter()
            .map(|p| (p, AccountSlot { account: Account::new(p), in_flight: None }))
            .collect();
        Self {
            inner: Arc::new(ManagerInner {
                accounts: Mutex::new(accounts),
                transitions: tokio::sync::Mutex::new(()),
                transport,
                listener,
                activity,
                event_bus,
                connect_timeout,
            }),
        }
    }

    pub fn account(&self, platform: Platform) -> Account {
        self.inner
            .lock()
            .get(&platform)
            .map(|slot| slot.account)
            .unwrap_or_else(|| Account::new(platform))
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.inner.lock().values().map(|slot| slot.account).collect()
    }

    /// Links the account.
    ///
    /// Valid from Disconnected or Failed. While an attempt is in flight every
    /// further call awaits that same attempt instead of starting another one.
    pub async fn connect(&self, platform: Platform) -> Result<Account, ConnectError> {
        let mut outcome_rx = {
            let mut accounts = self.inner.lock();
            let slot = accounts
                .entry(platform)
                .or_insert_with(|| AccountSlot { account: Account::new(platform), in_flight: None });

            if slot.account.state.can_connect() {
                let (tx, rx) = watch::channel(None);
                slot.account.state = AccountState::Connecting;
                slot.in_flight = Some(rx.clone());
                self.inner
                    .event_bus
                    .publish(OrchestratorEvent::AccountChanged(slot.account));
                info!("[{}] Connecting...", platform);

                // The attempt runs in its own task, watched by a supervisor:
                // a dropped caller or a panicking transport still ends in
                // Connected or Failed, never in Connecting.
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let attempt = tokio::spawn({
                        let inner = Arc::clone(&inner);
                        async move { inner.run_attempt(platform).await }
                    });
                    let result = match attempt.await {
                        Ok(result) => result,
                        Err(e) => inner.abandon_attempt(platform, e).await,
                    };
                    let _ = tx.send(Some(result));
                });
                rx
            } else if slot.account.state == AccountState::Connecting {
                match &slot.in_flight {
                    Some(rx) => {
                        debug!("[{}] joining in-flight connect attempt", platform);
                        rx.clone()
                    }
                    None => return Err(ConnectError::AlreadyConnecting),
                }
            } else {
                return Err(ConnectError::AlreadyConnected);
            }
        };

        let outcome = match outcome_rx.wait_for(|o| o.is_some()).await {
            Ok(outcome) => outcome.clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(ConnectError::Rejected("connection attempt aborted".into())))
    }

    /// Unlinks a Connected account. No-op in every other state.
    pub async fn disconnect(&self, platform: Platform) {
        {
            let _edge = self.inner.transitions.lock().await;
            let changed = {
                let mut accounts = self.inner.lock();
                match accounts.get_mut(&platform) {
                    Some(slot) if slot.account.state == AccountState::Connected => {
                        slot.account.state = AccountState::Disconnected;
                        self.inner
                            .event_bus
                            .publish(OrchestratorEvent::AccountChanged(slot.account));
                        true
                    }
                    Some(slot) => {
                        debug!("[{}] disconnect ignored in state {}", platform, slot.account.state);
                        false
                    }
                    None => false,
                }
            };
            if !changed {
                return;
            }

            info!("[{}] Disconnected.", platform);
            self.inner.activity.system(format!("Disconnected from {}", platform));
            self.inner.listener.on_account_lost(platform).await;
        }

        if let Err(e) = self.inner.transport.release_link(platform).await {
            warn!("[{}] release_link failed: {}", platform, e);
        }
    }
}

impl ManagerInner {
    fn lock(&self) -> MutexGuard<'_, BTreeMap<Platform, AccountSlot>> {
        self.accounts.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn run_attempt(&self, platform: Platform) -> Result<Account, ConnectError> {
        let linked = match timeout(self.connect_timeout, self.transport.initiate_link(platform)).await {
            Ok(result) => result,
            Err(_) => Err(ConnectError::Timeout),
        };

        let _edge = self.transitions.lock().await;
        match linked {
            Ok(()) => {
                let account = self.finish(platform, AccountState::Connected);
                info!("[{}] Connected.", platform);
                self.activity.system(format!("Successfully connected to {}!", platform));
                self.listener.on_account_ready(platform).await;
                Ok(account)
            }
            Err(e) => {
                self.finish(platform, AccountState::Failed);
                warn!("[{}] connect error: {}", platform, e);
                self.activity.system(format!("Failed to connect to {}: {}", platform, e));
                Err(e)
            }
        }
    }

    /// Settles an attempt whose task died before reporting a result.
    async fn abandon_attempt(&self, platform: Platform, e: JoinError) -> Result<Account, ConnectError> {
        let _edge = self.transitions.lock().await;
        let current = self.lock().get(&platform).map(|slot| slot.account.state);
        if current == Some(AccountState::Connected) {
            // the link came up; only the ready notification failed
            error!("[{}] connect attempt crashed after linking: {}", platform, e);
            return Ok(self.finish(platform, AccountState::Connected));
        }

        self.finish(platform, AccountState::Failed);
        error!("[{}] connect attempt crashed: {}", platform, e);
        let err = ConnectError::Rejected("link attempt crashed".into());
        self.activity.system(format!("Failed to connect to {}: {}", platform, err));
        Err(err)
    }

    fn finish(&self, platform: Platform, state: AccountState) -> Account {
        let mut accounts = self.lock();
        let slot = accounts
            .entry(platform)
            .or_insert_with(|| AccountSlot { account: Account::new(platform), in_flight: None });
        slot.account.state = state;
        slot.in_flight = None;
        self.event_bus.publish(OrchestratorEvent::AccountChanged(slot.account));
        slot.account
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;
    use crate::platforms::MockAccountListener;
    use crate::test_utils::{FakeTransport, FixedClock};

    fn manager(
        transport: Arc<FakeTransport>,
        listener: MockAccountListener,
        timeout: Duration,
    ) -> (ConnectionManager, Arc<ActivityLog>) {
        let bus = EventBus::new();
        let activity = Arc::new(ActivityLog::new(Arc::new(FixedClock::default()), bus.clone()));
        let mgr = ConnectionManager::new(transport, Arc::new(listener), activity.clone(), bus, timeout);
        (mgr, activity)
    }

    #[tokio::test]
    async fn connect_then_disconnect_notifies_listener() {
        let mut listener = MockAccountListener::new();
        listener
            .expect_on_account_ready()
            .with(eq(Platform::WhatsApp))
            .times(1)
            .returning(|_| ());
        listener
            .expect_on_account_lost()
            .with(eq(Platform::WhatsApp))
            .times(1)
            .returning(|_| ());

        let transport = Arc::new(FakeTransport::new());
        let (mgr, activity) = manager(transport.clone(), listener, Duration::from_secs(5));

        let account = mgr.connect(Platform::WhatsApp).await.unwrap();
        assert_eq!(account.state, AccountState::Connected);

        mgr.disconnect(Platform::WhatsApp).await;
        assert_eq!(mgr.account(Platform::WhatsApp).state, AccountState::Disconnected);
        assert_eq!(transport.released(), vec![Platform::WhatsApp]);

        let texts: Vec<String> = activity.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["Successfully connected to whatsapp!", "Disconnected from whatsapp"]);
    }

    #[tokio::test]
    async fn rejected_link_leaves_failed_and_is_retryable() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_ready().times(1).returning(|_| ());

        let transport = Arc::new(FakeTransport::new());
        transport.fail_next_link(Platform::Instagram, ConnectError::Rejected("bad password".into()));
        let (mgr, _activity) = manager(transport.clone(), listener, Duration::from_secs(5));

        let err = mgr.connect(Platform::Instagram).await.unwrap_err();
        assert_eq!(err, ConnectError::Rejected("bad password".into()));
        assert_eq!(mgr.account(Platform::Instagram).state, AccountState::Failed);

        let account = mgr.connect(Platform::Instagram).await.unwrap();
        assert!(account.is_connected());
        assert_eq!(transport.link_calls(Platform::Instagram), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_link_times_out() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_ready().never();

        let transport = Arc::new(FakeTransport::new().with_link_delay(Duration::from_secs(60)));
        let (mgr, _activity) = manager(transport, listener, Duration::from_secs(1));

        assert_eq!(mgr.connect(Platform::WhatsApp).await, Err(ConnectError::Timeout));
        assert_eq!(mgr.account(Platform::WhatsApp).state, AccountState::Failed);
    }

    #[tokio::test(start_paused = true)]
    async fn concurrent_connects_share_one_attempt() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_ready().times(1).returning(|_| ());

        let transport = Arc::new(FakeTransport::new().with_link_delay(Duration::from_millis(1500)));
        let (mgr, _activity) = manager(transport.clone(), listener, Duration::from_secs(5));

        let (a, b) = tokio::join!(mgr.connect(Platform::WhatsApp), mgr.connect(Platform::WhatsApp));
        assert!(a.unwrap().is_connected());
        assert!(b.unwrap().is_connected());
        assert_eq!(transport.link_calls(Platform::WhatsApp), 1);
    }

    #[tokio::test]
    async fn connecting_twice_after_success_is_refused() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_ready().times(1).returning(|_| ());

        let (mgr, _activity) = manager(Arc::new(FakeTransport::new()), listener, Duration::from_secs(5));
        mgr.connect(Platform::WhatsApp).await.unwrap();
        assert_eq!(mgr.connect(Platform::WhatsApp).await, Err(ConnectError::AlreadyConnected));
    }

    #[tokio::test]
    async fn crashed_link_attempt_fails_and_can_be_retried() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_ready().times(1).returning(|_| ());

        let transport = Arc::new(FakeTransport::new());
        transport.panic_next_link(Platform::WhatsApp);
        let (mgr, activity) = manager(transport.clone(), listener, Duration::from_secs(5));

        let err = mgr.connect(Platform::WhatsApp).await.unwrap_err();
        assert_eq!(err, ConnectError::Rejected("link attempt crashed".into()));
        assert_eq!(mgr.account(Platform::WhatsApp).state, AccountState::Failed);

        let texts: Vec<String> = activity.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec!["Failed to connect to whatsapp: connection rejected: link attempt crashed"]
        );

        let account = mgr.connect(Platform::WhatsApp).await.unwrap();
        assert!(account.is_connected());
        assert_eq!(transport.link_calls(Platform::WhatsApp), 2);
    }

    #[tokio::test]
    async fn disconnect_when_idle_is_a_no_op() {
        let mut listener = MockAccountListener::new();
        listener.expect_on_account_lost().never();

        let transport = Arc::new(FakeTransport::new());
        let (mgr, activity) = manager(transport.clone(), listener, Duration::from_secs(5));
        mgr.disconnect(Platform::Instagram).await;

        assert!(activity.is_empty());
        assert!(transport.released().is_empty());
    }
}
