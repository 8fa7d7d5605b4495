//! The automation dispatcher binds account state, feature flags and inbound
//! events to concrete actions.
//!
//! A feature's automation is *active* on a platform exactly when the
//! platform is ready (Connected) and the feature flag is enabled. Every
//! activation owns a cancellation token; deactivation cancels it, which
//! stops the feature's background work at its next scheduling point.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use async_trait::async_trait;
use rand::Rng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use socialai_common::models::{FeatureId, InboundEvent, Platform};
use socialai_common::traits::AccountTransport;
use crate::config::OrchestratorConfig;
use crate::platforms::AccountListener;
use crate::services::activity_log::ActivityLog;
use crate::services::feature_registry::FeatureRegistry;
use crate::services::lanes::{Lane, LaneHandler, LaneJob, LaneRouter};
use crate::services::rule_engine::{RuleSet, CHAT_FALLBACKS};
use crate::tasks::spawn_status_ticker;

/// How one inbound event was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// An automated reply was produced (and sent, for group messages).
    Replied(String),
    /// The event was acted on without a reply.
    Handled,
    /// Nothing happened; the reason says why.
    Ignored(&'static str),
}

#[derive(Default)]
struct DispatchState {
    ready: BTreeSet<Platform>,
    active: BTreeMap<Platform, BTreeMap<FeatureId, CancellationToken>>,
}

impl DispatchState {
    fn is_active(&self, platform: Platform, feature: FeatureId) -> bool {
        self.active
            .get(&platform)
            .is_some_and(|features| features.contains_key(&feature))
    }
}

pub struct Dispatcher {
    registry: Arc<FeatureRegistry>,
    activity: Arc<ActivityLog>,
    transport: Arc<dyn AccountTransport>,
    lanes: LaneRouter,
    chat_rules: RuleSet,
    group_rules: RuleSet,
    contact_pool: Vec<String>,
    tag_set: Vec<String>,
    status_interval: Duration,
    rng: Mutex<StdRng>,
    state: Mutex<DispatchState>,
    root_token: CancellationToken,
}

impl Dispatcher {
    pub fn new(
        config: &OrchestratorConfig,
        registry: Arc<FeatureRegistry>,
        activity: Arc<ActivityLog>,
        transport: Arc<dyn AccountTransport>,
        lanes: LaneRouter,
        root_token: CancellationToken,
    ) -> Self {
        let mut chat_rules = config.chat_rules.clone();
        if chat_rules.may_stay_silent() {
            warn!("chat rule set has no fallback replies; using the built-in ones");
            chat_rules.fallback = RuleSet::chat().fallback;
        }

        Self {
            registry,
            activity,
            transport,
            lanes,
            chat_rules,
            group_rules: config.group_rules.clone(),
            contact_pool: config.contact_pool.clone(),
            tag_set: config.tag_set.clone(),
            status_interval: config.status_view_interval(),
            rng: Mutex::new(config.rng()),
            state: Mutex::new(DispatchState::default()),
            root_token,
        }
    }

    pub fn is_active(&self, platform: Platform, feature: FeatureId) -> bool {
        self.lock().is_active(platform, feature)
    }

    pub fn active_features(&self, platform: Platform) -> Vec<FeatureId> {
        self.lock()
            .active
            .get(&platform)
            .map(|features| features.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Brings `feature`'s automation in line with its flag and the readiness
    /// of its prerequisite account. Safe to call any number of times.
    pub fn reconcile(&self, feature: FeatureId) {
        let Some(platform) = feature.prerequisite() else {
            // account-less features are checked per event
            return;
        };
        let mut state = self.lock();
        let wanted = self.registry.is_enabled(feature) && state.ready.contains(&platform);
        let active = state.is_active(platform, feature);

        if wanted && !active {
            self.activate(&mut state, platform, feature);
        } else if !wanted && active {
            self.deactivate(&mut state, platform, feature);
        } else if wanted {
            debug!("[{}] {} already active", platform, feature);
        } else {
            debug!("[{}] {} deferred until the account is ready", platform, feature);
        }
    }

    fn activate(&self, state: &mut DispatchState, platform: Platform, feature: FeatureId) {
        let token = self.root_token.child_token();
        info!("[{}] activating {}", platform, feature);
        self.activity.system(format!("{} enabled", feature.label()));

        match feature {
            FeatureId::MessageRecovery => {
                self.activity.system("Scanning for deleted messages...");
                let job = LaneJob::RecoverMessages { platform, token: token.clone() };
                if let Err(e) = self.lanes.enqueue_job(Lane::Platform(platform), job) {
                    error!("[{}] could not queue message recovery: {}", platform, e);
                }
            }
            FeatureId::AutoStatusView => {
                spawn_status_ticker(platform, self.status_interval, self.lanes.clone(), token.clone());
            }
            FeatureId::AutoTag | FeatureId::AutoGroupResponse | FeatureId::AiChat => {}
        }

        state.active.entry(platform).or_default().insert(feature, token);
    }

    fn deactivate(&self, state: &mut DispatchState, platform: Platform, feature: FeatureId) {
        let Some(token) = state.active.get_mut(&platform).and_then(|f| f.remove(&feature)) else {
            return;
        };
        token.cancel();
        info!("[{}] deactivated {}", platform, feature);
        self.activity.system(format!("{} disabled", feature.label()));
    }

    /// Routes one event to its feature handler.
    pub async fn handle(&self, event: InboundEvent) -> DispatchOutcome {
        debug!("dispatching {}", event.event_type());
        match event {
            InboundEvent::DirectMessage { text } => self.handle_direct_message(&text),
            InboundEvent::GroupMessage { platform, group, sender, text } => {
                self.handle_group_message(platform, &group, &sender, &text).await
            }
            InboundEvent::StatusTick { platform } => self.handle_status_tick(platform),
            InboundEvent::PostCreated { platform, post_id } => {
                self.handle_post_created(platform, post_id.as_deref())
            }
        }
    }

    fn handle_direct_message(&self, text: &str) -> DispatchOutcome {
        let text = text.trim();
        if text.is_empty() {
            return DispatchOutcome::Ignored("empty message");
        }
        self.activity.user(text);

        if !self.registry.is_enabled(FeatureId::AiChat) {
            return DispatchOutcome::Handled;
        }

        let reply = {
            let mut rng = self.rng();
            self.chat_rules.respond(text, &mut *rng)
        }
        .unwrap_or_else(|| CHAT_FALLBACKS[0].to_string());
        self.activity.automation(reply.clone());
        DispatchOutcome::Replied(reply)
    }

    async fn handle_group_message(
        &self,
        platform: Platform,
        group: &str,
        sender: &str,
        text: &str,
    ) -> DispatchOutcome {
        if !self.is_active(platform, FeatureId::AutoGroupResponse) {
            return DispatchOutcome::Ignored("auto-group-response inactive");
        }

        let reply = {
            let mut rng = self.rng();
            self.group_rules.respond(text, &mut *rng)
        };
        let Some(reply) = reply else {
            debug!("[{}] no group rule matched in '{}'", platform, group);
            return DispatchOutcome::Ignored("no matching rule");
        };

        self.activity.automation(format!(
            "[Group: {}] Automatically responding to {}: \"{}\"",
            group, sender, reply
        ));
        if let Err(e) = self.transport.send(platform, group, &reply).await {
            error!("[{}] failed to send group reply to '{}': {}", platform, group, e);
            self.activity.system(format!("Failed to send reply to {}: {}", group, e));
        }
        DispatchOutcome::Replied(reply)
    }

    fn handle_status_tick(&self, platform: Platform) -> DispatchOutcome {
        if !self.is_active(platform, FeatureId::AutoStatusView) {
            return DispatchOutcome::Ignored("auto-status-view inactive");
        }
        if self.contact_pool.is_empty() {
            return DispatchOutcome::Ignored("contact pool is empty");
        }

        let contact = {
            let mut rng = self.rng();
            &self.contact_pool[rng.random_range(0..self.contact_pool.len())]
        };
        info!("[{}] Viewed {}'s status", platform, contact);
        self.activity
            .system(format!("Automatically viewed {}'s status update", contact));
        DispatchOutcome::Handled
    }

    fn handle_post_created(&self, platform: Platform, post_id: Option<&str>) -> DispatchOutcome {
        if !self.is_active(platform, FeatureId::AutoTag) {
            return DispatchOutcome::Ignored("auto-tag inactive");
        }
        debug!("[{}] tagging post {:?}", platform, post_id);
        self.activity.automation(format!(
            "Automatically tagged members in new post: {}",
            self.tag_set.join(" ")
        ));
        DispatchOutcome::Handled
    }

    async fn recover_messages(&self, platform: Platform, token: CancellationToken) {
        if token.is_cancelled() {
            debug!("[{}] message recovery cancelled before it started", platform);
            return;
        }

        let result = tokio::select! {
            _ = token.cancelled() => return,
            result = self.transport.recover_deleted_messages(platform) => result,
        };

        match result {
            Ok(_) if token.is_cancelled() => {}
            Ok(messages) => {
                for msg in &messages {
                    self.activity.system(format!(
                        "Recovered message from {} ({}): {}",
                        msg.from,
                        msg.timestamp.format("%Y-%m-%d %H:%M"),
                        msg.message
                    ));
                }
                info!("[{}] recovered {} deleted messages", platform, messages.len());
                self.activity
                    .system(format!("Recovered {} deleted messages", messages.len()));
            }
            Err(e) => {
                error!("[{}] message recovery failed: {}", platform, e);
                self.activity.system(format!("Message recovery failed: {}", e));
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DispatchState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn rng(&self) -> MutexGuard<'_, StdRng> {
        self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl AccountListener for Dispatcher {
    async fn on_account_ready(&self, platform: Platform) {
        let mut state = self.lock();
        state.ready.insert(platform);
        for feature in FeatureId::ALL {
            if feature.prerequisite() == Some(platform)
                && self.registry.is_enabled(feature)
                && !state.is_active(platform, feature)
            {
                self.activate(&mut state, platform, feature);
            }
        }
    }

    async fn on_account_lost(&self, platform: Platform) {
        let mut state = self.lock();
        state.ready.remove(&platform);
        let features: Vec<FeatureId> = state
            .active
            .get(&platform)
            .map(|f| f.keys().copied().collect())
            .unwrap_or_default();
        for feature in features {
            self.deactivate(&mut state, platform, feature);
        }
    }
}

#[async_trait]
impl LaneHandler for Dispatcher {
    async fn handle_event(&self, event: InboundEvent) -> DispatchOutcome {
        self.handle(event).await
    }

    async fn run_job(&self, job: LaneJob) {
        match job {
            LaneJob::RecoverMessages { platform, token } => self.recover_messages(platform, token).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialai_common::models::{ActivitySource, FeatureFlags};
    use crate::eventbus::EventBus;
    use crate::test_utils::{FakeTransport, FixedClock};

    struct Fixture {
        dispatcher: Arc<Dispatcher>,
        registry: Arc<FeatureRegistry>,
        activity: Arc<ActivityLog>,
        transport: Arc<FakeTransport>,
        lanes: LaneRouter,
    }

    fn fixture(flags: FeatureFlags) -> Fixture {
        let bus = EventBus::new();
        let config = OrchestratorConfig { rng_seed: Some(1), ..Default::default() };
        let registry = Arc::new(FeatureRegistry::new(flags, bus.clone()));
        let activity = Arc::new(ActivityLog::new(Arc::new(FixedClock::default()), bus));
        let transport = Arc::new(FakeTransport::new());
        let lanes = LaneRouter::new();
        let dispatcher = Arc::new(Dispatcher::new(
            &config,
            registry.clone(),
            activity.clone(),
            transport.clone(),
            lanes.clone(),
            CancellationToken::new(),
        ));
        lanes.start(dispatcher.clone(), CancellationToken::new());
        Fixture { dispatcher, registry, activity, transport, lanes }
    }

    fn only(feature: FeatureId) -> FeatureFlags {
        let mut flags = FeatureFlags::all_disabled();
        flags.set(feature, true);
        flags
    }

    #[tokio::test]
    async fn group_reply_is_logged_and_sent_once() {
        let fx = fixture(only(FeatureId::AutoGroupResponse));
        fx.dispatcher.on_account_ready(Platform::WhatsApp).await;

        let outcome = fx
            .dispatcher
            .handle(InboundEvent::group(Platform::WhatsApp, "Family Chat", "Mom", "When are you coming home?"))
            .await;

        assert_eq!(outcome, DispatchOutcome::Replied("I'll be there by 8pm!".into()));
        let sent = fx.transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, "Family Chat");

        let last = fx.activity.entries().pop().unwrap();
        assert_eq!(last.source, ActivitySource::Automation);
        assert_eq!(
            last.text,
            "[Group: Family Chat] Automatically responding to Mom: \"I'll be there by 8pm!\""
        );
    }

    #[tokio::test]
    async fn failed_send_is_reported_not_retried() {
        let fx = fixture(only(FeatureId::AutoGroupResponse));
        fx.transport.fail_sends(true);
        fx.dispatcher.on_account_ready(Platform::WhatsApp).await;

        fx.dispatcher
            .handle(InboundEvent::group(Platform::WhatsApp, "Friends", "Alice", "dinner?"))
            .await;

        let texts: Vec<String> = fx.activity.entries().into_iter().map(|e| e.text).collect();
        assert!(texts.last().unwrap().starts_with("Failed to send reply to Friends"));
        assert!(fx.transport.sent().is_empty());
    }

    #[tokio::test]
    async fn events_for_inactive_features_are_ignored() {
        let fx = fixture(FeatureFlags::default());
        // nothing connected yet
        let outcome = fx
            .dispatcher
            .handle(InboundEvent::PostCreated { platform: Platform::Instagram, post_id: None })
            .await;
        assert_eq!(outcome, DispatchOutcome::Ignored("auto-tag inactive"));
        assert!(fx.activity.is_empty());
    }

    #[tokio::test]
    async fn reconcile_follows_flag_and_readiness() {
        let fx = fixture(FeatureFlags::all_disabled());
        fx.dispatcher.on_account_ready(Platform::Instagram).await;
        assert!(fx.dispatcher.active_features(Platform::Instagram).is_empty());

        fx.registry.set(FeatureId::AutoTag, true);
        fx.dispatcher.reconcile(FeatureId::AutoTag);
        fx.dispatcher.reconcile(FeatureId::AutoTag);
        assert_eq!(fx.dispatcher.active_features(Platform::Instagram), vec![FeatureId::AutoTag]);

        fx.registry.set(FeatureId::AutoTag, false);
        fx.dispatcher.reconcile(FeatureId::AutoTag);
        assert!(!fx.dispatcher.is_active(Platform::Instagram, FeatureId::AutoTag));

        let texts: Vec<String> = fx.activity.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(texts, vec!["Auto tagging enabled", "Auto tagging disabled"]);
    }

    #[tokio::test]
    async fn recovery_runs_on_the_platform_lane() {
        let fx = fixture(only(FeatureId::MessageRecovery));
        fx.dispatcher.on_account_ready(Platform::WhatsApp).await;
        fx.lanes.flush(Lane::Platform(Platform::WhatsApp)).await.unwrap();

        assert_eq!(fx.transport.recovery_calls(), 1);
        let texts: Vec<String> = fx.activity.entries().into_iter().map(|e| e.text).collect();
        assert_eq!(
            texts,
            vec![
                "Message recovery enabled",
                "Scanning for deleted messages...",
                "Recovered 0 deleted messages",
            ]
        );
    }

    #[tokio::test]
    async fn recovery_cancelled_before_running_does_nothing() {
        let fx = fixture(only(FeatureId::MessageRecovery));
        let token = CancellationToken::new();
        token.cancel();
        fx.dispatcher
            .run_job(LaneJob::RecoverMessages { platform: Platform::WhatsApp, token })
            .await;
        assert_eq!(fx.transport.recovery_calls(), 0);
    }

    #[tokio::test]
    async fn direct_chat_without_ai_only_records_the_user() {
        let fx = fixture(FeatureFlags::all_disabled());
        let outcome = fx.dispatcher.handle(InboundEvent::direct("  hello  ")).await;
        assert_eq!(outcome, DispatchOutcome::Handled);

        let entries = fx.activity.entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].source, ActivitySource::User);
        assert_eq!(entries[0].text, "hello");

        let blank = fx.dispatcher.handle(InboundEvent::direct("   ")).await;
        assert_eq!(blank, DispatchOutcome::Ignored("empty message"));
    }

    #[tokio::test]
    async fn status_tick_views_a_pool_contact() {
        let fx = fixture(only(FeatureId::AutoStatusView));
        fx.dispatcher.on_account_ready(Platform::WhatsApp).await;

        let outcome = fx
            .dispatcher
            .handle(InboundEvent::StatusTick { platform: Platform::WhatsApp })
            .await;
        assert_eq!(outcome, DispatchOutcome::Handled);

        let last = fx.activity.entries().pop().unwrap().text;
        assert!(["John", "Sarah", "Mike", "Dad"]
            .iter()
            .any(|c| last == format!("Automatically viewed {}'s status update", c)));
    }
}
