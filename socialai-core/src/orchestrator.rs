// File: socialai-core/src/orchestrator.rs

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use socialai_common::Error;
use socialai_common::error::{ConnectError, SettingsError};
use socialai_common::models::{Account, ActivityEntry, FeatureFlags, FeatureId, InboundEvent, Platform};
use socialai_common::traits::{AccountTransport, Clock, EventSource, SettingsStore, SystemClock};
use crate::config::OrchestratorConfig;
use crate::eventbus::{EventBus, OrchestratorEvent};
use crate::platforms::ConnectionManager;
use crate::services::activity_log::ActivityLog;
use crate::services::dispatcher::{DispatchOutcome, Dispatcher};
use crate::services::feature_registry::FeatureRegistry;
use crate::services::lanes::{Lane, LaneRouter};
use crate::settings::InMemorySettingsStore;

/// Assembles an `Orchestrator` from its collaborators.
pub struct OrchestratorBuilder {
    transport: Arc<dyn AccountTransport>,
    settings: Option<Arc<dyn SettingsStore>>,
    clock: Option<Arc<dyn Clock>>,
    config: OrchestratorConfig,
    initial_flags: FeatureFlags,
}

impl OrchestratorBuilder {
    pub fn settings(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings = Some(store);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    /// Flags in effect before any settings are loaded. Defaults to all enabled.
    pub fn initial_flags(mut self, flags: FeatureFlags) -> Self {
        self.initial_flags = flags;
        self
    }

    /// Builds the orchestrator and starts its lane workers. Must be called
    /// from within a tokio runtime.
    pub fn build(self) -> Orchestrator {
        let event_bus = EventBus::new();
        let root_token = CancellationToken::new();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let settings = self
            .settings
            .unwrap_or_else(|| Arc::new(InMemorySettingsStore::new()));

        let activity = Arc::new(ActivityLog::new(clock, event_bus.clone()));
        let registry = Arc::new(FeatureRegistry::new(self.initial_flags, event_bus.clone()));
        let lanes = LaneRouter::new();
        let dispatcher = Arc::new(Dispatcher::new(
            &self.config,
            registry.clone(),
            activity.clone(),
            self.transport.clone(),
            lanes.clone(),
            root_token.clone(),
        ));
        lanes.start(dispatcher.clone(), root_token.clone());

        let connections = ConnectionManager::new(
            self.transport,
            dispatcher.clone(),
            activity.clone(),
            event_bus.clone(),
            self.config.connect_timeout(),
        );

        info!("orchestrator ready");
        Orchestrator {
            config: self.config,
            event_bus,
            activity,
            registry,
            dispatcher,
            connections,
            lanes,
            settings,
            root_token,
        }
    }
}

/// One independent automation orchestrator: accounts, feature flags,
/// activity log and the automations binding them together.
pub struct Orchestrator {
    config: OrchestratorConfig,
    event_bus: EventBus,
    activity: Arc<ActivityLog>,
    registry: Arc<FeatureRegistry>,
    dispatcher: Arc<Dispatcher>,
    connections: ConnectionManager,
    lanes: LaneRouter,
    settings: Arc<dyn SettingsStore>,
    root_token: CancellationToken,
}

impl Orchestrator {
    pub fn builder(transport: Arc<dyn AccountTransport>) -> OrchestratorBuilder {
        OrchestratorBuilder {
            transport,
            settings: None,
            clock: None,
            config: OrchestratorConfig::default(),
            initial_flags: FeatureFlags::default(),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ---------------------------------------------------------------
    // Accounts
    // ---------------------------------------------------------------

    pub async fn connect(&self, platform: Platform) -> Result<Account, ConnectError> {
        self.connections.connect(platform).await
    }

    pub async fn disconnect(&self, platform: Platform) {
        self.connections.disconnect(platform).await
    }

    pub fn account(&self, platform: Platform) -> Account {
        self.connections.account(platform)
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.connections.accounts()
    }

    // ---------------------------------------------------------------
    // Features
    // ---------------------------------------------------------------

    /// Toggles a feature by id. Unknown ids are reported as a warning and
    /// otherwise ignored. When this returns, the matching automation has
    /// already been started or stopped.
    pub fn set_feature(&self, id: &str, enabled: bool) {
        if let Some(feature) = self.registry.resolve(id) {
            self.set_feature_flag(feature, enabled);
        }
    }

    pub fn set_feature_flag(&self, feature: FeatureId, enabled: bool) {
        if self.registry.set(feature, enabled) {
            self.dispatcher.reconcile(feature);
        }
    }

    /// Unknown ids read as disabled.
    pub fn is_enabled(&self, id: &str) -> bool {
        id.parse::<FeatureId>()
            .map(|f| self.registry.is_enabled(f))
            .unwrap_or(false)
    }

    pub fn features(&self) -> FeatureFlags {
        self.registry.snapshot()
    }

    pub fn active_features(&self, platform: Platform) -> Vec<FeatureId> {
        self.dispatcher.active_features(platform)
    }

    // ---------------------------------------------------------------
    // Settings
    // ---------------------------------------------------------------

    /// Loads the stored flags and applies every change through the normal
    /// toggle path. On failure the current flags stay untouched.
    pub async fn load_settings(&self) -> Result<(), SettingsError> {
        match self.settings.load().await {
            Ok(flags) => {
                for (feature, enabled) in flags.iter() {
                    self.set_feature_flag(feature, enabled);
                }
                debug!("settings loaded");
                Ok(())
            }
            Err(e) => {
                error!("Failed to load settings: {}", e);
                self.activity.system(format!("Failed to load settings: {}", e));
                Err(e)
            }
        }
    }

    pub async fn save_settings(&self) -> Result<(), SettingsError> {
        let flags = self.registry.snapshot();
        match self.settings.save(&flags).await {
            Ok(()) => {
                self.activity.system("Settings saved successfully!");
                Ok(())
            }
            Err(e) => {
                error!("Failed to save settings: {}", e);
                self.activity.system("Failed to save settings");
                self.event_bus.notice(format!("Failed to save settings: {}", e));
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------
    // Events
    // ---------------------------------------------------------------

    /// Handles text typed by the user into the assistant chat and returns
    /// the automated reply, if the assistant is enabled.
    pub async fn send_user_message(&self, text: &str) -> Result<Option<String>, Error> {
        match self.dispatch(InboundEvent::direct(text)).await? {
            DispatchOutcome::Replied(reply) => Ok(Some(reply)),
            _ => Ok(None),
        }
    }

    /// Queues an event on its platform lane and waits for the outcome.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome, Error> {
        self.lanes.dispatch(event).await
    }

    /// Queues an event without waiting.
    pub fn submit(&self, event: InboundEvent) -> Result<(), Error> {
        self.lanes.submit(event)
    }

    /// Drains `source`, queuing every event in order, then waits until all
    /// of them have been handled. Returns the number of events consumed.
    pub async fn pump<S: EventSource + ?Sized>(&self, source: &mut S) -> Result<usize, Error> {
        let mut count = 0;
        while let Some(event) = source.next_event().await {
            if self.root_token.is_cancelled() {
                break;
            }
            self.lanes.submit(event)?;
            count += 1;
        }
        self.flush_all().await?;
        Ok(count)
    }

    /// Runs `pump` in a background task.
    pub fn spawn_pump<S>(self: &Arc<Self>, mut source: S) -> JoinHandle<Result<usize, Error>>
    where
        S: EventSource + 'static,
    {
        let this = Arc::clone(self);
        tokio::spawn(async move { this.pump(&mut source).await })
    }

    pub async fn flush(&self, lane: Lane) -> Result<(), Error> {
        self.lanes.flush(lane).await
    }

    pub async fn flush_all(&self) -> Result<(), Error> {
        for lane in Lane::all() {
            self.lanes.flush(lane).await?;
        }
        Ok(())
    }

    // ---------------------------------------------------------------
    // Presentation
    // ---------------------------------------------------------------

    pub fn subscribe(&self) -> tokio::sync::mpsc::UnboundedReceiver<OrchestratorEvent> {
        self.event_bus.subscribe()
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn activity(&self) -> Vec<ActivityEntry> {
        self.activity.entries()
    }

    pub fn activity_since(&self, seq: u64) -> Vec<ActivityEntry> {
        self.activity.since(seq)
    }

    /// Stops every background automation and lane worker.
    pub fn shutdown(&self) {
        info!("orchestrator shutting down");
        self.root_token.cancel();
        self.event_bus.shutdown();
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        self.root_token.cancel();
    }
}
