use std::sync::RwLock;
use tracing::{info, warn};
use socialai_common::models::{FeatureFlags, FeatureId};
use crate::eventbus::{EventBus, OrchestratorEvent};

/// Holds the on/off state of every feature.
///
/// Only real value changes are reported (edge-triggered); the caller is
/// expected to hand a `true` return straight to the dispatcher.
pub struct FeatureRegistry {
    flags: RwLock<FeatureFlags>,
    event_bus: EventBus,
}

impl FeatureRegistry {
    pub fn new(initial: FeatureFlags, event_bus: EventBus) -> Self {
        Self {
            flags: RwLock::new(initial),
            event_bus,
        }
    }

    pub fn is_enabled(&self, feature: FeatureId) -> bool {
        self.flags
            .read()
            .map(|f| f.get(feature))
            .unwrap_or_else(|poisoned| poisoned.into_inner().get(feature))
    }

    /// Resolves a feature id. Unknown ids are a warning, never an error.
    pub fn resolve(&self, id: &str) -> Option<FeatureId> {
        match id.parse::<FeatureId>() {
            Ok(feature) => Some(feature),
            Err(e) => {
                warn!("Ignoring toggle request: {}", e);
                self.event_bus.notice(format!("Unknown feature '{}' ignored", id));
                None
            }
        }
    }

    /// Stores the new value. Returns `true` when the value actually changed.
    pub fn set(&self, feature: FeatureId, enabled: bool) -> bool {
        let previous = {
            let mut flags = self.flags.write().unwrap_or_else(|poisoned| poisoned.into_inner());
            flags.set(feature, enabled)
        };
        if previous == enabled {
            return false;
        }
        info!("{} {}", feature, if enabled { "enabled" } else { "disabled" });
        self.event_bus
            .publish(OrchestratorEvent::FeatureChanged { feature, enabled });
        true
    }

    pub fn snapshot(&self) -> FeatureFlags {
        self.flags
            .read()
            .map(|f| f.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}
