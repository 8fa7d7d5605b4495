use std::sync::{Arc, Mutex};
use tracing::debug;
use uuid::Uuid;
use socialai_common::models::{ActivityEntry, ActivitySource};
use socialai_common::traits::Clock;
use crate::eventbus::{EventBus, OrchestratorEvent};

/// Append-only record of what the user and the automations did.
///
/// Sequence numbers are assigned and the entry is published while the lock
/// is held, so subscribers observe entries in exactly `seq` order even with
/// concurrent producers.
pub struct ActivityLog {
    entries: Mutex<Vec<ActivityEntry>>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
}

impl ActivityLog {
    pub fn new(clock: Arc<dyn Clock>, event_bus: EventBus) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            clock,
            event_bus,
        }
    }

    pub fn append(&self, source: ActivitySource, text: impl Into<String>) -> ActivityEntry {
        let text = text.into();
        let mut entries = self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let entry = ActivityEntry {
            entry_id: Uuid::new_v4(),
            seq: entries.len() as u64 + 1,
            source,
            text,
            timestamp: self.clock.now(),
        };
        debug!("activity #{} [{:?}] {}", entry.seq, entry.source, entry.text);
        entries.push(entry.clone());
        self.event_bus.publish(OrchestratorEvent::Activity(entry.clone()));
        entry
    }

    pub fn user(&self, text: impl Into<String>) -> ActivityEntry {
        self.append(ActivitySource::User, text)
    }

    pub fn automation(&self, text: impl Into<String>) -> ActivityEntry {
        self.append(ActivitySource::Automation, text)
    }

    pub fn system(&self, text: impl Into<String>) -> ActivityEntry {
        self.append(ActivitySource::System, text)
    }

    /// Copy of the whole log, in order.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.lock().clone()
    }

    /// Entries with `seq` greater than `after`.
    pub fn since(&self, after: u64) -> Vec<ActivityEntry> {
        self.lock()
            .iter()
            .filter(|e| e.seq > after)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ActivityEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
