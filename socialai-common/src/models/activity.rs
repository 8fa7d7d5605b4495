// File: socialai-common/src/models/activity.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum ActivitySource {
    User,
    Automation,
    System,
}

/// One immutable line of the conversational activity log.
///
/// `seq` is assigned by the log at append time, starts at 1 and is
/// strictly increasing; it is the total order of the log.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ActivityEntry {
    pub entry_id: Uuid,
    pub seq: u64,
    pub source: ActivitySource,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// A message that the provider reported as deleted and that the recovery
/// scan brought back.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RecoveredMessage {
    pub from: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
