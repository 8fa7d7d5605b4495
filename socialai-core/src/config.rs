// File: socialai-core/src/config.rs

use std::path::Path;
use std::time::Duration;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use socialai_common::Error;
use crate::services::rule_engine::RuleSet;

/// Tunables of one orchestrator instance. Every field has a default, so a
/// config file only needs to list what it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Upper bound for one `connect` attempt.
    pub connect_timeout_ms: u64,

    /// Period of the auto status viewing timer.
    pub status_view_interval_ms: u64,

    /// Contacts whose status updates get viewed.
    pub contact_pool: Vec<String>,

    /// Handles tagged on every new post.
    pub tag_set: Vec<String>,

    pub chat_rules: RuleSet,
    pub group_rules: RuleSet,

    /// Seed for reply/contact selection. `None` seeds from the OS.
    pub rng_seed: Option<u64>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 30_000,
            status_view_interval_ms: 10_000,
            contact_pool: ["John", "Sarah", "Mike", "Dad"].map(String::from).to_vec(),
            tag_set: ["@user1", "@user2", "@user3", "@user4"].map(String::from).to_vec(),
            chat_rules: RuleSet::chat(),
            group_rules: RuleSet::group(),
            rng_seed: None,
        }
    }
}

impl OrchestratorConfig {
    pub async fn from_json_file(path: impl AsRef<Path>) -> Result<Self, Error> {
        let raw = tokio::fs::read_to_string(path.as_ref()).await?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn status_view_interval(&self) -> Duration {
        // a zero period would make tokio's interval panic
        Duration::from_millis(self.status_view_interval_ms.max(1))
    }

    pub fn rng(&self) -> StdRng {
        match self.rng_seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        }
    }
}
