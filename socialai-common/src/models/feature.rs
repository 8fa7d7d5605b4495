// File: socialai-common/src/models/feature.rs

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize};
use crate::error::UnknownFeature;
use crate::models::platform::Platform;

/// Every automation capability that can be toggled.
/// The key set is fixed; settings never add or remove features.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "kebab-case")]
pub enum FeatureId {
    MessageRecovery,
    AutoTag,
    AutoStatusView,
    AutoGroupResponse,
    AiChat,
}

impl FeatureId {
    pub const ALL: [FeatureId; 5] = [
        FeatureId::MessageRecovery,
        FeatureId::AutoTag,
        FeatureId::AutoStatusView,
        FeatureId::AutoGroupResponse,
        FeatureId::AiChat,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureId::MessageRecovery => "message-recovery",
            FeatureId::AutoTag => "auto-tag",
            FeatureId::AutoStatusView => "auto-status-view",
            FeatureId::AutoGroupResponse => "auto-group-response",
            FeatureId::AiChat => "ai-chat",
        }
    }

    /// Key used for this feature by the old browser build's settings blob.
    pub fn legacy_key(&self) -> &'static str {
        match self {
            FeatureId::MessageRecovery => "recoverDeletedMessages",
            FeatureId::AutoTag => "autoTagMembers",
            FeatureId::AutoStatusView => "autoViewStatus",
            FeatureId::AutoGroupResponse => "autoGroupResponses",
            FeatureId::AiChat => "aiChatEnabled",
        }
    }

    /// The account that must be connected before the automation can run.
    /// `None` means the feature works without any linked account.
    pub fn prerequisite(&self) -> Option<Platform> {
        match self {
            FeatureId::MessageRecovery
            | FeatureId::AutoStatusView
            | FeatureId::AutoGroupResponse => Some(Platform::WhatsApp),
            FeatureId::AutoTag => Some(Platform::Instagram),
            FeatureId::AiChat => None,
        }
    }

    /// Human readable label used in activity entries.
    pub fn label(&self) -> &'static str {
        match self {
            FeatureId::MessageRecovery => "Message recovery",
            FeatureId::AutoTag => "Auto tagging",
            FeatureId::AutoStatusView => "Auto status viewing",
            FeatureId::AutoGroupResponse => "Group auto-responses",
            FeatureId::AiChat => "AI chat",
        }
    }
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FeatureId {
    type Err = UnknownFeature;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeatureId::ALL
            .into_iter()
            .find(|f| f.as_str() == s || f.legacy_key() == s)
            .ok_or_else(|| UnknownFeature(s.to_string()))
    }
}

/// The toggle state of every feature.
///
/// Deserialisation is lenient: unknown keys and non-boolean values are
/// ignored, missing keys keep their default (enabled). Serialisation always
/// writes every canonical key.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(transparent)]
pub struct FeatureFlags(BTreeMap<FeatureId, bool>);

impl Default for FeatureFlags {
    fn default() -> Self {
        Self(FeatureId::ALL.into_iter().map(|f| (f, true)).collect())
    }
}

impl FeatureFlags {
    pub fn all_disabled() -> Self {
        Self(FeatureId::ALL.into_iter().map(|f| (f, false)).collect())
    }

    pub fn get(&self, feature: FeatureId) -> bool {
        self.0.get(&feature).copied().unwrap_or(false)
    }

    /// Sets a flag and returns the previous value.
    pub fn set(&mut self, feature: FeatureId, enabled: bool) -> bool {
        self.0.insert(feature, enabled).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (FeatureId, bool)> + '_ {
        self.0.iter().map(|(f, on)| (*f, *on))
    }

    /// Builds flags from an arbitrary JSON object, starting from defaults.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut flags = Self::default();
        if let Some(obj) = value.as_object() {
            for (key, val) in obj {
                let (Ok(feature), Some(on)) = (key.parse::<FeatureId>(), val.as_bool()) else {
                    continue;
                };
                flags.set(feature, on);
            }
        }
        flags
    }
}

impl<'de> Deserialize<'de> for FeatureFlags {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = serde_json::Value::deserialize(deserializer)?;
        Ok(FeatureFlags::from_value(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn defaults_enable_everything() {
        let flags = FeatureFlags::default();
        assert!(FeatureId::ALL.iter().all(|f| flags.get(*f)));
    }

    #[test]
    fn parse_accepts_canonical_and_legacy_ids() {
        assert_eq!("auto-tag".parse::<FeatureId>().unwrap(), FeatureId::AutoTag);
        assert_eq!("autoViewStatus".parse::<FeatureId>().unwrap(), FeatureId::AutoStatusView);
        assert_eq!(
            "teleport".parse::<FeatureId>(),
            Err(UnknownFeature("teleport".to_string()))
        );
    }

    #[test]
    fn lenient_blob_ignores_unknown_and_keeps_defaults() {
        let flags: FeatureFlags = serde_json::from_value(json!({
            "auto-tag": false,
            "aiChatEnabled": false,
            "dark-mode": true,
            "auto-status-view": "yes"
        }))
        .unwrap();

        assert!(!flags.get(FeatureId::AutoTag));
        assert!(!flags.get(FeatureId::AiChat));
        assert!(flags.get(FeatureId::AutoStatusView));
        assert!(flags.get(FeatureId::MessageRecovery));
    }

    #[test]
    fn serialises_with_canonical_keys() {
        let mut flags = FeatureFlags::default();
        flags.set(FeatureId::AutoGroupResponse, false);
        let value = serde_json::to_value(&flags).unwrap();
        assert_eq!(value["auto-group-response"], json!(false));
        assert_eq!(value["message-recovery"], json!(true));
        assert_eq!(value.as_object().unwrap().len(), 5);
    }

    #[test]
    fn prerequisites_follow_the_owning_account() {
        assert_eq!(FeatureId::AutoTag.prerequisite(), Some(Platform::Instagram));
        assert_eq!(FeatureId::AutoStatusView.prerequisite(), Some(Platform::WhatsApp));
        assert_eq!(FeatureId::AiChat.prerequisite(), None);
    }
}
