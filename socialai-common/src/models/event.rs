// File: socialai-common/src/models/event.rs

use serde::{Deserialize, Serialize};
use crate::models::platform::Platform;

/// Something that happened outside the orchestrator and must be reacted to.
/// Consumed exactly once by the dispatcher.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InboundEvent {
    /// Text typed by the local user into the assistant chat.
    DirectMessage {
        text: String,
    },

    /// A message posted in a group the account belongs to.
    GroupMessage {
        platform: Platform,
        group: String,
        sender: String,
        text: String,
    },

    /// Periodic prompt to view one contact's status update.
    StatusTick {
        platform: Platform,
    },

    /// The user published a new post.
    PostCreated {
        platform: Platform,
        #[serde(default)]
        post_id: Option<String>,
    },
}

impl InboundEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            InboundEvent::DirectMessage { .. } => "direct_message",
            InboundEvent::GroupMessage { .. } => "group_message",
            InboundEvent::StatusTick { .. } => "status_tick",
            InboundEvent::PostCreated { .. } => "post_created",
        }
    }

    /// Platform the event belongs to. Direct chat is not tied to an account.
    pub fn platform(&self) -> Option<Platform> {
        match self {
            InboundEvent::DirectMessage { .. } => None,
            InboundEvent::GroupMessage { platform, .. }
            | InboundEvent::StatusTick { platform }
            | InboundEvent::PostCreated { platform, .. } => Some(*platform),
        }
    }

    pub fn direct(text: impl Into<String>) -> Self {
        InboundEvent::DirectMessage { text: text.into() }
    }

    pub fn group(
        platform: Platform,
        group: impl Into<String>,
        sender: impl Into<String>,
        text: impl Into<String>,
    ) -> Self {
        InboundEvent::GroupMessage {
            platform,
            group: group.into(),
            sender: sender.into(),
            text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_messages_have_no_platform() {
        assert_eq!(InboundEvent::direct("hi").platform(), None);
        let tick = InboundEvent::StatusTick { platform: Platform::WhatsApp };
        assert_eq!(tick.platform(), Some(Platform::WhatsApp));
        assert_eq!(tick.event_type(), "status_tick");
    }

    #[test]
    fn deserialises_tagged_json() {
        let evt: InboundEvent = serde_json::from_str(
            r#"{"kind":"post_created","platform":"instagram"}"#,
        )
        .unwrap();
        assert_eq!(evt, InboundEvent::PostCreated { platform: Platform::Instagram, post_id: None });
    }
}
