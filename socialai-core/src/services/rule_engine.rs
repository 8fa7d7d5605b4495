//! Keyword rule engine used for automated replies.
//!
//! A `RuleSet` is an ordered list of rules; the first rule with any keyword
//! contained (case-insensitively) in the text wins. Rule order is part of the
//! contract: broad rules such as a bare `"?"` must come after the specific ones.

use rand::Rng;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub keywords: Vec<String>,
    pub response: String,
}

impl Rule {
    pub fn new(keywords: &[&str], response: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_lowercase()).collect(),
            response: response.to_string(),
        }
    }

    fn matches(&self, lowered: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| lowered.contains(k.to_lowercase().as_str()))
    }
}

/// What happens when no rule matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "responses", rename_all = "snake_case")]
pub enum Fallback {
    /// Stay silent.
    None,
    /// Pick one of these uniformly at random.
    Random(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    pub rules: Vec<Rule>,
    pub fallback: Fallback,
}

pub const CHAT_FALLBACKS: [&str; 4] = [
    "Interesting! Tell me more about that.",
    "I can help with WhatsApp and Instagram automation. What would you like to do?",
    "I'm designed to assist with social media tasks. How can I help you today?",
    "Let me know if you'd like help with message recovery, auto-tagging, or other features!",
];

impl RuleSet {
    /// Rules for the assistant chat. Never silent.
    pub fn chat() -> Self {
        Self {
            rules: vec![
                Rule::new(&["hello", "hi"], "Hello there! How can I assist you today?"),
                Rule::new(
                    &["recover", "deleted"],
                    "I can help recover deleted WhatsApp messages. Would you like me to scan for deleted messages now?",
                ),
                Rule::new(
                    &["tag", "mention"],
                    "Auto-tagging is enabled. I'll automatically tag relevant people in your Instagram posts.",
                ),
                Rule::new(
                    &["status", "story"],
                    "I'm automatically viewing status updates for you. You can check the activity log to see which ones I've viewed.",
                ),
                Rule::new(
                    &["group", "response"],
                    "I'm monitoring your groups for questions I can answer automatically. You can customize my responses in settings.",
                ),
            ],
            fallback: Fallback::Random(CHAT_FALLBACKS.iter().map(|s| s.to_string()).collect()),
        }
    }

    /// Rules for replying inside group conversations. Silent on no match.
    pub fn group() -> Self {
        Self {
            rules: vec![
                Rule::new(&["when are you"], "I'll be there by 8pm!"),
                Rule::new(&["where are you"], "On my way home now."),
                Rule::new(
                    &["dinner", "food"],
                    "I can pick up something on my way home if you'd like.",
                ),
                Rule::new(&["?"], "I'll check and get back to you shortly!"),
            ],
            fallback: Fallback::None,
        }
    }

    /// Whether `respond` can ever return `None` for this set.
    pub fn may_stay_silent(&self) -> bool {
        match &self.fallback {
            Fallback::None => true,
            Fallback::Random(list) => list.is_empty(),
        }
    }

    /// Returns the first matching rule's response, or the fallback.
    pub fn respond<R: Rng>(&self, text: &str, rng: &mut R) -> Option<String> {
        let lowered = text.to_lowercase();
        if let Some(rule) = self.rules.iter().find(|r| r.matches(&lowered)) {
            return Some(rule.response.clone());
        }
        match &self.fallback {
            Fallback::None => None,
            Fallback::Random(list) if list.is_empty() => None,
            Fallback::Random(list) => Some(list[rng.random_range(0..list.len())].clone()),
        }
    }
}
