// File: socialai-common/src/models/platform.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

/// A kind of linked account. The platform is the account's identity key:
/// there is exactly one `Account` per platform.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    WhatsApp,
    Instagram,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::WhatsApp, Platform::Instagram];
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::WhatsApp => write!(f, "whatsapp"),
            Platform::Instagram => write!(f, "instagram"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "whatsapp" => Ok(Platform::WhatsApp),
            "instagram" => Ok(Platform::Instagram),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// Connection lifecycle of one account.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AccountState {
    Disconnected,
    Connecting,
    Connected,
    Failed,
}

impl AccountState {
    /// `connect` may only start from these states.
    pub fn can_connect(&self) -> bool {
        matches!(self, AccountState::Disconnected | AccountState::Failed)
    }
}

impl fmt::Display for AccountState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccountState::Disconnected => "Disconnected",
            AccountState::Connecting => "Connecting",
            AccountState::Connected => "Connected",
            AccountState::Failed => "Failed",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq)]
pub struct Account {
    pub platform: Platform,
    pub state: AccountState,
}

impl Account {
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            state: AccountState::Disconnected,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.state == AccountState::Connected
    }
}
