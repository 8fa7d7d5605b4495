// File: socialai-common/src/models/mod.rs
pub mod platform;
pub mod feature;
pub mod activity;
pub mod event;

pub use platform::{Account, AccountState, Platform};
pub use feature::{FeatureFlags, FeatureId};
pub use activity::{ActivityEntry, ActivitySource, RecoveredMessage};
pub use event::InboundEvent;
