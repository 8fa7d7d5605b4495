use async_trait::async_trait;
use crate::error::SettingsError;
use crate::models::feature::FeatureFlags;

/// Persists the feature toggles as one opaque blob.
///
/// `load` on an empty store returns the default flags, not an error.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn load(&self) -> Result<FeatureFlags, SettingsError>;
    async fn save(&self, flags: &FeatureFlags) -> Result<(), SettingsError>;
}
