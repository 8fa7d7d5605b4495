//! Settings persistence.
//!
//! The feature toggles are stored as a single JSON object. Loading is
//! lenient (see `FeatureFlags`), saving always writes every canonical key.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use async_trait::async_trait;
use tracing::{debug, info};
use socialai_common::error::SettingsError;
use socialai_common::models::FeatureFlags;
use socialai_common::traits::SettingsStore;

/// Keeps the blob in a JSON file on disk.
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl SettingsStore for JsonFileSettingsStore {
    async fn load(&self) -> Result<FeatureFlags, SettingsError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no settings at {}; using defaults", self.path.display());
                return Ok(FeatureFlags::default());
            }
            Err(e) => return Err(e.into()),
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(FeatureFlags::from_value(&value))
    }

    async fn save(&self, flags: &FeatureFlags) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let blob = serde_json::to_string_pretty(flags)?;

        // write-then-rename: readers only ever see a complete file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, blob).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        info!("settings saved to {}", self.path.display());
        Ok(())
    }
}

/// Keeps the serialised blob in memory. Useful for tests and for running
/// without a writable disk.
#[derive(Default)]
pub struct InMemorySettingsStore {
    blob: Mutex<Option<String>>,
}

impl InMemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from an arbitrary raw blob, e.g. one written by an older build.
    pub fn with_blob(raw: impl Into<String>) -> Self {
        Self { blob: Mutex::new(Some(raw.into())) }
    }

    pub fn raw(&self) -> Option<String> {
        self.blob.lock().map(|b| b.clone()).unwrap_or(None)
    }
}

#[async_trait]
impl SettingsStore for InMemorySettingsStore {
    async fn load(&self) -> Result<FeatureFlags, SettingsError> {
        let Some(raw) = self.raw() else {
            return Ok(FeatureFlags::default());
        };
        let value: serde_json::Value = serde_json::from_str(&raw)?;
        Ok(FeatureFlags::from_value(&value))
    }

    async fn save(&self, flags: &FeatureFlags) -> Result<(), SettingsError> {
        let blob = serde_json::to_string(flags)?;
        if let Ok(mut slot) = self.blob.lock() {
            *slot = Some(blob);
        }
        Ok(())
    }
}
