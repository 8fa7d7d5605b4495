// File: src/platforms/mod.rs

use async_trait::async_trait;
use socialai_common::models::Platform;

/// Receives account lifecycle edges from the connection manager.
///
/// `on_account_ready` is awaited before the `connect` call that caused it
/// returns, so automations are live by the time the caller sees `Connected`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AccountListener: Send + Sync {
    async fn on_account_ready(&self, platform: Platform);
    async fn on_account_lost(&self, platform: Platform);
}

pub mod manager;

pub use manager::ConnectionManager;
