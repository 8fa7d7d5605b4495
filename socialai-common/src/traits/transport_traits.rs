use async_trait::async_trait;
use crate::error::{ConnectError, Error};
use crate::models::activity::RecoveredMessage;
use crate::models::platform::Platform;

/// The real connection/message layer (browser automation client, provider
/// API, ...). The orchestrator never speaks a wire protocol itself.
#[async_trait]
pub trait AccountTransport: Send + Sync {
    /// Links the account. Resolves once the provider reports it ready.
    async fn initiate_link(&self, platform: Platform) -> Result<(), ConnectError>;

    /// Tears the link down. Failures are logged by the caller.
    async fn release_link(&self, platform: Platform) -> Result<(), Error>;

    /// Delivers an automated reply.
    async fn send(&self, platform: Platform, target: &str, text: &str) -> Result<(), Error>;

    /// Scans the provider's local store for messages deleted by their senders.
    async fn recover_deleted_messages(&self, platform: Platform) -> Result<Vec<RecoveredMessage>, Error>;
}
