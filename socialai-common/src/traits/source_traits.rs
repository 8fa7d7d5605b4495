use async_trait::async_trait;
use crate::models::event::InboundEvent;

/// A lazy sequence of inbound events. `None` ends the sequence.
#[async_trait]
pub trait EventSource: Send {
    async fn next_event(&mut self) -> Option<InboundEvent>;
}
