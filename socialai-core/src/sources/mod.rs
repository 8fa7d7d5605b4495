//! Event sources feeding the orchestrator.

use std::collections::VecDeque;
use async_trait::async_trait;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use socialai_common::models::InboundEvent;
use socialai_common::traits::EventSource;

/// A fixed, already-known sequence of events.
#[derive(Debug, Default, Clone)]
pub struct ScriptedEventSource {
    events: VecDeque<InboundEvent>,
}

impl ScriptedEventSource {
    pub fn new(events: impl IntoIterator<Item = InboundEvent>) -> Self {
        Self { events: events.into_iter().collect() }
    }

    pub fn remaining(&self) -> usize {
        self.events.len()
    }
}

#[async_trait]
impl EventSource for ScriptedEventSource {
    async fn next_event(&mut self) -> Option<InboundEvent> {
        self.events.pop_front()
    }
}

/// Events pushed by a transport over a channel. Ends when every sender is gone.
pub struct ChannelEventSource {
    rx: mpsc::Receiver<InboundEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: mpsc::Receiver<InboundEvent>) -> Self {
        Self { rx }
    }

    /// Creates a connected sender/source pair.
    pub fn channel(buffer: usize) -> (mpsc::Sender<InboundEvent>, Self) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait]
impl EventSource for ChannelEventSource {
    async fn next_event(&mut self) -> Option<InboundEvent> {
        self.rx.recv().await
    }
}

/// Adapts any `Stream` of events.
pub struct StreamEventSource<S> {
    stream: S,
}

impl<S> StreamEventSource<S>
where
    S: Stream<Item = InboundEvent> + Unpin + Send,
{
    pub fn new(stream: S) -> Self {
        Self { stream }
    }
}

#[async_trait]
impl<S> EventSource for StreamEventSource<S>
where
    S: Stream<Item = InboundEvent> + Unpin + Send,
{
    async fn next_event(&mut self) -> Option<InboundEvent> {
        self.stream.next().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use socialai_common::models::Platform;

    #[tokio::test]
    async fn scripted_source_yields_in_order_then_ends() {
        let mut src = ScriptedEventSource::new(vec![
            InboundEvent::direct("one"),
            InboundEvent::StatusTick { platform: Platform::WhatsApp },
        ]);
        assert_eq!(src.next_event().await, Some(InboundEvent::direct("one")));
        assert_eq!(src.remaining(), 1);
        assert!(src.next_event().await.is_some());
        assert_eq!(src.next_event().await, None);
    }

    #[tokio::test]
    async fn channel_source_ends_with_senders() {
        let (tx, mut src) = ChannelEventSource::channel(4);
        tx.send(InboundEvent::direct("hey")).await.unwrap();
        drop(tx);
        assert_eq!(src.next_event().await, Some(InboundEvent::direct("hey")));
        assert_eq!(src.next_event().await, None);
    }

    #[tokio::test]
    async fn stream_source_wraps_iterators() {
        let stream = futures_util::stream::iter(vec![InboundEvent::direct("a"), InboundEvent::direct("b")]);
        let mut src = StreamEventSource::new(stream);
        assert_eq!(src.next_event().await, Some(InboundEvent::direct("a")));
        assert_eq!(src.next_event().await, Some(InboundEvent::direct("b")));
        assert_eq!(src.next_event().await, None);
    }
}
