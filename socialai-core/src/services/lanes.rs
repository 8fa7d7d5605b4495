//! Per-platform sequential work queues.
//!
//! Every platform gets one lane (plus one for the assistant chat). A lane is
//! drained by a single worker task, so two events of the same platform are
//! never handled concurrently and are handled in arrival order. Different
//! lanes run independently.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use socialai_common::Error;
use socialai_common::models::{InboundEvent, Platform};
use crate::services::dispatcher::DispatchOutcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lane {
    Direct,
    Platform(Platform),
}

impl Lane {
    pub fn of(event: &InboundEvent) -> Lane {
        match event.platform() {
            Some(p) => Lane::Platform(p),
            None => Lane::Direct,
        }
    }

    pub fn all() -> Vec<Lane> {
        std::iter::once(Lane::Direct)
            .chain(Platform::ALL.into_iter().map(Lane::Platform))
            .collect()
    }
}

impl fmt::Display for Lane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Lane::Direct => write!(f, "direct"),
            Lane::Platform(p) => write!(f, "{}", p),
        }
    }
}

/// Internal work that must run in a platform's order but is not an
/// inbound event.
#[derive(Debug)]
pub enum LaneJob {
    RecoverMessages {
        platform: Platform,
        token: CancellationToken,
    },
}

enum LaneWork {
    Event {
        event: InboundEvent,
        reply: Option<oneshot::Sender<DispatchOutcome>>,
    },
    Job(LaneJob),
    Barrier(oneshot::Sender<()>),
}

/// What a lane worker calls for each item.
#[async_trait]
pub trait LaneHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: InboundEvent) -> DispatchOutcome;
    async fn run_job(&self, job: LaneJob);
}

/// Cheap-to-clone handle for enqueuing work on any lane.
#[derive(Clone)]
pub struct LaneRouter {
    senders: Arc<HashMap<Lane, mpsc::UnboundedSender<LaneWork>>>,
    receivers: Arc<Mutex<Option<HashMap<Lane, mpsc::UnboundedReceiver<LaneWork>>>>>,
}

impl Default for LaneRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl LaneRouter {
    pub fn new() -> Self {
        let mut senders = HashMap::new();
        let mut receivers = HashMap::new();
        for lane in Lane::all() {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.insert(lane, tx);
            receivers.insert(lane, rx);
        }
        Self {
            senders: Arc::new(senders),
            receivers: Arc::new(Mutex::new(Some(receivers))),
        }
    }

    /// Spawns one worker per lane. Workers exit when `token` is cancelled.
    /// Calling this a second time does nothing.
    pub fn start(&self, handler: Arc<dyn LaneHandler>, token: CancellationToken) -> Vec<JoinHandle<()>> {
        let receivers = match self.receivers.lock() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        let Some(receivers) = receivers else {
            return Vec::new();
        };

        receivers
            .into_iter()
            .map(|(lane, rx)| spawn_lane_worker(lane, rx, Arc::clone(&handler), token.clone()))
            .collect()
    }

    /// Queues an event without waiting for it to be handled.
    pub fn submit(&self, event: InboundEvent) -> Result<(), Error> {
        let lane = Lane::of(&event);
        self.send(lane, LaneWork::Event { event, reply: None })
    }

    /// Queues an event and waits for its outcome.
    pub async fn dispatch(&self, event: InboundEvent) -> Result<DispatchOutcome, Error> {
        let lane = Lane::of(&event);
        let (tx, rx) = oneshot::channel();
        self.send(lane, LaneWork::Event { event, reply: Some(tx) })?;
        rx.await
            .map_err(|_| Error::EventBus(format!("lane '{}' stopped before handling the event", lane)))
    }

    pub fn enqueue_job(&self, lane: Lane, job: LaneJob) -> Result<(), Error> {
        self.send(lane, LaneWork::Job(job))
    }

    /// Resolves once everything queued on `lane` before this call is done.
    pub async fn flush(&self, lane: Lane) -> Result<(), Error> {
        let (tx, rx) = oneshot::channel();
        self.send(lane, LaneWork::Barrier(tx))?;
        rx.await
            .map_err(|_| Error::EventBus(format!("lane '{}' stopped before flushing", lane)))
    }

    fn send(&self, lane: Lane, work: LaneWork) -> Result<(), Error> {
        let sender = self
            .senders
            .get(&lane)
            .ok_or_else(|| Error::NotFound(format!("lane '{}'", lane)))?;
        sender
            .send(work)
            .map_err(|_| Error::EventBus(format!("lane '{}' is closed", lane)))
    }
}

fn spawn_lane_worker(
    lane: Lane,
    mut rx: mpsc::UnboundedReceiver<LaneWork>,
    handler: Arc<dyn LaneHandler>,
    token: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        debug!("[{}] lane worker started", lane);
        loop {
            let work = tokio::select! {
                biased;
                _ = token.cancelled() => break,
                work = rx.recv() => match work {
                    Some(w) => w,
                    None => break,
                },
            };

            match work {
                LaneWork::Event { event, reply } => {
                    let outcome = handler.handle_event(event).await;
                    if let Some(tx) = reply {
                        let _ = tx.send(outcome);
                    }
                }
                LaneWork::Job(job) => handler.run_job(job).await,
                LaneWork::Barrier(tx) => {
                    let _ = tx.send(());
                }
            }
        }
        // closing the queue makes pending dispatch/flush callers fail fast
        rx.close();
        info!("[{}] lane worker ended", lane);
    })
}
