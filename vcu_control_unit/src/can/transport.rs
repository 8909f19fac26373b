//! CAN transport capability and subscriber fan-out.
//!
//! Components only ever see [`CanTransport`]: `send` a frame, or
//! `subscribe` a queue to an identifier. The bus receive thread pulls raw
//! frames off a [`CanInterface`] and posts them to every queue subscribed
//! to that identifier.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{trace, warn};

use super::frame::CanFrame;
use crate::queue::Queue;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("failed to open CAN interface {iface}: {source}")]
    Open {
        iface: String,
        #[source]
        source: std::io::Error,
    },
    #[error("CAN write failed: {0}")]
    Write(std::io::Error),
    #[error("CAN read failed: {0}")]
    Read(std::io::Error),
    #[error("frame {id:#x} cannot be represented on this bus")]
    Frame { id: u32 },
    #[error("CAN interface closed")]
    Closed,
}

/// What components use to talk on the bus.
pub trait CanTransport: Send + Sync {
    fn send(&self, frame: &CanFrame) -> Result<(), TransportError>;

    /// Deliver every future frame with `id` to `queue`. A queue may be
    /// subscribed to many ids; an id may have many queues.
    fn subscribe(&self, id: u32, queue: Queue<CanFrame>);
}

/// Raw driver underneath a [`CanBus`]: one socket, one loopback, etc.
pub trait CanInterface: Send + Sync {
    fn transmit(&self, frame: &CanFrame) -> Result<(), TransportError>;

    /// Non-blocking read. `Ok(None)` when nothing is pending.
    fn try_receive(&self) -> Result<Option<CanFrame>, TransportError>;
}

// ─── Subscriber Map ─────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct SubscriberMap {
    routes: RwLock<HashMap<u32, Vec<Queue<CanFrame>>>>,
}

impl SubscriberMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: u32, queue: Queue<CanFrame>) {
        self.routes.write().entry(id).or_default().push(queue);
    }

    /// Fan a frame out to its subscribers. Returns how many accepted it.
    pub fn post(&self, frame: &CanFrame) -> usize {
        let routes = self.routes.read();
        match routes.get(&frame.raw_id()) {
            Some(queues) => queues.iter().filter(|q| q.enqueue(*frame)).count(),
            None => {
                trace!(id = frame.raw_id(), "no subscriber, frame dropped");
                0
            }
        }
    }
}

// ─── Bus ────────────────────────────────────────────────────────────

/// Transport implementation over a [`CanInterface`].
///
/// `send` goes straight to the interface from the caller's thread;
/// reception happens only in [`CanBus::pump`], called by the bus thread.
pub struct CanBus<I: CanInterface> {
    iface: Arc<I>,
    subscribers: SubscriberMap,
    max_reads: usize,
}

impl<I: CanInterface> CanBus<I> {
    pub fn new(iface: Arc<I>, max_reads: usize) -> Self {
        Self {
            iface,
            subscribers: SubscriberMap::new(),
            max_reads,
        }
    }

    /// Drain up to `max_reads` frames and fan them out.
    ///
    /// Returns the number of frames read this burst.
    pub fn pump(&self) -> Result<usize, TransportError> {
        let mut reads = 0;
        while reads < self.max_reads {
            match self.iface.try_receive()? {
                Some(frame) => {
                    if frame.is_overrun() {
                        warn!(id = frame.raw_id(), "CAN controller overrun before frame");
                    }
                    self.subscribers.post(&frame);
                    reads += 1;
                }
                None => return Ok(reads),
            }
        }
        warn!(max_reads = self.max_reads, "bus read limit hit, deferring to next wake");
        Ok(reads)
    }
}

impl<I: CanInterface> CanTransport for CanBus<I> {
    fn send(&self, frame: &CanFrame) -> Result<(), TransportError> {
        self.iface.transmit(frame)
    }

    fn subscribe(&self, id: u32, queue: Queue<CanFrame>) {
        self.subscribers.insert(id, queue);
    }
}
