//! In-memory CAN interface.
//!
//! Transmitted frames are logged and copied to every tap (simulated nodes
//! listen on taps); frames for the VCU are injected and come back out of
//! [`CanInterface::try_receive`]. Used by the simulation build and tests.

use parking_lot::{Mutex, RwLock};

use super::frame::CanFrame;
use super::transport::{CanInterface, TransportError};
use crate::queue::{Queue, Timeout};

pub struct Loopback {
    inbound: Queue<CanFrame>,
    sent: Mutex<Vec<CanFrame>>,
    taps: RwLock<Vec<Queue<CanFrame>>>,
    capacity: usize,
}

impl Loopback {
    pub fn new(capacity: usize) -> Self {
        Self {
            inbound: Queue::bounded("loopback-rx", capacity),
            sent: Mutex::new(Vec::new()),
            taps: RwLock::new(Vec::new()),
            capacity,
        }
    }

    /// Queue a frame as if it arrived from the wire.
    pub fn inject(&self, frame: CanFrame) -> bool {
        self.inbound.enqueue(frame)
    }

    /// New queue that sees every frame transmitted from now on.
    pub fn tap(&self) -> Queue<CanFrame> {
        let q = Queue::bounded("loopback-tap", self.capacity);
        self.taps.write().push(q.clone());
        q
    }

    /// Copy of every frame transmitted so far.
    pub fn sent(&self) -> Vec<CanFrame> {
        self.sent.lock().clone()
    }

    pub fn take_sent(&self) -> Vec<CanFrame> {
        std::mem::take(&mut *self.sent.lock())
    }

    pub fn sent_with_id(&self, id: u32) -> Vec<CanFrame> {
        self.sent
            .lock()
            .iter()
            .filter(|f| f.raw_id() == id)
            .copied()
            .collect()
    }
}

impl CanInterface for Loopback {
    fn transmit(&self, frame: &CanFrame) -> Result<(), TransportError> {
        self.sent.lock().push(*frame);
        for tap in self.taps.read().iter() {
            tap.enqueue(*frame);
        }
        Ok(())
    }

    fn try_receive(&self) -> Result<Option<CanFrame>, TransportError> {
        Ok(self.inbound.dequeue(Timeout::Immediate))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::transport::{CanBus, CanTransport};
    use std::sync::Arc;

    #[test]
    fn send_is_logged_and_tapped() {
        let lb = Loopback::new(16);
        let tap = lb.tap();
        let f = CanFrame::standard(0x000, &[0x81, 0x01]).unwrap();
        lb.transmit(&f).unwrap();

        assert_eq!(lb.sent(), vec![f]);
        assert_eq!(tap.dequeue(Timeout::Immediate), Some(f));
        assert_eq!(lb.take_sent().len(), 1);
        assert!(lb.sent().is_empty());
    }

    #[test]
    fn pump_respects_burst_limit() {
        let lb = Arc::new(Loopback::new(64));
        let bus = CanBus::new(lb.clone(), 15);
        let q = Queue::bounded("rx", 64);
        bus.subscribe(0x701, q.clone());

        for _ in 0..20 {
            lb.inject(CanFrame::standard(0x701, &[0x05]).unwrap());
        }

        assert_eq!(bus.pump().unwrap(), 15);
        assert_eq!(q.len(), 15);
        assert_eq!(bus.pump().unwrap(), 5);
        assert_eq!(bus.pump().unwrap(), 0);
        assert_eq!(q.len(), 20);
    }

    #[test]
    fn bus_send_goes_through_interface() {
        let lb = Arc::new(Loopback::new(4));
        let bus = CanBus::new(lb.clone(), 15);
        bus.send(&CanFrame::standard(0x080, &[]).unwrap()).unwrap();
        assert_eq!(lb.sent_with_id(0x080).len(), 1);
    }
}
