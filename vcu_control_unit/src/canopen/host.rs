//! VCU-side CANopen producer: SYNC plus the VCU's own heartbeat.

use std::sync::Arc;

use super::codec::{self, NmtState};
use super::device::DeviceError;
use crate::can::CanTransport;

pub struct CanOpenHost {
    transport: Arc<dyn CanTransport>,
    node_id: u8,
}

impl CanOpenHost {
    pub fn new(transport: Arc<dyn CanTransport>, node_id: u8) -> Result<Self, DeviceError> {
        let node_id = codec::check_node(node_id)?;
        Ok(Self { transport, node_id })
    }

    /// One host period: SYNC, then heartbeat as Operational.
    pub fn tick(&self) -> Result<(), DeviceError> {
        self.transport.send(&codec::sync()?)?;
        self.transport
            .send(&codec::heartbeat(self.node_id, NmtState::Operational)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::can::{CanBus, Loopback};

    #[test]
    fn tick_sends_sync_then_heartbeat() {
        let lb = Arc::new(Loopback::new(8));
        let host = CanOpenHost::new(Arc::new(CanBus::new(lb.clone(), 15)), 5).unwrap();
        host.tick().unwrap();

        let sent = lb.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!((sent[0].raw_id(), sent[0].len()), (0x080, 0));
        assert_eq!(sent[1].raw_id(), 0x705);
        assert_eq!(sent[1].payload(), &[0x05]);
    }
}
