//! Linux SocketCAN backend.

use ::socketcan::{CanSocket, Socket};
use tracing::{info, warn};

use super::frame::CanFrame;
use super::transport::{CanInterface, TransportError};

pub struct SocketCanInterface {
    socket: CanSocket,
}

impl SocketCanInterface {
    /// Open `iface` in non-blocking mode; the bus thread polls it.
    pub fn open(iface: &str) -> Result<Self, TransportError> {
        let socket = CanSocket::open(iface).map_err(|source| TransportError::Open {
            iface: iface.to_string(),
            source,
        })?;
        socket
            .set_nonblocking(true)
            .map_err(|source| TransportError::Open {
                iface: iface.to_string(),
                source,
            })?;
        info!(iface, "SocketCAN interface open");
        Ok(Self { socket })
    }
}

impl CanInterface for SocketCanInterface {
    fn transmit(&self, frame: &CanFrame) -> Result<(), TransportError> {
        let out: ::socketcan::CanFrame = frame
            .to_frame()
            .ok_or(TransportError::Frame { id: frame.raw_id() })?;
        self.socket.write_frame(&out).map_err(TransportError::Write)
    }

    fn try_receive(&self) -> Result<Option<CanFrame>, TransportError> {
        match self.socket.read_frame() {
            Ok(::socketcan::CanFrame::Error(err)) => {
                warn!(?err, "CAN error frame");
                Ok(None)
            }
            Ok(frame) => Ok(Some(CanFrame::from_frame(&frame))),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(TransportError::Read(e)),
        }
    }
}
