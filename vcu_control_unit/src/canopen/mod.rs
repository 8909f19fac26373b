//! CANopen device protocol: framing, per-node device handle, host producer.

pub mod codec;
pub mod device;
pub mod host;

pub use codec::{CodecError, Inbound, NmtCommand, NmtState, PdoMessage, SdoMessage};
pub use device::{CanOpenDevice, DeviceError};
pub use host::CanOpenHost;
