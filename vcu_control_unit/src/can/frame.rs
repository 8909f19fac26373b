//! CAN 2.0 frame value type.
//!
//! Fixed 8-byte payload buffer plus length so frames are `Copy` and can sit
//! in bounded queues without allocation. Implements [`embedded_can::Frame`]
//! so hardware backends convert through the common trait.

use embedded_can::{ExtendedId, Id, StandardId};

pub const MAX_DATA_LEN: usize = 8;

const STANDARD_ID_MASK: u32 = 0x7FF;
const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanFrame {
    id: u32,
    len: u8,
    data: [u8; MAX_DATA_LEN],
    extended: bool,
    remote: bool,
    overrun: bool,
    /// Receive time [µs], 0 for locally built frames.
    timestamp_us: u64,
}

impl CanFrame {
    /// Standard-id data frame. `None` if the id is not 11-bit or `data` is
    /// longer than 8 bytes.
    pub fn standard(id: u32, data: &[u8]) -> Option<Self> {
        if id > STANDARD_ID_MASK {
            return None;
        }
        Self::build(id, data, false)
    }

    pub fn extended(id: u32, data: &[u8]) -> Option<Self> {
        if id > EXTENDED_ID_MASK {
            return None;
        }
        Self::build(id, data, true)
    }

    fn build(id: u32, data: &[u8], extended: bool) -> Option<Self> {
        if data.len() > MAX_DATA_LEN {
            return None;
        }
        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..data.len()].copy_from_slice(data);
        Some(Self {
            id,
            len: data.len() as u8,
            data: buf,
            extended,
            remote: false,
            overrun: false,
            timestamp_us: 0,
        })
    }

    #[inline]
    pub fn raw_id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Payload bytes `[0, len)`.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// Full 8-byte buffer, zero-padded past `len`.
    #[inline]
    pub fn bytes(&self) -> &[u8; MAX_DATA_LEN] {
        &self.data
    }

    pub fn is_overrun(&self) -> bool {
        self.overrun
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    /// Mark that the controller dropped frames before this one.
    pub fn with_overrun(mut self, overrun: bool) -> Self {
        self.overrun = overrun;
        self
    }

    /// Convert from any `embedded_can` frame (e.g. a SocketCAN frame).
    pub fn from_frame<F: embedded_can::Frame>(frame: &F) -> Self {
        let (id, extended) = match frame.id() {
            Id::Standard(sid) => (sid.as_raw() as u32, false),
            Id::Extended(eid) => (eid.as_raw(), true),
        };
        let data = frame.data();
        let len = data.len().min(MAX_DATA_LEN);
        let mut buf = [0u8; MAX_DATA_LEN];
        buf[..len].copy_from_slice(&data[..len]);
        Self {
            id,
            len: if frame.is_remote_frame() {
                frame.dlc().min(MAX_DATA_LEN) as u8
            } else {
                len as u8
            },
            data: buf,
            extended,
            remote: frame.is_remote_frame(),
            overrun: false,
            timestamp_us: 0,
        }
    }

    /// Convert into another `embedded_can` frame type.
    pub fn to_frame<F: embedded_can::Frame>(&self) -> Option<F> {
        let id = embedded_can::Frame::id(self);
        if self.remote {
            F::new_remote(id, self.len())
        } else {
            F::new(id, self.payload())
        }
    }
}

impl embedded_can::Frame for CanFrame {
    fn new(id: impl Into<Id>, data: &[u8]) -> Option<Self> {
        match id.into() {
            Id::Standard(sid) => Self::standard(sid.as_raw() as u32, data),
            Id::Extended(eid) => Self::extended(eid.as_raw(), data),
        }
    }

    fn new_remote(id: impl Into<Id>, dlc: usize) -> Option<Self> {
        if dlc > MAX_DATA_LEN {
            return None;
        }
        let mut frame = <Self as embedded_can::Frame>::new(id, &[])?;
        frame.remote = true;
        frame.len = dlc as u8;
        Some(frame)
    }

    fn is_extended(&self) -> bool {
        self.extended
    }

    fn is_remote_frame(&self) -> bool {
        self.remote
    }

    fn id(&self) -> Id {
        if self.extended {
            // Constructors bound the id, so `new` cannot fail here.
            ExtendedId::new(self.id)
                .map(Id::Extended)
                .unwrap_or(Id::Extended(ExtendedId::ZERO))
        } else {
            StandardId::new(self.id as u16)
                .map(Id::Standard)
                .unwrap_or(Id::Standard(StandardId::ZERO))
        }
    }

    fn dlc(&self) -> usize {
        self.len as usize
    }

    fn data(&self) -> &[u8] {
        if self.remote { &[] } else { self.payload() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_can::Frame;

    #[test]
    fn standard_frame_pads_payload() {
        let f = CanFrame::standard(0x201, &[0x9C, 0xFF]).unwrap();
        assert_eq!(f.raw_id(), 0x201);
        assert_eq!(f.len(), 2);
        assert_eq!(f.payload(), &[0x9C, 0xFF]);
        assert_eq!(f.bytes(), &[0x9C, 0xFF, 0, 0, 0, 0, 0, 0]);
        assert!(!Frame::is_extended(&f));
    }

    #[test]
    fn rejects_oversized() {
        assert!(CanFrame::standard(0x800, &[]).is_none());
        assert!(CanFrame::standard(0x100, &[0; 9]).is_none());
        assert!(CanFrame::extended(0x2000_0000, &[]).is_none());
    }

    #[test]
    fn zero_length_frame() {
        let sync = CanFrame::standard(0x080, &[]).unwrap();
        assert!(sync.is_empty());
        assert_eq!(Frame::dlc(&sync), 0);
    }

    #[test]
    fn embedded_can_view_matches() {
        let f = CanFrame::standard(0x701, &[0x05]).unwrap();
        assert_eq!(Frame::id(&f), Id::Standard(StandardId::new(0x701).unwrap()));

        let copy: CanFrame = f.to_frame().unwrap();
        assert_eq!(copy, f);
        assert_eq!(CanFrame::from_frame(&f), f);
    }

    #[test]
    fn remote_frame_has_no_data() {
        let r = <CanFrame as Frame>::new_remote(StandardId::new(0x181).unwrap(), 8).unwrap();
        assert!(r.is_remote_frame());
        assert_eq!(r.dlc(), 8);
        assert!(Frame::data(&r).is_empty());
    }

    #[test]
    fn metadata_builders() {
        let f = CanFrame::standard(0x181, &[0; 8])
            .unwrap()
            .with_timestamp(1_234)
            .with_overrun(true);
        assert_eq!(f.timestamp_us(), 1_234);
        assert!(f.is_overrun());
    }
}
