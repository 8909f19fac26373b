//! Battery management stand-in.
//!
//! `Ready → AwaitActive → Active` on a close request, with the precharge
//! finishing `precharge_ms` after the first [`SimBattery::tick`] that sees
//! it. Faults are injected with [`SimBattery::set_status`].

use std::sync::atomic::{AtomicBool, AtomicU8, AtomicU32, Ordering};

use parking_lot::Mutex;
use tracing::debug;
use vcu_common::vehicle::state::ContactorStatus;

use crate::battery::Battery;

/// `f32` stored as its bit pattern.
#[derive(Debug)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn new(v: f32) -> Self {
        Self(AtomicU32::new(v.to_bits()))
    }

    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Acquire))
    }

    fn store(&self, v: f32) {
        self.0.store(v.to_bits(), Ordering::Release);
    }
}

#[derive(Debug)]
pub struct SimBattery {
    status: AtomicU8,
    precharge_ms: u64,
    precharge_started: Mutex<Option<u64>>,
    /// Precharge never completes.
    stuck: AtomicBool,
    close_requests: AtomicU32,
    open_requests: AtomicU32,
    max_charge: AtomicF32,
    max_discharge: AtomicF32,
    voltage: AtomicF32,
    current: AtomicF32,
}

impl SimBattery {
    pub fn new(precharge_ms: u64) -> Self {
        Self {
            status: AtomicU8::new(ContactorStatus::Ready as u8),
            precharge_ms,
            precharge_started: Mutex::new(None),
            stuck: AtomicBool::new(false),
            close_requests: AtomicU32::new(0),
            open_requests: AtomicU32::new(0),
            max_charge: AtomicF32::new(20.0),
            max_discharge: AtomicF32::new(150.0),
            voltage: AtomicF32::new(400.0),
            current: AtomicF32::new(0.0),
        }
    }

    /// Advance the precharge.
    pub fn tick(&self, now_ms: u64) {
        if self.contactor_status() != ContactorStatus::AwaitActive || self.stuck.load(Ordering::Acquire) {
            return;
        }
        let mut started = self.precharge_started.lock();
        let start = *started.get_or_insert(now_ms);
        if now_ms.saturating_sub(start) >= self.precharge_ms {
            let closed = self
                .status
                .compare_exchange(
                    ContactorStatus::AwaitActive as u8,
                    ContactorStatus::Active as u8,
                    Ordering::AcqRel,
                    Ordering::Acquire,
                )
                .is_ok();
            if closed {
                debug!(precharge_ms = self.precharge_ms, "sim battery: contactors closed");
            }
        }
    }

    pub fn set_status(&self, status: ContactorStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    pub fn set_stuck(&self, stuck: bool) {
        self.stuck.store(stuck, Ordering::Release);
    }

    pub fn set_max_charge_current(&self, amps: f32) {
        self.max_charge.store(amps);
    }

    pub fn set_terminal_current(&self, amps: f32) {
        self.current.store(amps);
    }

    pub fn close_requests(&self) -> u32 {
        self.close_requests.load(Ordering::Acquire)
    }

    pub fn open_requests(&self) -> u32 {
        self.open_requests.load(Ordering::Acquire)
    }
}

impl Battery for SimBattery {
    fn contactor_status(&self) -> ContactorStatus {
        ContactorStatus::from_u8(self.status.load(Ordering::Acquire)).unwrap_or(ContactorStatus::Error)
    }

    fn max_charge_current(&self) -> f32 {
        self.max_charge.load()
    }

    fn max_discharge_current(&self) -> f32 {
        self.max_discharge.load()
    }

    fn pack_voltage(&self) -> f32 {
        self.voltage.load()
    }

    fn terminal_current(&self) -> f32 {
        self.current.load()
    }

    fn close_contactors(&self) {
        self.close_requests.fetch_add(1, Ordering::AcqRel);
        if self
            .status
            .compare_exchange(
                ContactorStatus::Ready as u8,
                ContactorStatus::AwaitActive as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok()
        {
            *self.precharge_started.lock() = None;
        }
    }

    fn open_contactors(&self) {
        self.open_requests.fetch_add(1, Ordering::AcqRel);
        let _ = self.status.fetch_update(Ordering::AcqRel, Ordering::Acquire, |s| {
            match ContactorStatus::from_u8(s) {
                Some(ContactorStatus::AwaitActive | ContactorStatus::Active) => {
                    Some(ContactorStatus::Ready as u8)
                }
                _ => None,
            }
        });
    }
}
