//! Switch panel and indicator outputs backed by atomics.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::io::DigitalIo;

#[derive(Debug, Default)]
pub struct SimIo {
    sdc: AtomicBool,
    tsas: AtomicBool,
    start: AtomicBool,
    brake: AtomicBool,
    regen: AtomicBool,
    buzzer: AtomicBool,
    r2d_led: AtomicBool,
}

impl SimIo {
    /// Shutdown circuit closed, everything else released.
    pub fn new() -> Self {
        let io = Self::default();
        io.set_sdc(true);
        io
    }

    pub fn set_sdc(&self, closed: bool) {
        self.sdc.store(closed, Ordering::Release);
    }

    pub fn set_tsas(&self, pressed: bool) {
        self.tsas.store(pressed, Ordering::Release);
    }

    pub fn set_start(&self, pressed: bool) {
        self.start.store(pressed, Ordering::Release);
    }

    pub fn set_brake(&self, applied: bool) {
        self.brake.store(applied, Ordering::Release);
    }

    pub fn set_regen(&self, on: bool) {
        self.regen.store(on, Ordering::Release);
    }

    pub fn buzzer(&self) -> bool {
        self.buzzer.load(Ordering::Acquire)
    }

    pub fn r2d_led(&self) -> bool {
        self.r2d_led.load(Ordering::Acquire)
    }
}

impl DigitalIo for SimIo {
    fn sdc_closed(&self) -> bool {
        self.sdc.load(Ordering::Acquire)
    }

    fn tsas_pressed(&self) -> bool {
        self.tsas.load(Ordering::Acquire)
    }

    fn start_pressed(&self) -> bool {
        self.start.load(Ordering::Acquire)
    }

    fn brake_applied(&self) -> bool {
        self.brake.load(Ordering::Acquire)
    }

    fn regen_switch(&self) -> bool {
        self.regen.load(Ordering::Acquire)
    }

    fn set_buzzer(&self, on: bool) {
        self.buzzer.store(on, Ordering::Release);
    }

    fn set_r2d_led(&self, on: bool) {
        self.r2d_led.store(on, Ordering::Release);
    }
}
