//! Board I/O seams polled once per supervisor tick.

/// Discrete inputs and outputs of the tractive-system loop.
pub trait DigitalIo: Send + Sync {
    /// Shutdown circuit continuity.
    fn sdc_closed(&self) -> bool;
    /// Tractive-system activation switch.
    fn tsas_pressed(&self) -> bool;
    fn start_pressed(&self) -> bool;
    /// Discrete brake switch.
    fn brake_applied(&self) -> bool;
    /// Driver regen enable switch.
    fn regen_switch(&self) -> bool;

    fn set_buzzer(&self, on: bool);
    fn set_r2d_led(&self, on: bool);
}

/// Latest conversion result per ADC channel.
pub trait AnalogInput: Send + Sync {
    fn read(&self, channel: u8) -> u16;
}
