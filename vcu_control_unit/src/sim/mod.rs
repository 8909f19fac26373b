//! Simulated vehicle: switch panel, pedal ADC, battery, inverter node, and
//! a scripted driver, wired over the loopback bus.
//!
//! [`SimWorld`] is the composition used by `--simulate` and by the
//! integration tests; [`SimWorld::step`] runs every component once in a
//! fixed order for lockstep tests.

pub mod adc;
pub mod battery;
pub mod driver;
pub mod inverter_node;
pub mod io;

use std::sync::Arc;

use tracing::warn;
use vcu_common::vehicle::config::VcuConfig;

pub use adc::SimAdc;
pub use battery::SimBattery;
pub use driver::ScriptedDriver;
pub use inverter_node::SimInverterNode;
pub use io::SimIo;

use crate::can::{CanBus, Loopback};
use crate::canopen::{CanOpenDevice, CanOpenHost, DeviceError};
use crate::inverter::InverterSupervisor;
use crate::tractive::{Collaborators, TractiveSupervisor};

/// Default simulated precharge time [ms].
pub const SIM_PRECHARGE_MS: u64 = 1_000;
/// Simulated inverter TPDO/heartbeat period [ms].
pub const SIM_NODE_PERIOD_MS: u64 = 100;

pub struct SimWorld {
    pub cfg: VcuConfig,
    pub loopback: Arc<Loopback>,
    pub bus: Arc<CanBus<Loopback>>,
    pub device: Arc<CanOpenDevice>,
    pub inverter: Arc<InverterSupervisor>,
    pub node: Arc<SimInverterNode>,
    pub host: CanOpenHost,
    pub io: Arc<SimIo>,
    pub adc: Arc<SimAdc>,
    pub battery: Arc<SimBattery>,
    pub supervisor: Arc<TractiveSupervisor>,
}

impl SimWorld {
    pub fn new(cfg: &VcuConfig, precharge_ms: u64) -> Result<Self, DeviceError> {
        let loopback = Arc::new(Loopback::new(cfg.bus.queue_capacity));
        let bus = Arc::new(CanBus::new(loopback.clone(), cfg.bus.max_reads));
        let node = Arc::new(SimInverterNode::new(loopback.clone(), &cfg.inverter));

        let device = Arc::new(CanOpenDevice::new(
            bus.clone(),
            cfg.inverter.node_id,
            &cfg.inverter.tpdo_bases,
            cfg.bus.queue_capacity,
        )?);
        let inverter = Arc::new(InverterSupervisor::new(device.clone(), &cfg.inverter));
        let host = CanOpenHost::new(bus.clone(), cfg.bus.vcu_node_id)?;

        let io = Arc::new(SimIo::new());
        let adc = Arc::new(SimAdc::new(cfg));
        let battery = Arc::new(SimBattery::new(precharge_ms));
        let supervisor = Arc::new(TractiveSupervisor::new(
            cfg,
            Collaborators {
                io: io.clone(),
                adc: adc.clone(),
                battery: battery.clone(),
                inverter: inverter.clone(),
            },
        ));

        Ok(Self {
            cfg: cfg.clone(),
            loopback,
            bus,
            device,
            inverter,
            node,
            host,
            io,
            adc,
            battery,
            supervisor,
        })
    }

    /// Move frames until both sides are quiet.
    pub fn pump(&self) {
        loop {
            let handled = self.node.poll();
            let received = match self.bus.pump() {
                Ok(n) => n,
                Err(e) => {
                    warn!(error = %e, "sim bus pump failed");
                    0
                }
            };
            self.device.process_pending();
            if handled == 0 && received == 0 {
                break;
            }
        }
    }

    /// One lockstep period of every component at `now_ms`.
    pub fn step(&self, now_ms: u64) {
        self.battery.tick(now_ms);
        self.pump();
        self.inverter.tick(now_ms);
        self.pump();
        self.supervisor.tick(now_ms);
        self.pump();
        if now_ms % self.cfg.timing.host_period_ms == 0 {
            if let Err(e) = self.host.tick() {
                warn!(error = %e, "host tick failed");
            }
        }
        if now_ms % SIM_NODE_PERIOD_MS == 0 {
            self.node.publish();
        }
        self.pump();
    }
}
