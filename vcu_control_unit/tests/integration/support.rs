//! Lockstep rig over [`SimWorld`].

use vcu_common::vehicle::config::VcuConfig;
use vcu_common::vehicle::state::{InverterState, TsState};
use vcu_control_unit::inverter::InverterControl;
use vcu_control_unit::sim::SimWorld;

pub const TICK_MS: u64 = 10;
pub const TORQUE_COB_ID: u32 = 0x201;
pub const PRECHARGE_MS: u64 = 200;

pub struct Rig {
    pub world: SimWorld,
    pub now: u64,
}

impl Rig {
    pub fn new(cfg: VcuConfig) -> Self {
        let world = SimWorld::new(&cfg, PRECHARGE_MS).expect("sim world");
        world.step(0);
        Self { world, now: 0 }
    }

    pub fn with_defaults() -> Self {
        Self::new(VcuConfig::default())
    }

    pub fn step(&mut self) {
        self.now += TICK_MS;
        self.world.step(self.now);
    }

    pub fn steps(&mut self, n: usize) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Step until `pred` holds, failing after `limit_ms` of simulated time.
    pub fn run_until(&mut self, limit_ms: u64, what: &str, pred: impl Fn(&SimWorld) -> bool) {
        let deadline = self.now + limit_ms;
        while !pred(&self.world) {
            assert!(
                self.now < deadline,
                "timed out waiting for {what}: ts={:?} inverter={:?}",
                self.world.supervisor.state(),
                self.world.inverter.state()
            );
            self.step();
        }
    }

    pub fn ts_state(&self) -> TsState {
        self.world.supervisor.state()
    }

    /// Idle → Driving through the full ready-to-drive procedure.
    pub fn drive_up(&mut self) {
        let io = self.world.io.clone();

        io.set_tsas(true);
        self.run_until(2_000, "WaitR2D", |w| w.supervisor.state() == TsState::WaitR2D);
        io.set_tsas(false);

        self.run_until(2_000, "inverter pre-operational", |w| {
            w.inverter.state() == InverterState::PreOp
        });

        io.set_brake(true);
        io.set_start(true);
        self.run_until(3_000, "buzzer", |w| w.supervisor.state() == TsState::Buzzer);
        io.set_start(false);
        io.set_brake(false);

        self.run_until(2_000, "driving", |w| w.supervisor.state() == TsState::Driving);
        assert_eq!(self.world.inverter.state(), InverterState::Drive);
    }

    /// First two bytes of the most recent torque RPDO.
    pub fn last_torque_wire(&self) -> Option<[u8; 2]> {
        self.world
            .loopback
            .sent_with_id(TORQUE_COB_ID)
            .last()
            .map(|f| [f.payload()[0], f.payload()[1]])
    }
}
