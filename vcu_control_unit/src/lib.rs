//! # VCU Control Unit Library
//!
//! Drive-path control for an electric race car: the tractive-system state
//! machine, pedal plausibility, the CANopen inverter supervisor, and the
//! bus plumbing underneath them.
//!
//! ## Layers
//!
//! 1. **CAN** ([`can`]): frame type, `{send, subscribe}` transport, backends
//! 2. **CANopen** ([`canopen`]): framing, per-node device, SYNC/heartbeat host
//! 3. **Inverter** ([`inverter`]): boot/enable sequence and torque PDO
//! 4. **Plausibility** ([`plausibility`]): pedal channels and checks
//! 5. **Tractive system** ([`tractive`]): `TsState` machine and torque shaping
//!
//! Every component is constructed once by the binary and shared through
//! `Arc` handles; nothing is global. Periodic threads come from
//! [`runtime`]. [`sim`] supplies in-memory collaborators for the
//! `--simulate` build and the tests.

pub mod battery;
pub mod can;
pub mod canopen;
pub mod clock;
pub mod config;
pub mod inverter;
pub mod io;
pub mod plausibility;
pub mod queue;
pub mod runtime;
pub mod sim;
pub mod telemetry;
pub mod tractive;
