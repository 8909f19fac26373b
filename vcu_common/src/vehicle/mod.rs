//! Vehicle-level shared types.
//!
//! Everything exchanged between the supervisor threads and the read-only
//! telemetry consumers lives here: state enums, plausibility flags, the
//! telemetry snapshot and the TOML configuration model.

pub mod config;
pub mod plausibility;
pub mod state;
pub mod telemetry;
