//! Prelude module for common re-exports.
//!
//! `use vcu_common::prelude::*;` brings in the types every VCU component
//! touches without listing individual paths.

// ─── Logging ────────────────────────────────────────────────────────
pub use crate::config::LogLevel;

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{ConfigError, ConfigLoader, SharedConfig};
pub use crate::vehicle::config::VcuConfig;

// ─── Vehicle State ──────────────────────────────────────────────────
pub use crate::vehicle::plausibility::PlausibilityFlags;
pub use crate::vehicle::state::{ContactorStatus, InverterState, TsState};
pub use crate::vehicle::telemetry::VcuTelemetry;
