//! VCU Common Library
//!
//! Shared types for the vehicle control unit workspace: state enums,
//! plausibility flags, the telemetry snapshot, CANopen constants and the
//! TOML configuration model.
//!
//! # Module Structure
//!
//! - [`config`] - Configuration loading traits and types
//! - [`consts`] - CANopen identifiers and default timings
//! - [`vehicle`] - State, plausibility, telemetry and `VcuConfig`
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use vcu_common::prelude::*;
//!
//! let cfg = VcuConfig::default();
//! assert!(cfg.validate().is_ok());
//! assert_eq!(TsState::default(), TsState::Idle);
//! ```

pub mod config;
pub mod consts;
pub mod prelude;
pub mod vehicle;
