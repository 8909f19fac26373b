//! Tractive-system supervisor and torque shaping.

pub mod supervisor;
pub mod torque;

pub use supervisor::{Collaborators, SupervisorCore, TractiveSupervisor};
