//! Periodic telemetry: the supervisor snapshot as one structured event.

use tracing::{info, warn};
use vcu_common::vehicle::state::TsState;
use vcu_common::vehicle::telemetry::VcuTelemetry;

#[derive(Debug, Default)]
pub struct TelemetryLogger {
    last_state: Option<TsState>,
    reports: u64,
}

impl TelemetryLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serialize and log `snap`. Returns the JSON that was logged.
    pub fn report(&mut self, snap: &VcuTelemetry) -> Option<String> {
        let json = match serde_json::to_string(snap) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "telemetry snapshot not serializable");
                return None;
            }
        };
        if self.last_state != Some(snap.ts_state) {
            info!(ts_state = ?snap.ts_state, tick = snap.tick, "telemetry: state changed");
            self.last_state = Some(snap.ts_state);
        }
        info!(target: "vcu::telemetry", snapshot = %json);
        self.reports += 1;
        Some(json)
    }

    pub fn reports(&self) -> u64 {
        self.reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_serializes_with_state_names() {
        let mut log = TelemetryLogger::new();
        let snap = VcuTelemetry {
            ts_state: TsState::Driving,
            requested_torque: 42,
            ..Default::default()
        };
        let json = log.report(&snap).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["ts_state"], "Driving");
        assert_eq!(value["requested_torque"], 42);
        assert_eq!(log.reports(), 1);
    }
}
