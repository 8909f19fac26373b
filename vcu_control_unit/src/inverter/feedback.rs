//! Decoded inverter TPDO content.

use serde::Serialize;

use crate::canopen::PdoMessage;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct InverterFeedback {
    pub speed_rpm: i32,
    pub motor_temp: i16,
    pub controller_temp: i16,
    pub error_code: u16,
    pub warning_code: u16,
}

impl InverterFeedback {
    /// Status TPDO: bytes 4–5 error code, 6–7 warning code.
    pub fn apply_status(&mut self, pdo: &PdoMessage) {
        let d = &pdo.data;
        self.error_code = u16::from_le_bytes([d[4], d[5]]);
        self.warning_code = u16::from_le_bytes([d[6], d[7]]);
    }

    /// Feedback TPDO: bytes 0–3 speed, 4–5 motor temp, 6–7 controller temp.
    pub fn apply_feedback(&mut self, pdo: &PdoMessage) {
        let d = &pdo.data;
        self.speed_rpm = i32::from_le_bytes([d[0], d[1], d[2], d[3]]);
        self.motor_temp = i16::from_le_bytes([d[4], d[5]]);
        self.controller_temp = i16::from_le_bytes([d[6], d[7]]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdo(base: u32, data: [u8; 8]) -> PdoMessage {
        PdoMessage { base, len: 8, data }
    }

    #[test]
    fn decode_status() {
        let mut fb = InverterFeedback::default();
        fb.apply_status(&pdo(0x180, [0, 0, 0, 0, 0x34, 0x12, 0x02, 0x00]));
        assert_eq!(fb.error_code, 0x1234);
        assert_eq!(fb.warning_code, 2);
    }

    #[test]
    fn decode_speed_and_temps() {
        let mut fb = InverterFeedback::default();
        let rpm = (-3_000i32).to_le_bytes();
        fb.apply_feedback(&pdo(
            0x280,
            [rpm[0], rpm[1], rpm[2], rpm[3], 55, 0, 0xF6, 0xFF],
        ));
        assert_eq!(fb.speed_rpm, -3_000);
        assert_eq!(fb.motor_temp, 55);
        assert_eq!(fb.controller_temp, -10);
    }
}
