//! VCU configuration model.
//!
//! One TOML file, one section per concern. Every section is
//! `#[serde(default)]` so an empty file reproduces the car's calibration;
//! unknown keys are rejected so a typo never silently falls back to a
//! default.
//!
//! ```toml
//! [tractive]
//! contactor_close_timeout_ms = 10000
//! max_torque_request = 100
//!
//! [apps]
//! tolerance = 0.2
//! timeout_ms = 100
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, SharedConfig};
use crate::consts::*;

// ─── Top-Level Config ───────────────────────────────────────────────

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VcuConfig {
    pub shared: SharedConfig,
    pub timing: TimingConfig,
    pub bus: BusConfig,
    pub tractive: TractiveConfig,
    pub inverter: InverterConfig,
    pub apps: AppsConfig,
    pub brake: BrakeConfig,
    pub hard_brake: HardBrakeConfig,
    pub regen: RegenConfig,
    pub power_limit: PowerLimitConfig,
}

impl VcuConfig {
    /// Validate every section, reporting all failures at once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;

        let errors: Vec<String> = [
            self.timing.validate(),
            self.bus.validate(),
            self.tractive.validate(),
            self.inverter.validate(self.bus.vcu_node_id),
            self.apps.validate(),
            self.brake.validate(),
            self.hard_brake.validate(),
            self.regen.validate(),
            self.power_limit.validate(),
        ]
        .into_iter()
        .filter_map(Result::err)
        .collect();

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::ValidationError(errors.join("; ")))
        }
    }
}

// ─── Timing ─────────────────────────────────────────────────────────

/// Loop periods [ms].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TimingConfig {
    pub supervisor_tick_ms: u64,
    pub inverter_tick_ms: u64,
    pub host_period_ms: u64,
    pub telemetry_period_ms: u64,
    pub bus_poll_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            supervisor_tick_ms: SUPERVISOR_TICK_MS,
            inverter_tick_ms: INVERTER_TICK_MS,
            host_period_ms: CANOPEN_HOST_PERIOD_MS,
            telemetry_period_ms: TELEMETRY_PERIOD_MS,
            bus_poll_ms: BUS_POLL_PERIOD_MS,
        }
    }
}

impl TimingConfig {
    pub fn validate(&self) -> Result<(), String> {
        for (name, v) in [
            ("supervisor_tick_ms", self.supervisor_tick_ms),
            ("inverter_tick_ms", self.inverter_tick_ms),
            ("host_period_ms", self.host_period_ms),
            ("telemetry_period_ms", self.telemetry_period_ms),
            ("bus_poll_ms", self.bus_poll_ms),
        ] {
            if v == 0 || v > 1000 {
                return Err(format!("timing.{name} {v} out of range [1, 1000]"));
            }
        }
        Ok(())
    }
}

// ─── Bus ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BusConfig {
    /// SocketCAN interface name.
    pub interface: String,
    /// Capacity of each subscriber queue.
    pub queue_capacity: usize,
    /// Frames drained per bus wake-up before yielding.
    pub max_reads: usize,
    /// Node id the VCU heartbeats as.
    pub vcu_node_id: u8,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            interface: "can0".to_string(),
            queue_capacity: QUEUE_CAPACITY,
            max_reads: BUS_MAX_READS,
            vcu_node_id: VCU_NODE_ID,
        }
    }
}

impl BusConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.interface.is_empty() {
            return Err("bus.interface cannot be empty".to_string());
        }
        if self.queue_capacity == 0 {
            return Err("bus.queue_capacity must be > 0".to_string());
        }
        if self.max_reads == 0 {
            return Err("bus.max_reads must be > 0".to_string());
        }
        validate_node_id("bus.vcu_node_id", self.vcu_node_id)
    }
}

fn validate_node_id(name: &str, id: u8) -> Result<(), String> {
    if id == 0 || id > MAX_NODE_ID {
        return Err(format!("{name} {id} out of range [1, {MAX_NODE_ID}]"));
    }
    Ok(())
}

// ─── Tractive System ────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TractiveConfig {
    /// Max time from close request to contactors Active [ms].
    pub contactor_close_timeout_ms: u64,
    /// Ready-to-drive sound length [ms].
    pub buzzer_duration_ms: u64,
    /// Positive torque ceiling in inverter units.
    pub max_torque_request: i16,
    /// Regen floor in inverter units (≤ 0).
    pub min_torque_request: i16,
}

impl Default for TractiveConfig {
    fn default() -> Self {
        Self {
            contactor_close_timeout_ms: CONTACTOR_CLOSE_TIMEOUT_MS,
            buzzer_duration_ms: BUZZER_DURATION_MS,
            max_torque_request: MAX_TORQUE_REQUEST_DEFAULT,
            min_torque_request: MIN_TORQUE_REQUEST_DEFAULT,
        }
    }
}

impl TractiveConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.contactor_close_timeout_ms == 0 {
            return Err("tractive.contactor_close_timeout_ms must be > 0".to_string());
        }
        if self.max_torque_request <= 0 || self.max_torque_request > TORQUE_REQUEST_LIMIT {
            return Err(format!(
                "tractive.max_torque_request {} out of range [1, {TORQUE_REQUEST_LIMIT}]",
                self.max_torque_request
            ));
        }
        if self.min_torque_request > 0 || self.min_torque_request < -TORQUE_REQUEST_LIMIT {
            return Err(format!(
                "tractive.min_torque_request {} out of range [-{TORQUE_REQUEST_LIMIT}, 0]",
                self.min_torque_request
            ));
        }
        Ok(())
    }
}

// ─── Inverter ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InverterConfig {
    pub node_id: u8,
    /// Minimum gap between boot-sequence commands [ms].
    pub send_period_ms: u64,
    /// +1 or -1: sign applied to torque before it goes on the bus.
    pub torque_polarity: i8,
    /// RPDO base carrying the torque setpoint.
    pub torque_pdo: u32,
    /// TPDO base carrying error/warning codes.
    pub status_pdo: u32,
    /// TPDO base carrying speed and temperatures.
    pub feedback_pdo: u32,
    /// All TPDO bases to subscribe to.
    pub tpdo_bases: Vec<u32>,
    pub cw_disable_output: u8,
    pub cw_enable_output: u8,
}

impl Default for InverterConfig {
    fn default() -> Self {
        Self {
            node_id: INVERTER_NODE_ID,
            send_period_ms: INVERTER_SEND_PERIOD_MS,
            torque_polarity: -1,
            torque_pdo: INVERTER_RPDO1,
            status_pdo: INVERTER_TPDO1,
            feedback_pdo: INVERTER_TPDO2,
            tpdo_bases: vec![INVERTER_TPDO1, INVERTER_TPDO2, INVERTER_TPDO3, INVERTER_TPDO4],
            cw_disable_output: INVERTER_CW_DISABLE_OUTPUT,
            cw_enable_output: INVERTER_CW_ENABLE_OUTPUT,
        }
    }
}

impl InverterConfig {
    pub fn validate(&self, vcu_node_id: u8) -> Result<(), String> {
        validate_node_id("inverter.node_id", self.node_id)?;
        if self.node_id == vcu_node_id {
            return Err(format!(
                "inverter.node_id {} collides with bus.vcu_node_id",
                self.node_id
            ));
        }
        if self.torque_polarity != 1 && self.torque_polarity != -1 {
            return Err(format!(
                "inverter.torque_polarity must be 1 or -1, got {}",
                self.torque_polarity
            ));
        }
        for base in self.tpdo_bases.iter().chain([&self.torque_pdo]) {
            let top = base.checked_add(MAX_NODE_ID as u32);
            if top.is_none_or(|id| id > STANDARD_ID_MAX) {
                return Err(format!("inverter PDO base {base:#x} exceeds 11-bit range"));
            }
        }
        if !self.tpdo_bases.contains(&self.status_pdo) {
            return Err(format!(
                "inverter.status_pdo {:#x} not in tpdo_bases",
                self.status_pdo
            ));
        }
        if self.cw_disable_output == self.cw_enable_output {
            return Err("inverter control word codes must differ".to_string());
        }
        Ok(())
    }
}

// ─── Pedal Channels ─────────────────────────────────────────────────

/// Linear voltage → fraction calibration for one analog channel.
///
/// `fraction = (volts - offset_volts) / range_volts`. A negative range
/// describes a sensor whose voltage falls as the pedal is pressed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelCalibration {
    pub adc_channel: u8,
    pub offset_volts: f32,
    pub range_volts: f32,
}

impl ChannelCalibration {
    fn validate(&self, name: &str) -> Result<(), String> {
        if self.range_volts.abs() < 0.01 {
            return Err(format!("{name}.range_volts too small ({})", self.range_volts));
        }
        if !(0.0..=ADC_FULL_SCALE_VOLTS).contains(&self.offset_volts) {
            return Err(format!(
                "{name}.offset_volts {} outside [0, {ADC_FULL_SCALE_VOLTS}]",
                self.offset_volts
            ));
        }
        Ok(())
    }
}

/// Analog front-end parameters shared by every pedal channel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AdcConfig {
    pub resolution: u16,
    pub full_scale_volts: f32,
}

impl Default for AdcConfig {
    fn default() -> Self {
        Self {
            resolution: ADC_RESOLUTION,
            full_scale_volts: ADC_FULL_SCALE_VOLTS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppsConfig {
    pub adc: AdcConfig,
    pub apps1: ChannelCalibration,
    pub apps2: ChannelCalibration,
    /// Dead-band trimmed off both ends of pedal travel.
    pub ignore_fraction: f32,
    /// Connection band [V].
    pub low_volts: f32,
    pub high_volts: f32,
    /// Max |APPS1 − APPS2| before the disagreement timer starts.
    pub tolerance: f32,
    pub timeout_ms: u64,
    /// Moving-average smoothing on the raw codes.
    pub smoothing: bool,
}

impl Default for AppsConfig {
    fn default() -> Self {
        Self {
            adc: AdcConfig::default(),
            apps1: ChannelCalibration {
                adc_channel: 0,
                offset_volts: 0.3,
                range_volts: 1.2,
            },
            apps2: ChannelCalibration {
                adc_channel: 1,
                offset_volts: 1.5,
                range_volts: -1.2,
            },
            ignore_fraction: 0.2,
            low_volts: 0.18,
            high_volts: 1.62,
            tolerance: 0.2,
            timeout_ms: APPS_TIMEOUT_MS,
            smoothing: true,
        }
    }
}

impl AppsConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.apps1.validate("apps.apps1")?;
        self.apps2.validate("apps.apps2")?;
        if self.apps1.adc_channel == self.apps2.adc_channel {
            return Err("apps.apps1 and apps.apps2 share an ADC channel".to_string());
        }
        if !(0.0..0.5).contains(&self.ignore_fraction) {
            return Err(format!(
                "apps.ignore_fraction {} out of range [0, 0.5)",
                self.ignore_fraction
            ));
        }
        validate_band("apps", self.low_volts, self.high_volts)?;
        if !(0.0..=1.0).contains(&self.tolerance) {
            return Err(format!("apps.tolerance {} out of range [0, 1]", self.tolerance));
        }
        if self.timeout_ms == 0 || self.timeout_ms > 1000 {
            return Err(format!("apps.timeout_ms {} out of range [1, 1000]", self.timeout_ms));
        }
        validate_adc("apps.adc", &self.adc)
    }
}

fn validate_band(name: &str, low: f32, high: f32) -> Result<(), String> {
    if low >= high {
        return Err(format!("{name} connection band [{low}, {high}] is empty"));
    }
    Ok(())
}

fn validate_adc(name: &str, adc: &AdcConfig) -> Result<(), String> {
    if adc.resolution == 0 || adc.full_scale_volts <= 0.0 {
        return Err(format!("{name} resolution and full_scale_volts must be > 0"));
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BrakeConfig {
    pub adc: AdcConfig,
    pub brake1: ChannelCalibration,
    pub brake2: ChannelCalibration,
    /// Raw code above which channel 1 counts as "brake on".
    pub threshold1_raw: u16,
    /// Raw code above which channel 2 counts as "brake on".
    pub threshold2_raw: u16,
    /// Expected `raw1 / raw2` ratio of the two sensors.
    pub ratio: f32,
    /// Allowed deviation from `ratio × raw2`, as a fraction of ADC resolution.
    pub plausibility_fraction: f32,
    pub timeout_ms: u64,
    pub low_volts: f32,
    pub high_volts: f32,
}

impl Default for BrakeConfig {
    fn default() -> Self {
        Self {
            adc: AdcConfig::default(),
            brake1: ChannelCalibration {
                adc_channel: 2,
                offset_volts: 0.2,
                range_volts: 1.4,
            },
            brake2: ChannelCalibration {
                adc_channel: 3,
                offset_volts: 0.1,
                range_volts: 0.7,
            },
            threshold1_raw: 600,
            threshold2_raw: 500,
            ratio: 2.0,
            plausibility_fraction: 0.1,
            timeout_ms: APPS_TIMEOUT_MS,
            low_volts: 0.05,
            high_volts: 1.75,
        }
    }
}

impl BrakeConfig {
    pub fn validate(&self) -> Result<(), String> {
        self.brake1.validate("brake.brake1")?;
        self.brake2.validate("brake.brake2")?;
        if self.brake1.adc_channel == self.brake2.adc_channel {
            return Err("brake.brake1 and brake.brake2 share an ADC channel".to_string());
        }
        if self.ratio <= 0.0 {
            return Err(format!("brake.ratio {} must be > 0", self.ratio));
        }
        if !(0.0..=1.0).contains(&self.plausibility_fraction) {
            return Err(format!(
                "brake.plausibility_fraction {} out of range [0, 1]",
                self.plausibility_fraction
            ));
        }
        if self.timeout_ms == 0 {
            return Err("brake.timeout_ms must be > 0".to_string());
        }
        validate_band("brake", self.low_volts, self.high_volts)?;
        validate_adc("brake.adc", &self.adc)
    }
}

// ─── Hard Brake ─────────────────────────────────────────────────────

/// Brake + throttle check with asymmetric hysteresis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HardBrakeConfig {
    /// Throttle fraction above which braking counts as a fault.
    pub trip_fraction: f32,
    /// Throttle fraction at or below which a latched fault clears.
    pub release_fraction: f32,
    pub timeout_ms: u64,
}

impl Default for HardBrakeConfig {
    fn default() -> Self {
        Self {
            trip_fraction: 0.25,
            release_fraction: 0.05,
            timeout_ms: BRAKE_TIMEOUT_MS,
        }
    }
}

impl HardBrakeConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.trip_fraction) {
            return Err(format!(
                "hard_brake.trip_fraction {} out of range [0, 1]",
                self.trip_fraction
            ));
        }
        if self.release_fraction < 0.0 || self.release_fraction >= self.trip_fraction {
            return Err(format!(
                "hard_brake.release_fraction {} must be in [0, trip_fraction)",
                self.release_fraction
            ));
        }
        Ok(())
    }
}

// ─── Regen ──────────────────────────────────────────────────────────

/// Regenerative braking. Shipped disabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RegenConfig {
    pub enabled: bool,
    /// Regen fraction applied when the accelerator is fully released.
    pub lift_off_ratio: f32,
    /// Largest regen fraction ever requested (positive number).
    pub max_ratio: f32,
    /// Brake pressure fraction where brake regen starts.
    pub brake_start_fraction: f32,
    /// Brake pressure fraction where brake regen reaches `max_ratio`.
    pub brake_full_fraction: f32,
    /// Battery charge-current headroom required to permit regen [A].
    pub min_charge_current: f32,
}

impl Default for RegenConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            lift_off_ratio: 0.0,
            max_ratio: 0.3,
            brake_start_fraction: 0.1,
            brake_full_fraction: 0.6,
            min_charge_current: 1.0,
        }
    }
}

impl RegenConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.max_ratio) {
            return Err(format!("regen.max_ratio {} out of range [0, 1]", self.max_ratio));
        }
        if !(0.0..=self.max_ratio).contains(&self.lift_off_ratio) {
            return Err(format!(
                "regen.lift_off_ratio {} out of range [0, max_ratio]",
                self.lift_off_ratio
            ));
        }
        if self.brake_start_fraction >= self.brake_full_fraction {
            return Err("regen.brake_start_fraction must be < brake_full_fraction".to_string());
        }
        Ok(())
    }
}

// ─── Power Limit ────────────────────────────────────────────────────

/// Battery-power torque limiter. Disabled with zero gains by default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PowerLimitConfig {
    pub enabled: bool,
    pub kp: f32,
    pub ki: f32,
    /// Below this speed the `P / ω` ceiling is not applied [rpm].
    pub min_speed_rpm: f32,
    /// Torque corresponding to a fraction of 1.0 [Nm].
    pub max_motor_torque_nm: f32,
}

impl Default for PowerLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            kp: 0.0,
            ki: 0.0,
            min_speed_rpm: 100.0,
            max_motor_torque_nm: 230.0,
        }
    }
}

impl PowerLimitConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.kp < 0.0 || self.ki < 0.0 {
            return Err("power_limit gains must be >= 0".to_string());
        }
        if self.min_speed_rpm <= 0.0 {
            return Err("power_limit.min_speed_rpm must be > 0".to_string());
        }
        if self.max_motor_torque_nm <= 0.0 {
            return Err("power_limit.max_motor_torque_nm must be > 0".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigLoader;

    #[test]
    fn defaults_are_valid() {
        VcuConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_document_is_all_defaults() {
        let cfg = VcuConfig::from_toml("").unwrap();
        assert_eq!(cfg.tractive.contactor_close_timeout_ms, 10_000);
        assert_eq!(cfg.tractive.buzzer_duration_ms, 1_500);
        assert_eq!(cfg.apps.timeout_ms, 100);
        assert_eq!(cfg.inverter.torque_polarity, -1);
        assert!(!cfg.regen.enabled);
        assert!(!cfg.power_limit.enabled);
        assert_eq!(cfg.power_limit.kp, 0.0);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = VcuConfig::from_toml(
            r#"
[apps]
tolerance = 0.1
"#,
        )
        .unwrap();
        assert_eq!(cfg.apps.tolerance, 0.1);
        assert_eq!(cfg.apps.ignore_fraction, 0.2);
        assert_eq!(cfg.apps.apps1.adc_channel, 0);
    }

    #[test]
    fn unknown_key_is_rejected() {
        let result = VcuConfig::from_toml("[tractive]\nbuzer_duration_ms = 5\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn hysteresis_must_be_asymmetric() {
        let mut cfg = VcuConfig::default();
        cfg.hard_brake.release_fraction = cfg.hard_brake.trip_fraction;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("release_fraction"), "{err}");
    }

    #[test]
    fn all_failures_reported_together() {
        let mut cfg = VcuConfig::default();
        cfg.tractive.max_torque_request = 0;
        cfg.inverter.torque_polarity = 2;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("max_torque_request"));
        assert!(err.contains("torque_polarity"));
    }

    #[test]
    fn pdo_base_near_u32_max_is_rejected() {
        let mut cfg = VcuConfig::default();
        cfg.inverter.torque_pdo = u32::MAX - 10;
        let err = cfg.validate().unwrap_err().to_string();
        assert!(err.contains("11-bit"), "{err}");

        let mut cfg = VcuConfig::default();
        cfg.inverter.tpdo_bases.push(u32::MAX);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverter_node_cannot_be_vcu_node() {
        let mut cfg = VcuConfig::default();
        cfg.inverter.node_id = cfg.bus.vcu_node_id;
        assert!(cfg.validate().is_err());
    }
}
