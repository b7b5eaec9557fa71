use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::trace;

use crate::codec::{
    FAN_SPEED, HvacAction, HvacMode, OPERATION_MODE_AUTO, OPERATION_MODE_COOL, OPERATION_MODE_DRY,
    OPERATION_MODE_HEAT, OPERATION_MODE_OFF, OPERATION_MODE_VENT, VANE,
};

pub const DEFAULT_MIN_TEMP: f64 = 16.0;
pub const DEFAULT_MAX_TEMP: f64 = 30.0;
pub const TARGET_TEMPERATURE_STEP: f64 = 0.5;
/// Degrees beyond target before auto mode reports heating or cooling.
const AUTO_ACTION_THRESHOLD: f64 = 1.0;

pub const MANUFACTURER: &str = "Mitsubishi Electric";
const DEFAULT_DEVICE_NAME: &str = "Kumo Cloud Device";
const DEFAULT_MODEL: &str = "Unknown Model";

/// Reads a field, falling back to its default when it is `null` or of an
/// unexpected type.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_default())
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct SetPoints {
    #[serde(deserialize_with = "lenient")]
    pub heat: Option<f64>,
    #[serde(deserialize_with = "lenient")]
    pub cool: Option<f64>,
}

/// Capability descriptor from `/devices/{serial}/profile`.
///
/// Each field decodes on its own, so one malformed flag does not hide the
/// rest of the profile.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeviceProfile {
    #[serde(deserialize_with = "lenient")]
    pub has_mode_heat: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_mode_dry: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_mode_vent: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_vane_swing: bool,
    #[serde(deserialize_with = "lenient")]
    pub has_vane_dir: bool,
    #[serde(deserialize_with = "lenient")]
    pub number_of_fan_speeds: u32,
    #[serde(deserialize_with = "lenient")]
    pub minimum_set_points: SetPoints,
    #[serde(deserialize_with = "lenient")]
    pub maximum_set_points: SetPoints,
}

impl DeviceProfile {
    /// Accepts either a profile object or a list whose first element is one.
    pub fn from_value(value: &Value) -> Option<Self> {
        let obj = match value {
            Value::Array(items) => items.first()?,
            other => other,
        };
        if !obj.is_object() {
            return None;
        }
        serde_json::from_value(obj.clone()).ok()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SupportedFeatures {
    pub target_temperature: bool,
    pub fan_mode: bool,
    pub swing_mode: bool,
    pub turn_on: bool,
    pub turn_off: bool,
}

/// Presentation metadata for a device registry.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceIdentity {
    pub serial: String,
    pub name: String,
    pub manufacturer: &'static str,
    pub model: String,
    pub sw_version: Option<String>,
    pub serial_number: Option<String>,
}

/// Serial of the indoor unit attached to a zone, if it has one.
pub fn zone_device_serial(zone: &Value) -> Option<&str> {
    zone.pointer("/adapter/deviceSerial").and_then(|v| v.as_str())
}

/// Normalized view over the cached payloads of one indoor unit.
///
/// The device snapshot (`/devices/{serial}`) is fresher than the zone's
/// `adapter` object, so every reader goes through [`DeviceView::lookup`].
#[derive(Debug, Clone, Default)]
pub struct DeviceView {
    serial: String,
    zone: Value,
    device: Value,
    profile: Option<DeviceProfile>,
}

impl DeviceView {
    pub fn new(serial: impl Into<String>) -> Self {
        Self {
            serial: serial.into(),
            ..Default::default()
        }
    }

    pub fn serial(&self) -> &str {
        &self.serial
    }

    pub fn set_zone(&mut self, zone: Value) {
        self.zone = zone;
    }

    pub fn set_device(&mut self, device: Value) {
        self.device = device;
    }

    pub fn set_profile(&mut self, profile: &Value) {
        self.profile = DeviceProfile::from_value(profile);
    }

    pub fn with_zone(mut self, zone: Value) -> Self {
        self.set_zone(zone);
        self
    }

    pub fn with_device(mut self, device: Value) -> Self {
        self.set_device(device);
        self
    }

    pub fn with_profile(mut self, profile: &Value) -> Self {
        self.set_profile(profile);
        self
    }

    pub fn profile(&self) -> Option<&DeviceProfile> {
        self.profile.as_ref()
    }

    /// Device field if present and non-null, else the zone adapter field.
    pub fn lookup(&self, field: &str) -> Option<&Value> {
        self.device
            .get(field)
            .filter(|v| !v.is_null())
            .or_else(|| {
                self.zone
                    .get("adapter")
                    .and_then(|a| a.get(field))
                    .filter(|v| !v.is_null())
            })
    }

    fn lookup_f64(&self, field: &str) -> Option<f64> {
        self.lookup(field).and_then(Value::as_f64)
    }

    fn lookup_str(&self, field: &str) -> Option<&str> {
        self.lookup(field).and_then(Value::as_str)
    }

    /// Anything other than zero counts as on. Numeric strings are read by
    /// value; other non-empty strings count as on.
    fn is_powered(&self) -> bool {
        match self.lookup("power") {
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|p| p != 0.0),
            Some(Value::String(s)) => match s.trim().parse::<f64>() {
                Ok(p) => p != 0.0,
                Err(_) => !s.trim().is_empty(),
            },
            _ => false,
        }
    }

    /// Last reported vendor operation mode, regardless of power.
    pub fn operation_mode(&self) -> Option<&str> {
        self.lookup_str("operationMode")
    }

    pub fn hvac_mode(&self) -> HvacMode {
        let operation_mode = self.operation_mode().unwrap_or(OPERATION_MODE_OFF);
        trace!(serial = %self.serial, operation_mode, power = self.is_powered(), "raw mode");
        if !self.is_powered() {
            return HvacMode::Off;
        }
        HvacMode::from_vendor_str(operation_mode).unwrap_or(HvacMode::Off)
    }

    pub fn hvac_modes(&self) -> Vec<HvacMode> {
        let heat = self.profile.as_ref().is_some_and(|p| p.has_mode_heat);
        let dry = self.profile.as_ref().is_some_and(|p| p.has_mode_dry);
        let vent = self.profile.as_ref().is_some_and(|p| p.has_mode_vent);

        let mut modes = vec![HvacMode::Off];
        if heat {
            modes.push(HvacMode::Heat);
        }
        modes.push(HvacMode::Cool);
        if dry {
            modes.push(HvacMode::Dry);
        }
        if vent {
            modes.push(HvacMode::FanOnly);
        }
        // No separate auto capability flag; auto follows heat.
        if heat {
            modes.push(HvacMode::HeatCool);
        }
        modes
    }

    pub fn hvac_action(&self) -> HvacAction {
        if self.hvac_mode() == HvacMode::Off {
            return HvacAction::Off;
        }
        match self.operation_mode() {
            Some(OPERATION_MODE_HEAT) => HvacAction::Heating,
            Some(OPERATION_MODE_COOL) => HvacAction::Cooling,
            Some(OPERATION_MODE_DRY) => HvacAction::Drying,
            Some(OPERATION_MODE_VENT) => HvacAction::Fan,
            Some(OPERATION_MODE_AUTO) => {
                match (self.current_temperature(), self.target_temperature()) {
                    (Some(current), Some(target)) => infer_auto_action(current, target),
                    _ => HvacAction::Idle,
                }
            }
            _ => HvacAction::Idle,
        }
    }

    pub fn current_temperature(&self) -> Option<f64> {
        self.lookup_f64("roomTemp")
    }

    pub fn humidity(&self) -> Option<f64> {
        self.lookup_f64("humidity")
    }

    pub fn cool_setpoint(&self) -> Option<f64> {
        self.lookup_f64("spCool")
    }

    pub fn heat_setpoint(&self) -> Option<f64> {
        self.lookup_f64("spHeat")
    }

    pub fn target_temperature(&self) -> Option<f64> {
        match self.hvac_mode() {
            HvacMode::Cool => self.cool_setpoint(),
            HvacMode::Heat => self.heat_setpoint(),
            HvacMode::HeatCool => self.cool_setpoint().or_else(|| self.heat_setpoint()),
            _ => None,
        }
    }

    pub fn target_temperature_step(&self) -> f64 {
        TARGET_TEMPERATURE_STEP
    }

    /// Current fan speed as a UI label.
    pub fn fan_mode(&self) -> Option<&str> {
        self.lookup_str("fanSpeed").map(|v| FAN_SPEED.to_ui(v))
    }

    pub fn fan_modes(&self) -> Vec<&'static str> {
        FAN_SPEED.order().to_vec()
    }

    /// Current vane position as a UI label.
    pub fn swing_mode(&self) -> Option<&str> {
        self.lookup_str("airDirection").map(|v| VANE.to_ui(v))
    }

    pub fn swing_modes(&self) -> Option<Vec<&'static str>> {
        let profile = self.profile.as_ref()?;
        if !(profile.has_vane_dir || profile.has_vane_swing) {
            return None;
        }
        Some(VANE.order().to_vec())
    }

    pub fn min_temp(&self) -> f64 {
        match &self.profile {
            Some(p) => {
                let sp = &p.minimum_set_points;
                sp.heat
                    .unwrap_or(DEFAULT_MIN_TEMP)
                    .min(sp.cool.unwrap_or(DEFAULT_MIN_TEMP))
            }
            None => DEFAULT_MIN_TEMP,
        }
    }

    pub fn max_temp(&self) -> f64 {
        match &self.profile {
            Some(p) => {
                let sp = &p.maximum_set_points;
                sp.heat
                    .unwrap_or(DEFAULT_MAX_TEMP)
                    .max(sp.cool.unwrap_or(DEFAULT_MAX_TEMP))
            }
            None => DEFAULT_MAX_TEMP,
        }
    }

    pub fn supported_features(&self) -> SupportedFeatures {
        let (fan_mode, swing_mode) = match &self.profile {
            Some(p) => (p.number_of_fan_speeds > 0, p.has_vane_swing || p.has_vane_dir),
            None => (false, false),
        };
        SupportedFeatures {
            target_temperature: true,
            fan_mode,
            swing_mode,
            turn_on: true,
            turn_off: true,
        }
    }

    pub fn identity(&self) -> DeviceIdentity {
        let model = self.device.get("model");
        DeviceIdentity {
            serial: self.serial.clone(),
            name: self
                .zone
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_DEVICE_NAME)
                .to_string(),
            manufacturer: MANUFACTURER,
            model: model
                .and_then(|m| m.get("materialDescription"))
                .and_then(Value::as_str)
                .unwrap_or(DEFAULT_MODEL)
                .to_string(),
            sw_version: model
                .and_then(|m| m.get("serialProfile"))
                .and_then(Value::as_str)
                .map(str::to_string),
            serial_number: self
                .device
                .get("serialNumber")
                .and_then(Value::as_str)
                .map(str::to_string),
        }
    }
}

fn infer_auto_action(current: f64, target: f64) -> HvacAction {
    let diff = current - target;
    if diff > AUTO_ACTION_THRESHOLD {
        HvacAction::Cooling
    } else if diff < -AUTO_ACTION_THRESHOLD {
        HvacAction::Heating
    } else {
        HvacAction::Idle
    }
}
