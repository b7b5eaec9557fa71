//! Vendor command payloads built from a [`DeviceView`].
//!
//! Commands always carry the setpoint that is not being changed so the unit
//! does not fall back to its own default for it.

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::codec::{FAN_SPEED, HvacMode, OPERATION_MODE_COOL, OPERATION_MODE_OFF, VANE};
use crate::device::DeviceView;

/// Heat setpoint offset below the requested target in auto mode.
pub const AUTO_HYSTERESIS: f64 = 2.0;

/// The `commands` mapping sent to `/devices/send-command`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Command(Map<String, Value>);

impl Command {
    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.0.insert(key.to_string(), value.into());
        self
    }

    /// Copies `key` from the view as last reported, if it is known.
    fn with_known(self, view: &DeviceView, key: &str) -> Self {
        match view.lookup(key) {
            Some(v) => self.with(key, v.clone()),
            None => self,
        }
    }

    fn with_known_setpoints(self, view: &DeviceView) -> Self {
        self.with_known(view, "spCool").with_known(view, "spHeat")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

fn off() -> Command {
    Command::default().with("operationMode", OPERATION_MODE_OFF)
}

pub fn set_hvac_mode(view: &DeviceView, mode: HvacMode) -> Command {
    if mode == HvacMode::Off {
        return off();
    }
    Command::default()
        .with("operationMode", mode.as_vendor_str())
        .with_known_setpoints(view)
}

/// `None` when the current mode has no setpoint (off, dry, fan only).
pub fn set_temperature(view: &DeviceView, target: f64) -> Option<Command> {
    let cmd = Command::default();
    match view.hvac_mode() {
        HvacMode::Cool => Some(cmd.with("spCool", target).with_known(view, "spHeat")),
        HvacMode::Heat => Some(cmd.with("spHeat", target).with_known(view, "spCool")),
        HvacMode::HeatCool => Some(
            cmd.with("spCool", target)
                .with("spHeat", target - AUTO_HYSTERESIS),
        ),
        _ => None,
    }
}

pub fn set_fan_mode(fan_mode: &str) -> Command {
    Command::default().with("fanSpeed", FAN_SPEED.to_vendor(fan_mode))
}

pub fn set_swing_mode(swing_mode: &str) -> Command {
    Command::default().with("airDirection", VANE.to_vendor(swing_mode))
}

/// Resumes the last vendor mode, or cool if the unit was last seen off.
pub fn turn_on(view: &DeviceView) -> Command {
    let mode = match view.operation_mode() {
        None | Some(OPERATION_MODE_OFF) => OPERATION_MODE_COOL,
        Some(m) => m,
    };
    Command::default()
        .with("operationMode", mode)
        .with_known_setpoints(view)
}

pub fn turn_off() -> Command {
    off()
}

impl From<Map<String, Value>> for Command {
    fn from(fields: Map<String, Value>) -> Self {
        Command(fields)
    }
}

impl From<Command> for Value {
    fn from(cmd: Command) -> Self {
        cmd.into_value()
    }
}

impl PartialEq<Value> for Command {
    fn eq(&self, other: &Value) -> bool {
        other.as_object() == Some(&self.0)
    }
}

pub(crate) fn payload(serial: &str, commands: &Command) -> Value {
    json!({ "deviceSerial": serial, "commands": commands })
}
