use kumo_cloud::command::{self, AUTO_HYSTERESIS};
use kumo_cloud::{DeviceView, FAN_SPEED, HvacAction, HvacMode, VANE};
use serde_json::{Value, json};

fn zone_with(adapter: Value) -> Value {
    json!({ "id": 7, "name": "Bedroom", "adapter": adapter })
}

#[test]
fn fan_speed_pairs_are_exact_inverses() {
    for vendor in FAN_SPEED.vendor_values() {
        assert_eq!(FAN_SPEED.to_vendor(FAN_SPEED.to_ui(vendor)), vendor);
    }
    for ui in FAN_SPEED.order() {
        assert_eq!(FAN_SPEED.to_ui(FAN_SPEED.to_vendor(ui)), *ui);
    }
    assert_eq!(FAN_SPEED.order().len(), 6);
}

#[test]
fn vane_pairs_are_exact_inverses() {
    for vendor in VANE.vendor_values() {
        assert_eq!(VANE.to_vendor(VANE.to_ui(vendor)), vendor);
    }
    for ui in VANE.order() {
        assert_eq!(VANE.to_ui(VANE.to_vendor(ui)), *ui);
    }
    assert_eq!(VANE.order().len(), 7);
}

#[test]
fn hvac_modes_round_trip_through_vendor_labels() {
    for mode in [
        HvacMode::Off,
        HvacMode::Cool,
        HvacMode::Heat,
        HvacMode::Dry,
        HvacMode::FanOnly,
        HvacMode::HeatCool,
    ] {
        assert_eq!(HvacMode::from_vendor_str(mode.as_vendor_str()), Some(mode));
    }
}

#[test]
fn power_off_overrides_operation_mode() {
    let view = DeviceView::new("S1").with_device(json!({ "power": 0, "operationMode": "cool" }));
    assert_eq!(view.hvac_mode(), HvacMode::Off);
    assert_eq!(view.hvac_action(), HvacAction::Off);
}

#[test]
fn auto_mode_action_follows_room_temperature() {
    let cases = [(24.0, HvacAction::Cooling), (19.0, HvacAction::Heating), (21.0, HvacAction::Idle)];
    for (room, expected) in cases {
        let view = DeviceView::new("S1").with_device(json!({
            "power": 1,
            "operationMode": "auto",
            "roomTemp": room,
            "spCool": 21.5,
        }));
        assert_eq!(view.hvac_mode(), HvacMode::HeatCool);
        assert_eq!(view.hvac_action(), expected, "room {room}");
    }
}

#[test]
fn stale_adapter_is_shadowed_by_device_snapshot() {
    let view = DeviceView::new("S1")
        .with_zone(zone_with(json!({
            "deviceSerial": "S1",
            "power": 1,
            "operationMode": "heat",
            "roomTemp": 18.0,
            "humidity": 40,
        })))
        .with_device(json!({ "operationMode": "cool", "roomTemp": null }));

    assert_eq!(view.hvac_mode(), HvacMode::Cool);
    // null on the device falls through to the adapter
    assert_eq!(view.current_temperature(), Some(18.0));
    assert_eq!(view.humidity(), Some(40.0));
}

#[test]
fn cool_setpoint_change_keeps_heat_setpoint() {
    let view = DeviceView::new("S1").with_device(json!({
        "power": 1,
        "operationMode": "cool",
        "spCool": 24.0,
        "spHeat": 20.0,
    }));
    let cmd = command::set_temperature(&view, 23.0).unwrap();
    assert_eq!(cmd, json!({ "spCool": 23.0, "spHeat": 20.0 }));
}

#[test]
fn heat_cool_target_applies_fixed_hysteresis() {
    let view = DeviceView::new("S1").with_device(json!({ "power": 1, "operationMode": "auto" }));
    let cmd = command::set_temperature(&view, 22.0).unwrap();
    assert_eq!(cmd, json!({ "spCool": 22.0, "spHeat": 20.0 }));
    assert_eq!(22.0 - AUTO_HYSTERESIS, 20.0);
}

#[test]
fn setpoint_in_fan_only_mode_is_ignored() {
    let view = DeviceView::new("S1").with_device(json!({ "power": 1, "operationMode": "vent" }));
    assert!(command::set_temperature(&view, 22.0).is_none());
}

#[test]
fn mode_change_carries_known_setpoints() {
    let view = DeviceView::new("S1").with_zone(zone_with(json!({ "spHeat": 19.5 })));
    let cmd = command::set_hvac_mode(&view, HvacMode::Heat);
    assert_eq!(cmd, json!({ "operationMode": "heat", "spHeat": 19.5 }));

    let off = command::set_hvac_mode(&view, HvacMode::Off);
    assert_eq!(off, json!({ "operationMode": "off" }));
}

#[test]
fn fan_and_vane_commands_use_vendor_labels() {
    assert_eq!(command::set_fan_mode("quiet"), json!({ "fanSpeed": "superQuiet" }));
    assert_eq!(command::set_fan_mode("turbo"), json!({ "fanSpeed": "turbo" }));
    assert_eq!(command::set_swing_mode("highest"), json!({ "airDirection": "horizontal" }));
}

#[test]
fn turn_on_resumes_last_mode() {
    let dry = DeviceView::new("S1").with_device(json!({ "power": 0, "operationMode": "dry" }));
    assert_eq!(command::turn_on(&dry), json!({ "operationMode": "dry" }));

    let was_off = DeviceView::new("S1").with_device(json!({ "power": 0, "operationMode": "off", "spCool": 25 }));
    assert_eq!(command::turn_on(&was_off), json!({ "operationMode": "cool", "spCool": 25 }));
}

#[test]
fn full_profile_drives_capabilities() {
    let profile = json!([{
        "hasModeHeat": true,
        "hasModeDry": true,
        "hasModeVent": true,
        "hasVaneSwing": true,
        "numberOfFanSpeeds": 5,
        "minimumSetPoints": { "heat": 10, "cool": 16 },
        "maximumSetPoints": { "heat": 31, "cool": 31 }
    }]);
    let view = DeviceView::new("S1").with_profile(&profile);

    assert_eq!(
        view.hvac_modes(),
        [
            HvacMode::Off,
            HvacMode::Heat,
            HvacMode::Cool,
            HvacMode::Dry,
            HvacMode::FanOnly,
            HvacMode::HeatCool
        ]
    );
    assert_eq!(view.min_temp(), 10.0);
    assert_eq!(view.max_temp(), 31.0);
    assert_eq!(view.swing_modes().unwrap().len(), 7);
    let features = view.supported_features();
    assert!(features.fan_mode && features.swing_mode && features.target_temperature);
}

#[test]
fn empty_profile_falls_back_to_defaults() {
    let view = DeviceView::new("S1").with_profile(&json!([]));
    assert!(view.profile().is_none());
    assert_eq!(view.min_temp(), 16.0);
    assert_eq!(view.max_temp(), 30.0);
    assert_eq!(view.hvac_modes(), [HvacMode::Off, HvacMode::Cool]);
}
