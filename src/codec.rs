//! Vendor ↔ UI vocabularies.
//!
//! Fan speed and vane position are relabelled, not copied: vendor `quiet` is
//! shown as `low`, vendor `low` as `medium`, and so on. Each vocabulary is a
//! single table; the reverse direction is derived from it and checked to be
//! an exact inverse when first used. Values missing from a table are passed
//! through untouched in both directions.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

/// A bidirectional vendor/UI mapping with a fixed presentation order.
#[derive(Debug)]
pub struct Vocabulary {
    to_ui: HashMap<&'static str, &'static str>,
    to_vendor: HashMap<&'static str, &'static str>,
    order: Vec<&'static str>,
}

impl Vocabulary {
    /// Builds from `(vendor, ui)` pairs; the pair order is the UI order.
    ///
    /// Panics if a vendor or UI label appears twice, since the two
    /// directions would then disagree.
    fn from_pairs(pairs: &[(&'static str, &'static str)]) -> Self {
        let to_ui: HashMap<_, _> = pairs.iter().copied().collect();
        let to_vendor: HashMap<_, _> = to_ui.iter().map(|(v, u)| (*u, *v)).collect();
        assert_eq!(to_ui.len(), pairs.len(), "duplicate vendor label");
        assert_eq!(to_vendor.len(), pairs.len(), "duplicate UI label");
        for (vendor, ui) in &to_ui {
            assert_eq!(to_vendor.get(ui), Some(vendor), "vocabulary drift on {vendor}");
        }
        Self {
            to_ui,
            to_vendor,
            order: pairs.iter().map(|(_, ui)| *ui).collect(),
        }
    }

    pub fn to_ui<'a>(&self, vendor: &'a str) -> &'a str {
        self.to_ui.get(vendor).copied().unwrap_or(vendor)
    }

    pub fn to_vendor<'a>(&self, ui: &'a str) -> &'a str {
        self.to_vendor.get(ui).copied().unwrap_or(ui)
    }

    /// UI labels in presentation order.
    pub fn order(&self) -> &[&'static str] {
        &self.order
    }

    pub fn vendor_values(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.order.iter().map(|ui| self.to_vendor[ui])
    }
}

pub static FAN_SPEED: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::from_pairs(&[
        ("auto", "auto"),
        ("superQuiet", "quiet"),
        ("quiet", "low"),
        ("low", "medium"),
        ("powerful", "high"),
        ("superPowerful", "powerful"),
    ])
});

pub static VANE: LazyLock<Vocabulary> = LazyLock::new(|| {
    Vocabulary::from_pairs(&[
        ("auto", "auto"),
        ("swing", "swing"),
        ("vertical", "lowest"),
        ("midvertical", "low"),
        ("midpoint", "middle"),
        ("midhorizontal", "high"),
        ("horizontal", "highest"),
    ])
});

pub const OPERATION_MODE_OFF: &str = "off";
pub const OPERATION_MODE_COOL: &str = "cool";
pub const OPERATION_MODE_HEAT: &str = "heat";
pub const OPERATION_MODE_DRY: &str = "dry";
pub const OPERATION_MODE_VENT: &str = "vent";
pub const OPERATION_MODE_AUTO: &str = "auto";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HvacMode {
    Off,
    Cool,
    Heat,
    Dry,
    FanOnly,
    HeatCool,
}

const MODE_TABLE: [(&str, HvacMode); 6] = [
    (OPERATION_MODE_OFF, HvacMode::Off),
    (OPERATION_MODE_COOL, HvacMode::Cool),
    (OPERATION_MODE_HEAT, HvacMode::Heat),
    (OPERATION_MODE_DRY, HvacMode::Dry),
    (OPERATION_MODE_VENT, HvacMode::FanOnly),
    (OPERATION_MODE_AUTO, HvacMode::HeatCool),
];

static MODE_TO_VENDOR: LazyLock<HashMap<HvacMode, &'static str>> = LazyLock::new(|| {
    let inverted: HashMap<_, _> = MODE_TABLE.iter().map(|(v, m)| (*m, *v)).collect();
    assert_eq!(inverted.len(), MODE_TABLE.len(), "operation mode table is not invertible");
    inverted
});

impl HvacMode {
    pub fn from_vendor_str(s: &str) -> Option<Self> {
        MODE_TABLE.iter().find(|(v, _)| *v == s).map(|(_, m)| *m)
    }

    pub fn as_vendor_str(&self) -> &'static str {
        MODE_TO_VENDOR[self]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HvacMode::Off => "off",
            HvacMode::Cool => "cool",
            HvacMode::Heat => "heat",
            HvacMode::Dry => "dry",
            HvacMode::FanOnly => "fan_only",
            HvacMode::HeatCool => "heat_cool",
        }
    }
}

impl fmt::Display for HvacMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What the unit is doing right now, as opposed to what it is set to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HvacAction {
    Off,
    Heating,
    Cooling,
    Drying,
    Fan,
    #[default]
    Idle,
}

impl HvacAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HvacAction::Off => "off",
            HvacAction::Heating => "heating",
            HvacAction::Cooling => "cooling",
            HvacAction::Drying => "drying",
            HvacAction::Fan => "fan",
            HvacAction::Idle => "idle",
        }
    }
}

impl fmt::Display for HvacAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fan_relabels_vendor_values() {
        assert_eq!(FAN_SPEED.to_ui("superQuiet"), "quiet");
        assert_eq!(FAN_SPEED.to_ui("quiet"), "low");
        assert_eq!(FAN_SPEED.to_ui("low"), "medium");
        assert_eq!(FAN_SPEED.to_ui("powerful"), "high");
        assert_eq!(FAN_SPEED.to_ui("superPowerful"), "powerful");
        assert_eq!(FAN_SPEED.to_vendor("medium"), "low");
    }

    #[test]
    fn orders_are_fixed() {
        assert_eq!(
            FAN_SPEED.order(),
            ["auto", "quiet", "low", "medium", "high", "powerful"]
        );
        assert_eq!(
            VANE.order(),
            ["auto", "swing", "lowest", "low", "middle", "high", "highest"]
        );
    }

    #[test]
    fn vendor_values_follow_ui_order() {
        let vane: Vec<_> = VANE.vendor_values().collect();
        assert_eq!(
            vane,
            ["auto", "swing", "vertical", "midvertical", "midpoint", "midhorizontal", "horizontal"]
        );
    }

    #[test]
    fn unknown_values_pass_through() {
        assert_eq!(FAN_SPEED.to_ui("turbo"), "turbo");
        assert_eq!(FAN_SPEED.to_vendor("turbo"), "turbo");
        assert_eq!(VANE.to_ui(""), "");
        assert_eq!(VANE.to_vendor("diagonal"), "diagonal");
    }

    #[test]
    #[should_panic(expected = "duplicate UI label")]
    fn duplicate_labels_are_rejected() {
        Vocabulary::from_pairs(&[("a", "x"), ("b", "x")]);
    }

    #[test]
    fn hvac_mode_mapping() {
        assert_eq!(HvacMode::from_vendor_str("vent"), Some(HvacMode::FanOnly));
        assert_eq!(HvacMode::from_vendor_str("auto"), Some(HvacMode::HeatCool));
        assert_eq!(HvacMode::from_vendor_str("autoHeat"), None);
        assert_eq!(HvacMode::HeatCool.as_vendor_str(), "auto");
        assert_eq!(HvacMode::FanOnly.to_string(), "fan_only");
    }
}
