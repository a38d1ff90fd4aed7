//! Component model.
//!
//! A component is a tagged record: a kind, two grid endpoints, a numeric
//! property map, and a string metadata map. The kind tag is a closed
//! enumeration so that resistance resolution, switch expansion, and meter
//! math are exhaustive matches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geom::Point;

/// The closed set of component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentKind {
    /// Ideal voltage source from `a` to `b` (`V`, `Iwarn`).
    Socket,
    /// Ideal conductor (near-short resistance).
    Wire,
    /// Linear resistor (`R`).
    Resistor,
    /// Linear resistor derived from rated voltage/power (`Vr`, `Wr`).
    Bulb,
    /// Variable resistor clamped into `[Rmin, Rmax]`.
    Rheostat,
    /// Single-pole single-throw switch (`state`).
    SwitchSpst,
    /// Single-pole double-throw switch (`throw`, extra terminal coords).
    SwitchSpdt,
    /// Single-pole triple-throw switch.
    SwitchSp3t,
    /// Double-pole single-throw switch.
    SwitchDpst,
    /// Double-pole double-throw switch.
    SwitchDpdt,
    /// Momentary push button (`pressed`).
    ButtonMomentary,
    /// Near-short metering element with optional current ranges.
    Ammeter,
    /// High-impedance metering element with optional voltage ranges.
    Voltmeter,
    /// Shunted coil metering element (`Rcoil`, `Ifs`).
    Galvanometer,
}

impl ComponentKind {
    /// The serialized tag for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            ComponentKind::Socket => "socket",
            ComponentKind::Wire => "wire",
            ComponentKind::Resistor => "resistor",
            ComponentKind::Bulb => "bulb",
            ComponentKind::Rheostat => "rheostat",
            ComponentKind::SwitchSpst => "switch_spst",
            ComponentKind::SwitchSpdt => "switch_spdt",
            ComponentKind::SwitchSp3t => "switch_sp3t",
            ComponentKind::SwitchDpst => "switch_dpst",
            ComponentKind::SwitchDpdt => "switch_dpdt",
            ComponentKind::ButtonMomentary => "button_momentary",
            ComponentKind::Ammeter => "ammeter",
            ComponentKind::Voltmeter => "voltmeter",
            ComponentKind::Galvanometer => "galvanometer",
        }
    }

    /// True for compound switches that must be expanded before solving.
    pub fn is_compound_switch(self) -> bool {
        matches!(
            self,
            ComponentKind::SwitchSpdt
                | ComponentKind::SwitchSp3t
                | ComponentKind::SwitchDpst
                | ComponentKind::SwitchDpdt
        )
    }

    /// True for metering elements.
    pub fn is_meter(self) -> bool {
        matches!(
            self,
            ComponentKind::Ammeter | ComponentKind::Voltmeter | ComponentKind::Galvanometer
        )
    }
}

impl std::fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A circuit component.
///
/// Identity (`cid`) is immutable once created; endpoints and properties are
/// mutable. Properties hold all numeric configuration; `meta` holds string
/// configuration such as meter range lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub cid: String,
    #[serde(rename = "ctype")]
    pub kind: ComponentKind,
    pub a: Point,
    pub b: Point,
    #[serde(default)]
    pub props: BTreeMap<String, f64>,
    #[serde(default)]
    pub meta: BTreeMap<String, String>,
}

impl Component {
    pub fn new(cid: impl Into<String>, kind: ComponentKind, a: Point, b: Point) -> Self {
        Self {
            cid: cid.into(),
            kind,
            a,
            b,
            props: BTreeMap::new(),
            meta: BTreeMap::new(),
        }
    }

    /// Numeric property with a fallback default.
    pub fn prop(&self, name: &str, default: f64) -> f64 {
        self.props.get(name).copied().unwrap_or(default)
    }

    /// Numeric property truncated to an integer, with a fallback default.
    pub fn prop_int(&self, name: &str, default: i32) -> i32 {
        self.props
            .get(name)
            .map(|v| *v as i32)
            .unwrap_or(default)
    }

    pub fn set_prop(&mut self, name: &str, value: f64) {
        self.props.insert(name.to_string(), value);
    }

    /// Short human-readable name: kind plus cid prefix.
    pub fn display_name(&self) -> String {
        let prefix = self.cid.get(..4).unwrap_or(&self.cid);
        format!("{}:{}", self.kind, prefix)
    }
}
