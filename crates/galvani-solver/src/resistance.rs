//! Effective resistance resolution.
//!
//! Every primitive component maps to a linear conductance for MNA, or to
//! "open" (`None`), in which case it is omitted from the matrix and flagged
//! after the solve. Sockets and unexpanded compound switches have no
//! primitive conductance and also resolve to open.

use galvani_core::{Component, ComponentKind};

/// Resistance used for ideal conductors and closed switch contacts.
pub const R_NEAR_SHORT: f64 = 1e-9;

/// Rated-V/W bulb model. Degenerate ratings yield a blocking resistance.
pub fn bulb_resistance(vr: f64, wr: f64) -> f64 {
    if wr <= 1e-12 {
        return 1e12;
    }
    ((vr * vr) / wr).max(1e-6)
}

/// Clamp a rheostat's `R` into `[Rmin, Rmax]` (swapped if inverted) and
/// return the clamped value.
fn rheostat_resistance(comp: &Component) -> f64 {
    let r = comp.prop("R", 100.0);
    let mut rmin = comp.prop("Rmin", 0.0);
    let mut rmax = comp.prop("Rmax", r.max(100.0));
    if rmax < rmin {
        std::mem::swap(&mut rmin, &mut rmax);
    }
    r.clamp(rmin, rmax)
}

/// Write clamped rheostat resistances back into the live circuit.
///
/// Resolution itself is pure; this pass makes the clamp visible to callers
/// (property editors show the value the solver actually used).
pub fn normalize_circuit(cir: &mut galvani_core::Circuit) {
    for comp in cir.components.values_mut() {
        if comp.kind == ComponentKind::Rheostat {
            let clamped = rheostat_resistance(comp);
            comp.set_prop("R", clamped);
        }
    }
}

/// Effective resistance of a solver component, or `None` for open.
pub fn effective_resistance(comp: &Component) -> Option<f64> {
    match comp.kind {
        ComponentKind::Wire => Some(R_NEAR_SHORT),
        ComponentKind::Resistor => Some(comp.prop("R", 100.0).max(1e-6)),
        ComponentKind::Bulb => Some(bulb_resistance(
            comp.prop("Vr", 6.0),
            comp.prop("Wr", 3.0),
        )),
        ComponentKind::Rheostat => Some(rheostat_resistance(comp).max(1e-6)),
        ComponentKind::Ammeter | ComponentKind::Voltmeter | ComponentKind::Galvanometer => {
            Some(meter_effective_resistance(comp))
        }
        ComponentKind::SwitchSpst => {
            (comp.prop_int("state", 1) == 1).then_some(R_NEAR_SHORT)
        }
        ComponentKind::ButtonMomentary => {
            (comp.prop_int("pressed", 0) == 1).then_some(R_NEAR_SHORT)
        }
        // No primitive conductance: sockets are stamped as sources, compound
        // switches must be expanded first.
        ComponentKind::Socket
        | ComponentKind::SwitchSpdt
        | ComponentKind::SwitchSp3t
        | ComponentKind::SwitchDpst
        | ComponentKind::SwitchDpdt => None,
    }
}

/// Parse a range list from a JSON array string or a comma/semicolon list.
/// Non-numeric tokens are silently dropped.
fn parse_float_list(s: &str) -> Vec<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Vec::new();
    }
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(s) {
        return items
            .iter()
            .filter_map(|it| match it {
                serde_json::Value::Number(n) => n.as_f64(),
                serde_json::Value::String(t) => t.trim().parse().ok(),
                _ => None,
            })
            .collect();
    }
    s.replace(';', ",")
        .split(',')
        .filter_map(|part| {
            let part = part.trim();
            (!part.is_empty()).then(|| part.parse().ok()).flatten()
        })
        .collect()
}

/// Configured measurement ranges for a meter (empty for other kinds).
pub fn meter_ranges(comp: &Component) -> Vec<f64> {
    let key = match comp.kind {
        ComponentKind::Ammeter | ComponentKind::Galvanometer => "ranges_I",
        ComponentKind::Voltmeter => "ranges_V",
        _ => return Vec::new(),
    };
    let raw = comp
        .meta
        .get(key)
        .or_else(|| comp.meta.get("ranges"))
        .map(String::as_str)
        .unwrap_or("");
    parse_float_list(raw)
}

/// Active range index, clamped into the configured list.
pub fn meter_range_index(comp: &Component) -> usize {
    comp.prop_int("range", 0).max(0) as usize
}

/// Full-scale value at the active range, if any ranges are configured.
pub fn meter_full_scale(comp: &Component) -> Option<f64> {
    let ranges = meter_ranges(comp);
    if ranges.is_empty() {
        return None;
    }
    let idx = meter_range_index(comp).min(ranges.len() - 1);
    Some(ranges[idx])
}

/// Native full-scale basis for display: the configured range, or the coil
/// full-deflection current for an unranged galvanometer.
pub fn meter_native_full_scale(comp: &Component) -> Option<f64> {
    if let Some(fs) = meter_full_scale(comp) {
        return Some(fs);
    }
    (comp.kind == ComponentKind::Galvanometer).then(|| comp.prop("Ifs", 50e-6))
}

/// Overload display predicate: the measured value exceeds full scale by more
/// than 2%.
pub fn meter_overload(comp: &Component, value: f64) -> bool {
    match meter_native_full_scale(comp) {
        Some(fs) => value.abs() > 1.02 * fs.abs(),
        None => false,
    }
}

/// Effective series resistance of a metering element.
///
/// All meters are linear two-terminal devices during the solve; overload is
/// purely a display property.
pub fn meter_effective_resistance(comp: &Component) -> f64 {
    match comp.kind {
        ComponentKind::Ammeter => match meter_full_scale(comp) {
            Some(fs) => {
                let burden_v = comp.prop("burden_V", 0.05);
                (burden_v / fs.abs().max(1e-15)).max(R_NEAR_SHORT)
            }
            None => comp.prop("Rin", 0.05).max(R_NEAR_SHORT),
        },
        ComponentKind::Voltmeter => match meter_full_scale(comp) {
            Some(fs) => {
                let ohm_per_v = comp
                    .props
                    .get("ohm_per_V")
                    .or_else(|| comp.props.get("sens"))
                    .copied()
                    .unwrap_or(1e4);
                (ohm_per_v * fs.abs().max(1e-15)).max(R_NEAR_SHORT)
            }
            None => comp.prop("Rin", 1e6).max(R_NEAR_SHORT),
        },
        ComponentKind::Galvanometer => {
            let rcoil = comp.prop("Rcoil", 50.0);
            let fs = match meter_full_scale(comp) {
                Some(fs) => fs,
                None => return rcoil.max(R_NEAR_SHORT),
            };
            let ifs = comp.prop("Ifs", 50e-6);
            if ifs.abs() < 1e-15 {
                return rcoil.max(R_NEAR_SHORT);
            }
            let ratio = fs.abs() / ifs.abs();
            if ratio <= 1.0 {
                return rcoil.max(R_NEAR_SHORT);
            }
            // Shunt sized so the coil sees Ifs at full-scale input.
            let rs = (rcoil / (ratio - 1.0)).max(R_NEAR_SHORT);
            (1.0 / (1.0 / rcoil + 1.0 / rs)).max(R_NEAR_SHORT)
        }
        _ => 1e12,
    }
}
