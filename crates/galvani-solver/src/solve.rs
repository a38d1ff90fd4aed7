//! DC steady-state solve pipeline.
//!
//! user circuit -> switch expansion -> effective resistance -> MNA assembly
//! -> dense solve -> post-processing. Numeric anomalies degrade to flags and
//! warnings; only a singular system fails the solve.

use std::collections::{BTreeMap, HashMap};

use galvani_core::{format::format_si, Circuit, Component, ComponentKind, Point};

use crate::error::Error;
use crate::expand::{expand_switches, Expansion};
use crate::mna::{select_ground, MnaSystem, NodeMap};
use crate::resistance::effective_resistance;

/// Current below which a source is considered quiet (open loop).
const QUIET_SOURCE_CURRENT: f64 = 1e-6;

/// Post-solve status flag attached to a component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompFlag {
    /// A surrogate branch of this component has no finite resistance.
    Open,
    /// Carrying more than the largest source warning threshold.
    Overcurrent,
    /// A source exceeding its own `Iwarn` threshold.
    SourceOvercurrent,
}

/// Result of a DC solve.
///
/// Source currents are the MNA auxiliary variables directly: the current
/// flowing from `a` to `b` through the source (see
/// [`MnaSystem::stamp_voltage_source`]). All other currents are signed from
/// `a` to `b` through the component.
#[derive(Debug, Clone, Default)]
pub struct SolveResult {
    pub ok: bool,
    pub singular: bool,
    /// Voltage per node coordinate; ground is pinned to exactly 0.
    pub node_v: HashMap<Point, f64>,
    /// Aggregated current per original component.
    pub comp_i: HashMap<String, f64>,
    /// Labeled branch currents per original component (surrogate branches
    /// for compound switches, `"main"` otherwise).
    pub comp_branch_i: HashMap<String, BTreeMap<String, f64>>,
    pub comp_flags: HashMap<String, CompFlag>,
    pub warnings: Vec<String>,
}

impl SolveResult {
    /// Node voltage, defaulting to 0 for unknown coordinates.
    pub fn voltage(&self, node: Point) -> f64 {
        self.node_v.get(&node).copied().unwrap_or(0.0)
    }

    /// Aggregated component current, defaulting to 0.
    pub fn current(&self, cid: &str) -> f64 {
        self.comp_i.get(cid).copied().unwrap_or(0.0)
    }
}

fn warn(warnings: &mut Vec<String>, message: String) {
    log::warn!("{message}");
    warnings.push(message);
}

/// Solve the DC steady state of a circuit.
pub fn solve_circuit(cir: &Circuit) -> SolveResult {
    let mut res = SolveResult::default();
    let originals: Vec<&Component> = cir.components.values().collect();

    let ground = select_ground(&originals);
    let expansion = expand_switches(cir);
    let Expansion {
        solver_comps,
        parent,
        label,
    } = &expansion;

    let node_map = NodeMap::build(solver_comps, ground);
    let sources: Vec<&Component> = solver_comps
        .iter()
        .filter(|c| c.kind == ComponentKind::Socket)
        .collect();

    let n = node_map.len();
    let m = sources.len();
    if n + m == 0 {
        res.ok = true;
        return res;
    }

    let mut mna = MnaSystem::new(n, m);
    for c in solver_comps {
        if c.kind == ComponentKind::Socket {
            continue;
        }
        let Some(r) = effective_resistance(c) else {
            continue;
        };
        mna.stamp_conductance(node_map.index(c.a), node_map.index(c.b), 1.0 / r);
    }
    for (k, c) in sources.iter().enumerate() {
        mna.stamp_voltage_source(
            node_map.index(c.a),
            node_map.index(c.b),
            k,
            c.prop("V", 5.0),
        );
    }

    let sol = match mna.solve() {
        Ok(sol) => sol,
        Err(Error::SingularMatrix) | Err(Error::DimensionMismatch { .. }) => {
            res.singular = true;
            warn(
                &mut res.warnings,
                "circuit matrix is singular: the loop may be fully open, missing a \
                 reference ground, or shorting/conflicting ideal voltage sources"
                    .to_string(),
            );
            return res;
        }
    };

    res.node_v.insert(ground, 0.0);
    for (node, i) in node_map.iter() {
        res.node_v.insert(node, sol[i]);
    }

    // Per-surrogate currents.
    let mut solver_comp_i: HashMap<&str, f64> = HashMap::new();
    let mut source_slot = 0usize;
    for c in solver_comps {
        if c.kind == ComponentKind::Socket {
            solver_comp_i.insert(&c.cid, sol[n + source_slot]);
            source_slot += 1;
            continue;
        }
        let i = match effective_resistance(c) {
            Some(r) => (res.voltage(c.a) - res.voltage(c.b)) / r,
            None => 0.0,
        };
        solver_comp_i.insert(&c.cid, i);
    }

    // Aggregate surrogate branches onto their parents and flag open branches.
    for c in solver_comps {
        let parent_cid = parent.get(&c.cid).cloned().unwrap_or_else(|| c.cid.clone());
        let branch_label = label.get(&c.cid).cloned().unwrap_or_else(|| "main".to_string());
        res.comp_branch_i
            .entry(parent_cid.clone())
            .or_default()
            .insert(branch_label, solver_comp_i.get(c.cid.as_str()).copied().unwrap_or(0.0));
        if c.kind != ComponentKind::Socket && effective_resistance(c).is_none() {
            res.comp_flags.insert(parent_cid, CompFlag::Open);
        }
    }

    // Per-original current: the "main" branch when present, otherwise the
    // alphabetically first label.
    for oc in &originals {
        if oc.kind == ComponentKind::Socket {
            res.comp_i
                .insert(oc.cid.clone(), solver_comp_i.get(oc.cid.as_str()).copied().unwrap_or(0.0));
            continue;
        }
        let current = match res.comp_branch_i.get(&oc.cid) {
            Some(branches) if !branches.is_empty() => branches
                .get("main")
                .or_else(|| branches.values().next())
                .copied()
                .unwrap_or(0.0),
            _ => solver_comp_i.get(oc.cid.as_str()).copied().unwrap_or(0.0),
        };
        res.comp_i.insert(oc.cid.clone(), current);
    }

    // Source overcurrent flags and warnings.
    for c in &sources {
        let i = solver_comp_i.get(c.cid.as_str()).copied().unwrap_or(0.0);
        if i.abs() > c.prop("Iwarn", 5.0) {
            warn(
                &mut res.warnings,
                format!(
                    "possible short circuit: source {} output current is too large, |I|={}",
                    c.display_name(),
                    format_si(i.abs(), "A")
                ),
            );
            res.comp_flags
                .insert(c.cid.clone(), CompFlag::SourceOvercurrent);
        }
    }

    // When a source trips, flag every other component above the largest
    // source threshold.
    let max_iwarn = sources
        .iter()
        .map(|c| c.prop("Iwarn", 5.0))
        .fold(None, |acc: Option<f64>, v| Some(acc.map_or(v, |a| a.max(v))));
    let any_source_over = sources
        .iter()
        .any(|c| res.comp_flags.get(&c.cid) == Some(&CompFlag::SourceOvercurrent));
    if let (Some(threshold), true) = (max_iwarn, any_source_over) {
        for oc in &originals {
            if oc.kind == ComponentKind::Socket || res.comp_flags.contains_key(&oc.cid) {
                continue;
            }
            if res.current(&oc.cid).abs() > threshold {
                res.comp_flags.insert(oc.cid.clone(), CompFlag::Overcurrent);
            }
        }
    }

    if !sources.is_empty()
        && sources
            .iter()
            .all(|c| res.current(&c.cid).abs() < QUIET_SOURCE_CURRENT)
    {
        warn(
            &mut res.warnings,
            "likely open loop: the sources deliver almost no current".to_string(),
        );
    }

    res.ok = true;
    res
}
