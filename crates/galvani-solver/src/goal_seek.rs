//! Parameter goal-seek.
//!
//! Finds the value of one scalar component property that drives a chosen
//! measurement on the re-solved circuit to a target. Bracketed problems use
//! bisection; otherwise a clamped secant iteration with bisection injection
//! on stalls. Every evaluation mutates the live property and re-runs the
//! full solve; on total failure the property is restored.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use galvani_core::{Circuit, Point};

use crate::metrics::{component_metrics, MeasureField};
use crate::solve::{solve_circuit, CompFlag, SolveResult};

/// Expansion steps attempted while searching for a sign change.
const BRACKET_EXPANSIONS: usize = 12;

/// What to measure after each trial solve.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Measurement {
    /// A node voltage at a grid coordinate.
    Node {
        node: Point,
        #[serde(default)]
        abs: bool,
    },
    /// A component field, optionally restricted to one surrogate branch.
    Comp {
        cid: String,
        #[serde(default = "default_measure_field")]
        field: MeasureField,
        #[serde(default)]
        branch: Option<String>,
        #[serde(default)]
        abs: bool,
    },
}

fn default_measure_field() -> MeasureField {
    MeasureField::Iab
}

/// Root-finding method selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeekMethod {
    /// Bracketed bisection when possible, secant otherwise.
    #[default]
    Auto,
    Bisect,
    Secant,
}

/// A goal-seek request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoalSeekRequest {
    /// Component whose property is varied.
    pub var_cid: String,
    /// Property name to vary (e.g. `"R"`, `"V"`).
    pub var_prop: String,
    pub target: f64,
    pub measure: Measurement,
    /// Inclusive search bounds (swapped if inverted).
    pub lo: f64,
    pub hi: f64,
    #[serde(default = "default_tol_abs")]
    pub tol_abs: f64,
    #[serde(default = "default_tol_rel")]
    pub tol_rel: f64,
    #[serde(default = "default_max_iter")]
    pub max_iter: usize,
    #[serde(default)]
    pub method: SeekMethod,
    /// Treat trial solves with a tripped source as failed evaluations.
    #[serde(default)]
    pub reject_if_overcurrent: bool,
}

fn default_tol_abs() -> f64 {
    1e-9
}

fn default_tol_rel() -> f64 {
    1e-6
}

fn default_max_iter() -> usize {
    60
}

/// Outcome of a goal-seek run.
///
/// On failure, `value`/`achieved`/`error` carry the best iterate observed
/// (smallest `|error|`) and the property is restored to its pre-call value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoalSeekResult {
    pub ok: bool,
    pub value: f64,
    pub achieved: f64,
    pub target: f64,
    pub error: f64,
    pub iterations: usize,
    pub message: String,
    /// Chronological `(x, measured)` trajectory.
    pub history: Vec<(f64, f64)>,
}

impl GoalSeekResult {
    fn failure(target: f64, message: impl Into<String>) -> Self {
        Self {
            target,
            message: message.into(),
            ..Self::default()
        }
    }
}

/// Extract the requested measurement from a solve result.
fn goal_measure(result: &SolveResult, cir: &Circuit, measure: &Measurement) -> Option<f64> {
    let (value, absolute) = match measure {
        Measurement::Node { node, abs } => (result.voltage(*node), *abs),
        Measurement::Comp {
            cid,
            field,
            branch,
            abs,
        } => {
            // A named branch takes priority for current measurements.
            if let (Some(branch), MeasureField::Iab) = (branch, field) {
                if let Some(i) = result
                    .comp_branch_i
                    .get(cid)
                    .and_then(|branches| branches.get(branch))
                {
                    return Some(if *abs { i.abs() } else { *i });
                }
            }
            let comp = cir.get(cid)?;
            let value = component_metrics(result, comp).field(*field)?;
            (value, *abs)
        }
    };
    Some(if absolute { value.abs() } else { value })
}

/// One trial evaluation: write the property, solve, measure, memoize.
struct Evaluator<'a> {
    cir: &'a mut Circuit,
    var_cid: &'a str,
    var_prop: &'a str,
    target: f64,
    measure: &'a Measurement,
    reject_if_overcurrent: bool,
    /// Keyed by the exact bit pattern of the trial value.
    cache: HashMap<u64, Option<(f64, f64)>>,
}

impl Evaluator<'_> {
    /// Returns `(error, measured)`, or `None` for a failed evaluation
    /// (singular solve, rejected overcurrent, missing or non-finite
    /// measurement).
    fn eval(&mut self, x: f64) -> Option<(f64, f64)> {
        let key = x.to_bits();
        if let Some(hit) = self.cache.get(&key) {
            return *hit;
        }
        self.write_prop(x);
        let res = solve_circuit(self.cir);
        let out = self.measure_result(&res);
        self.cache.insert(key, out);
        out
    }

    fn write_prop(&mut self, x: f64) {
        if let Some(comp) = self.cir.get_mut(self.var_cid) {
            comp.set_prop(self.var_prop, x);
        }
    }

    fn measure_result(&self, res: &SolveResult) -> Option<(f64, f64)> {
        if !res.ok {
            return None;
        }
        if self.reject_if_overcurrent
            && res
                .comp_flags
                .values()
                .any(|f| *f == CompFlag::SourceOvercurrent)
        {
            return None;
        }
        let measured = goal_measure(res, self.cir, self.measure)?;
        if !measured.is_finite() {
            return None;
        }
        let error = measured - self.target;
        error.is_finite().then_some((error, measured))
    }
}

fn straddles_zero(e_lo: f64, e_hi: f64) -> bool {
    e_lo == 0.0 || e_hi == 0.0 || (e_lo < 0.0 && e_hi > 0.0) || (e_hi < 0.0 && e_lo > 0.0)
}

/// Find the property value that drives the measurement to the target.
pub fn goal_seek_parameter(cir: &mut Circuit, req: &GoalSeekRequest) -> GoalSeekResult {
    let Some(comp) = cir.get(&req.var_cid) else {
        return GoalSeekResult::failure(req.target, format!("unknown var_cid: {}", req.var_cid));
    };
    if req.lo == req.hi {
        return GoalSeekResult::failure(req.target, "lo == hi");
    }
    let (mut lo, mut hi) = if req.lo > req.hi {
        (req.hi, req.lo)
    } else {
        (req.lo, req.hi)
    };

    let prev = comp.prop(&req.var_prop, 0.0);

    let mut out = GoalSeekResult {
        target: req.target,
        ..GoalSeekResult::default()
    };

    let mut ev = Evaluator {
        cir,
        var_cid: &req.var_cid,
        var_prop: &req.var_prop,
        target: req.target,
        measure: &req.measure,
        reject_if_overcurrent: req.reject_if_overcurrent,
        cache: HashMap::new(),
    };

    let mut at_lo = ev.eval(lo);
    let mut at_hi = ev.eval(hi);

    // One midpoint substitution for a single failed bound.
    if req.method == SeekMethod::Auto && (at_lo.is_none() || at_hi.is_none()) {
        let mid = 0.5 * (lo + hi);
        if let Some(at_mid) = ev.eval(mid) {
            if at_lo.is_none() {
                lo = mid;
                at_lo = Some(at_mid);
            } else if at_hi.is_none() {
                hi = mid;
                at_hi = Some(at_mid);
            }
        }
    }

    let (Some((mut e_lo, mut m_lo)), Some((mut e_hi, mut m_hi))) = (at_lo, at_hi) else {
        ev.write_prop(prev);
        return GoalSeekResult::failure(req.target, "evaluation failed at bounds");
    };

    out.history.push((lo, m_lo));
    out.history.push((hi, m_hi));

    let tol_abs = req.tol_abs;
    let tol_rel = req.tol_rel;
    let target = req.target;
    let is_done = move |err: f64, achieved: f64| {
        let tol = tol_abs.max(tol_rel * 1.0_f64.max(target.abs()).max(achieved.abs()));
        err.abs() <= tol
    };

    let mut bracketed = straddles_zero(e_lo, e_hi);

    // Bracketing phase: expand the bounds looking for a sign change.
    // Resistance-like positive intervals scale geometrically; anything else
    // widens linearly around the midpoint.
    if req.method == SeekMethod::Auto && !bracketed {
        let (mut lo2, mut hi2) = (lo, hi);
        let (mut e_lo2, mut e_hi2) = (e_lo, e_hi);
        let (mut m_lo2, mut m_hi2) = (m_lo, m_hi);
        let geometric = req.var_prop.eq_ignore_ascii_case("R");

        for _ in 0..BRACKET_EXPANSIONS {
            if straddles_zero(e_lo2, e_hi2) {
                lo = lo2;
                hi = hi2;
                e_lo = e_lo2;
                e_hi = e_hi2;
                m_lo = m_lo2;
                m_hi = m_hi2;
                bracketed = true;
                break;
            }

            if lo2 > 0.0 && hi2 > 0.0 && geometric {
                lo2 = (lo2 / 10.0).max(1e-12);
                hi2 *= 10.0;
            } else {
                let c = 0.5 * (lo2 + hi2);
                let mut w = hi2 - lo2;
                if w.abs() < 1e-15 {
                    w = c.abs().max(1.0);
                }
                lo2 = c - 2.0 * w;
                hi2 = c + 2.0 * w;
            }

            // Keep the previous values for a bound whose re-evaluation fails.
            if let Some((e, m)) = ev.eval(lo2) {
                e_lo2 = e;
                m_lo2 = m;
            }
            if let Some((e, m)) = ev.eval(hi2) {
                e_hi2 = e;
                m_hi2 = m;
            }
        }
    }

    let use_bisect = matches!(req.method, SeekMethod::Auto | SeekMethod::Bisect) && bracketed;

    // Secant state.
    let (mut x0, mut x1) = (lo, hi);
    let (mut y0, mut y1) = (e_lo, e_hi);
    let (mut m0, mut m1) = (m_lo, m_hi);
    // Bisection state.
    let (mut a, mut b) = (lo, hi);
    let (mut fa, mut fb) = (e_lo, e_hi);

    let (mut best_x, mut best_m, mut best_err) = (lo, m_lo, e_lo);
    let mut fail_reason = "iteration budget exhausted";

    for it in 0..req.max_iter {
        out.iterations = it + 1;
        if y0.abs() < best_err.abs() {
            (best_x, best_m, best_err) = (x0, m0, y0);
        }
        if y1.abs() < best_err.abs() {
            (best_x, best_m, best_err) = (x1, m1, y1);
        }

        if use_bisect {
            let mid = 0.5 * (a + b);
            let Some((fm, mm)) = ev.eval(mid) else {
                fail_reason = "evaluation failed during bisection";
                break;
            };
            out.history.push((mid, mm));
            if fm.abs() < best_err.abs() {
                (best_x, best_m, best_err) = (mid, mm, fm);
            }
            if is_done(fm, mm) {
                ev.write_prop(mid);
                out.ok = true;
                out.value = mid;
                out.achieved = mm;
                out.error = fm;
                out.message = "ok".to_string();
                return out;
            }
            // Standard sign update; an exact zero at an endpoint narrows
            // toward it.
            if fa == 0.0 {
                a = mid;
                fa = fm;
            } else if fb == 0.0 {
                b = mid;
                fb = fm;
            } else if (fa < 0.0 && fm > 0.0) || (fa > 0.0 && fm < 0.0) {
                b = mid;
                fb = fm;
            } else {
                a = mid;
                fa = fm;
            }
            continue;
        }

        // Secant step, clamped to the search interval.
        if y1 - y0 == 0.0 {
            fail_reason = "secant slope is zero";
            break;
        }
        let mut x2 = x1 - y1 * (x1 - x0) / (y1 - y0);
        x2 = x2.clamp(lo, hi);
        // Inject a bisection step when the iterate stalls.
        if (x2 - x1).abs() <= 1e-15_f64.max(1e-12 * 1.0_f64.max(x1.abs())) {
            x2 = 0.5 * (x0 + x1);
        }
        let Some((y2, m2)) = ev.eval(x2) else {
            fail_reason = "evaluation failed during secant";
            break;
        };
        out.history.push((x2, m2));
        if y2.abs() < best_err.abs() {
            (best_x, best_m, best_err) = (x2, m2, y2);
        }
        if is_done(y2, m2) {
            ev.write_prop(x2);
            out.ok = true;
            out.value = x2;
            out.achieved = m2;
            out.error = y2;
            out.message = "ok".to_string();
            return out;
        }
        (x0, y0, m0) = (x1, y1, m1);
        (x1, y1, m1) = (x2, y2, m2);
    }

    // Total failure: restore the property, report the best iterate.
    ev.write_prop(prev);
    out.ok = false;
    out.value = best_x;
    out.achieved = best_m;
    out.error = best_err;
    out.message = if req.method == SeekMethod::Auto && !bracketed {
        "failed: not bracketed".to_string()
    } else {
        fail_reason.to_string()
    };
    out
}
