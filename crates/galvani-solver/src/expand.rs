//! Compound switch expansion.
//!
//! Multi-pole/multi-throw switches are rewritten into two-terminal
//! `switch_spst` surrogates before assembly. Each surrogate carries its
//! parent identifier and a branch label so that post-processing can
//! aggregate branch currents back onto the original component. Non-switch
//! components pass through under the synthetic label `"main"`.

use std::collections::HashMap;

use galvani_core::{Circuit, Component, ComponentKind, Point};

/// Result of the expansion pass: the solver component list plus the
/// surrogate-to-parent and surrogate-to-label mappings.
#[derive(Debug, Clone, Default)]
pub struct Expansion {
    pub solver_comps: Vec<Component>,
    pub parent: HashMap<String, String>,
    pub label: HashMap<String, String>,
}

impl Expansion {
    fn push(&mut self, comp: Component, parent: &str, label: &str) {
        self.parent.insert(comp.cid.clone(), parent.to_string());
        self.label.insert(comp.cid.clone(), label.to_string());
        self.solver_comps.push(comp);
    }

    fn push_surrogate(
        &mut self,
        parent: &Component,
        label: &str,
        a: Point,
        b: Point,
        state: i32,
        variant: String,
    ) {
        let mut sw = Component::new(
            format!("{}:{}", parent.cid, label),
            ComponentKind::SwitchSpst,
            a,
            b,
        );
        sw.set_prop("state", state as f64);
        sw.meta.insert("variant".to_string(), variant);
        self.push(sw, &parent.cid, label);
    }
}

/// Read an auxiliary terminal coordinate from `{x_prop, y_prop}` props,
/// falling back to a default point.
fn terminal(comp: &Component, x_prop: &str, y_prop: &str, default: Point) -> Point {
    Point::new(
        comp.prop_int(x_prop, default.x),
        comp.prop_int(y_prop, default.y),
    )
}

/// Expand every compound switch into `switch_spst` surrogates.
///
/// The original component list is left untouched; the returned list is what
/// the solver assembles from.
pub fn expand_switches(cir: &Circuit) -> Expansion {
    let mut out = Expansion::default();

    for c in cir.components.values() {
        match c.kind {
            ComponentKind::SwitchSpdt => {
                let throw = c.prop_int("throw", 0);
                let c2 = terminal(c, "c_x", "c_y", Point::new(c.b.x, c.b.y + 2));
                if throw == 0 {
                    out.push_surrogate(c, "t0", c.a, c.b, 1, "spdt->b".to_string());
                } else {
                    out.push_surrogate(c, "t1", c.a, c2, 1, "spdt->c2".to_string());
                }
            }
            ComponentKind::SwitchSp3t => {
                let throw = c.prop_int("throw", 0).clamp(0, 2);
                let targets = [
                    c.b,
                    terminal(c, "c_x", "c_y", Point::new(c.b.x, c.b.y + 2)),
                    terminal(c, "d_x", "d_y", Point::new(c.b.x, c.b.y + 4)),
                ];
                let label = format!("t{throw}");
                out.push_surrogate(
                    c,
                    &label,
                    c.a,
                    targets[throw as usize],
                    1,
                    format!("sp3t->t{throw}"),
                );
            }
            ComponentKind::SwitchDpst => {
                let state = c.prop_int("state", 1);
                let p2a = terminal(c, "c_x", "c_y", Point::new(c.a.x, c.a.y + 2));
                let p2b = terminal(c, "d_x", "d_y", Point::new(c.b.x, c.b.y + 2));
                out.push_surrogate(c, "p1", c.a, c.b, state, "dpst:p1".to_string());
                out.push_surrogate(c, "p2", p2a, p2b, state, "dpst:p2".to_string());
            }
            ComponentKind::SwitchDpdt => {
                let throw = c.prop_int("throw", 0).clamp(0, 1);
                let t1_0 = c.b;
                let t1_1 = terminal(c, "c_x", "c_y", Point::new(c.b.x, c.b.y + 2));
                let com2 = terminal(c, "d_x", "d_y", Point::new(c.a.x, c.a.y + 4));
                let t2_0 = terminal(c, "e_x", "e_y", Point::new(com2.x + 6, com2.y));
                let t2_1 = terminal(c, "f_x", "f_y", Point::new(t2_0.x, t2_0.y + 2));
                let pole1 = if throw == 0 { t1_0 } else { t1_1 };
                let pole2 = if throw == 0 { t2_0 } else { t2_1 };
                out.push_surrogate(c, "p1", c.a, pole1, 1, format!("dpdt:p1:t{throw}"));
                out.push_surrogate(c, "p2", com2, pole2, 1, format!("dpdt:p2:t{throw}"));
            }
            ComponentKind::ButtonMomentary => {
                let pressed = c.prop_int("pressed", 0);
                let state = if pressed == 1 { 1 } else { 0 };
                out.push_surrogate(c, "m", c.a, c.b, state, "momentary".to_string());
            }
            _ => {
                out.push(c.clone(), &c.cid, "main");
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resistance::effective_resistance;

    fn p(x: i32, y: i32) -> Point {
        Point::new(x, y)
    }

    #[test]
    fn test_passthrough_gets_main_label() {
        let mut cir = Circuit::new();
        let rid = cir.add(ComponentKind::Resistor, p(0, 0), p(4, 0), &[]);
        let exp = expand_switches(&cir);
        assert_eq!(exp.solver_comps.len(), 1);
        assert_eq!(exp.parent[&rid], rid);
        assert_eq!(exp.label[&rid], "main");
    }

    #[test]
    fn test_spdt_selects_throw_terminal() {
        let mut cir = Circuit::new();
        let sid = cir.add(ComponentKind::SwitchSpdt, p(0, 0), p(6, 0), &[]);
        let exp = expand_switches(&cir);
        let sw = &exp.solver_comps[0];
        assert_eq!(sw.kind, ComponentKind::SwitchSpst);
        assert_eq!((sw.a, sw.b), (p(0, 0), p(6, 0)));
        assert_eq!(exp.label[&sw.cid], "t0");
        assert_eq!(exp.parent[&sw.cid], sid);

        cir.get_mut(&sid).unwrap().set_prop("throw", 1.0);
        let exp = expand_switches(&cir);
        let sw = &exp.solver_comps[0];
        // Default second throw terminal: (b.x, b.y + 2)
        assert_eq!(sw.b, p(6, 2));
        assert_eq!(exp.label[&sw.cid], "t1");
    }

    #[test]
    fn test_sp3t_clamps_throw() {
        let mut cir = Circuit::new();
        let sid = cir.add(ComponentKind::SwitchSp3t, p(0, 0), p(6, 0), &[("throw", 7.0)]);
        let exp = expand_switches(&cir);
        let sw = &exp.solver_comps[0];
        assert_eq!(exp.label[&sw.cid], "t2");
        assert_eq!(sw.b, p(6, 4));
        assert_eq!(exp.parent[&sw.cid], sid);
    }

    #[test]
    fn test_dpst_shares_state_across_channels() {
        let mut cir = Circuit::new();
        let sid = cir.add(ComponentKind::SwitchDpst, p(0, 0), p(6, 0), &[("state", 0.0)]);
        let exp = expand_switches(&cir);
        assert_eq!(exp.solver_comps.len(), 2);
        for sw in &exp.solver_comps {
            assert_eq!(exp.parent[&sw.cid], sid);
            assert_eq!(effective_resistance(sw), None);
        }
        assert_eq!(exp.label[&exp.solver_comps[0].cid], "p1");
        assert_eq!(exp.label[&exp.solver_comps[1].cid], "p2");
        // Second channel defaults two rows below the first.
        assert_eq!(exp.solver_comps[1].a, p(0, 2));
        assert_eq!(exp.solver_comps[1].b, p(6, 2));
    }

    #[test]
    fn test_dpdt_throw_moves_both_poles() {
        let mut cir = Circuit::new();
        let sid = cir.add(ComponentKind::SwitchDpdt, p(0, 0), p(6, 0), &[("throw", 1.0)]);
        let exp = expand_switches(&cir);
        assert_eq!(exp.solver_comps.len(), 2);
        let p1 = &exp.solver_comps[0];
        let p2 = &exp.solver_comps[1];
        assert_eq!(p1.b, p(6, 2));
        // Pole 2 common defaults to (a.x, a.y + 4); throw-1 target two below
        // its throw-0 target.
        assert_eq!(p2.a, p(0, 4));
        assert_eq!(p2.b, p(6, 6));
        assert_eq!(exp.parent[&p1.cid], sid);
        assert_eq!(exp.parent[&p2.cid], sid);
    }

    #[test]
    fn test_momentary_button_state_follows_pressed() {
        let mut cir = Circuit::new();
        let bid = cir.add(ComponentKind::ButtonMomentary, p(0, 0), p(4, 0), &[]);
        let exp = expand_switches(&cir);
        assert_eq!(effective_resistance(&exp.solver_comps[0]), None);
        assert_eq!(exp.label[&exp.solver_comps[0].cid], "m");

        cir.get_mut(&bid).unwrap().set_prop("pressed", 1.0);
        let exp = expand_switches(&cir);
        assert!(effective_resistance(&exp.solver_comps[0]).is_some());
    }

    #[test]
    fn test_surrogate_cids_are_namespaced() {
        let mut cir = Circuit::new();
        let sid = cir.add(ComponentKind::SwitchSpdt, p(0, 0), p(6, 0), &[]);
        let exp = expand_switches(&cir);
        assert_eq!(exp.solver_comps[0].cid, format!("{sid}:t0"));
        assert_eq!(exp.solver_comps[0].meta["variant"], "spdt->b");
    }
}
