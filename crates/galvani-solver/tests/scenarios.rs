//! End-to-end solve scenarios and conservation-law checks.

use std::collections::HashMap;

use galvani_core::{Circuit, ComponentKind, Point};
use galvani_solver::{
    component_metrics, effective_resistance, expand_switches, goal_seek_parameter, solve_circuit,
    CompFlag, GoalSeekRequest, MeasureField, Measurement, SeekMethod, SolveResult,
};

fn p(x: i32, y: i32) -> Point {
    Point::new(x, y)
}

/// Sum of signed branch currents at every node; zero everywhere by KCL.
fn node_current_sums(cir: &Circuit, res: &SolveResult) -> HashMap<Point, f64> {
    let mut sums: HashMap<Point, f64> = HashMap::new();
    let expansion = expand_switches(cir);
    for c in &expansion.solver_comps {
        let parent = &expansion.parent[&c.cid];
        let label = &expansion.label[&c.cid];
        let i = res.comp_branch_i[parent][label];
        // Positive current flows a -> b: it leaves a and enters b.
        *sums.entry(c.a).or_default() -= i;
        *sums.entry(c.b).or_default() += i;
    }
    sums
}

#[test]
fn voltage_divider_operating_point() {
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 10),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(0, 0), p(10, 0), &[("R", 100.0)]);
    cir.add(ComponentKind::Resistor, p(10, 0), p(10, 10), &[("R", 100.0)]);
    cir.add(ComponentKind::Wire, p(10, 10), p(0, 10), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    assert!((res.current(&sid).abs() - 0.05).abs() < 1e-9);
    assert!((res.voltage(p(10, 0)) - 5.0).abs() < 1e-4);
}

#[test]
fn series_resistors_split_the_voltage() {
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 12.0), ("Iwarn", 5.0)],
    );
    let r1 = cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 10.0)]);
    let r2 = cir.add(ComponentKind::Resistor, p(6, 0), p(12, 0), &[("R", 20.0)]);
    let r3 = cir.add(ComponentKind::Resistor, p(12, 0), p(12, 6), &[("R", 30.0)]);
    cir.add(ComponentKind::Wire, p(12, 6), p(0, 6), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    assert!((res.current(&sid).abs() - 0.2).abs() < 1e-9);

    for (rid, expected_drop) in [(&r1, 2.0), (&r2, 4.0), (&r3, 6.0)] {
        let m = component_metrics(&res, cir.get(rid).unwrap());
        assert!(
            (m.vab.abs() - expected_drop).abs() < 1e-6,
            "drop across {rid} = {}",
            m.vab
        );
    }
}

#[test]
fn bulb_draws_rated_power() {
    let mut cir = Circuit::new();
    cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 6.0), ("Iwarn", 5.0)],
    );
    let bid = cir.add(
        ComponentKind::Bulb,
        p(0, 0),
        p(6, 0),
        &[("Vr", 6.0), ("Wr", 3.0)],
    );
    cir.add(ComponentKind::Wire, p(6, 0), p(6, 6), &[]);
    cir.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    let m = component_metrics(&res, cir.get(&bid).unwrap());
    assert!((m.iab.abs() - 0.5).abs() < 1e-6, "I = {}", m.iab);
    assert!((m.p.abs() - 3.0).abs() < 1e-5, "P = {}", m.p);
}

#[test]
fn parallel_resistors_sum_their_currents() {
    let n = 4;
    let r = 100.0;
    let v = 10.0;
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 10),
        &[("V", v), ("Iwarn", 5.0)],
    );
    // All rungs share the same two nodes via coordinates.
    for _ in 0..n {
        cir.add(ComponentKind::Resistor, p(0, 0), p(0, 10), &[("R", r)]);
    }

    let res = solve_circuit(&cir);
    assert!(res.ok);
    let expected = v * n as f64 / r;
    assert!(
        (res.current(&sid).abs() - expected).abs() < 1e-9,
        "I = {}",
        res.current(&sid)
    );
}

#[test]
fn ohms_law_holds_per_component() {
    let mut cir = Circuit::new();
    cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 9.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 47.0)]);
    cir.add(ComponentKind::Bulb, p(6, 0), p(6, 6), &[("Vr", 6.0), ("Wr", 3.0)]);
    cir.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    for comp in cir.components.values() {
        if comp.kind == ComponentKind::Socket {
            continue;
        }
        let r = effective_resistance(comp).expect("all components closed");
        let m = component_metrics(&res, comp);
        let predicted = m.vab / r;
        let denom = m.iab.abs().max(1e-30);
        assert!(
            (m.iab - predicted).abs() / denom < 1e-9,
            "{}: I = {}, V/R = {}",
            comp.display_name(),
            m.iab,
            predicted
        );
    }
}

#[test]
fn kcl_holds_at_every_node() {
    let mut cir = Circuit::new();
    cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 10),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(0, 0), p(10, 0), &[("R", 100.0)]);
    cir.add(ComponentKind::Resistor, p(10, 0), p(10, 10), &[("R", 220.0)]);
    cir.add(ComponentKind::Resistor, p(10, 0), p(10, 10), &[("R", 330.0)]);
    cir.add(ComponentKind::Wire, p(10, 10), p(0, 10), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    for (node, sum) in node_current_sums(&cir, &res) {
        assert!(sum.abs() < 1e-9, "KCL violated at {node}: {sum}");
    }
}

#[test]
fn ground_is_pinned_to_zero() {
    let mut cir = Circuit::new();
    cir.add(
        ComponentKind::Socket,
        p(3, 7),
        p(5, 9),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(3, 7), p(5, 9), &[("R", 100.0)]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    assert_eq!(res.voltage(p(5, 9)), 0.0);
}

#[test]
fn closed_spst_matches_wire_equivalent() {
    // The same loop built with a closed SPST and with its hand-built
    // near-short equivalent must produce identical results.
    let build = |with_switch: bool| {
        let mut cir = Circuit::new();
        let sid = cir.add(
            ComponentKind::Socket,
            p(0, 0),
            p(0, 6),
            &[("V", 10.0), ("Iwarn", 5.0)],
        );
        cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 100.0)]);
        if with_switch {
            cir.add(ComponentKind::SwitchSpst, p(6, 0), p(6, 6), &[("state", 1.0)]);
        } else {
            cir.add(ComponentKind::Wire, p(6, 0), p(6, 6), &[]);
        }
        cir.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);
        (cir, sid)
    };

    let (sw_cir, sw_sid) = build(true);
    let (wire_cir, wire_sid) = build(false);
    let sw_res = solve_circuit(&sw_cir);
    let wire_res = solve_circuit(&wire_cir);
    assert!(sw_res.ok && wire_res.ok);
    assert!(
        (sw_res.current(&sw_sid) - wire_res.current(&wire_sid)).abs() < 1e-12
    );
    for (node, v) in &sw_res.node_v {
        assert!((v - wire_res.voltage(*node)).abs() < 1e-9, "node {node}");
    }
}

#[test]
fn spdt_throw_matches_hand_built_route() {
    // SPDT with throw=1 routes to the (b.x, b.y + 2) terminal; compare with
    // an explicit closed SPST over the same pair of points.
    let mut spdt = Circuit::new();
    let sid1 = spdt.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 6.0), ("Iwarn", 5.0)],
    );
    spdt.add(ComponentKind::SwitchSpdt, p(0, 0), p(6, 0), &[("throw", 1.0)]);
    spdt.add(ComponentKind::Resistor, p(6, 2), p(6, 6), &[("R", 60.0)]);
    spdt.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);

    let mut hand = Circuit::new();
    let sid2 = hand.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 6.0), ("Iwarn", 5.0)],
    );
    hand.add(ComponentKind::SwitchSpst, p(0, 0), p(6, 2), &[("state", 1.0)]);
    hand.add(ComponentKind::Resistor, p(6, 2), p(6, 6), &[("R", 60.0)]);
    hand.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);

    let res1 = solve_circuit(&spdt);
    let res2 = solve_circuit(&hand);
    assert!(res1.ok && res2.ok);
    assert!((res1.current(&sid1) - res2.current(&sid2)).abs() < 1e-12);
}

#[test]
fn pressed_button_matches_closed_switch() {
    let build = |kind: ComponentKind, props: &[(&str, f64)]| {
        let mut cir = Circuit::new();
        let sid = cir.add(
            ComponentKind::Socket,
            p(0, 0),
            p(0, 6),
            &[("V", 5.0), ("Iwarn", 5.0)],
        );
        cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 50.0)]);
        cir.add(kind, p(6, 0), p(6, 6), props);
        cir.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);
        (cir, sid)
    };

    let (btn_cir, btn_sid) = build(ComponentKind::ButtonMomentary, &[("pressed", 1.0)]);
    let (sw_cir, sw_sid) = build(ComponentKind::SwitchSpst, &[("state", 1.0)]);
    let btn_res = solve_circuit(&btn_cir);
    let sw_res = solve_circuit(&sw_cir);
    assert!(btn_res.ok && sw_res.ok);
    assert!((btn_res.current(&btn_sid) - sw_res.current(&sw_sid)).abs() < 1e-12);
}

#[test]
fn open_switch_leaves_quiet_loop() {
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 100.0)]);
    let swid = cir.add(ComponentKind::SwitchSpst, p(6, 0), p(6, 6), &[("state", 0.0)]);
    cir.add(ComponentKind::Wire, p(6, 6), p(0, 6), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    assert!(res.current(&sid).abs() < 1e-6);
    assert_eq!(res.comp_flags.get(&swid), Some(&CompFlag::Open));
    assert!(res.warnings.iter().any(|w| w.contains("open loop")));
}

#[test]
fn short_across_source_is_flagged_not_singular() {
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 5.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Wire, p(0, 0), p(0, 6), &[]);

    let res = solve_circuit(&cir);
    assert!(res.ok);
    assert!(!res.singular);
    assert_eq!(res.comp_flags.get(&sid), Some(&CompFlag::SourceOvercurrent));
    assert!(!res.warnings.is_empty());
}

#[test]
fn goal_seek_finds_divider_resistance() {
    let mut cir = Circuit::new();
    let sid = cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 6),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Resistor, p(0, 0), p(6, 0), &[("R", 100.0)]);
    let rid = cir.add(ComponentKind::Resistor, p(6, 0), p(12, 0), &[("R", 50.0)]);
    cir.add(ComponentKind::Wire, p(12, 0), p(12, 6), &[]);
    cir.add(ComponentKind::Wire, p(12, 6), p(0, 6), &[]);

    let req = GoalSeekRequest {
        var_cid: rid.clone(),
        var_prop: "R".to_string(),
        target: 0.05,
        measure: Measurement::Comp {
            cid: sid,
            field: MeasureField::Iab,
            branch: None,
            abs: true,
        },
        lo: 1.0,
        hi: 1000.0,
        tol_abs: 1e-9,
        tol_rel: 1e-4,
        max_iter: 80,
        method: SeekMethod::Auto,
        reject_if_overcurrent: false,
    };
    let result = goal_seek_parameter(&mut cir, &req);
    assert!(result.ok, "message: {}", result.message);

    let solved = cir.get(&rid).unwrap().prop("R", 0.0);
    let expected = 10.0 / 0.05 - 100.0;
    assert!(
        (solved - expected).abs() / expected < 1e-2,
        "solved = {solved}, expected = {expected}"
    );
}

#[test]
fn solve_twice_yields_equal_maps() {
    let mut cir = Circuit::new();
    cir.add(
        ComponentKind::Socket,
        p(0, 0),
        p(0, 10),
        &[("V", 10.0), ("Iwarn", 5.0)],
    );
    cir.add(ComponentKind::Rheostat, p(0, 0), p(10, 0), &[("R", 150.0)]);
    cir.add(ComponentKind::Ammeter, p(10, 0), p(10, 10), &[]);
    cir.add(ComponentKind::Wire, p(10, 10), p(0, 10), &[]);

    let r1 = solve_circuit(&cir);
    let r2 = solve_circuit(&cir);
    assert_eq!(r1.node_v, r2.node_v);
    assert_eq!(r1.comp_i, r2.comp_i);
    assert_eq!(r1.comp_branch_i, r2.comp_branch_i);
}
