//! Tabular output for solve and goal-seek results.

use galvani_core::format::format_si;
use galvani_core::{Circuit, Point};
use galvani_solver::{CompFlag, GoalSeekRequest, GoalSeekResult, SolveResult};

/// Print the DC operating point: node voltages, component currents, flags,
/// and warnings.
pub fn print_solve_result(cir: &Circuit, result: &SolveResult) {
    println!("DC Operating Point");
    println!("==================");
    println!();

    if !result.ok {
        println!("Solve failed{}.", if result.singular { " (singular system)" } else { "" });
        print_warnings(result);
        return;
    }

    let mut nodes: Vec<(&Point, &f64)> = result.node_v.iter().collect();
    nodes.sort_by_key(|(p, _)| **p);

    println!("Node voltages:");
    for (node, v) in nodes {
        println!("  {:>10}  {:>12}", node.to_string(), format_si(*v, "V"));
    }
    println!();

    println!("Component currents:");
    for comp in cir.components.values() {
        let current = result.current(&comp.cid);
        let flag = match result.comp_flags.get(&comp.cid) {
            Some(CompFlag::Open) => "  [open]",
            Some(CompFlag::Overcurrent) => "  [overcurrent]",
            Some(CompFlag::SourceOvercurrent) => "  [source overcurrent]",
            None => "",
        };
        println!(
            "  {:>20}  {:>12}{}",
            comp.display_name(),
            format_si(current, "A"),
            flag
        );
        if let Some(branches) = result.comp_branch_i.get(&comp.cid) {
            if branches.len() > 1 || !branches.contains_key("main") {
                for (label, i) in branches {
                    println!("  {:>20}  {:>12}", format!("· {label}"), format_si(*i, "A"));
                }
            }
        }
    }

    print_warnings(result);
    println!();
    println!("Analysis complete.");
}

fn print_warnings(result: &SolveResult) {
    if result.warnings.is_empty() {
        return;
    }
    println!();
    println!("Warnings:");
    for w in &result.warnings {
        println!("  - {w}");
    }
}

/// Print a goal-seek outcome and its trajectory summary.
pub fn print_goal_seek_result(req: &GoalSeekRequest, result: &GoalSeekResult) {
    println!("Goal Seek ({} of {})", req.var_prop, req.var_cid);
    println!("==========================================");
    println!();
    if result.ok {
        println!("Converged in {} iterations.", result.iterations);
    } else {
        println!("Failed after {} iterations: {}", result.iterations, result.message);
    }
    println!("  value    = {:.6e}", result.value);
    println!("  achieved = {:.6e}", result.achieved);
    println!("  target   = {:.6e}", result.target);
    println!("  error    = {:.3e}", result.error);
    println!("  evaluations recorded: {}", result.history.len());
}
