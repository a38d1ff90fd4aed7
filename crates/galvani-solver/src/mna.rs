//! MNA system assembly.
//!
//! Node voltages occupy rows `0..n-1` (ground omitted); each voltage source
//! adds one auxiliary current row in `n..n+m-1`, assigned in circuit
//! insertion order.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use galvani_core::{Component, ComponentKind, Point};

use crate::error::Result;
use crate::linear::solve_dense;

/// Pick the reference ground for a component list.
///
/// The `b` endpoint of the first socket wins; without a socket, the minimum
/// endpoint coordinate; for an empty circuit, the origin.
pub fn select_ground(comps: &[&Component]) -> Point {
    for c in comps {
        if c.kind == ComponentKind::Socket {
            return c.b;
        }
    }
    comps
        .iter()
        .flat_map(|c| [c.a, c.b])
        .min()
        .unwrap_or(Point::new(0, 0))
}

/// Deterministic enumeration of non-ground nodes.
#[derive(Debug, Clone)]
pub struct NodeMap {
    pub ground: Point,
    index: HashMap<Point, usize>,
}

impl NodeMap {
    /// Collect every unique endpoint, sort, and index all but ground.
    pub fn build(comps: &[Component], ground: Point) -> Self {
        let mut nodes: Vec<Point> = comps
            .iter()
            .flat_map(|c| [c.a, c.b])
            .collect();
        nodes.sort_unstable();
        nodes.dedup();

        let mut index = HashMap::new();
        let mut next = 0;
        for n in nodes {
            if n == ground {
                continue;
            }
            index.insert(n, next);
            next += 1;
        }
        Self { ground, index }
    }

    /// Matrix row/column for a node; `None` for ground.
    pub fn index(&self, node: Point) -> Option<usize> {
        self.index.get(&node).copied()
    }

    /// Number of non-ground nodes.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterate `(node, index)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Point, usize)> + '_ {
        self.index.iter().map(|(p, i)| (*p, *i))
    }
}

/// The augmented nodal/auxiliary system `Ax = b`.
#[derive(Debug, Clone)]
pub struct MnaSystem {
    matrix: DMatrix<f64>,
    rhs: DVector<f64>,
    pub num_nodes: usize,
    pub num_sources: usize,
}

impl MnaSystem {
    pub fn new(num_nodes: usize, num_sources: usize) -> Self {
        let size = num_nodes + num_sources;
        Self {
            matrix: DMatrix::zeros(size, size),
            rhs: DVector::zeros(size),
            num_nodes,
            num_sources,
        }
    }

    pub fn size(&self) -> usize {
        self.num_nodes + self.num_sources
    }

    pub fn matrix(&self) -> &DMatrix<f64> {
        &self.matrix
    }

    pub fn rhs(&self) -> &DVector<f64> {
        &self.rhs
    }

    /// Stamp a conductance `g` between two nodes (`None` = ground).
    pub fn stamp_conductance(&mut self, ia: Option<usize>, ib: Option<usize>, g: f64) {
        if let Some(i) = ia {
            self.matrix[(i, i)] += g;
        }
        if let Some(j) = ib {
            self.matrix[(j, j)] += g;
        }
        if let (Some(i), Some(j)) = (ia, ib) {
            self.matrix[(i, j)] -= g;
            self.matrix[(j, i)] -= g;
        }
    }

    /// Stamp an ideal voltage source `V(a) - V(b) = v` at auxiliary slot `k`.
    ///
    /// The auxiliary unknown is the current flowing from `a` to `b` through
    /// the source itself, i.e. the negative of the current the source
    /// delivers into the circuit at `a`. Downstream overcurrent checks use
    /// the magnitude only.
    pub fn stamp_voltage_source(
        &mut self,
        ia: Option<usize>,
        ib: Option<usize>,
        k: usize,
        v: f64,
    ) {
        let row = self.num_nodes + k;
        if let Some(i) = ia {
            self.matrix[(i, row)] += 1.0;
            self.matrix[(row, i)] += 1.0;
        }
        if let Some(j) = ib {
            self.matrix[(j, row)] -= 1.0;
            self.matrix[(row, j)] -= 1.0;
        }
        self.rhs[row] = v;
    }

    /// Solve the assembled system.
    pub fn solve(&self) -> Result<DVector<f64>> {
        solve_dense(&self.matrix, &self.rhs)
    }
}
