//! Dense linear system solver.

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};

/// Pivots with magnitude below this are treated as zero.
pub const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve Ax = b using Gaussian elimination with partial pivoting.
///
/// The target systems are small (tens of unknowns), so a dense direct solve
/// is both adequate and robust. Returns [`Error::SingularMatrix`] when the
/// best available pivot falls below [`PIVOT_TOLERANCE`].
pub fn solve_dense(a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>> {
    if a.nrows() != a.ncols() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: a.ncols(),
        });
    }
    if a.nrows() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.nrows(),
            actual: b.len(),
        });
    }

    let n = a.nrows();
    let mut m = a.clone();
    let mut x = b.clone();

    for col in 0..n {
        // Partial pivoting: largest magnitude in the column at or below the
        // diagonal.
        let mut pivot = col;
        let mut best = m[(col, col)].abs();
        for r in (col + 1)..n {
            let v = m[(r, col)].abs();
            if v > best {
                best = v;
                pivot = r;
            }
        }
        if best < PIVOT_TOLERANCE {
            return Err(Error::SingularMatrix);
        }
        if pivot != col {
            m.swap_rows(col, pivot);
            x.swap_rows(col, pivot);
        }

        let inv = 1.0 / m[(col, col)];
        for c in col..n {
            m[(col, c)] *= inv;
        }
        x[col] *= inv;

        // Gauss-Jordan: eliminate the column everywhere else, leaving the
        // solution directly in x.
        for r in 0..n {
            if r == col {
                continue;
            }
            let factor = m[(r, col)];
            if factor.abs() < PIVOT_TOLERANCE {
                continue;
            }
            for c in col..n {
                let pivot_val = m[(col, c)];
                m[(r, c)] -= factor * pivot_val;
            }
            let xc = x[col];
            x[r] -= factor * xc;
        }
    }

    Ok(x)
}
