//! Error types for the solver crate.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    /// A pivot fell below tolerance during elimination.
    #[error("matrix is singular")]
    SingularMatrix,

    /// Matrix and right-hand side shapes disagree.
    #[error("dimension mismatch: expected {expected}, actual {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
