//! Error types for the core crate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// A persisted circuit document failed to parse or validate.
    #[error("malformed circuit document: {0}")]
    MalformedCircuit(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
