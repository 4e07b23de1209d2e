//! Error types for the simulation engine.
//!
//! Only boundary operations (configuration loading, snapshot export, parsing
//! caller-supplied operation names) can fail. Capacity exhaustion and unknown
//! identifiers are logged no-ops, never errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type WorldResult<T> = Result<T, WorldError>;

#[derive(Debug, Error)]
pub enum WorldError {
    #[error("i/o error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("unknown will operation: {0}")]
    UnknownWillOperation(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("field `{field}` value {value} outside [{min}, {max}] at element {index}")]
    FieldOutOfBounds {
        field: &'static str,
        index: usize,
        value: f32,
        min: f32,
        max: f32,
    },
    #[error("agent `{id}` (slot {index}) violates bounds: {detail}")]
    AgentOutOfBounds { id: String, index: usize, detail: String },
}

impl WorldError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WorldError::Io {
            path: path.into(),
            source,
        }
    }
}
