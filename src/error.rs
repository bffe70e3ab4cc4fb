//! Error types for unlearning runs, model artifacts and the JSON data store.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for forget-nn operations.
pub type Result<T> = std::result::Result<T, UnlearnError>;

/// Errors surfaced by the library.
///
/// A cancelled run is not an error; it ends with
/// `UnlearningOutcome::Cancelled`.
#[derive(Debug, Error)]
pub enum UnlearnError {
    /// Request rejected before any training happened.
    #[error("invalid unlearning request: {0}")]
    InvalidRequest(String),

    /// Removing the forget class left nothing to train on.
    #[error("no training samples remain after removing class {forget_class}")]
    EmptyRetainSet { forget_class: usize },

    /// A run is already in flight on this status handle.
    #[error("an unlearning run is already in progress")]
    AlreadyRunning,

    /// Operand shapes do not line up.
    #[error("shape mismatch: expected {expected}, got {got}")]
    ShapeMismatch { expected: String, got: String },

    /// `backward` was called without a preceding training-mode `forward`.
    #[error("layer {layer} has no cached forward state; run forward in training mode first")]
    NoForwardCache { layer: usize },

    /// Malformed or inconsistent dataset.
    #[error("data error: {0}")]
    Data(String),

    /// A requested file or directory does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// I/O failure tied to a concrete path.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialisation failure tied to a concrete path.
    #[error("JSON error in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl UnlearnError {
    /// Wraps an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        UnlearnError::Io { path: path.into(), source }
    }

    /// Wraps a JSON error with the path it happened on.
    pub fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        UnlearnError::Json { path: path.into(), source }
    }

    pub fn shape(expected: impl Into<String>, got: impl Into<String>) -> Self {
        UnlearnError::ShapeMismatch { expected: expected.into(), got: got.into() }
    }
}
