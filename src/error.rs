use thiserror::Error;

use crate::activation::activation::ActivationFunction;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, BrainError>;

/// Everything that can go wrong while building, training, evaluating or
/// (de)serializing a network.
#[derive(Error, Debug)]
pub enum BrainError {
    /// A hyperparameter or topology setting is outside its allowed range.
    #[error("invalid configuration: {field} = {value} ({constraint})")]
    Configuration {
        field: &'static str,
        value: String,
        constraint: &'static str,
    },

    /// A vector length disagrees with the network topology.
    #[error("shape mismatch for {what}: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Inference was requested before the network has any dimensions.
    #[error("network is not initialized; train or import it before running")]
    Uninitialized,

    /// The activation is recognized but has no forward/backward rule.
    #[error("activation {0:?} is not implemented; only Sigmoid is supported")]
    UnsupportedActivation(ActivationFunction),

    #[error("insufficient data: {available} examples available, at least {required} required")]
    InsufficientData { available: usize, required: usize },

    /// Model selection was attempted before any fold produced a result.
    #[error("no trained partition to select a model from")]
    NoModelSelected,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BrainError {
    pub(crate) fn config(field: &'static str, value: impl ToString, constraint: &'static str) -> Self {
        BrainError::Configuration {
            field,
            value: value.to_string(),
            constraint,
        }
    }
}
