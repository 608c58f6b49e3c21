use serde::{Serialize, Deserialize};
use std::f64::consts::E;

use crate::error::{BrainError, Result};

/// Activation applied to every non-input node.
///
/// Only `Sigmoid` has a forward and backward rule. The other kinds are
/// accepted by the (de)serializer so configurations naming them can be read,
/// but selecting one for training or inference fails with
/// `BrainError::UnsupportedActivation` instead of falling back silently.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivationFunction {
    #[default]
    Sigmoid,
    #[serde(rename = "relu")]
    ReLU,
    #[serde(rename = "leaky_relu")]
    LeakyReLU,
    Tanh,
}

impl ActivationFunction {
    /// Fails unless this activation has an implementation.
    pub fn ensure_supported(&self) -> Result<()> {
        match self {
            ActivationFunction::Sigmoid => Ok(()),
            other => Err(BrainError::UnsupportedActivation(*other)),
        }
    }

    /// Element-wise forward transform.
    pub fn function(&self, x: f64) -> Result<f64> {
        match self {
            ActivationFunction::Sigmoid => Ok(1.0 / (1.0 + E.powf(-x))),
            other => Err(BrainError::UnsupportedActivation(*other)),
        }
    }

    /// Delta for a node given its backpropagated error and its activated
    /// output (not the pre-activation sum).
    pub fn delta(&self, error: f64, output: f64) -> Result<f64> {
        match self {
            ActivationFunction::Sigmoid => Ok(error * output * (1.0 - output)),
            other => Err(BrainError::UnsupportedActivation(*other)),
        }
    }
}
