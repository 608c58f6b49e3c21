use std::fmt;

use serde::{Serialize, Deserialize};

/// One labelled example. `input` must match the network's input width and
/// `output` its output width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingDatum {
    pub input: Vec<f64>,
    pub output: Vec<f64>,
}

impl TrainingDatum {
    pub fn new(input: Vec<f64>, output: Vec<f64>) -> TrainingDatum {
        TrainingDatum { input, output }
    }
}

/// Where a training run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingStatus {
    #[default]
    Running,
    /// Error fell to or below the threshold.
    Converged,
    TimedOut,
    IterationCapped,
}

/// Progress of a single training run.
///
/// Hooks receive clones; the value returned from `Network::train` is the
/// final state itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingState {
    pub id: Option<usize>,
    pub iterations: usize,
    /// Mean squared error over the training set as of the last recomputation.
    pub error: f64,
    pub status: TrainingStatus,
}

impl TrainingState {
    /// Fresh state; the error starts at 1 so it never satisfies a threshold.
    pub fn new(id: Option<usize>) -> TrainingState {
        TrainingState {
            id,
            iterations: 0,
            error: 1.0,
            status: TrainingStatus::Running,
        }
    }
}

impl fmt::Display for TrainingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "N{id}")?,
            None => f.write_str("N-")?,
        }
        write!(f, ", Iterations {:05}, Errors {}", self.iterations, self.error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_pads_iterations() {
        let state = TrainingState { id: Some(2), iterations: 42, error: 0.25, status: TrainingStatus::Running };
        assert_eq!(state.to_string(), "N2, Iterations 00042, Errors 0.25");
        assert_eq!(TrainingState::new(None).to_string(), "N-, Iterations 00000, Errors 1");
    }
}
