use serde::{Serialize, Deserialize};

use crate::error::{BrainError, Result};

/// Topology configuration of a network.
///
/// When both `input_size` and `output_size` are set the layer sizes are
/// known up front. Otherwise they are inferred from the first training
/// example, and written back here once the topology is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkOptions {
    pub input_size: Option<usize>,
    pub hidden_layers: Vec<usize>,
    pub output_size: Option<usize>,
    /// Activation above which a single-output network predicts the positive class.
    pub binary_thresh: f64,
}

impl Default for NetworkOptions {
    fn default() -> Self {
        NetworkOptions {
            input_size: None,
            hidden_layers: Vec::new(),
            output_size: None,
            binary_thresh: 0.5,
        }
    }
}

impl NetworkOptions {
    pub fn hidden(hidden_layers: Vec<usize>) -> NetworkOptions {
        NetworkOptions { hidden_layers, ..Default::default() }
    }

    pub fn with_sizes(mut self, input_size: usize, output_size: usize) -> NetworkOptions {
        self.input_size = Some(input_size);
        self.output_size = Some(output_size);
        self
    }

    /// Layer sizes `[input, hidden.., output]`, if both ends are configured.
    pub fn sizes(&self) -> Option<Vec<usize>> {
        let (input, output) = (self.input_size?, self.output_size?);
        let mut sizes = Vec::with_capacity(self.hidden_layers.len() + 2);
        sizes.push(input);
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(output);
        Some(sizes)
    }

    /// Sizes derived from the first example's widths. A network without
    /// configured hidden layers gets one of `max(3, input / 2)` nodes.
    pub fn infer_sizes(&mut self, input_size: usize, output_size: usize) -> Vec<usize> {
        if self.hidden_layers.is_empty() {
            self.hidden_layers.push((input_size / 2).max(3));
        }
        self.input_size = Some(input_size);
        self.output_size = Some(output_size);
        let mut sizes = vec![input_size];
        sizes.extend_from_slice(&self.hidden_layers);
        sizes.push(output_size);
        sizes
    }
}

/// Checks the `LayerSizes` invariant: at least an input and an output
/// layer, every layer non-empty.
pub fn validate_sizes(sizes: &[usize]) -> Result<()> {
    if sizes.len() < 2 {
        return Err(BrainError::config("sizes", format!("{sizes:?}"), "must contain an input and an output width"));
    }
    if sizes.contains(&0) {
        return Err(BrainError::config("sizes", format!("{sizes:?}"), "every layer must have at least one node"));
    }
    Ok(())
}
