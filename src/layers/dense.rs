use rand::Rng;

use crate::{
    activation::activation::ActivationFunction,
    error::Result,
    math::matrix::{uniform_vec, Matrix},
};

/// Range of the uniform distribution used for fresh weights and biases.
pub const INIT_BOUND: f64 = 0.2;

/// First/second moment estimates kept per weight and per bias under Adam.
#[derive(Debug, Clone)]
pub struct AdamMoments {
    pub weight_low: Matrix,
    pub weight_high: Matrix,
    pub bias_low: Vec<f64>,
    pub bias_high: Vec<f64>,
}

impl AdamMoments {
    pub fn zeros(size: usize, input_size: usize) -> AdamMoments {
        AdamMoments {
            weight_low: Matrix::zeros(size, input_size),
            weight_high: Matrix::zeros(size, input_size),
            bias_low: vec![0.0; size],
            bias_high: vec![0.0; size],
        }
    }
}

/// A fully connected, non-input layer.
///
/// Owns its parameters plus every buffer the training loop writes per
/// example, so a tick over the training set allocates nothing.
#[derive(Debug, Clone)]
pub struct Layer{
    pub size: usize,
    /// `size` rows, one weight per node of the previous layer.
    pub weights: Matrix,
    pub biases: Vec<f64>,
    pub outputs: Vec<f64>,
    pub deltas: Vec<f64>,
    pub errors: Vec<f64>,
    /// Last applied weight change, read back as momentum.
    pub changes: Matrix,
    /// Allocated on first use of Adam.
    pub moments: Option<AdamMoments>,
}

impl Layer {
    pub fn new<R: Rng + ?Sized>(size: usize, input_size: usize, rng: &mut R) -> Layer {
        Layer {
            size,
            weights: Matrix::uniform(size, input_size, INIT_BOUND, rng),
            biases: uniform_vec(size, INIT_BOUND, rng),
            outputs: vec![0.0; size],
            deltas: vec![0.0; size],
            errors: vec![0.0; size],
            changes: Matrix::zeros(size, input_size),
            moments: None,
        }
    }

    pub fn input_size(&self) -> usize {
        self.weights.cols
    }

    /// Computes `activation(bias + Σ weight·input)` for every node into the
    /// output buffer.
    pub fn feed_from(&mut self, input: &[f64], activation: ActivationFunction) -> Result<()> {
        for node in 0..self.size {
            let sum = self.weights.row(node).iter()
                .zip(input)
                .fold(self.biases[node], |acc, (w, x)| acc + w * x);
            self.outputs[node] = activation.function(sum)?;
        }
        Ok(())
    }

    /// Output-layer deltas: the error is `target - output`.
    pub fn output_deltas(&mut self, target: &[f64], activation: ActivationFunction) -> Result<()> {
        for node in 0..self.size {
            let output = self.outputs[node];
            let error = target[node] - output;
            self.errors[node] = error;
            self.deltas[node] = activation.delta(error, output)?;
        }
        Ok(())
    }

    /// Hidden-layer deltas, propagated back through `next`'s (not yet
    /// updated) weights and already computed deltas.
    pub fn hidden_deltas(&mut self, next: &Layer, activation: ActivationFunction) -> Result<()> {
        for node in 0..self.size {
            let error = next.deltas.iter()
                .enumerate()
                .map(|(k, delta)| delta * next.weights.data[k][node])
                .sum::<f64>();
            self.errors[node] = error;
            self.deltas[node] = activation.delta(error, self.outputs[node])?;
        }
        Ok(())
    }

    pub fn ensure_moments(&mut self) {
        if self.moments.is_none() {
            self.moments = Some(AdamMoments::zeros(self.size, self.input_size()));
        }
    }
}
