use crate::layers::dense::Layer;

/// Stochastic gradient descent with momentum.
pub struct Sgd {
    pub learning_rate: f64,
    pub momentum: f64,
}

impl Sgd {
    pub fn new(learning_rate: f64, momentum: f64) -> Sgd {
        Sgd { learning_rate, momentum }
    }

    /// Applies one update to `layer` from its current deltas.
    /// `incoming` is the previous layer's output.
    pub fn step(&self, layer: &mut Layer, incoming: &[f64]) {
        for node in 0..layer.size {
            let delta = layer.deltas[node];
            let weights = layer.weights.row_mut(node);
            let changes = layer.changes.row_mut(node);

            for ((weight, change), input) in weights.iter_mut().zip(changes.iter_mut()).zip(incoming) {
                *change = self.learning_rate * delta * input + self.momentum * *change;
                *weight += *change;
            }

            layer.biases[node] += self.learning_rate * delta;
        }
    }
}
