use crate::layers::dense::Layer;

/// Adam: bias-corrected first/second moment estimates per parameter.
pub struct Adam {
    pub learning_rate: f64,
    pub beta1: f64,
    pub beta2: f64,
    pub epsilon: f64,
}

impl Adam {
    pub fn new(learning_rate: f64, beta1: f64, beta2: f64, epsilon: f64) -> Adam {
        Adam { learning_rate, beta1, beta2, epsilon }
    }

    /// Applies update number `t` (1-based) to `layer`.
    pub fn step(&self, layer: &mut Layer, incoming: &[f64], t: u64) {
        layer.ensure_moments();

        let Self { learning_rate: lr, beta1: b1, beta2: b2, epsilon: eps } = *self;
        let t = i32::try_from(t).unwrap_or(i32::MAX);
        let bc1 = 1.0 - b1.powi(t);
        let bc2 = 1.0 - b2.powi(t);

        let update = |low: &mut f64, high: &mut f64, gradient: f64| -> f64 {
            *low = b1 * *low + (1.0 - b1) * gradient;
            *high = b2 * *high + (1.0 - b2) * gradient * gradient;
            let corrected_low = *low / bc1;
            let corrected_high = *high / bc2;
            lr * corrected_low / (corrected_high.sqrt() + eps)
        };

        let Layer { size, weights, biases, deltas, moments, .. } = layer;
        let Some(moments) = moments.as_mut() else { return };

        for node in 0..*size {
            let delta = deltas[node];
            let rows = weights.row_mut(node).iter_mut()
                .zip(moments.weight_low.row_mut(node).iter_mut())
                .zip(moments.weight_high.row_mut(node).iter_mut())
                .zip(incoming);

            for (((weight, low), high), input) in rows {
                *weight += update(low, high, delta * input);
            }

            biases[node] += update(&mut moments.bias_low[node], &mut moments.bias_high[node], delta);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::matrix::Matrix;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn first_step_moves_by_learning_rate() {
        let mut layer = Layer::new(1, 1, &mut StdRng::seed_from_u64(0));
        layer.weights = Matrix::from_data(vec![vec![0.0]]);
        layer.biases = vec![0.0];
        layer.deltas = vec![0.5];
        let adam = Adam::new(0.01, 0.9, 0.999, 1e-8);

        adam.step(&mut layer, &[2.0], 1);

        // After bias correction on step 1, low/sqrt(high) == sign(gradient).
        assert_abs_diff_eq!(layer.weights.data[0][0], 0.01, epsilon = 1e-6);
        assert_abs_diff_eq!(layer.biases[0], 0.01, epsilon = 1e-6);
        let moments = layer.moments.as_ref().unwrap();
        assert_abs_diff_eq!(moments.weight_low.data[0][0], 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(moments.bias_high[0], 0.001 * 0.25, epsilon = 1e-12);
    }
}
