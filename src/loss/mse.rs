pub struct MseLoss;

impl MseLoss {
    /// Scalar MSE: mean((predicted - expected)²)
    pub fn loss(predicted: &[f64], expected: &[f64]) -> f64 {
        let errors: Vec<f64> = predicted.iter().zip(expected.iter())
            .map(|(a, b)| b - a)
            .collect();
        MseLoss::from_errors(&errors)
    }

    /// Mean of the squared entries of an already computed error vector.
    /// An empty vector has no error.
    pub fn from_errors(errors: &[f64]) -> f64 {
        if errors.is_empty() {
            return 0.0;
        }
        errors.iter().map(|e| e * e).sum::<f64>() / errors.len() as f64
    }
}
