use serde::{Serialize, Deserialize};

/// Weight-update rule used for a training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Praxis {
    /// SGD with momentum.
    #[default]
    Momentum,
    Adam,
}
