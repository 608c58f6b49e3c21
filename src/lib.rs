pub mod error;
pub mod math;
pub mod activation;
pub mod layers;
pub mod network;
pub mod loss;
pub mod optim;
pub mod train;
pub mod eval;
pub mod cross_validate;

// Convenience re-exports
pub use error::{BrainError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use layers::dense::Layer;
pub use network::{Network, NetworkExport, NetworkOptions, LayerExport};
pub use loss::mse::MseLoss;
pub use optim::{Adam, Praxis, Sgd};
pub use train::{StateHook, TrainingDatum, TrainingOptions, TrainingOptionsPatch, TrainingState, TrainingStatus};
pub use eval::{ConfusionMatrix, Misclassification, TestResult};
pub use cross_validate::{CrossValidate, CrossValidateStats, PartitionResult, DEFAULT_FOLDS};
