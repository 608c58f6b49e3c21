pub mod test_result;

pub use test_result::{ConfusionMatrix, Misclassification, TestResult};
