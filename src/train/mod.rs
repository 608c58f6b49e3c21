pub mod state;
pub mod train_config;

pub use state::{TrainingDatum, TrainingState, TrainingStatus};
pub use train_config::{StateHook, TrainingOptions, TrainingOptionsPatch};
