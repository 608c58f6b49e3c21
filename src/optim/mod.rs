pub mod adam;
pub mod praxis;
pub mod sgd;

pub use adam::Adam;
pub use praxis::Praxis;
pub use sgd::Sgd;
