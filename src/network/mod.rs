pub mod export;
pub mod network;
pub mod options;

pub use export::{LayerExport, NetworkExport};
pub use network::Network;
pub use options::NetworkOptions;
